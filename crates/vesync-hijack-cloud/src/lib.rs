//! Impersonated vendor cloud.
//!
//! After configuration a plug reboots and opens a WebSocket to the server it
//! was given. This crate answers on that socket the way the vendor cloud
//! does, accepts the plug's login, and tells it to upgrade its firmware from
//! our own HTTP server, which is served from the same listener.

pub mod assets;
pub mod cipher;
pub mod connection;
pub mod error;
pub mod message;
pub mod server;

pub use assets::StaticAssets;
pub use connection::{DeviceSocketConnection, Inbound, Outbound};
pub use error::{CloudError, Result};
pub use message::{
    DeviceMessage, LoginReply, UpgradeDirective, EXPECTED_DEVICE_NAME, EXPECTED_DEVICE_TYPE,
    UPGRADE_VERSION,
};
pub use server::{router, CloudConfig, CloudServer, HTTP_PORT, WEBSOCKET_PATH};
