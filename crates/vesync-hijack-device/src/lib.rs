//! TCP configuration client for newly joined smart plugs.
//!
//! Once a plug has joined the network it listens on a fixed TCP port for
//! a single `/beginConfigRequest`. We connect, send it, wait for the one
//! correlated reply, and close. The plug then reboots and dials the server
//! named in the request.

pub mod command;
pub mod connector;
pub mod error;
pub mod session;

pub use command::{BeginConfigRequest, BEGIN_CONFIG_URI};
pub use connector::{configure_device, DEVICE_CONFIG_PORT};
pub use error::{DeviceError, Result};
pub use session::{DeviceSession, SessionState};
