//! One-byte length-prefixed framing for the plug configuration protocol.
//!
//! Every message on the device's TCP port is framed as:
//! - A 1-byte body length
//! - The JSON body, optionally null-terminated inside the declared length
//! - An optional trailing null pad byte after the frame
//!
//! [`DeviceCodec`] plugs this into `tokio_util::codec` so callers always see
//! complete bodies regardless of TCP segmentation.

pub mod codec;
pub mod error;

pub use codec::{decode_frame, encode_frame, DeviceCodec, Frame, LENGTH_PREFIX_SIZE, MAX_BODY_LEN};
pub use error::{FrameError, Result};
