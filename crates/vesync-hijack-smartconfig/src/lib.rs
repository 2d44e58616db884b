//! Esptouch/AirKiss credential broadcast and device rendezvous.
//!
//! An unconfigured plug sniffs the air for UDP datagrams before it has any
//! network access. It cannot read their payloads, only their lengths, so the
//! credentials are encoded as a sequence of datagram lengths:
//! - A guide preamble (515, 514, 513, 512) lets the sniffer lock on
//! - Each payload byte becomes three lengths: crc/data high nibbles, a
//!   sequence marker, crc/data low nibbles
//!
//! Once the plug joins the network it announces itself over UDP; the
//! [`RendezvousListener`] turns those announcements into device addresses.

pub mod checksum;
pub mod credentials;
pub mod encoder;
pub mod error;
pub mod rendezvous;
pub mod transmitter;

pub use checksum::{crc32_espressif, crc8_esptouch, espressif_adjust};
pub use credentials::{format_bssid, parse_bssid, Bssid, NetworkCredentials, ZERO_BSSID};
pub use encoder::{encode_packet_lengths, GUARD_LENGTH, MAX_PAYLOAD_LEN};
pub use error::{Result, SmartConfigError};
pub use rendezvous::{AnnouncementFilter, RendezvousListener, DEDUP_WINDOW};
pub use transmitter::{BroadcastTiming, BroadcastTransmitter, GUIDE_CODE};
