//! Esptouch datum encoding.
//!
//! Payload layout before encoding:
//! ```text
//! ┌───────┬─────────┬──────────┬───────────┬─────┬────────┬────────────┬──────────┐
//! │ total │ pass    │ crc8     │ crc8      │ xor │ IPv4   │ passphrase │ SSID     │
//! │ len   │ len     │ (SSID)   │ (BSSID)   │     │ (4B)   │            │ (hidden) │
//! └───────┴─────────┴──────────┴───────────┴─────┴────────┴────────────┴──────────┘
//! ```
//! Each payload byte at index `seq` is sent as three datagram lengths:
//! ```text
//!              control   high 4 bits   low 4 bits
//! 1st 9 bits:    0x0      crc(high)     data(high)
//! 2nd 9 bits:    0x1         sequence index
//! 3rd 9 bits:    0x0      crc(low)      data(low)
//! ```
//! where `crc = crc8([byte, seq])`, and every length is offset by
//! [`GUARD_LENGTH`] so none of them is zero.

use crate::checksum::crc8_esptouch;
use crate::credentials::NetworkCredentials;
use crate::error::{Result, SmartConfigError};

/// Offset added to every encoded length.
pub const GUARD_LENGTH: u16 = 40;

/// The total-length and sequence fields are a single byte each.
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

const TOTAL_LEN_INDEX: usize = 0;
const XOR_INDEX: usize = 4;

/// Marks the middle slot as the sequence index.
const SEQUENCE_MARKER: u16 = 0x100;

/// Build the raw datum payload (before the three-slot expansion).
pub fn build_payload(credentials: &NetworkCredentials, ssid_hidden: bool) -> Result<Vec<u8>> {
    let ssid = credentials.ssid.as_bytes();
    let passphrase = credentials.passphrase.as_bytes();

    let mut payload = Vec::with_capacity(9 + passphrase.len() + ssid.len());
    payload.extend_from_slice(&[
        0,
        passphrase.len() as u8,
        crc8_esptouch(ssid),
        crc8_esptouch(credentials.bssid),
        0,
    ]);
    payload.extend_from_slice(&credentials.local_ip.octets());
    payload.extend_from_slice(passphrase);
    payload.extend_from_slice(ssid);

    if payload.len() > MAX_PAYLOAD_LEN || passphrase.len() > MAX_PAYLOAD_LEN {
        return Err(SmartConfigError::PayloadTooLong {
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    // Length and xor cover the SSID even when it is dropped below.
    payload[TOTAL_LEN_INDEX] = payload.len() as u8;
    payload[XOR_INDEX] = payload.iter().fold(0, |acc, b| acc ^ b);

    if !ssid_hidden {
        payload.truncate(payload.len() - ssid.len());
    }
    Ok(payload)
}

/// Encode credentials into the ordered datagram lengths to transmit.
///
/// The result always has `3 * payload_len` entries.
pub fn encode_packet_lengths(
    credentials: &NetworkCredentials,
    ssid_hidden: bool,
) -> Result<Vec<u16>> {
    let payload = build_payload(credentials, ssid_hidden)?;

    let mut lengths = Vec::with_capacity(payload.len() * 3);
    for (seq, &b) in payload.iter().enumerate() {
        let seq = seq as u8;
        let crc = u16::from(crc8_esptouch([b, seq]));
        let b = u16::from(b);

        lengths.push(GUARD_LENGTH + ((crc & 0xf0) | (b >> 4)));
        lengths.push(GUARD_LENGTH + (SEQUENCE_MARKER | u16::from(seq)));
        lengths.push(GUARD_LENGTH + (((crc & 0x0f) << 4) | (b & 0x0f)));
    }
    Ok(lengths)
}
