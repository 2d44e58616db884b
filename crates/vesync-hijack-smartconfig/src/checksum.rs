//! Checksums used by the Espressif provisioning and boot stacks.

/// Reversed 1-Wire polynomial used by Esptouch.
const CRC8_POLY: u8 = 0x8c;

const CRC8_TABLE: [u8; 256] = build_crc8_table();

const fn build_crc8_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut remainder = i as u8;
        let mut bit = 0;
        while bit < 8 {
            remainder = if remainder & 0x01 != 0 {
                (remainder >> 1) ^ CRC8_POLY
            } else {
                remainder >> 1
            };
            bit += 1;
        }
        table[i] = remainder;
        i += 1;
    }
    table
}

/// Esptouch CRC8 (polynomial 0x8C reflected, initial value 0).
///
/// Accepts anything byte-like, so both `crc8_esptouch("ssid")` and
/// `crc8_esptouch(&[b, seq])` work. The Esptouch reference keeps a 16-bit
/// accumulator, but the bits above the low byte never reach the table index
/// or the result, so a `u8` state is equivalent.
pub fn crc8_esptouch(bytes: impl AsRef<[u8]>) -> u8 {
    bytes
        .as_ref()
        .iter()
        .fold(0u8, |value, &b| CRC8_TABLE[(b ^ value) as usize])
}

/// Sign adjustment applied by Espressif's `gen_appbin` after a standard CRC-32.
pub fn espressif_adjust(crc: u32) -> u32 {
    if crc < 0x8000_0000 {
        crc + 1
    } else {
        u32::MAX - crc
    }
}

/// CRC-32 (IEEE, reflected 0xEDB88320) with the Espressif sign adjustment.
///
/// Matches the trailing checksum the vendor bootloader writes after a user
/// image.
pub fn crc32_espressif(bytes: impl AsRef<[u8]>) -> u32 {
    espressif_adjust(crc32fast::hash(bytes.as_ref()))
}
