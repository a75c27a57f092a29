//! CRC-16/ARC style checksum (reflected polynomial `0xA001`, init `0xFFFF`).
//!
//! These are the CRC-16/MODBUS parameters. The table-free bit-serial form is
//! used so that the same routine fits small targets unchanged.

/// Reflected generator polynomial.
pub const CRC16_POLY: u16 = 0xA001;

/// Initial register value.
pub const CRC16_INIT: u16 = 0xFFFF;

/// Compute the CRC16 of `data`.
pub fn crc16(data: &[u8]) -> u16 {
    crc16_update(CRC16_INIT, data)
}

/// Continue a running CRC16 over another chunk of bytes.
///
/// `crc16_update(crc16(a), b) == crc16(a ++ b)`.
pub fn crc16_update(mut crc: u16, data: &[u8]) -> u16 {
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}
