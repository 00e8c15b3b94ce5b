// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Per-packet CRC-8 (polynomial 0x07, init 0, MSB-first).

use crc::{Crc, CRC_8_SMBUS};

// CRC-8/SMBus is exactly the packet checksum: poly 0x07, init 0x00,
// no reflection, no output XOR.
pub const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// CRC-8 over an arbitrary byte span.
pub fn crc8(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        // Standard check input for all CRC catalog entries.
        assert_eq!(crc8(b"123456789"), 0xF4);
    }

    #[test]
    fn test_empty_span() {
        assert_eq!(crc8(&[]), 0x00);
    }

    #[test]
    fn test_single_bit_errors_detected() {
        let data = [0x10, 0xC4, 0x55, 0x7E, 0x00, 0xFF];
        let reference = crc8(&data);
        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut corrupted = data;
                corrupted[byte] ^= 1 << bit;
                assert_ne!(
                    crc8(&corrupted),
                    reference,
                    "flip of byte {} bit {} went undetected",
                    byte,
                    bit
                );
            }
        }
    }
}
