// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Resident-image validation and signing.
//!
//! An image is accepted only if its firmware info block carries the expected
//! sentinel and device id, and an AES-128 CBC-MAC over the image matches the
//! stored signature block. The MAC processes the info block first, then the
//! rest of the image in order with the info/signature region skipped (the
//! signature cannot cover itself), PKCS#7-padding the tail.
//!
//! The key is compiled in and symmetric: this authenticates against
//! corruption and casual tampering, not against an attacker who can read the
//! device flash.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::layout::{
    AES_BLOCK_SIZE, FWINFO_OFFSET, FWINFO_SIZE, FW_CODE_OFFSET, FW_SIGNATURE_OFFSET,
};
use crate::protocol::DEVICE_ID;

/// Marks a well-formed firmware info block.
pub const FWINFO_SENTINEL: u32 = 0xDEAD_C0DE;

/// Shared MAC key, baked into bootloader and signer.
pub const MAC_KEY: [u8; AES_BLOCK_SIZE] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E,
    0x0F,
];

/// Fixed-offset metadata placed immediately after the vector table.
/// All fields little-endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FirmwareInfo {
    pub sentinel: u32,
    pub device_id: u32,
    pub version: u32,
    pub length: u32,
}

impl FirmwareInfo {
    pub const SIZE: usize = FWINFO_SIZE;

    pub fn from_bytes(bytes: &[u8; FWINFO_SIZE]) -> Self {
        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self {
            sentinel: word(0),
            device_id: word(4),
            version: word(8),
            length: word(12),
        }
    }

    pub fn to_bytes(&self) -> [u8; FWINFO_SIZE] {
        let mut bytes = [0u8; FWINFO_SIZE];
        bytes[0..4].copy_from_slice(&self.sentinel.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.device_id.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.version.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.length.to_le_bytes());
        bytes
    }

    /// Bounds-checked read from an image slice at the fixed offset.
    pub fn read_from(image: &[u8]) -> Option<Self> {
        let slot = image.get(FWINFO_OFFSET..FW_SIGNATURE_OFFSET)?;
        let mut bytes = [0u8; FWINFO_SIZE];
        bytes.copy_from_slice(slot);
        Some(Self::from_bytes(&bytes))
    }

    /// Bounds-checked write into an image slice at the fixed offset.
    /// Returns `false` if the image is too short to hold the block.
    pub fn write_to(&self, image: &mut [u8]) -> bool {
        let Some(slot) = image.get_mut(FWINFO_OFFSET..FW_SIGNATURE_OFFSET) else {
            return false;
        };
        slot.copy_from_slice(&self.to_bytes());
        true
    }
}

/// Streaming CBC-MAC over AES-128 with an all-zero initial chaining value.
pub struct CbcMac {
    cipher: Aes128,
    state: [u8; AES_BLOCK_SIZE],
    buf: [u8; AES_BLOCK_SIZE],
    buf_len: usize,
}

impl CbcMac {
    pub fn new(key: &[u8; AES_BLOCK_SIZE]) -> Self {
        Self {
            cipher: Aes128::new(GenericArray::from_slice(key)),
            state: [0; AES_BLOCK_SIZE],
            buf: [0; AES_BLOCK_SIZE],
            buf_len: 0,
        }
    }

    /// Absorb bytes; block boundaries may fall anywhere across calls.
    pub fn update(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let take = (AES_BLOCK_SIZE - self.buf_len).min(data.len());
            self.buf[self.buf_len..self.buf_len + take].copy_from_slice(&data[..take]);
            self.buf_len += take;
            data = &data[take..];

            if self.buf_len == AES_BLOCK_SIZE {
                let block = self.buf;
                self.process_block(&block);
                self.buf_len = 0;
            }
        }
    }

    fn process_block(&mut self, block: &[u8; AES_BLOCK_SIZE]) {
        for (state, byte) in self.state.iter_mut().zip(block) {
            *state ^= byte;
        }
        let mut chained = GenericArray::clone_from_slice(&self.state);
        self.cipher.encrypt_block(&mut chained);
        self.state.copy_from_slice(&chained);
    }

    /// Pad the tail and return the final chaining block. A partial tail is
    /// padded with `pad_len` bytes of value `pad_len`; an exact block
    /// multiple gets one whole extra block of 0x10.
    pub fn finalize(mut self) -> [u8; AES_BLOCK_SIZE] {
        let pad = (AES_BLOCK_SIZE - self.buf_len) as u8;
        let mut block = self.buf;
        for slot in block[self.buf_len..].iter_mut() {
            *slot = pad;
        }
        self.process_block(&block);
        self.state
    }
}

/// MAC over the first `length` bytes of `image`: info block first, then the
/// image in order with `[FWINFO_OFFSET, FW_CODE_OFFSET)` skipped.
pub fn compute_image_mac(
    image: &[u8],
    length: usize,
    key: &[u8; AES_BLOCK_SIZE],
) -> Option<[u8; AES_BLOCK_SIZE]> {
    if length > image.len() || length < FW_CODE_OFFSET {
        return None;
    }

    let mut mac = CbcMac::new(key);
    mac.update(&image[FWINFO_OFFSET..FW_SIGNATURE_OFFSET]);
    mac.update(&image[..FWINFO_OFFSET]);
    mac.update(&image[FW_CODE_OFFSET..length]);
    Some(mac.finalize())
}

/// Full resident-image check: sentinel, device id, length bounds, MAC.
pub fn validate_image(image: &[u8], key: &[u8; AES_BLOCK_SIZE]) -> bool {
    let Some(info) = FirmwareInfo::read_from(image) else {
        return false;
    };
    if info.sentinel != FWINFO_SENTINEL {
        return false;
    }
    if info.device_id != u32::from(DEVICE_ID) {
        return false;
    }

    let length = info.length as usize;
    if length < FW_CODE_OFFSET || length > image.len() {
        return false;
    }

    let Some(mac) = compute_image_mac(image, length, key) else {
        return false;
    };
    mac[..] == image[FW_SIGNATURE_OFFSET..FW_CODE_OFFSET]
}

/// Stamp `version` and the image length into the info block, compute the
/// MAC, and store it in the signature slot. Returns the signature, or `None`
/// if the image cannot hold the info and signature blocks.
pub fn sign_image(
    image: &mut [u8],
    version: u32,
    key: &[u8; AES_BLOCK_SIZE],
) -> Option<[u8; AES_BLOCK_SIZE]> {
    let mut info = FirmwareInfo::read_from(image)?;
    info.version = version;
    info.length = image.len() as u32;
    if !info.write_to(image) {
        return None;
    }

    let mac = compute_image_mac(image, image.len(), key)?;
    image[FW_SIGNATURE_OFFSET..FW_CODE_OFFSET].copy_from_slice(&mac);
    Some(mac)
}
