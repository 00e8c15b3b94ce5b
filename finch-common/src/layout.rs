// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash geometry and application-image layout.
//!
//! The first 64 KiB of flash belong to the bootloader; everything after it is
//! the application region, erased and programmed a sector / page at a time.
//! The application image itself starts with its vector table, immediately
//! followed by the firmware info block and the 16-byte signature.

// --- Flash geometry (RP2040 XIP flash) ---

pub const FLASH_BASE: u32 = 0x1000_0000;
pub const FLASH_SIZE: u32 = 2048 * 1024;
pub const FLASH_SECTOR_SIZE: u32 = 4096;
pub const FLASH_PAGE_SIZE: u32 = 256;

pub const BOOTLOADER_SIZE: u32 = 64 * 1024;
pub const MAIN_APP_START: u32 = FLASH_BASE + BOOTLOADER_SIZE;
pub const MAX_FW_LENGTH: u32 = FLASH_SIZE - BOOTLOADER_SIZE;

/// First erase sector of the application region.
pub const MAIN_APP_SECTOR_START: u32 = BOOTLOADER_SIZE / FLASH_SECTOR_SIZE;
pub const MAIN_APP_SECTOR_COUNT: u32 = MAX_FW_LENGTH / FLASH_SECTOR_SIZE;

// --- Application image layout (offsets within the image) ---

/// Cortex-M0+ vector table: 48 entries of 4 bytes.
pub const VECTOR_TABLE_SIZE: usize = 0xC0;
pub const FWINFO_SIZE: usize = 16;
pub const SIGNATURE_SIZE: usize = 16;

pub const FWINFO_OFFSET: usize = VECTOR_TABLE_SIZE;
pub const FW_SIGNATURE_OFFSET: usize = FWINFO_OFFSET + FWINFO_SIZE;

/// First byte after the signature block; MAC computation resumes here.
pub const FW_CODE_OFFSET: usize = FW_SIGNATURE_OFFSET + SIGNATURE_SIZE;

pub const AES_BLOCK_SIZE: usize = 16;

// The info and signature blocks must sit on AES block boundaries so the MAC
// skip region is block-exact.
const _: () = assert!(FWINFO_OFFSET % AES_BLOCK_SIZE == 0);
const _: () = assert!(FWINFO_SIZE == AES_BLOCK_SIZE);
const _: () = assert!(SIGNATURE_SIZE == AES_BLOCK_SIZE);
const _: () = assert!(MAIN_APP_START % FLASH_SECTOR_SIZE == 0);
