// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Image signing: stamp version and length, compute and store the MAC.
//!
//! Shares the layout and MAC implementation with the bootloader's validator,
//! so a signed image is accepted by construction.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};

use finch_common::image::{
    sign_image, validate_image, FirmwareInfo, FWINFO_SENTINEL, MAC_KEY,
};
use finch_common::layout::{FWINFO_OFFSET, FW_CODE_OFFSET, MAX_FW_LENGTH};
use finch_common::protocol::DEVICE_ID;

pub fn sign(file: &Path, version: u32, output: Option<&Path>) -> Result<()> {
    let mut image =
        fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    ensure!(
        image.len() >= FW_CODE_OFFSET,
        "image is too short to hold the info and signature blocks ({} bytes)",
        image.len()
    );
    ensure!(
        image.len() <= MAX_FW_LENGTH as usize,
        "image is {} bytes, the application region holds {}",
        image.len(),
        MAX_FW_LENGTH
    );

    let info =
        FirmwareInfo::read_from(&image).context("image too short for the info block")?;
    ensure!(
        info.sentinel == FWINFO_SENTINEL,
        "no firmware info block at offset {:#x} (sentinel {:#010x})",
        FWINFO_OFFSET,
        info.sentinel
    );
    ensure!(
        info.device_id == u32::from(DEVICE_ID),
        "image was built for device id {:#04x}, expected {:#04x}",
        info.device_id,
        DEVICE_ID
    );

    let signature =
        sign_image(&mut image, version, &MAC_KEY).context("image rejected by signer")?;

    // A freshly signed image must validate with the same key.
    ensure!(
        validate_image(&image, &MAC_KEY),
        "signed image failed self-validation"
    );

    let output = output.map(PathBuf::from).unwrap_or_else(|| {
        let mut path = file.as_os_str().to_owned();
        path.push(".signed");
        PathBuf::from(path)
    });
    fs::write(&output, &image)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Signed firmware version {:#x}", version);
    println!(
        "  signature = {}",
        signature
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>()
    );
    println!("  image size = {} bytes", image.len());
    println!("  output     = {}", output.display());
    Ok(())
}
