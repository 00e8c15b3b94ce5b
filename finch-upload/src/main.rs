// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware update and signing tool for finch-bootloader.
//!
//! Usage:
//!   finch-upload sign firmware.bin --version 2
//!   finch-upload update firmware.bin.signed --port /dev/ttyUSB0

mod cli;
mod commands;
mod sign;
mod transport;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
