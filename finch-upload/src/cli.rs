// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::sign;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "finch-upload")]
#[command(about = "Firmware update and signing tool for finch-bootloader")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Push a signed firmware image to a device waiting in the bootloader
    Update {
        /// Signed firmware binary
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Serial port (e.g., /dev/ttyUSB0)
        #[arg(short, long)]
        port: String,

        /// Baud rate
        #[arg(short, long, default_value = "115200")]
        baud: u32,
    },

    /// Stamp version and length into an image and write its signature
    Sign {
        /// Firmware binary (application image, vector table first)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Version number stamped into the info block
        #[arg(short, long, default_value = "1")]
        version: u32,

        /// Output path (defaults to FILE with a .signed suffix)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Update { file, port, baud } => commands::update(&port, baud, &file),
        Commands::Sign {
            file,
            version,
            output,
        } => sign::sign(&file, version, output.as_deref()),
    }
}
