// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Common logic for the finch bootloader.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode for the bootloader binary
//! - `std` feature: enables `std` support for host tools
//!
//! Everything here is hardware-free: the serial link, flash programmer, and
//! tick source are reached through the [`comms::Serial`], [`update_fsm::AppFlash`],
//! and [`timer::Clock`] traits, so the whole update path runs under `cargo test`
//! on the host.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod comms;
pub mod crc8;
pub mod image;
pub mod layout;
pub mod packet;
pub mod protocol;
pub mod ring_buffer;
pub mod timer;
pub mod update_fsm;

// Re-export commonly used types
pub use comms::{Comms, Serial};
pub use packet::{Packet, PACKET_DATA_LENGTH, PACKET_WIRE_LENGTH};
pub use protocol::Message;
pub use ring_buffer::RingBuffer;
pub use timer::{Clock, SimpleTimer};
pub use update_fsm::{AppFlash, Step, UpdateState, Updater};
