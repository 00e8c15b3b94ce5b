// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Host side of the update session.
//!
//! The device leads most of the handshake: after sync and the update
//! request, it asks for the device id, then the firmware length, then pulls
//! data one packet at a time with ready-for-data.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, ensure, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use finch_common::layout::MAX_FW_LENGTH;
use finch_common::packet::{Packet, PACKET_DATA_LENGTH};
use finch_common::protocol::{
    Message, DEFAULT_TIMEOUT_MS, DEVICE_ID, LONG_TIMEOUT_MS, SHORT_TIMEOUT_MS, SYNC_SEQUENCE,
};
use finch_common::{Comms, Serial};

use crate::transport::SerialLink;

/// Run a full update session against a device waiting in the bootloader.
pub fn update(port: &str, baud: u32, file: &Path) -> Result<()> {
    let firmware = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    ensure!(!firmware.is_empty(), "firmware image is empty");
    ensure!(
        firmware.len() <= MAX_FW_LENGTH as usize,
        "firmware image is {} bytes, the application region holds {}",
        firmware.len(),
        MAX_FW_LENGTH
    );

    println!("Firmware: {} ({} bytes)", file.display(), firmware.len());

    let mut link = SerialLink::open(port, baud)?;
    let mut comms = Comms::new();

    sync(&mut comms, &mut link)?;
    println!("Bootloader sync observed");

    comms.send(&mut link, &Message::UpdateRequest.encode());
    wait_for(&mut comms, &mut link, DEFAULT_TIMEOUT_MS, |m| {
        matches!(m, Message::UpdateResponse)
    })
    .context("update request was not accepted")?;

    wait_for(&mut comms, &mut link, DEFAULT_TIMEOUT_MS, |m| {
        matches!(m, Message::DeviceIdRequest)
    })?;
    comms.send(
        &mut link,
        &Message::DeviceIdResponse {
            device_id: DEVICE_ID,
        }
        .encode(),
    );

    wait_for(&mut comms, &mut link, DEFAULT_TIMEOUT_MS, |m| {
        matches!(m, Message::FwLengthRequest)
    })?;
    comms.send(
        &mut link,
        &Message::FwLengthResponse {
            length: firmware.len() as u32,
        }
        .encode(),
    );

    // The device erases the whole application region before the first
    // ready-for-data; nothing arrives for several seconds.
    println!("Waiting for application erase...");
    wait_for(&mut comms, &mut link, LONG_TIMEOUT_MS, |m| {
        matches!(m, Message::ReadyForData)
    })
    .context("device never became ready for data")?;

    let pb = ProgressBar::new(firmware.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let mut chunks = firmware.chunks(PACKET_DATA_LENGTH).peekable();
    while let Some(chunk) = chunks.next() {
        comms.send(&mut link, &Packet::new(chunk));
        pb.inc(chunk.len() as u64);

        if chunks.peek().is_some() {
            wait_for(&mut comms, &mut link, DEFAULT_TIMEOUT_MS, |m| {
                matches!(m, Message::ReadyForData)
            })
            .context("transfer stalled")?;
        }
    }
    pb.finish();

    wait_for(&mut comms, &mut link, DEFAULT_TIMEOUT_MS, |m| {
        matches!(m, Message::UpdateSuccess)
    })
    .context("device did not confirm the update")?;

    println!("Update complete ({} bytes)", firmware.len());
    Ok(())
}

/// Transmit the raw sync sequence until the device answers with
/// sync-observed. The sequence is unframed, so it bypasses `Comms::send`.
fn sync(comms: &mut Comms, link: &mut SerialLink) -> Result<()> {
    let deadline = Instant::now() + Duration::from_millis(DEFAULT_TIMEOUT_MS);

    loop {
        link.send(&SYNC_SEQUENCE);
        link.check()?;

        match wait_for(comms, link, SHORT_TIMEOUT_MS, |m| {
            matches!(m, Message::SyncObserved)
        }) {
            Ok(_) => return Ok(()),
            Err(e) if Instant::now() >= deadline => {
                return Err(e).context("bootloader sync timed out")
            }
            Err(_) => {} // retry the sequence
        }
    }
}

/// Pump the transport until a packet decoding to an accepted message
/// arrives. Any other session message is a protocol violation; transport
/// control frames (acks, retransmit requests) never surface here.
fn wait_for(
    comms: &mut Comms,
    link: &mut SerialLink,
    timeout_ms: u64,
    accept: fn(&Message) -> bool,
) -> Result<Message> {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        comms.update(link);
        link.check()?;

        if let Some(packet) = comms.receive() {
            let message = Message::decode(&packet);
            if accept(&message) {
                return Ok(message);
            }
            bail!("unexpected response: {:?}", message);
        }

        if Instant::now() >= deadline {
            bail!("timed out after {} ms", timeout_ms);
        }
        thread::sleep(Duration::from_millis(1));
    }
}
