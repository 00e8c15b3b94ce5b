// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Mock collaborators for driving the transport and state machine on the host.

// Each test binary compiles this module separately and uses a subset of it.
#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;

use finch_common::comms::Serial;
use finch_common::packet::{Packet, PACKET_WIRE_LENGTH};
use finch_common::timer::Clock;
use finch_common::update_fsm::AppFlash;

/// In-memory serial link: `rx` is what the device will read, `tx` collects
/// everything the device wrote.
#[derive(Default)]
pub struct MockSerial {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    pub fn push_packet(&mut self, packet: &Packet) {
        self.push_bytes(&packet.to_bytes());
    }

    /// Split everything transmitted so far into 18-byte frames.
    pub fn sent_packets(&self) -> Vec<Packet> {
        assert_eq!(
            self.tx.len() % PACKET_WIRE_LENGTH,
            0,
            "transmit stream is not a whole number of frames"
        );
        self.tx
            .chunks(PACKET_WIRE_LENGTH)
            .map(|raw| {
                let mut frame = [0u8; PACKET_WIRE_LENGTH];
                frame.copy_from_slice(raw);
                Packet::from_bytes(&frame)
            })
            .collect()
    }
}

impl Serial for MockSerial {
    fn try_recv(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn send(&mut self, bytes: &[u8]) {
        self.tx.extend_from_slice(bytes);
    }
}

/// Records every flash operation instead of touching hardware.
#[derive(Default)]
pub struct MockFlash {
    pub erase_calls: usize,
    pub writes: Vec<(u32, Vec<u8>)>,
    pub finish_calls: usize,
}

impl MockFlash {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AppFlash for MockFlash {
    fn erase_application(&mut self) {
        self.erase_calls += 1;
    }

    fn write(&mut self, address: u32, data: &[u8]) {
        self.writes.push((address, data.to_vec()));
    }

    fn finish(&mut self) {
        self.finish_calls += 1;
    }
}

/// Manually advanced millisecond clock.
pub struct FakeClock {
    now: Cell<u64>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { now: Cell::new(0) }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}
