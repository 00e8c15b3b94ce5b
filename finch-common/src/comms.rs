// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Reliable packet transport over an unreliable byte stream.
//!
//! Stop-and-wait delivery: corruption is detected per frame by CRC-8 and
//! repaired with a retransmit request answered from the peer's
//! last-transmitted cache. No sequence numbers; the bounded retransmission
//! scheme trades generality for minimal code.

use crate::packet::{Packet, PACKET_DATA_LENGTH};
use crate::protocol::{ACK, RETX};
use crate::ring_buffer::RingBuffer;

/// Byte-oriented serial collaborator. The device implementation reads from
/// an interrupt-fed ring buffer and writes blocking; host implementations
/// wrap an OS serial port.
pub trait Serial {
    /// Pop the next received byte if one is pending.
    fn try_recv(&mut self) -> Option<u8>;
    /// Transmit bytes. May block until the bytes have left the device.
    fn send(&mut self, bytes: &[u8]);
}

/// Decoded-packet queue depth. Power of two; one slot stays empty.
pub const PACKET_QUEUE_DEPTH: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DecodeState {
    AwaitingLength,
    AwaitingData,
    AwaitingCrc,
}

pub struct Comms {
    state: DecodeState,
    scratch: Packet,
    data_idx: usize,
    queue: RingBuffer<Packet, PACKET_QUEUE_DEPTH>,
    last_sent: Packet,
    retx: Packet,
    ack: Packet,
}

impl Default for Comms {
    fn default() -> Self {
        Self::new()
    }
}

impl Comms {
    pub fn new() -> Self {
        let ack = Packet::single_byte(ACK);
        Self {
            state: DecodeState::AwaitingLength,
            scratch: Packet::EMPTY,
            data_idx: 0,
            queue: RingBuffer::new(Packet::EMPTY),
            last_sent: ack,
            retx: Packet::single_byte(RETX),
            ack,
        }
    }

    /// Drain every currently buffered byte through the frame decoder.
    /// Non-blocking; arrival order is preserved through to the packet queue.
    pub fn update<S: Serial>(&mut self, serial: &mut S) {
        while let Some(byte) = serial.try_recv() {
            match self.state {
                DecodeState::AwaitingLength => {
                    self.scratch.length = byte;
                    self.data_idx = 0;
                    self.state = DecodeState::AwaitingData;
                }
                DecodeState::AwaitingData => {
                    self.scratch.data[self.data_idx] = byte;
                    self.data_idx += 1;
                    if self.data_idx == PACKET_DATA_LENGTH {
                        self.state = DecodeState::AwaitingCrc;
                    }
                }
                DecodeState::AwaitingCrc => {
                    self.scratch.crc = byte;
                    self.state = DecodeState::AwaitingLength;
                    self.dispatch_frame(serial);
                }
            }
        }
    }

    /// Handle one completed frame: CRC check, transport control frames,
    /// then hand-off to the consumer queue with an acknowledge.
    fn dispatch_frame<S: Serial>(&mut self, serial: &mut S) {
        let frame = self.scratch;

        if frame.compute_crc() != frame.crc {
            let retx = self.retx;
            self.send(serial, &retx);
            return;
        }

        if frame == self.retx {
            let last = self.last_sent;
            self.send(serial, &last);
            return;
        }

        if frame == self.ack {
            return;
        }

        if !self.queue.write(frame) {
            // The consumer is not draining; treat as fatal.
            panic!("packet queue overflow");
        }
        let ack = self.ack;
        self.send(serial, &ack);
    }

    /// Serialize a frame to the wire and refresh the retransmit cache.
    pub fn send<S: Serial>(&mut self, serial: &mut S, packet: &Packet) {
        serial.send(&packet.to_bytes());
        self.last_sent = *packet;
    }

    pub fn data_available(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Pop the oldest validated packet (FIFO).
    pub fn receive(&mut self) -> Option<Packet> {
        self.queue.read()
    }
}
