// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware-update session state machine.
//!
//! Drives the handshake (sync, update request, device identification, length
//! negotiation, erase, transfer) over the packet transport, one step per
//! main-loop iteration. All session state lives in [`Updater`]; hardware is
//! reached through the [`Serial`] and [`AppFlash`] collaborators so the whole
//! machine runs under host tests.
//!
//! Failure semantics: any malformed or unexpected packet, identifier or
//! length mismatch, or session-timer expiry aborts the session. There is no
//! per-state retry beyond the transport's own CRC/retransmit recovery.

use crate::comms::{Comms, Serial};
use crate::layout::{MAIN_APP_START, MAX_FW_LENGTH};
use crate::protocol::{self, Message, DEFAULT_TIMEOUT_MS};
use crate::timer::{Clock, SimpleTimer};

/// Application-region flash collaborator.
///
/// `write` is byte-granular; implementations backed by page-programmed flash
/// may buffer internally and must flush any tail in `finish`, which the state
/// machine calls once the final chunk has been accepted.
pub trait AppFlash {
    /// Erase every sector of the application region. Blocking; on real
    /// hardware this takes seconds and the peer receives no responses.
    fn erase_application(&mut self);
    /// Program `data` starting at the absolute address `address`.
    fn write(&mut self, address: u32, data: &[u8]);
    /// Flush any buffered tail once the transfer is complete.
    fn finish(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateState {
    Sync,
    UpdateRequest,
    DeviceIdRequest,
    DeviceIdResponse,
    FwLengthRequest,
    FwLengthResponse,
    ApplicationErase,
    ReceiveFirmware,
    Done,
}

/// Result of one [`Updater::poll`] step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Pending,
    /// The session is over (success or abort). The caller flushes the final
    /// packet, tears down peripherals, validates the resident image, and
    /// either jumps to it or resets.
    Complete,
}

pub struct Updater {
    state: UpdateState,
    fw_length: u32,
    bytes_written: u32,
    sync_window: [u8; 4],
    timer: SimpleTimer,
    success_sent: bool,
}

impl Updater {
    pub fn new(now: u64) -> Self {
        Self {
            state: UpdateState::Sync,
            fw_length: 0,
            bytes_written: 0,
            sync_window: [0; 4],
            timer: SimpleTimer::new(DEFAULT_TIMEOUT_MS, false, now),
            success_sent: false,
        }
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    pub fn fw_length(&self) -> u32 {
        self.fw_length
    }

    pub fn bytes_written(&self) -> u32 {
        self.bytes_written
    }

    /// Run one step of the session.
    pub fn poll<S: Serial, F: AppFlash, C: Clock>(
        &mut self,
        comms: &mut Comms,
        serial: &mut S,
        flash: &mut F,
        clock: &C,
    ) -> Step {
        // Sync hunts for the raw byte sequence, bypassing the framer.
        if self.state == UpdateState::Sync {
            self.handle_sync(comms, serial, clock);
            return Step::Pending;
        }

        comms.update(serial);

        match self.state {
            UpdateState::Sync => Step::Pending,
            UpdateState::UpdateRequest => {
                self.handle_update_request(comms, serial, clock);
                Step::Pending
            }
            UpdateState::DeviceIdRequest => {
                self.timer.reset(clock.now_ms());
                comms.send(serial, &Message::DeviceIdRequest.encode());
                self.state = UpdateState::DeviceIdResponse;
                Step::Pending
            }
            UpdateState::DeviceIdResponse => {
                self.handle_device_id_response(comms, serial, clock);
                Step::Pending
            }
            UpdateState::FwLengthRequest => {
                comms.send(serial, &Message::FwLengthRequest.encode());
                self.timer.reset(clock.now_ms());
                self.state = UpdateState::FwLengthResponse;
                Step::Pending
            }
            UpdateState::FwLengthResponse => {
                self.handle_fw_length_response(comms, serial, clock);
                Step::Pending
            }
            UpdateState::ApplicationErase => {
                flash.erase_application();
                comms.send(serial, &Message::ReadyForData.encode());
                // Re-read the clock: the erase blocked for a long time.
                self.timer.reset(clock.now_ms());
                self.state = UpdateState::ReceiveFirmware;
                Step::Pending
            }
            UpdateState::ReceiveFirmware => {
                self.handle_receive_firmware(comms, serial, flash, clock);
                Step::Pending
            }
            UpdateState::Done => {
                if !self.success_sent {
                    comms.send(serial, &Message::UpdateSuccess.encode());
                    self.success_sent = true;
                }
                Step::Complete
            }
        }
    }

    fn handle_sync<S: Serial, C: Clock>(
        &mut self,
        comms: &mut Comms,
        serial: &mut S,
        clock: &C,
    ) {
        let Some(byte) = serial.try_recv() else {
            self.check_timeout(comms, serial, clock);
            return;
        };

        self.sync_window.rotate_left(1);
        self.sync_window[3] = byte;

        if self.sync_window == protocol::SYNC_SEQUENCE {
            comms.send(serial, &Message::SyncObserved.encode());
            self.timer.reset(clock.now_ms());
            self.state = UpdateState::UpdateRequest;
        } else {
            self.check_timeout(comms, serial, clock);
        }
    }

    fn handle_update_request<S: Serial, C: Clock>(
        &mut self,
        comms: &mut Comms,
        serial: &mut S,
        clock: &C,
    ) {
        let Some(packet) = comms.receive() else {
            self.check_timeout(comms, serial, clock);
            return;
        };

        match Message::decode(&packet) {
            Message::UpdateRequest => {
                comms.send(serial, &Message::UpdateResponse.encode());
                self.timer.reset(clock.now_ms());
                self.state = UpdateState::DeviceIdRequest;
            }
            _ => self.abort(comms, serial),
        }
    }

    fn handle_device_id_response<S: Serial, C: Clock>(
        &mut self,
        comms: &mut Comms,
        serial: &mut S,
        clock: &C,
    ) {
        let Some(packet) = comms.receive() else {
            self.check_timeout(comms, serial, clock);
            return;
        };

        match Message::decode(&packet) {
            Message::DeviceIdResponse { device_id } if device_id == protocol::DEVICE_ID => {
                self.timer.reset(clock.now_ms());
                self.state = UpdateState::FwLengthRequest;
            }
            _ => self.abort(comms, serial),
        }
    }

    fn handle_fw_length_response<S: Serial, C: Clock>(
        &mut self,
        comms: &mut Comms,
        serial: &mut S,
        clock: &C,
    ) {
        let Some(packet) = comms.receive() else {
            self.check_timeout(comms, serial, clock);
            return;
        };

        match Message::decode(&packet) {
            Message::FwLengthResponse { length } if length <= MAX_FW_LENGTH => {
                self.fw_length = length;
                self.timer.reset(clock.now_ms());
                self.state = UpdateState::ApplicationErase;
            }
            _ => self.abort(comms, serial),
        }
    }

    fn handle_receive_firmware<S: Serial, F: AppFlash, C: Clock>(
        &mut self,
        comms: &mut Comms,
        serial: &mut S,
        flash: &mut F,
        clock: &C,
    ) {
        let Some(packet) = comms.receive() else {
            self.check_timeout(comms, serial, clock);
            return;
        };

        // Clamp to the negotiated length so writes can never leave the
        // application region (the length was bounded in FwLengthResponse).
        let remaining = (self.fw_length - self.bytes_written) as usize;
        let payload = packet.payload();
        let chunk = &payload[..payload.len().min(remaining)];

        if !chunk.is_empty() {
            flash.write(MAIN_APP_START + self.bytes_written, chunk);
            self.bytes_written += chunk.len() as u32;
        }
        self.timer.reset(clock.now_ms());

        if self.bytes_written >= self.fw_length {
            flash.finish();
            self.state = UpdateState::Done;
        } else {
            comms.send(serial, &Message::ReadyForData.encode());
        }
    }

    /// Abort the session: notify the peer, then land in `Done`, which will
    /// re-validate whatever image is resident and boot it or reset. An
    /// interrupted transfer never validates: its info and signature blocks
    /// were erased and not yet rewritten.
    fn abort<S: Serial>(&mut self, comms: &mut Comms, serial: &mut S) {
        comms.send(serial, &Message::Nack.encode());
        self.state = UpdateState::Done;
    }

    fn check_timeout<S: Serial, C: Clock>(
        &mut self,
        comms: &mut Comms,
        serial: &mut S,
        clock: &C,
    ) {
        if self.timer.has_expired(clock.now_ms()) {
            self.abort(comms, serial);
        }
    }
}
