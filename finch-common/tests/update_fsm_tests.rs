// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! End-to-end state machine tests over mock serial, flash, and clock.

mod support;

use finch_common::comms::Comms;
use finch_common::layout::MAIN_APP_START;
use finch_common::packet::Packet;
use finch_common::protocol::{
    Message, ACK, DEVICE_ID_REQUEST, FW_LENGTH_REQUEST, FW_UPDATE_RESPONSE, NACK, READY_FOR_DATA,
    SYNC_OBSERVED, SYNC_SEQUENCE, UPDATE_SUCCESS,
};
use finch_common::update_fsm::{Step, UpdateState, Updater};

use support::{FakeClock, MockFlash, MockSerial};

struct Harness {
    comms: Comms,
    serial: MockSerial,
    flash: MockFlash,
    clock: FakeClock,
    updater: Updater,
}

impl Harness {
    fn new() -> Self {
        let clock = FakeClock::new();
        let updater = Updater::new(0);
        Self {
            comms: Comms::new(),
            serial: MockSerial::new(),
            flash: MockFlash::new(),
            clock,
            updater,
        }
    }

    fn poll(&mut self) -> Step {
        self.updater.poll(
            &mut self.comms,
            &mut self.serial,
            &mut self.flash,
            &self.clock,
        )
    }

    /// Drive the sync sequence one raw byte per poll.
    fn sync(&mut self) {
        for byte in SYNC_SEQUENCE {
            self.serial.push_bytes(&[byte]);
            self.poll();
        }
        assert_eq!(self.updater.state(), UpdateState::UpdateRequest);
    }

    /// Count transmitted single-byte frames carrying `code`.
    fn sent_count(&self, code: u8) -> usize {
        self.serial
            .sent_packets()
            .iter()
            .filter(|p| p.is_single_byte(code))
            .count()
    }
}

#[test]
fn test_sync_sequence_yields_exactly_one_sync_observed() {
    let mut h = Harness::new();
    h.sync();

    let sent = h.serial.sent_packets();
    assert_eq!(sent.len(), 1);
    let raw = sent[0].to_bytes();
    assert_eq!(raw[0], 1);
    assert_eq!(raw[1], SYNC_OBSERVED);
    assert!(raw[2..17].iter().all(|&b| b == 0xFF));
    assert_eq!(sent[0].crc, sent[0].compute_crc());
}

#[test]
fn test_sync_ignores_noise_before_sequence() {
    let mut h = Harness::new();
    for byte in [0x00, 0xC4, 0xC4, 0x55, 0x12] {
        h.serial.push_bytes(&[byte]);
        h.poll();
    }
    assert_eq!(h.updater.state(), UpdateState::Sync);

    h.sync();
    assert_eq!(h.sent_count(SYNC_OBSERVED), 1);
}

#[test]
fn test_full_update_session_reaches_done() {
    let mut h = Harness::new();
    h.sync();

    // Host requests the update.
    h.serial.push_packet(&Message::UpdateRequest.encode());
    h.poll();
    assert_eq!(h.updater.state(), UpdateState::DeviceIdRequest);
    assert_eq!(h.sent_count(FW_UPDATE_RESPONSE), 1);

    // Device asks who we are.
    h.poll();
    assert_eq!(h.updater.state(), UpdateState::DeviceIdResponse);
    assert_eq!(h.sent_count(DEVICE_ID_REQUEST), 1);

    h.serial
        .push_packet(&Message::DeviceIdResponse { device_id: 0xA3 }.encode());
    h.poll();
    assert_eq!(h.updater.state(), UpdateState::FwLengthRequest);

    // Length negotiation for a single 16-byte chunk.
    h.poll();
    assert_eq!(h.updater.state(), UpdateState::FwLengthResponse);
    assert_eq!(h.sent_count(FW_LENGTH_REQUEST), 1);

    h.serial
        .push_packet(&Message::FwLengthResponse { length: 16 }.encode());
    h.poll();
    assert_eq!(h.updater.state(), UpdateState::ApplicationErase);
    assert_eq!(h.flash.erase_calls, 0);

    h.poll();
    assert_eq!(h.updater.state(), UpdateState::ReceiveFirmware);
    assert_eq!(h.flash.erase_calls, 1);
    assert_eq!(h.sent_count(READY_FOR_DATA), 1);

    // One full data packet completes the transfer.
    let chunk: Vec<u8> = (0..16).collect();
    h.serial.push_packet(&Packet::new(&chunk));
    h.poll();
    assert_eq!(h.updater.state(), UpdateState::Done);
    assert_eq!(h.updater.bytes_written(), 16);

    assert_eq!(h.poll(), Step::Complete);
    assert_eq!(h.sent_count(UPDATE_SUCCESS), 1);

    // Exactly one erase and one write, at the region start.
    assert_eq!(h.flash.erase_calls, 1);
    assert_eq!(h.flash.writes.len(), 1);
    assert_eq!(h.flash.writes[0], (MAIN_APP_START, chunk));
    assert_eq!(h.flash.finish_calls, 1);
}

#[test]
fn test_multi_chunk_transfer_requests_more_data() {
    let mut h = Harness::new();
    h.sync();
    h.serial.push_packet(&Message::UpdateRequest.encode());
    h.poll();
    h.poll();
    h.serial
        .push_packet(&Message::DeviceIdResponse { device_id: 0xA3 }.encode());
    h.poll();
    h.poll();
    h.serial
        .push_packet(&Message::FwLengthResponse { length: 40 }.encode());
    h.poll();
    h.poll(); // erase + first ready-for-data

    for chunk in [vec![0x11u8; 16], vec![0x22; 16], vec![0x33; 8]] {
        assert_eq!(h.updater.state(), UpdateState::ReceiveFirmware);
        h.serial.push_packet(&Packet::new(&chunk));
        h.poll();
    }

    assert_eq!(h.updater.state(), UpdateState::Done);
    assert_eq!(h.updater.bytes_written(), 40);
    // One ready-for-data after the erase, one after each non-final chunk.
    assert_eq!(h.sent_count(READY_FOR_DATA), 3);
    assert_eq!(h.flash.writes.len(), 3);
    assert_eq!(h.flash.writes[1].0, MAIN_APP_START + 16);
    assert_eq!(h.flash.writes[2].0, MAIN_APP_START + 32);
}

#[test]
fn test_mismatched_device_id_aborts_without_erase() {
    let mut h = Harness::new();
    h.sync();
    h.serial.push_packet(&Message::UpdateRequest.encode());
    h.poll();
    h.poll();

    h.serial
        .push_packet(&Message::DeviceIdResponse { device_id: 0x55 }.encode());
    h.poll();

    assert_eq!(h.updater.state(), UpdateState::Done);
    assert_eq!(h.sent_count(NACK), 1);
    assert_eq!(h.flash.erase_calls, 0);
    assert!(h.flash.writes.is_empty());
}

#[test]
fn test_unexpected_packet_during_update_request_aborts() {
    let mut h = Harness::new();
    h.sync();

    h.serial.push_packet(&Message::ReadyForData.encode());
    h.poll();

    assert_eq!(h.updater.state(), UpdateState::Done);
    assert_eq!(h.sent_count(NACK), 1);
}

#[test]
fn test_oversized_length_aborts_before_erase() {
    let mut h = Harness::new();
    h.sync();
    h.serial.push_packet(&Message::UpdateRequest.encode());
    h.poll();
    h.poll();
    h.serial
        .push_packet(&Message::DeviceIdResponse { device_id: 0xA3 }.encode());
    h.poll();
    h.poll();

    h.serial.push_packet(
        &Message::FwLengthResponse {
            length: 2048 * 1024,
        }
        .encode(),
    );
    h.poll();

    assert_eq!(h.updater.state(), UpdateState::Done);
    assert_eq!(h.sent_count(NACK), 1);
    assert_eq!(h.flash.erase_calls, 0);
}

#[test]
fn test_sync_timeout_aborts() {
    let mut h = Harness::new();
    h.poll();
    assert_eq!(h.updater.state(), UpdateState::Sync);

    h.clock.advance(5001);
    h.poll();

    assert_eq!(h.updater.state(), UpdateState::Done);
    assert_eq!(h.sent_count(NACK), 1);
}

#[test]
fn test_handshake_timeout_aborts() {
    let mut h = Harness::new();
    h.sync();

    // Stay quiet past the session timeout.
    h.clock.advance(4999);
    h.poll();
    assert_eq!(h.updater.state(), UpdateState::UpdateRequest);

    h.clock.advance(2);
    h.poll();
    assert_eq!(h.updater.state(), UpdateState::Done);
    assert_eq!(h.sent_count(NACK), 1);
}

#[test]
fn test_timer_resets_on_each_received_chunk() {
    let mut h = Harness::new();
    h.sync();
    h.serial.push_packet(&Message::UpdateRequest.encode());
    h.poll();
    h.poll();
    h.serial
        .push_packet(&Message::DeviceIdResponse { device_id: 0xA3 }.encode());
    h.poll();
    h.poll();
    h.serial
        .push_packet(&Message::FwLengthResponse { length: 32 }.encode());
    h.poll();
    h.poll();

    // Each chunk lands just inside the window; the session must survive.
    h.clock.advance(4000);
    h.serial.push_packet(&Packet::new(&[0x44; 16]));
    h.poll();
    assert_eq!(h.updater.state(), UpdateState::ReceiveFirmware);

    h.clock.advance(4000);
    h.serial.push_packet(&Packet::new(&[0x55; 16]));
    h.poll();
    assert_eq!(h.updater.state(), UpdateState::Done);
    assert_eq!(h.updater.bytes_written(), 32);
}

#[test]
fn test_final_chunk_is_clamped_to_negotiated_length() {
    let mut h = Harness::new();
    h.sync();
    h.serial.push_packet(&Message::UpdateRequest.encode());
    h.poll();
    h.poll();
    h.serial
        .push_packet(&Message::DeviceIdResponse { device_id: 0xA3 }.encode());
    h.poll();
    h.poll();
    h.serial
        .push_packet(&Message::FwLengthResponse { length: 20 }.encode());
    h.poll();
    h.poll();

    h.serial.push_packet(&Packet::new(&[0x66; 16]));
    h.poll();
    // Peer overshoots with a full packet; only 4 bytes remain.
    h.serial.push_packet(&Packet::new(&[0x77; 16]));
    h.poll();

    assert_eq!(h.updater.state(), UpdateState::Done);
    assert_eq!(h.updater.bytes_written(), 20);
    assert_eq!(h.flash.writes[1].1.len(), 4);
}

#[test]
fn test_transport_corruption_is_invisible_to_the_session() {
    let mut h = Harness::new();
    h.sync();

    // A corrupted update request is repaired by the transport before the
    // state machine ever sees it.
    let request = Message::UpdateRequest.encode();
    let mut raw = request.to_bytes();
    raw[2] ^= 0x80;
    h.serial.push_bytes(&raw);
    h.poll();
    assert_eq!(h.updater.state(), UpdateState::UpdateRequest);
    assert_eq!(h.sent_count(0x19), 1); // retransmit request went out

    h.serial.push_packet(&request);
    h.poll();
    assert_eq!(h.updater.state(), UpdateState::DeviceIdRequest);
    assert_eq!(h.sent_count(NACK), 0);
}

#[test]
fn test_acks_from_peer_do_not_disturb_the_session() {
    let mut h = Harness::new();
    h.sync();

    h.serial.push_packet(&Packet::single_byte(ACK));
    h.serial.push_packet(&Message::UpdateRequest.encode());
    h.poll();

    assert_eq!(h.updater.state(), UpdateState::DeviceIdRequest);
}
