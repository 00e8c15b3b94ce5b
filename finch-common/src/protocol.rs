// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Protocol constants and the decoded message representation.
//!
//! Control traffic rides in single-byte frames whose first data byte is one
//! of the reserved codes below. [`Message`] gives decoded frames a typed
//! representation so the state machine matches on variants instead of
//! inspecting raw bytes.

use heapless::Vec;

use crate::packet::{Packet, PACKET_DATA_LENGTH};

// --- Transport-level control codes ---

pub const ACK: u8 = 0x15;
pub const RETX: u8 = 0x19;

// --- Bootloader session control codes ---

pub const SYNC_OBSERVED: u8 = 0x20;
pub const FW_UPDATE_REQUEST: u8 = 0x31;
pub const FW_UPDATE_RESPONSE: u8 = 0x37;
pub const DEVICE_ID_REQUEST: u8 = 0x3C;
pub const DEVICE_ID_RESPONSE: u8 = 0x3F;
pub const FW_LENGTH_REQUEST: u8 = 0x42;
pub const FW_LENGTH_RESPONSE: u8 = 0x45;
pub const READY_FOR_DATA: u8 = 0x48;
pub const UPDATE_SUCCESS: u8 = 0x54;
pub const NACK: u8 = 0x99;

/// Raw (unframed) byte sequence that opens an update session.
pub const SYNC_SEQUENCE: [u8; 4] = [0xC4, 0x55, 0x7E, 0x10];

/// Identifier a peer must present before an update proceeds.
pub const DEVICE_ID: u8 = 0xA3;

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const SHORT_TIMEOUT_MS: u64 = 1000;
pub const LONG_TIMEOUT_MS: u64 = 15000;

/// A decoded frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Ack,
    Retx,
    SyncObserved,
    UpdateRequest,
    UpdateResponse,
    DeviceIdRequest,
    DeviceIdResponse { device_id: u8 },
    FwLengthRequest,
    FwLengthResponse { length: u32 },
    ReadyForData,
    UpdateSuccess,
    Nack,
    /// Anything that does not match a control shape is firmware data.
    Data { payload: Vec<u8, PACKET_DATA_LENGTH> },
}

impl Message {
    /// Decode a validated frame. Control shapes are strict: a single-byte
    /// frame must have 0xFF padding throughout, the device-id response is
    /// exactly `{tag, id}` and the length response exactly `{tag, u32-le}`,
    /// each 0xFF padded. Everything else falls through to `Data`.
    pub fn decode(packet: &Packet) -> Message {
        if packet.length == 1 {
            let code = packet.data[0];
            if packet.is_single_byte(code) {
                match code {
                    ACK => return Message::Ack,
                    RETX => return Message::Retx,
                    SYNC_OBSERVED => return Message::SyncObserved,
                    FW_UPDATE_REQUEST => return Message::UpdateRequest,
                    FW_UPDATE_RESPONSE => return Message::UpdateResponse,
                    DEVICE_ID_REQUEST => return Message::DeviceIdRequest,
                    FW_LENGTH_REQUEST => return Message::FwLengthRequest,
                    READY_FOR_DATA => return Message::ReadyForData,
                    UPDATE_SUCCESS => return Message::UpdateSuccess,
                    NACK => return Message::Nack,
                    _ => {}
                }
            }
        }

        if packet.length == 2
            && packet.data[0] == DEVICE_ID_RESPONSE
            && packet.data[2..].iter().all(|&b| b == 0xFF)
        {
            return Message::DeviceIdResponse {
                device_id: packet.data[1],
            };
        }

        if packet.length == 5
            && packet.data[0] == FW_LENGTH_RESPONSE
            && packet.data[5..].iter().all(|&b| b == 0xFF)
        {
            let length = u32::from_le_bytes([
                packet.data[1],
                packet.data[2],
                packet.data[3],
                packet.data[4],
            ]);
            return Message::FwLengthResponse { length };
        }

        let mut payload = Vec::new();
        // payload() never exceeds PACKET_DATA_LENGTH, so this cannot fail.
        let _ = payload.extend_from_slice(packet.payload());
        Message::Data { payload }
    }

    pub fn encode(&self) -> Packet {
        match self {
            Message::Ack => Packet::single_byte(ACK),
            Message::Retx => Packet::single_byte(RETX),
            Message::SyncObserved => Packet::single_byte(SYNC_OBSERVED),
            Message::UpdateRequest => Packet::single_byte(FW_UPDATE_REQUEST),
            Message::UpdateResponse => Packet::single_byte(FW_UPDATE_RESPONSE),
            Message::DeviceIdRequest => Packet::single_byte(DEVICE_ID_REQUEST),
            Message::DeviceIdResponse { device_id } => {
                Packet::new(&[DEVICE_ID_RESPONSE, *device_id])
            }
            Message::FwLengthRequest => Packet::single_byte(FW_LENGTH_REQUEST),
            Message::FwLengthResponse { length } => {
                let le = length.to_le_bytes();
                Packet::new(&[FW_LENGTH_RESPONSE, le[0], le[1], le[2], le[3]])
            }
            Message::ReadyForData => Packet::single_byte(READY_FOR_DATA),
            Message::UpdateSuccess => Packet::single_byte(UPDATE_SUCCESS),
            Message::Nack => Packet::single_byte(NACK),
            Message::Data { payload } => Packet::new(payload),
        }
    }
}
