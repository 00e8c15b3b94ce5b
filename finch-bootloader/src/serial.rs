// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! UART serial link with an interrupt-fed receive buffer.
//!
//! The receive interrupt does the minimum possible: pull bytes out of the
//! UART FIFO and push them into the ring buffer. All decoding happens on the
//! main loop through the [`Serial`] trait.

use core::cell::RefCell;

use cortex_m::interrupt::Mutex;
use rp2040_hal as hal;
use rp2040_hal::pac::interrupt;

use finch_common::comms::Serial;
use finch_common::ring_buffer::RingBuffer;

use crate::peripherals::{BootUart, UartPins};

type UartReader = hal::uart::Reader<hal::pac::UART0, UartPins>;
type UartWriter = hal::uart::Writer<hal::pac::UART0, UartPins>;

/// Bytes captured by the receive interrupt, drained by the main loop.
static RX_BUFFER: RingBuffer<u8, 256> = RingBuffer::new(0);
static RX_READER: Mutex<RefCell<Option<UartReader>>> = Mutex::new(RefCell::new(None));

pub struct UartLink {
    writer: UartWriter,
}

impl UartLink {
    pub fn new(uart: BootUart) -> Self {
        let (mut reader, writer) = uart.split();
        reader.enable_rx_interrupt();
        cortex_m::interrupt::free(|cs| {
            RX_READER.borrow(cs).replace(Some(reader));
        });
        unsafe {
            hal::pac::NVIC::unmask(hal::pac::Interrupt::UART0_IRQ);
        }
        Self { writer }
    }

    /// Stop reception before handing the system to the application.
    pub fn teardown(&mut self) {
        hal::pac::NVIC::mask(hal::pac::Interrupt::UART0_IRQ);
        cortex_m::interrupt::free(|cs| {
            if let Some(reader) = RX_READER.borrow(cs).borrow_mut().as_mut() {
                reader.disable_rx_interrupt();
            }
        });
    }
}

impl Serial for UartLink {
    fn try_recv(&mut self) -> Option<u8> {
        RX_BUFFER.read()
    }

    fn send(&mut self, bytes: &[u8]) {
        self.writer.write_full_blocking(bytes);
    }
}

#[interrupt]
fn UART0_IRQ() {
    cortex_m::interrupt::free(|cs| {
        if let Some(reader) = RX_READER.borrow(cs).borrow_mut().as_mut() {
            let mut chunk = [0u8; 16];
            loop {
                let count = match reader.read_raw(&mut chunk) {
                    Ok(count) if count > 0 => count,
                    _ => break,
                };
                for &byte in &chunk[..count] {
                    // A full buffer drops the byte; the frame CRC catches the
                    // damage and the transport requests a retransmit.
                    let _ = RX_BUFFER.write(byte);
                }
                if count < chunk.len() {
                    break;
                }
            }
        }
    });
}
