// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial-port adapter for the shared packet transport.
//!
//! The host drives the same [`Comms`](finch_common::Comms) engine as the
//! device, so CRC checking and retransmission work identically on both ends.
//! This module only adapts an OS serial port to the byte-oriented [`Serial`]
//! trait.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use serialport::SerialPort;

use finch_common::comms::Serial;

/// Poll granularity for non-blocking reads.
const POLL_TIMEOUT_MS: u64 = 10;

pub struct SerialLink {
    port: Box<dyn SerialPort>,
    rx: VecDeque<u8>,
    io_error: Option<std::io::Error>,
}

impl SerialLink {
    pub fn open(port_name: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud)
            .timeout(Duration::from_millis(POLL_TIMEOUT_MS))
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;

        Ok(Self {
            port,
            rx: VecDeque::with_capacity(4096),
            io_error: None,
        })
    }

    /// Pull whatever the OS has buffered into our queue.
    fn fill(&mut self) {
        let mut buf = [0u8; 256];
        loop {
            match self.port.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => self.rx.extend(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    self.io_error.get_or_insert(e);
                    break;
                }
            }
        }
    }

    /// Surface any I/O error recorded by the infallible `Serial` methods.
    pub fn check(&mut self) -> Result<()> {
        match self.io_error.take() {
            Some(e) => Err(e).context("serial I/O error"),
            None => Ok(()),
        }
    }
}

impl Serial for SerialLink {
    fn try_recv(&mut self) -> Option<u8> {
        if self.rx.is_empty() {
            self.fill();
        }
        self.rx.pop_front()
    }

    fn send(&mut self, bytes: &[u8]) {
        let result = self
            .port
            .write_all(bytes)
            .and_then(|()| self.port.flush());
        if let Err(e) = result {
            self.io_error.get_or_insert(e);
        }
    }
}
