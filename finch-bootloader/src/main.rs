// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Finch bootloader for RP2040: serial firmware update with MAC-gated boot.

#![no_std]
#![no_main]

mod boot;
mod flash;
mod peripherals;
mod serial;

use defmt_rtt as _;
use panic_probe as _;

use cortex_m_rt::entry;
use embedded_hal::delay::DelayNs;

use finch_common::timer::Clock;
use finch_common::{Comms, Step, Updater};

defmt::timestamp!("{=u64:us}", { 0 });

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

#[entry]
fn main() -> ! {
    defmt::println!("Bootloader init");

    let mut p = peripherals::init();
    peripherals::blink(&mut p.led_pin, &mut p.timer, 3, 100);
    flash::init();

    let clock = peripherals::TimerClock::new(p.timer);
    let mut serial = serial::UartLink::new(p.uart);
    let mut comms = Comms::new();
    let mut updater = Updater::new(clock.now_ms());
    let mut programmer = flash::PageProgrammer::new();

    defmt::println!("Waiting for update session");
    while updater.poll(&mut comms, &mut serial, &mut programmer, &clock) == Step::Pending {}

    defmt::println!(
        "Session over: {} bytes written",
        updater.bytes_written()
    );

    // Let the final packet drain before the link goes away.
    p.timer.delay_ms(200u32);
    serial.teardown();

    boot::boot_or_reset()
}
