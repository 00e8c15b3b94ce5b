// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash erase/program via RP2040 ROM routines.
//!
//! Flash operations require leaving XIP first. The full sequence is:
//!   1. connect_internal_flash()
//!   2. flash_exit_xip()
//!   3. flash_range_erase() or flash_range_program()
//!   4. flash_flush_cache()
//!   5. flash_enter_cmd_xip()
//!
//! All code executing during steps 1-5 must run from RAM, not flash, so the
//! critical functions carry `#[link_section = ".data"]` and call ROM function
//! pointers resolved once at init time.

use finch_common::layout::{
    FLASH_BASE, FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, MAIN_APP_START, MAX_FW_LENGTH,
};
use finch_common::update_fsm::AppFlash;

// ROM function pointer types
type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

/// ROM function pointers, resolved once at init from the ROM table.
/// Stored in static RAM so RAM-resident functions can call them without
/// touching flash-based code.
static mut ROM_CONNECT_INTERNAL_FLASH: RomFnVoid = dummy_void;
static mut ROM_FLASH_EXIT_XIP: RomFnVoid = dummy_void;
static mut ROM_FLASH_RANGE_ERASE: RomFnErase = dummy_erase;
static mut ROM_FLASH_RANGE_PROGRAM: RomFnProgram = dummy_program;
static mut ROM_FLASH_FLUSH_CACHE: RomFnVoid = dummy_void;
static mut ROM_FLASH_ENTER_CMD_XIP: RomFnVoid = dummy_void;

unsafe extern "C" fn dummy_void() {}
unsafe extern "C" fn dummy_erase(_: u32, _: usize, _: u32, _: u8) {}
unsafe extern "C" fn dummy_program(_: u32, _: *const u8, _: usize) {}

/// Look up a ROM function by its two-character tag.
/// ROM table pointer at 0x14 and lookup function at 0x18 are 16-bit halfword pointers.
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *(0x14 as *const u16) as *const u16;
    let lookup: unsafe extern "C" fn(*const u16, u32) -> usize =
        core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
            *(0x18 as *const u16) as usize,
        );
    let code = u16::from_le_bytes(*tag) as u32;
    lookup(fn_table, code)
}

/// Initialize ROM flash function pointers. Must be called once before any
/// flash operations; the lookups themselves require XIP to be active.
pub fn init() {
    unsafe {
        ROM_CONNECT_INTERNAL_FLASH =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"IF"));
        ROM_FLASH_EXIT_XIP = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"EX"));
        ROM_FLASH_RANGE_ERASE =
            core::mem::transmute::<usize, RomFnErase>(rom_func_lookup(b"RE"));
        ROM_FLASH_RANGE_PROGRAM =
            core::mem::transmute::<usize, RomFnProgram>(rom_func_lookup(b"RP"));
        ROM_FLASH_FLUSH_CACHE = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"FC"));
        ROM_FLASH_ENTER_CMD_XIP =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"CX"));
    }
}

/// Convert an absolute XIP flash address to a flash-relative offset.
pub fn addr_to_offset(abs_addr: u32) -> u32 {
    abs_addr - FLASH_BASE
}

/// Erase flash at the given flash-relative offset (sector granular).
/// Runs entirely from RAM with proper XIP teardown/setup.
///
/// # Safety
/// `init()` must have been called first; `offset`/`size` must be
/// sector-aligned and inside flash.
#[link_section = ".data"]
#[inline(never)]
pub unsafe fn flash_erase(offset: u32, size: u32) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_ERASE(offset, size as usize, FLASH_SECTOR_SIZE, 0x20);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

/// Program flash at the given flash-relative offset (page granular).
/// Runs entirely from RAM with proper XIP teardown/setup.
///
/// # Safety
/// `init()` must have been called first; the target range must be erased,
/// page-aligned, and inside flash.
#[link_section = ".data"]
#[inline(never)]
pub unsafe fn flash_program(offset: u32, data: *const u8, len: usize) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_PROGRAM(offset, data, len);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

const PAGE: usize = FLASH_PAGE_SIZE as usize;

/// Sequential application-region programmer.
///
/// The transport delivers 16-byte chunks but the ROM programs 256-byte
/// pages, so bytes accumulate in a page buffer that is flushed when it fills
/// or when the state machine signals the end of the transfer. Unused bytes
/// in a flushed page stay 0xFF (the erased state), so they program nothing.
pub struct PageProgrammer {
    page: [u8; PAGE],
    base: u32,
    len: usize,
}

impl PageProgrammer {
    pub fn new() -> Self {
        Self {
            page: [0xFF; PAGE],
            base: 0,
            len: 0,
        }
    }

    fn flush(&mut self) {
        if self.len == 0 {
            return;
        }
        unsafe {
            flash_program(addr_to_offset(self.base), self.page.as_ptr(), PAGE);
        }
        self.page = [0xFF; PAGE];
        self.len = 0;
    }
}

impl AppFlash for PageProgrammer {
    fn erase_application(&mut self) {
        defmt::println!("Erasing application region");
        unsafe {
            flash_erase(addr_to_offset(MAIN_APP_START), MAX_FW_LENGTH);
        }
    }

    fn write(&mut self, address: u32, data: &[u8]) {
        let mut addr = address;
        for &byte in data {
            let page_base = addr & !(FLASH_PAGE_SIZE - 1);
            if self.len == 0 {
                self.base = page_base;
            } else if page_base != self.base {
                self.flush();
                self.base = page_base;
            }
            let offset = (addr - self.base) as usize;
            self.page[offset] = byte;
            self.len = offset + 1;
            addr += 1;
            if self.len == PAGE {
                self.flush();
            }
        }
    }

    fn finish(&mut self) {
        self.flush();
    }
}

/// The whole application region as a byte slice, for validation.
pub fn app_region() -> &'static [u8] {
    unsafe { core::slice::from_raw_parts(MAIN_APP_START as *const u8, MAX_FW_LENGTH as usize) }
}
