// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Resident-image validation and hand-off to the application.

use finch_common::image::{validate_image, MAC_KEY};
use finch_common::layout::MAIN_APP_START;

use crate::flash;

struct VectorTable {
    initial_sp: u32,
    reset_vector: u32,
}

impl VectorTable {
    unsafe fn read_from(addr: u32) -> Self {
        Self {
            initial_sp: (addr as *const u32).read_volatile(),
            reset_vector: (addr as *const u32).offset(1).read_volatile(),
        }
    }
}

/// Check the application region: info block sentinel/device id plus the
/// CBC-MAC against the stored signature.
pub fn validate_resident_image() -> bool {
    validate_image(flash::app_region(), &MAC_KEY)
}

/// Validate the resident image, then either execute it or reset. Never
/// transfers control to an image that fails validation.
pub fn boot_or_reset() -> ! {
    if validate_resident_image() {
        defmt::println!("Image valid, jumping to application");
        unsafe { jump_to_application() }
    } else {
        defmt::println!("Image validation failed, resetting");
        cortex_m::peripheral::SCB::sys_reset();
    }
}

/// # Safety
/// The application image must have passed validation; its vector table is
/// about to become live.
unsafe fn jump_to_application() -> ! {
    prepare_for_handoff();
    relocate_vector_table(MAIN_APP_START);

    let vt = VectorTable::read_from(MAIN_APP_START);
    jump_to_firmware(vt.initial_sp, vt.reset_vector)
}

/// Quiesce interrupts so the application starts from a clean slate. Clocks
/// are left configured; the application runtime reinitializes them itself.
unsafe fn prepare_for_handoff() {
    cortex_m::interrupt::disable();

    // Clear all pending interrupts in NVIC
    const NVIC_ICPR: *mut u32 = 0xE000_E280 as *mut u32;
    NVIC_ICPR.write_volatile(0xFFFF_FFFF);

    // Disable all NVIC interrupts
    const NVIC_ICER: *mut u32 = 0xE000_E180 as *mut u32;
    NVIC_ICER.write_volatile(0xFFFF_FFFF);
}

unsafe fn relocate_vector_table(base: u32) {
    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(base);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

unsafe fn jump_to_firmware(initial_sp: u32, reset_vector: u32) -> ! {
    core::arch::asm!(
        "msr msp, {sp}",
        "cpsie i",  // application entry expects PRIMASK=0
        "bx {reset}",
        sp = in(reg) initial_sp,
        reset = in(reg) reset_vector,
        options(noreturn)
    );
}
