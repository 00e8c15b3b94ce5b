// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Lock-free single-producer/single-consumer ring buffer.
//!
//! One instance carries raw bytes from the UART receive interrupt to the
//! main-loop decoder; a second instance carries decoded packets from the
//! decoder to the update state machine. Capacity must be a power of two; one
//! slot is always kept empty so `head == tail` unambiguously means empty.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

pub struct RingBuffer<T, const N: usize> {
    slots: UnsafeCell<[T; N]>,
    /// Read index, owned by the consumer.
    head: AtomicUsize,
    /// Write index, owned by the producer.
    tail: AtomicUsize,
}

// Safe for one producer and one consumer: each side mutates only its own
// index and the slot it exclusively owns at that moment.
unsafe impl<T: Send, const N: usize> Sync for RingBuffer<T, N> {}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    const MASK: usize = N - 1;
    const CAPACITY_IS_POWER_OF_TWO: () = assert!(N.is_power_of_two() && N > 1);

    pub const fn new(fill: T) -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::CAPACITY_IS_POWER_OF_TWO;
        Self {
            slots: UnsafeCell::new([fill; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Append an item. Returns `false` (item dropped) when the buffer is full.
    pub fn write(&self, item: T) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        // Snapshot of the consumer's index; it may lag behind but never
        // overtakes, so a stale value only makes us report full too early.
        let head = self.head.load(Ordering::Acquire);

        let next = (tail + 1) & Self::MASK;
        if next == head {
            return false;
        }

        unsafe {
            (*self.slots.get())[tail] = item;
        }
        self.tail.store(next, Ordering::Release);
        true
    }

    /// Pop the oldest item, or `None` when the buffer is empty.
    pub fn read(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        let item = unsafe { (*self.slots.get())[head] };
        self.head.store((head + 1) & Self::MASK, Ordering::Release);
        Some(item)
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }
}
