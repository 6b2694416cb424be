//! Memory-mapped register and clock gate backends
#![allow(unsafe_code)]

use core::ptr;

use pwm_core::Hertz;
use pwm_regmap::Register;

use crate::hw::{ClockControl, TimerRegisters};

/// TIMx register block at a fixed address.
#[derive(Debug)]
pub struct MmioTimer {
    base: usize,
}

impl MmioTimer {
    /// # Safety
    ///
    /// `base` must be the address of a TIMx register block, and no other
    /// `MmioTimer` may exist for it.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    fn addr(&self, reg: Register) -> *mut u32 {
        (self.base + reg.offset()) as *mut u32
    }
}

impl TimerRegisters for MmioTimer {
    fn read(&self, reg: Register) -> u32 {
        // SAFETY: in-bounds register of the block owned by this handle.
        unsafe { ptr::read_volatile(self.addr(reg)) }
    }

    fn write(&mut self, reg: Register, value: u32) {
        // SAFETY: in-bounds register of the block owned by this handle.
        unsafe { ptr::write_volatile(self.addr(reg), value) }
    }
}

/// RCC peripheral clock enable bit of one timer.
///
/// The enable register is shared between peripherals, so updates are
/// read-modify-write inside a critical section.
#[derive(Debug)]
pub struct RccClock {
    enr: usize,
    mask: u32,
    input: Hertz,
}

impl RccClock {
    /// # Safety
    ///
    /// `enr` must be the address of an RCC peripheral clock enable register.
    pub const unsafe fn new(enr: usize, bit: u8, input: Hertz) -> Self {
        Self {
            enr,
            mask: 1 << bit,
            input,
        }
    }

    fn update(&mut self, set: bool) {
        let enr = self.enr as *mut u32;
        let mask = self.mask;
        critical_section::with(|_| {
            // SAFETY: valid RCC register per the constructor contract,
            // serialized against the other gates by the critical section.
            unsafe {
                let value = ptr::read_volatile(enr);
                let value = if set { value | mask } else { value & !mask };
                ptr::write_volatile(enr, value);
            }
        });
    }
}

impl ClockControl for RccClock {
    fn enable(&mut self) {
        self.update(true);
    }

    fn disable(&mut self) {
        self.update(false);
    }

    fn is_enabled(&self) -> bool {
        // SAFETY: valid RCC register per the constructor contract.
        unsafe { ptr::read_volatile(self.enr as *const u32) & self.mask != 0 }
    }

    fn input_clock(&self) -> Hertz {
        self.input
    }
}
