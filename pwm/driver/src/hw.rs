//! Hardware seams owned by a driver

use pwm_core::{Hertz, PwmChannel, CHANNELS};
use pwm_regmap::{CounterWidth, Register};

/// Access to one timer's register block.
///
/// The driver holding an implementation is the only writer of the block.
/// Writes to the status register follow the hardware's write-0-to-clear
/// rule, so it is never read-modify-written through [`modify`](Self::modify).
pub trait TimerRegisters {
    /// Read a register
    fn read(&self, reg: Register) -> u32;

    /// Write a register
    fn write(&mut self, reg: Register, value: u32);

    /// Read-modify-write a register
    fn modify<F>(&mut self, reg: Register, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(reg);
        self.write(reg, f(value));
    }
}

/// Peripheral clock gate of one timer unit.
pub trait ClockControl {
    /// Ungate the peripheral clock
    fn enable(&mut self);

    /// Gate the peripheral clock
    fn disable(&mut self);

    fn is_enabled(&self) -> bool;

    /// Timer input clock, before the prescaler
    fn input_clock(&self) -> Hertz;
}

/// What a timer unit can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerCaps {
    /// Number of compare outputs, at most `CHANNELS`
    pub channels: u8,
    /// Counter and compare register width
    pub counter: CounterWidth,
    /// Advanced-control unit with break input and main output enable
    pub advanced: bool,
}

impl TimerCaps {
    /// Four-channel 16-bit general-purpose timer
    pub const GENERAL_PURPOSE: TimerCaps = TimerCaps {
        channels: CHANNELS as u8,
        counter: CounterWidth::Bits16,
        advanced: false,
    };

    /// Four-channel 16-bit advanced-control timer
    pub const ADVANCED: TimerCaps = TimerCaps {
        channels: CHANNELS as u8,
        counter: CounterWidth::Bits16,
        advanced: true,
    };

    /// Whether `channel` exists on this unit
    pub const fn has_channel(&self, channel: PwmChannel) -> bool {
        (channel as usize) < CHANNELS && channel < self.channels
    }
}
