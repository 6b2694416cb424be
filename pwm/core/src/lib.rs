#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! # PWM Core
//!
//! Value types shared by the PWM driver crates: the per-channel model, the
//! driver configuration, the driver state machine states and the error
//! taxonomy. Nothing in here touches hardware.

use core::fmt;

pub mod channel;
pub mod config;
pub mod priority;
pub mod state;
pub mod time;
pub mod width;

pub use channel::*;
pub use config::*;
pub use priority::*;
pub use state::*;
pub use time::*;

/// Number of PWM channels per driver.
pub const CHANNELS: usize = 4;

/// Result type used throughout the PWM driver crates
pub type PwmResult<T> = Result<T, PwmError>;

/// Reasons a configuration cannot be mapped onto the timer registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Requested tick frequency is zero
    ZeroFrequency,
    /// Requested tick frequency is higher than the timer input clock
    FrequencyAboveClock,
    /// The required divisor does not fit the prescaler register
    PrescalerOverflow,
    /// No integer prescaler reaches the tick frequency within tolerance
    InexactDivision,
    /// Period of zero ticks
    ZeroPeriod,
    /// Period does not fit the counter of this timer
    PeriodOutOfRange,
    /// Channel is configured but the timer has no such output
    ChannelNotPresent(PwmChannel),
    /// Interrupt priority beyond the implemented priority bits
    PriorityOutOfRange(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroFrequency => write!(f, "tick frequency is zero"),
            Self::FrequencyAboveClock => write!(f, "tick frequency above input clock"),
            Self::PrescalerOverflow => write!(f, "prescaler out of range"),
            Self::InexactDivision => write!(f, "input clock not divisible to tick frequency"),
            Self::ZeroPeriod => write!(f, "period is zero"),
            Self::PeriodOutOfRange => write!(f, "period exceeds counter width"),
            Self::ChannelNotPresent(ch) => write!(f, "channel {} not present on this timer", ch),
            Self::PriorityOutOfRange(p) => write!(f, "interrupt priority {} out of range", p),
        }
    }
}

/// Error types for PWM driver operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmError {
    /// Frequency/period/channel setup cannot be mapped to register values
    Configuration(ConfigError),
    /// Channel index outside `0..CHANNELS` or outside the timer's outputs
    InvalidChannel(PwmChannel),
    /// Operation not permitted in the current driver state
    InvalidStateTransition(DriverState),
}

impl From<ConfigError> for PwmError {
    fn from(err: ConfigError) -> Self {
        PwmError::Configuration(err)
    }
}

impl fmt::Display for PwmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PwmError::Configuration(e) => write!(f, "Configuration error: {}", e),
            PwmError::InvalidChannel(ch) => write!(f, "Invalid channel {}", ch),
            PwmError::InvalidStateTransition(state) => {
                write!(f, "Operation not allowed in state {}", state)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PwmError {}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::ZeroFrequency => defmt::write!(fmt, "ZeroFrequency"),
            Self::FrequencyAboveClock => defmt::write!(fmt, "FrequencyAboveClock"),
            Self::PrescalerOverflow => defmt::write!(fmt, "PrescalerOverflow"),
            Self::InexactDivision => defmt::write!(fmt, "InexactDivision"),
            Self::ZeroPeriod => defmt::write!(fmt, "ZeroPeriod"),
            Self::PeriodOutOfRange => defmt::write!(fmt, "PeriodOutOfRange"),
            Self::ChannelNotPresent(ch) => defmt::write!(fmt, "ChannelNotPresent({})", ch),
            Self::PriorityOutOfRange(p) => defmt::write!(fmt, "PriorityOutOfRange({})", p),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PwmError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            PwmError::Configuration(e) => defmt::write!(fmt, "Configuration({})", e),
            PwmError::InvalidChannel(ch) => defmt::write!(fmt, "InvalidChannel({})", ch),
            PwmError::InvalidStateTransition(s) => {
                defmt::write!(fmt, "InvalidStateTransition({})", s)
            }
        }
    }
}
