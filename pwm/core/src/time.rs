//! Frequency and tick count types

use core::fmt;

/// Counter ticks, used for periods and duty widths.
pub type PwmCount = u32;

/// Frequency in hertz
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hertz(pub u32);

impl Hertz {
    /// Create a frequency from hertz
    pub const fn hz(hz: u32) -> Self {
        Self(hz)
    }

    /// Create a frequency from kilohertz
    pub const fn khz(khz: u32) -> Self {
        Self(khz * 1_000)
    }

    /// Create a frequency from megahertz
    pub const fn mhz(mhz: u32) -> Self {
        Self(mhz * 1_000_000)
    }

    /// Get the raw value in hertz
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Output frequency of a PWM cycle lasting `period` ticks at this tick rate
    pub const fn cycle_rate(self, period: PwmCount) -> Option<Hertz> {
        if period == 0 {
            None
        } else {
            Some(Hertz(self.0 / period))
        }
    }
}

impl fmt::Display for Hertz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Hertz {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}Hz", self.0);
    }
}
