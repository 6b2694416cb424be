//! Interrupt priority levels for the timer interrupt lines

use core::fmt;
use crate::{ConfigError, PwmResult};

/// Number of implemented priority bits on the interrupt controller
pub const PRIORITY_BITS: u8 = 4;

/// Validated interrupt priority, lower value is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IrqPriority(u8);

impl IrqPriority {
    /// Most urgent priority level
    pub const HIGHEST: IrqPriority = IrqPriority(0);

    /// Least urgent priority level
    pub const LOWEST: IrqPriority = IrqPriority((1 << PRIORITY_BITS) - 1);

    /// Create a new priority level
    pub fn new(priority: u8) -> PwmResult<Self> {
        if priority > Self::LOWEST.0 {
            Err(ConfigError::PriorityOutOfRange(priority).into())
        } else {
            Ok(IrqPriority(priority))
        }
    }

    /// Create priority without validation (const fn)
    pub const fn new_unchecked(priority: u8) -> Self {
        IrqPriority(priority)
    }

    /// Get the raw priority value
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Check if this priority fits the implemented priority bits
    pub const fn is_valid(self) -> bool {
        self.0 <= Self::LOWEST.0
    }

    /// Value for the controller's priority register, left-aligned in the byte
    pub const fn hw_value(self) -> u8 {
        self.0 << (8 - PRIORITY_BITS)
    }
}

impl Default for IrqPriority {
    fn default() -> Self {
        IrqPriority::new_unchecked(7)
    }
}

impl fmt::Display for IrqPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Priority({})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for IrqPriority {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Priority({})", self.0);
    }
}
