//! Channel model: output logic mode, callbacks and the enabled-channel mask

use core::fmt;

use crate::CHANNELS;

/// PWM channel index, `0..CHANNELS`.
pub type PwmChannel = u8;

/// Identity of a driver instance, handed to callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DriverId(pub u8);

impl DriverId {
    /// Get the raw identifier
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PWMD{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DriverId {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "PWMD{}", self.0);
    }
}

/// Channel output logic mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OutputMode {
    /// Output not driven, callback only.
    #[default]
    Disabled = 0,
    /// Idle is logic level 0.
    ActiveHigh = 1,
    /// Idle is logic level 1.
    ActiveLow = 2,
}

impl OutputMode {
    /// Whether this mode drives the physical pin
    pub const fn drives_output(self) -> bool {
        !matches!(self, OutputMode::Disabled)
    }
}

/// Asynchronous fault conditions reported by the timer hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// Break input asserted, outputs were forced inactive by hardware
    Break,
    /// A compare flag was raised again before the previous one was serviced
    Overcapture(PwmChannel),
}

/// What happened at the whole-timer level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PeriodEvent {
    /// Counter wrapped to zero, a new PWM cycle started
    Reset,
    /// Hardware fault condition
    Fault(Fault),
}

/// Invoked on a channel compare event.
pub type CompareCallback = fn(DriverId, PwmChannel);

/// Invoked on counter reset, and on hardware faults.
pub type PeriodCallback = fn(DriverId, PeriodEvent);

/// Per-channel configuration.
///
/// A `Disabled` channel may still carry a callback: the compare event keeps
/// firing while the pin stays undriven.
#[derive(Debug, Clone, Copy)]
pub struct ChannelConfig {
    /// Channel active logic level
    pub mode: OutputMode,
    /// Invoked on the channel compare event, `None` disables the notification
    pub callback: Option<CompareCallback>,
}

impl ChannelConfig {
    /// Channel that drives nothing and notifies nobody
    pub const fn disabled() -> Self {
        Self {
            mode: OutputMode::Disabled,
            callback: None,
        }
    }

    /// Channel driven high during the active part of the period
    pub const fn active_high() -> Self {
        Self {
            mode: OutputMode::ActiveHigh,
            callback: None,
        }
    }

    /// Channel driven low during the active part of the period
    pub const fn active_low() -> Self {
        Self {
            mode: OutputMode::ActiveLow,
            callback: None,
        }
    }

    /// Attach a compare callback
    pub const fn with_callback(mut self, callback: CompareCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Whether this channel asks for anything at all
    pub const fn is_used(&self) -> bool {
        self.mode.drives_output() || self.callback.is_some()
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Bit mask of the enabled channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelMask(u32);

impl ChannelMask {
    /// No channel enabled
    pub const EMPTY: Self = Self(0);

    /// Create a new empty mask
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Raw bits, bit `n` for channel `n`
    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn set(&mut self, channel: PwmChannel) {
        if (channel as usize) < CHANNELS {
            self.0 |= 1 << channel;
        }
    }

    pub fn clear(&mut self, channel: PwmChannel) {
        if (channel as usize) < CHANNELS {
            self.0 &= !(1 << channel);
        }
    }

    pub const fn is_set(self, channel: PwmChannel) -> bool {
        (channel as usize) < CHANNELS && (self.0 & (1 << channel)) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of enabled channels
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterate over the enabled channel indices, lowest first
    pub fn iter(self) -> impl Iterator<Item = PwmChannel> {
        (0..CHANNELS as PwmChannel).filter(move |&ch| self.is_set(ch))
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ChannelMask {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "ChannelMask({=u32:b})", self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notify(_: DriverId, _: PwmChannel) {}

    #[test]
    fn test_disabled_channel_keeps_callback() {
        let cfg = ChannelConfig::disabled().with_callback(notify);
        assert_eq!(cfg.mode, OutputMode::Disabled);
        assert!(cfg.callback.is_some());
        assert!(cfg.is_used());
        assert!(!ChannelConfig::disabled().is_used());
    }

    #[test]
    fn test_channel_mask() {
        let mut mask = ChannelMask::new();
        assert!(mask.is_empty());

        mask.set(0);
        mask.set(3);
        assert!(mask.is_set(0));
        assert!(mask.is_set(3));
        assert!(!mask.is_set(1));
        assert_eq!(mask.count(), 2);
        assert_eq!(mask.bits(), 0b1001);

        // Out-of-range indices are ignored
        mask.set(CHANNELS as PwmChannel);
        assert_eq!(mask.bits(), 0b1001);
        assert!(!mask.is_set(CHANNELS as PwmChannel));

        mask.clear(0);
        let mut it = mask.iter();
        assert_eq!(it.next(), Some(3));
        assert_eq!(it.next(), None);
    }
}
