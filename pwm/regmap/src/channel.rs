//! Compare value and output polarity of a single channel

use pwm_core::{OutputMode, PwmChannel, PwmCount};

use crate::regs::ccer;

/// Register contents for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelRegister {
    /// Value for the channel's capture/compare register
    pub compare: u32,
    /// CCER bits of the channel, in channel 0 position
    pub polarity: u32,
    /// Requested width exceeded the period and was clamped to 100% duty
    pub saturated: bool,
}

impl ChannelRegister {
    /// Polarity bits shifted into `channel`'s CCER field
    pub const fn ccer_bits(&self, channel: PwmChannel) -> u32 {
        self.polarity << ccer::shift(channel)
    }
}

/// CCER bits for a logic mode, in channel 0 position.
///
/// `Disabled` leaves the output enable clear so the pin is not driven while
/// the compare event keeps being raised.
pub const fn polarity_bits(mode: OutputMode) -> u32 {
    match mode {
        OutputMode::Disabled => 0,
        OutputMode::ActiveHigh => ccer::CCE,
        OutputMode::ActiveLow => ccer::CCE | ccer::CCP,
    }
}

/// Map a duty width and logic mode to register contents.
///
/// In PWM mode 1 the output is active while the counter is below the
/// compare value, and the counter never reaches `period`. A compare value
/// of `period` is therefore always active; wider requests saturate there.
pub const fn compute_channel_register(mode: OutputMode, width: PwmCount, period: PwmCount) -> ChannelRegister {
    let saturated = width > period;
    ChannelRegister {
        compare: if saturated { period } else { width },
        polarity: polarity_bits(mode),
        saturated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity() {
        assert_eq!(compute_channel_register(OutputMode::Disabled, 10, 100).polarity, 0);
        assert_eq!(compute_channel_register(OutputMode::ActiveHigh, 10, 100).polarity, 0b01);
        assert_eq!(compute_channel_register(OutputMode::ActiveLow, 10, 100).polarity, 0b11);
    }

    #[test]
    fn test_width_within_period() {
        let reg = compute_channel_register(OutputMode::ActiveHigh, 500, 1000);
        assert_eq!(reg.compare, 500);
        assert!(!reg.saturated);

        let full = compute_channel_register(OutputMode::ActiveHigh, 1000, 1000);
        assert_eq!(full.compare, 1000);
        assert!(!full.saturated);
    }

    #[test]
    fn test_saturation() {
        let reg = compute_channel_register(OutputMode::ActiveLow, 1500, 1000);
        assert_eq!(reg.compare, 1000);
        assert!(reg.saturated);
    }

    #[test]
    fn test_ccer_shift() {
        let reg = compute_channel_register(OutputMode::ActiveLow, 0, 10);
        assert_eq!(reg.ccer_bits(0), 0x3);
        assert_eq!(reg.ccer_bits(2), 0x300);
    }
}
