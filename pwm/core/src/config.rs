//! Driver configuration
//!
//! A [`DriverConfig`] is built with `const fn` builder methods so it can live
//! in a `static` and be lent to the driver for as long as it stays started.

use crate::{ChannelConfig, Hertz, PeriodCallback, PwmChannel, PwmCount, CHANNELS};

/// Complete configuration of one PWM driver.
#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    /// Counter tick rate
    pub frequency: Hertz,
    /// Initial period in ticks, `1..=max_count` of the timer
    pub period: PwmCount,
    /// Invoked at every counter reset and on hardware faults
    pub callback: Option<PeriodCallback>,
    /// Per-channel configuration
    pub channels: [ChannelConfig; CHANNELS],
    /// Raw control register 2 bits, written as-is
    pub raw_control: u16,
    /// Accepted deviation of the achieved tick rate in parts per million
    pub tolerance_ppm: u32,
}

impl DriverConfig {
    /// New configuration with every channel disabled and no callbacks
    pub const fn new(frequency: Hertz, period: PwmCount) -> Self {
        Self {
            frequency,
            period,
            callback: None,
            channels: [ChannelConfig::disabled(); CHANNELS],
            raw_control: 0,
            tolerance_ppm: 0,
        }
    }

    /// Replace the configuration of one channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel` is outside `0..CHANNELS`. In a `static`
    /// initializer this is a compile error.
    pub const fn channel(mut self, channel: PwmChannel, config: ChannelConfig) -> Self {
        if channel as usize >= CHANNELS {
            panic!("channel index out of range");
        }
        self.channels[channel as usize] = config;
        self
    }

    /// Set the period-reset callback
    pub const fn on_period(mut self, callback: PeriodCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Set the raw control register 2 value
    pub const fn raw_control(mut self, bits: u16) -> Self {
        self.raw_control = bits;
        self
    }

    /// Accept a tick rate off by up to `ppm` parts per million
    pub const fn tolerance_ppm(mut self, ppm: u32) -> Self {
        self.tolerance_ppm = ppm;
        self
    }

    /// Configuration of `channel`, if the index is in range
    pub fn channel_config(&self, channel: PwmChannel) -> Option<&ChannelConfig> {
        self.channels.get(channel as usize)
    }
}
