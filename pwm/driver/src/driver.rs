//! PWM driver state machine and interrupt service

use pwm_core::{
    ChannelMask, ConfigError, DriverConfig, DriverId, DriverState, Fault, PeriodEvent, PwmChannel, PwmCount,
    PwmError, PwmResult, CHANNELS,
};
use pwm_regmap::regs::{bdtr, ccer, ccmr_pwm_mode, cr1, dier, egr, sr};
use pwm_regmap::{compute_channel_register, compute_reload, compute_timebase_with_tolerance, Register, Timebase};

use crate::dispatch::{Notification, Notifications};
use crate::hw::{ClockControl, TimerCaps, TimerRegisters};

/// PWM driver for one timer unit.
///
/// Owns the unit's register block and clock gate. A started driver
/// borrows its [`DriverConfig`] until the next `stop` or `start`.
pub struct PwmDriver<'a, T, C> {
    id: DriverId,
    caps: TimerCaps,
    state: DriverState,
    config: Option<&'a DriverConfig>,
    period: PwmCount,
    enabled: ChannelMask,
    regs: T,
    clock: C,
}

impl<'a, T, C> PwmDriver<'a, T, C>
where
    T: TimerRegisters,
    C: ClockControl,
{
    /// Create an uninitialized driver
    pub const fn new(id: DriverId, caps: TimerCaps, regs: T, clock: C) -> Self {
        Self {
            id,
            caps,
            state: DriverState::Uninitialized,
            config: None,
            period: 0,
            enabled: ChannelMask::EMPTY,
            regs,
            clock,
        }
    }

    /// Bring the driver to `Stopped`, leaving the peripheral unclocked.
    pub fn init(&mut self) -> PwmResult<()> {
        if self.state != DriverState::Uninitialized {
            return Err(PwmError::InvalidStateTransition(self.state));
        }
        self.state = DriverState::Stopped;
        log_debug!("{}: initialized", self.id);
        Ok(())
    }

    /// Program the timer from `config` and start the counter.
    ///
    /// Valid from `Stopped` and, to reconfigure, from `Ready` or `Active`.
    /// Every channel is left disabled. On error nothing is written and the
    /// driver keeps its previous state and configuration.
    pub fn start(&mut self, config: &'a DriverConfig) -> PwmResult<()> {
        if self.state == DriverState::Uninitialized {
            return Err(PwmError::InvalidStateTransition(self.state));
        }

        self.validate(config)?;
        let timebase = compute_timebase_with_tolerance(
            self.clock.input_clock(),
            config.frequency,
            config.period,
            self.caps.counter,
            config.tolerance_ppm,
        )?;

        if self.state == DriverState::Stopped {
            self.clock.enable();
        }

        critical_section::with(|_| self.program(config, &timebase));

        self.config = Some(config);
        self.period = config.period;
        self.enabled = ChannelMask::EMPTY;
        self.state = DriverState::Ready;
        log_debug!(
            "{}: started at {} with period {} ({})",
            self.id,
            config.frequency,
            config.period,
            timebase
        );
        Ok(())
    }

    /// Stop the counter and gate the peripheral clock.
    ///
    /// Pending compare cycles are abandoned and no further callback is
    /// delivered. Calling it on a stopped driver does nothing.
    pub fn stop(&mut self) -> PwmResult<()> {
        match self.state {
            DriverState::Uninitialized => return Err(PwmError::InvalidStateTransition(self.state)),
            DriverState::Stopped => return Ok(()),
            DriverState::Ready | DriverState::Active => {}
        }

        let advanced = self.caps.advanced;
        let regs = &mut self.regs;
        critical_section::with(|_| {
            regs.write(Register::Cr1, 0);
            regs.write(Register::Dier, 0);
            regs.write(Register::Sr, 0);
            if advanced {
                regs.write(Register::Bdtr, 0);
            }
        });
        self.clock.disable();

        self.config = None;
        self.period = 0;
        self.enabled = ChannelMask::EMPTY;
        self.state = DriverState::Stopped;
        log_debug!("{}: stopped", self.id);
        Ok(())
    }

    /// Change the period without stopping the counter.
    ///
    /// The auto-reload register is preloaded, so the new period starts at
    /// the next counter reset. Channel widths are tick counts and are not
    /// rescaled.
    pub fn change_period(&mut self, period: PwmCount) -> PwmResult<()> {
        self.require_running()?;
        let reload = compute_reload(period, self.caps.counter)?;
        self.regs.write(Register::Arr, reload);
        self.period = period;
        log_trace!("{}: period {}", self.id, period);
        Ok(())
    }

    /// Enable `channel` with a duty width of `width` ticks, or update the
    /// width of an enabled channel.
    ///
    /// A width above the period saturates to an always active output.
    pub fn enable_channel(&mut self, channel: PwmChannel, width: PwmCount) -> PwmResult<()> {
        let config = self.require_running()?;
        if !self.caps.has_channel(channel) {
            return Err(PwmError::InvalidChannel(channel));
        }
        let Some(ccr) = Register::ccr(channel) else {
            return Err(PwmError::InvalidChannel(channel));
        };

        let channel_config = config.channels[channel as usize];
        let reg = compute_channel_register(channel_config.mode, width, self.period);
        if reg.saturated {
            log_warn!(
                "{}: width {} exceeds period {} on channel {}, output saturated",
                self.id,
                width,
                self.period,
                channel
            );
        }
        let compare = reg.compare.min(self.caps.counter.max_reload());
        let first_enable = !self.enabled.is_set(channel);
        let notify = channel_config.callback.is_some();

        let regs = &mut self.regs;
        critical_section::with(|_| {
            regs.write(ccr, compare);
            regs.modify(Register::Ccer, |v| (v & !ccer::field(channel)) | reg.ccer_bits(channel));
            if first_enable && notify {
                regs.write(Register::Sr, !sr::ccif(channel));
                regs.modify(Register::Dier, |v| v | dier::ccie(channel));
            }
        });

        self.enabled.set(channel);
        self.state = DriverState::Active;
        log_trace!("{}: channel {} width {}", self.id, channel, width);
        Ok(())
    }

    /// Disable `channel`: output undriven, compare notification masked.
    ///
    /// The counter keeps running and the state stays as it is.
    pub fn disable_channel(&mut self, channel: PwmChannel) -> PwmResult<()> {
        self.require_running()?;
        if !self.caps.has_channel(channel) {
            return Err(PwmError::InvalidChannel(channel));
        }
        let Some(ccr) = Register::ccr(channel) else {
            return Err(PwmError::InvalidChannel(channel));
        };

        let regs = &mut self.regs;
        critical_section::with(|_| {
            regs.write(ccr, 0);
            regs.modify(Register::Ccer, |v| v & !ccer::field(channel));
            regs.modify(Register::Dier, |v| v & !dier::ccie(channel));
        });

        self.enabled.clear(channel);
        log_trace!("{}: channel {} disabled", self.id, channel);
        Ok(())
    }

    /// Acknowledge the pending timer interrupt flags and collect the
    /// callbacks to run.
    ///
    /// Compare events come first in channel order, then the counter reset,
    /// then a break fault. Does nothing unless the driver is running.
    pub fn serve_interrupt(&mut self) -> Notifications {
        let mut out = Notifications::new(self.id);
        let Some(config) = self.config.filter(|_| self.state.is_running()) else {
            return out;
        };

        let status = self.regs.read(Register::Sr);
        let pending = status & self.regs.read(Register::Dier);
        let mut ack = pending;

        for channel in 0..self.caps.channels.min(CHANNELS as u8) {
            if pending & sr::ccif(channel) == 0 {
                continue;
            }
            if let Some(callback) = config.channels[channel as usize].callback {
                out.push(Notification::Compare(callback, channel));
            }
            if status & sr::ccof(channel) != 0 {
                ack |= sr::ccof(channel);
                log_warn!("{}: overcapture on channel {}", self.id, channel);
                if let Some(callback) = config.callback {
                    out.push(Notification::Period(callback, PeriodEvent::Fault(Fault::Overcapture(channel))));
                }
            }
        }

        if pending & sr::UIF != 0 {
            if let Some(callback) = config.callback {
                out.push(Notification::Period(callback, PeriodEvent::Reset));
            }
        }

        if pending & sr::BIF != 0 {
            log_warn!("{}: break input asserted", self.id);
            if let Some(callback) = config.callback {
                out.push(Notification::Period(callback, PeriodEvent::Fault(Fault::Break)));
            }
        }

        self.regs.write(Register::Sr, !ack);
        out
    }

    /// Serve the interrupt and run the callbacks right away.
    ///
    /// The callbacks run while the caller still borrows this driver. For a
    /// driver held in a [`DriverSlot`](crate::registry::DriverSlot) use
    /// [`DriverSlot::on_interrupt`](crate::registry::DriverSlot::on_interrupt)
    /// instead: calling this from inside `DriverSlot::with` makes a callback
    /// that goes back to the slot panic on the double borrow.
    pub fn on_interrupt(&mut self) {
        self.serve_interrupt().deliver();
    }

    pub fn id(&self) -> DriverId {
        self.id
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Current period in ticks, zero while stopped
    pub fn period(&self) -> PwmCount {
        self.period
    }

    pub fn enabled_channels(&self) -> ChannelMask {
        self.enabled
    }

    pub fn is_channel_enabled(&self, channel: PwmChannel) -> bool {
        self.enabled.is_set(channel)
    }

    /// Active configuration
    pub fn config(&self) -> Option<&'a DriverConfig> {
        self.config
    }

    pub fn caps(&self) -> TimerCaps {
        self.caps
    }

    /// Shared view of the register block
    pub fn registers(&self) -> &T {
        &self.regs
    }

    /// Register block for simulating hardware events in tests
    pub fn registers_mut(&mut self) -> &mut T {
        &mut self.regs
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn require_running(&self) -> PwmResult<&'a DriverConfig> {
        match self.config {
            Some(config) if self.state.is_running() => Ok(config),
            _ => Err(PwmError::InvalidStateTransition(self.state)),
        }
    }

    fn validate(&self, config: &DriverConfig) -> PwmResult<()> {
        for (index, channel) in config.channels.iter().enumerate() {
            let index = index as PwmChannel;
            if !self.caps.has_channel(index) && channel.is_used() {
                return Err(ConfigError::ChannelNotPresent(index).into());
            }
        }
        Ok(())
    }

    // Counter held disabled while the whole block is rewritten.
    fn program(&mut self, config: &DriverConfig, timebase: &Timebase) {
        let regs = &mut self.regs;
        let channels = self.caps.channels.min(CHANNELS as u8);

        regs.write(Register::Cr1, 0);
        regs.write(Register::Dier, 0);
        let mut ccmr1 = 0;
        let mut ccmr2 = 0;
        let mut ccer_bits = 0;
        for channel in 0..channels {
            if let Some(ccr) = Register::ccr(channel) {
                regs.write(ccr, 0);
            }
            if let Some(field) = ccmr_pwm_mode(channel) {
                match field.register {
                    Register::Ccmr1 => ccmr1 |= field.bits,
                    _ => ccmr2 |= field.bits,
                }
            }
            let reg = compute_channel_register(config.channels[channel as usize].mode, 0, config.period);
            ccer_bits |= reg.ccer_bits(channel);
        }
        regs.write(Register::Cnt, 0);
        regs.write(Register::Ccmr1, ccmr1);
        regs.write(Register::Ccmr2, ccmr2);
        regs.write(Register::Psc, timebase.prescaler as u32);
        regs.write(Register::Arr, timebase.reload);
        regs.write(Register::Cr2, config.raw_control as u32);
        regs.write(Register::Ccer, ccer_bits);
        if self.caps.advanced {
            regs.write(Register::Bdtr, bdtr::MOE);
        }

        // Load PSC, ARR and CCRx into the shadow registers, then drop the
        // update flag this raised.
        regs.write(Register::Egr, egr::UG);
        regs.write(Register::Sr, 0);

        let mut interrupts = 0;
        if config.callback.is_some() {
            interrupts |= dier::UIE;
            if self.caps.advanced {
                interrupts |= dier::BIE;
            }
        }
        regs.write(Register::Dier, interrupts);
        regs.write(Register::Cr1, cr1::ARPE | cr1::URS | cr1::CEN);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FakeClock, FakeTimer};
    use pwm_core::{ChannelConfig, Hertz, OutputMode};
    use pwm_regmap::CounterWidth;

    type TestDriver<'a> = PwmDriver<'a, FakeTimer, FakeClock>;

    fn driver<'a>(caps: TimerCaps) -> TestDriver<'a> {
        let mut pwm = PwmDriver::new(DriverId(1), caps, FakeTimer::new(), FakeClock::new(Hertz::mhz(72)));
        pwm.init().unwrap();
        pwm
    }

    fn on_reset(_: DriverId, _: PeriodEvent) {}

    #[test]
    fn test_init_once() {
        let mut pwm = driver(TimerCaps::GENERAL_PURPOSE);
        assert_eq!(pwm.state(), DriverState::Stopped);
        assert_eq!(pwm.init(), Err(PwmError::InvalidStateTransition(DriverState::Stopped)));
    }

    #[test]
    fn test_start_requires_init() {
        let config = DriverConfig::new(Hertz::mhz(1), 1000);
        let mut pwm: TestDriver = PwmDriver::new(
            DriverId(1),
            TimerCaps::GENERAL_PURPOSE,
            FakeTimer::new(),
            FakeClock::new(Hertz::mhz(72)),
        );
        assert_eq!(
            pwm.start(&config),
            Err(PwmError::InvalidStateTransition(DriverState::Uninitialized))
        );
        assert_eq!(pwm.stop(), Err(PwmError::InvalidStateTransition(DriverState::Uninitialized)));
        assert!(!pwm.clock().is_enabled());
    }

    #[test]
    fn test_start_programs_block() {
        let config = DriverConfig::new(Hertz::mhz(1), 1000)
            .channel(0, ChannelConfig::active_high())
            .channel(1, ChannelConfig::active_low())
            .raw_control(0x0040);
        let mut pwm = driver(TimerCaps::GENERAL_PURPOSE);
        pwm.start(&config).unwrap();

        let regs = pwm.registers();
        assert_eq!(regs.read(Register::Psc), 71);
        assert_eq!(regs.read(Register::Arr), 999);
        assert_eq!(regs.active_reload(), 999);
        assert_eq!(regs.read(Register::Cr2), 0x0040);
        assert_eq!(regs.read(Register::Ccer), 0x31);
        assert_eq!(regs.read(Register::Ccmr1), 0x6868);
        assert_eq!(regs.read(Register::Ccmr2), 0x6868);
        assert_eq!(regs.read(Register::Dier), 0);
        assert_eq!(regs.read(Register::Sr), 0);
        assert_eq!(regs.read(Register::Cr1), cr1::ARPE | cr1::URS | cr1::CEN);
        assert!(pwm.clock().is_enabled());
        assert_eq!(pwm.state(), DriverState::Ready);
    }

    #[test]
    fn test_advanced_unit_enables_main_output_and_break() {
        let config = DriverConfig::new(Hertz::mhz(1), 1000).on_period(on_reset);
        let mut pwm = driver(TimerCaps::ADVANCED);
        pwm.start(&config).unwrap();
        assert_eq!(pwm.registers().read(Register::Bdtr), bdtr::MOE);
        assert_eq!(pwm.registers().read(Register::Dier), dier::UIE | dier::BIE);

        pwm.stop().unwrap();
        assert_eq!(pwm.registers().read(Register::Bdtr), 0);
    }

    #[test]
    fn test_failed_start_leaves_driver_untouched() {
        let good = DriverConfig::new(Hertz::mhz(1), 1000).channel(0, ChannelConfig::active_high());
        let bad = DriverConfig::new(Hertz::mhz(1), 70_000);
        let mut pwm = driver(TimerCaps::GENERAL_PURPOSE);
        pwm.start(&good).unwrap();
        pwm.enable_channel(0, 250).unwrap();
        let before = pwm.registers().clone();

        assert_eq!(
            pwm.start(&bad),
            Err(PwmError::Configuration(ConfigError::PeriodOutOfRange))
        );
        assert_eq!(pwm.registers(), &before);
        assert_eq!(pwm.state(), DriverState::Active);
        assert_eq!(pwm.period(), 1000);
        assert!(pwm.is_channel_enabled(0));
    }

    #[test]
    fn test_missing_hardware_channel_rejected() {
        let caps = TimerCaps {
            channels: 2,
            counter: CounterWidth::Bits16,
            advanced: false,
        };
        let config = DriverConfig::new(Hertz::mhz(1), 100).channel(3, ChannelConfig::active_high());
        let mut pwm = driver(caps);
        assert_eq!(
            pwm.start(&config),
            Err(PwmError::Configuration(ConfigError::ChannelNotPresent(3)))
        );
        assert!(!pwm.clock().is_enabled());

        let config = DriverConfig::new(Hertz::mhz(1), 100);
        pwm.start(&config).unwrap();
        assert_eq!(pwm.enable_channel(2, 10), Err(PwmError::InvalidChannel(2)));
    }

    #[test]
    fn test_full_width_period_on_16_bit_counter() {
        let config = DriverConfig::new(Hertz::mhz(1), 65_536).channel(0, ChannelConfig::active_high());
        let mut pwm = driver(TimerCaps::GENERAL_PURPOSE);
        pwm.start(&config).unwrap();
        pwm.enable_channel(0, 65_536).unwrap();
        assert_eq!(pwm.registers().read(Register::Arr), 0xFFFF);
        assert_eq!(pwm.registers().read(Register::Ccr1), 0xFFFF);
    }

    #[test]
    fn test_disable_channel_keeps_state() {
        let config = DriverConfig::new(Hertz::mhz(1), 100).channel(1, ChannelConfig::active_low());
        let mut pwm = driver(TimerCaps::GENERAL_PURPOSE);
        pwm.start(&config).unwrap();
        pwm.enable_channel(1, 40).unwrap();
        pwm.disable_channel(1).unwrap();

        assert_eq!(pwm.state(), DriverState::Active);
        assert!(pwm.enabled_channels().is_empty());
        assert_eq!(pwm.registers().read(Register::Ccr2), 0);
        assert_eq!(pwm.registers().read(Register::Ccer) & ccer::field(1), 0);
        assert_eq!(config.channels[1].mode, OutputMode::ActiveLow);
    }
}
