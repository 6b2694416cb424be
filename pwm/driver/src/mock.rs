//! Software models of the timer block, clock gate and interrupt controller
//!
//! [`FakeTimer`] follows the hardware closely enough to exercise the
//! driver: preloaded auto-reload and compare registers only take effect
//! at an update event, the status register is write-0-to-clear and event
//! generation is self-clearing.

use pwm_core::{Hertz, IrqPriority, PwmChannel, PwmResult, CHANNELS};
use pwm_regmap::regs::{bdtr, ccer, ccmr, cr1, egr, sr};
use pwm_regmap::Register;

use crate::hw::{ClockControl, TimerRegisters};
use crate::irq::{InterruptController, Irq};

const NREGS: usize = Register::ALL.len();

/// Register-level model of a TIMx block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FakeTimer {
    regs: [u32; NREGS],
    active_arr: u32,
    active_ccr: [u32; CHANNELS],
    updates: u32,
}

impl FakeTimer {
    pub const fn new() -> Self {
        Self {
            regs: [0; NREGS],
            active_arr: 0,
            active_ccr: [0; CHANNELS],
            updates: 0,
        }
    }

    fn get(&self, reg: Register) -> u32 {
        self.regs[reg.index()]
    }

    fn set(&mut self, reg: Register, value: u32) {
        self.regs[reg.index()] = value;
    }

    fn counting(&self) -> bool {
        self.get(Register::Cr1) & cr1::CEN != 0
    }

    fn compare_channel(reg: Register) -> Option<usize> {
        (0..CHANNELS).find(|&ch| Register::ccr(ch as PwmChannel) == Some(reg))
    }

    // Whether a write to `reg` waits for the next update event.
    fn buffered(&self, reg: Register) -> bool {
        if !reg.is_preloaded() {
            return false;
        }
        match Self::compare_channel(reg) {
            Some(channel) => {
                let (ccmr_reg, shift) = if channel < 2 {
                    (Register::Ccmr1, channel as u32 * 8)
                } else {
                    (Register::Ccmr2, (channel as u32 - 2) * 8)
                };
                self.get(ccmr_reg) & (ccmr::OCPE << shift) != 0
            }
            None => self.get(Register::Cr1) & cr1::ARPE != 0,
        }
    }

    // Update event: shadow registers take the preload values.
    fn update(&mut self) {
        self.active_arr = self.get(Register::Arr);
        for channel in 0..CHANNELS as PwmChannel {
            if let Some(ccr) = Register::ccr(channel) {
                self.active_ccr[channel as usize] = self.get(ccr);
            }
        }
        self.set(Register::Cnt, 0);
        self.updates += 1;
    }

    /// Auto-reload value in effect for the running cycle
    pub fn active_reload(&self) -> u32 {
        self.active_arr
    }

    /// Compare value of `channel` in effect for the running cycle
    pub fn active_compare(&self, channel: PwmChannel) -> u32 {
        self.active_ccr.get(channel as usize).copied().unwrap_or(0)
    }

    /// Number of update events so far
    pub fn updates(&self) -> u32 {
        self.updates
    }

    /// Counter reaches the reload value and wraps.
    ///
    /// Returns `false` if the counter is disabled.
    pub fn overflow(&mut self) -> bool {
        if !self.counting() {
            return false;
        }
        self.update();
        let status = self.get(Register::Sr);
        self.set(Register::Sr, status | sr::UIF);
        true
    }

    /// Counter matches the compare value of `channel`.
    ///
    /// A flag still pending from the previous match is reported as
    /// overcapture.
    pub fn compare_match(&mut self, channel: PwmChannel) -> bool {
        if !self.counting() || channel as usize >= CHANNELS {
            return false;
        }
        let mut status = self.get(Register::Sr);
        if status & sr::ccif(channel) != 0 {
            status |= sr::ccof(channel);
        }
        self.set(Register::Sr, status | sr::ccif(channel));
        true
    }

    /// Break input asserted: outputs forced off and the break flag set
    pub fn assert_break(&mut self) {
        let bdtr_value = self.get(Register::Bdtr);
        self.set(Register::Bdtr, bdtr_value & !bdtr::MOE);
        let status = self.get(Register::Sr);
        self.set(Register::Sr, status | sr::BIF);
    }

    /// Ticks per cycle during which `channel` is in its active state, or
    /// `None` if its output is not enabled.
    pub fn active_ticks(&self, channel: PwmChannel) -> Option<u32> {
        if channel as usize >= CHANNELS {
            return None;
        }
        if self.get(Register::Ccer) & (ccer::CCE << ccer::shift(channel)) == 0 {
            return None;
        }
        let period = self.active_arr as u64 + 1;
        Some((self.active_ccr[channel as usize] as u64).min(period) as u32)
    }

    /// Pin level of `channel` at counter value `count`, `None` if undriven
    pub fn pin_level(&self, channel: PwmChannel, count: u32) -> Option<bool> {
        self.active_ticks(channel)?;
        let inverted = self.get(Register::Ccer) & (ccer::CCP << ccer::shift(channel)) != 0;
        let active = count < self.active_ccr[channel as usize];
        Some(active != inverted)
    }
}

impl TimerRegisters for FakeTimer {
    fn read(&self, reg: Register) -> u32 {
        match reg {
            Register::Egr => 0,
            _ => self.get(reg),
        }
    }

    fn write(&mut self, reg: Register, value: u32) {
        match reg {
            Register::Sr => {
                let status = self.get(Register::Sr);
                self.set(Register::Sr, status & value);
            }
            Register::Egr => {
                if value & egr::UG != 0 {
                    self.update();
                    if self.get(Register::Cr1) & cr1::URS == 0 {
                        let status = self.get(Register::Sr);
                        self.set(Register::Sr, status | sr::UIF);
                    }
                }
            }
            _ if reg.is_preloaded() => {
                self.set(reg, value);
                if !self.buffered(reg) {
                    match Self::compare_channel(reg) {
                        Some(channel) => self.active_ccr[channel] = value,
                        None => self.active_arr = value,
                    }
                }
            }
            _ => self.set(reg, value),
        }
    }
}

/// Clock gate model with a fixed input clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeClock {
    input: Hertz,
    enabled: bool,
    enables: u32,
}

impl FakeClock {
    pub const fn new(input: Hertz) -> Self {
        Self {
            input,
            enabled: false,
            enables: 0,
        }
    }

    /// How many times the gate was opened
    pub fn enables(&self) -> u32 {
        self.enables
    }
}

impl ClockControl for FakeClock {
    fn enable(&mut self) {
        self.enabled = true;
        self.enables += 1;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn input_clock(&self) -> Hertz {
        self.input
    }
}

/// Interrupt controller recording enable state and priorities per line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FakeInterruptController {
    enabled: [bool; Irq::ALL.len()],
    pending: [bool; Irq::ALL.len()],
    priority: [Option<IrqPriority>; Irq::ALL.len()],
}

impl FakeInterruptController {
    pub const fn new() -> Self {
        Self {
            enabled: [false; Irq::ALL.len()],
            pending: [false; Irq::ALL.len()],
            priority: [None; Irq::ALL.len()],
        }
    }

    pub fn is_enabled(&self, irq: Irq) -> bool {
        self.enabled[irq.index()]
    }

    pub fn priority(&self, irq: Irq) -> Option<IrqPriority> {
        self.priority[irq.index()]
    }

    /// Mark `irq` pending as the hardware would
    pub fn pend(&mut self, irq: Irq) {
        self.pending[irq.index()] = true;
    }
}

impl InterruptController for FakeInterruptController {
    fn enable(&mut self, irq: Irq) -> PwmResult<()> {
        self.enabled[irq.index()] = true;
        Ok(())
    }

    fn disable(&mut self, irq: Irq) -> PwmResult<()> {
        self.enabled[irq.index()] = false;
        Ok(())
    }

    fn set_priority(&mut self, irq: Irq, priority: IrqPriority) -> PwmResult<()> {
        self.priority[irq.index()] = Some(IrqPriority::new(priority.raw())?);
        Ok(())
    }

    fn is_pending(&self, irq: Irq) -> bool {
        self.pending[irq.index()]
    }

    fn clear_pending(&mut self, irq: Irq) -> PwmResult<()> {
        self.pending[irq.index()] = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_write_zero_to_clear() {
        let mut timer = FakeTimer::new();
        timer.write(Register::Cr1, cr1::CEN);
        timer.overflow();
        timer.compare_match(1);
        assert_eq!(timer.read(Register::Sr), sr::UIF | sr::ccif(1));

        timer.write(Register::Sr, !sr::UIF);
        assert_eq!(timer.read(Register::Sr), sr::ccif(1));
        timer.write(Register::Sr, u32::MAX);
        assert_eq!(timer.read(Register::Sr), sr::ccif(1));
    }

    #[test]
    fn test_preloaded_reload() {
        let mut timer = FakeTimer::new();
        timer.write(Register::Arr, 99);
        assert_eq!(timer.active_reload(), 99);

        timer.write(Register::Cr1, cr1::ARPE | cr1::CEN);
        timer.write(Register::Arr, 199);
        assert_eq!(timer.read(Register::Arr), 199);
        assert_eq!(timer.active_reload(), 99);

        timer.overflow();
        assert_eq!(timer.active_reload(), 199);
    }

    #[test]
    fn test_preloaded_compare() {
        let mut timer = FakeTimer::new();
        timer.write(Register::Ccr2, 40);
        assert_eq!(timer.active_compare(1), 40);

        let field = pwm_regmap::regs::ccmr_pwm_mode(1).unwrap();
        timer.write(field.register, field.bits);
        timer.write(Register::Ccr2, 60);
        assert_eq!(timer.read(Register::Ccr2), 60);
        assert_eq!(timer.active_compare(1), 40);

        // Other channels keep writing through
        timer.write(Register::Ccr3, 7);
        assert_eq!(timer.active_compare(2), 7);

        timer.write(Register::Egr, egr::UG);
        assert_eq!(timer.active_compare(1), 60);
    }

    #[test]
    fn test_stopped_counter_raises_nothing() {
        let mut timer = FakeTimer::new();
        assert!(!timer.overflow());
        assert!(!timer.compare_match(0));
        assert_eq!(timer.read(Register::Sr), 0);
    }

    #[test]
    fn test_overcapture() {
        let mut timer = FakeTimer::new();
        timer.write(Register::Cr1, cr1::CEN);
        timer.compare_match(2);
        timer.compare_match(2);
        assert_eq!(timer.read(Register::Sr), sr::ccif(2) | sr::ccof(2));
    }

    #[test]
    fn test_fake_controller() {
        let mut nvic = FakeInterruptController::new();
        nvic.set_priority(Irq::Tim3, IrqPriority::new_unchecked(5)).unwrap();
        nvic.enable(Irq::Tim3).unwrap();
        nvic.pend(Irq::Tim3);
        assert!(nvic.is_enabled(Irq::Tim3));
        assert!(nvic.is_pending(Irq::Tim3));
        assert_eq!(nvic.priority(Irq::Tim3).map(IrqPriority::raw), Some(5));
        assert!(nvic.set_priority(Irq::Tim3, IrqPriority::new_unchecked(16)).is_err());
    }
}
