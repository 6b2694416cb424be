//! Prescaler and auto-reload computation

use core::fmt;
use pwm_core::{ConfigError, Hertz, PwmCount, PwmResult};

/// Largest prescaler divisor, `PSC + 1` with a 16-bit `PSC`
pub const MAX_DIVISOR: u32 = 1 << 16;

const PPM: u128 = 1_000_000;

/// Width of a timer's counter and compare registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CounterWidth {
    Bits16,
    Bits32,
}

impl CounterWidth {
    /// Largest auto-reload value
    pub const fn max_reload(self) -> u32 {
        match self {
            CounterWidth::Bits16 => 0xFFFF,
            CounterWidth::Bits32 => u32::MAX,
        }
    }

    /// Longest period in ticks.
    ///
    /// A 32-bit counter could count `2^32` ticks but the period type stops
    /// one short of that.
    pub const fn max_period(self) -> PwmCount {
        match self {
            CounterWidth::Bits16 => 0x1_0000,
            CounterWidth::Bits32 => u32::MAX,
        }
    }
}

/// Register values defining the counter timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timebase {
    /// `PSC`, the input clock is divided by `prescaler + 1`
    pub prescaler: u16,
    /// `ARR`, the counter wraps after `reload + 1` ticks
    pub reload: u32,
}

impl Timebase {
    /// Input clock divisor
    pub const fn divisor(&self) -> u32 {
        self.prescaler as u32 + 1
    }

    /// Achieved counter tick rate
    pub const fn tick_rate(&self, input_clock: Hertz) -> Hertz {
        Hertz(input_clock.0 / self.divisor())
    }

    /// Period in ticks
    pub const fn period(&self) -> u64 {
        self.reload as u64 + 1
    }
}

impl fmt::Display for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "psc={} arr={}", self.prescaler, self.reload)
    }
}

/// Compute prescaler and reload for an exact tick rate.
///
/// The input clock must be an exact multiple of `frequency`.
pub fn compute_timebase(
    input_clock: Hertz,
    frequency: Hertz,
    period: PwmCount,
    width: CounterWidth,
) -> PwmResult<Timebase> {
    compute_timebase_with_tolerance(input_clock, frequency, period, width, 0)
}

/// Compute prescaler and reload, accepting a tick rate within `tolerance_ppm`.
///
/// Picks the smallest divisor whose achieved rate `input_clock / divisor`
/// lies within `frequency * tolerance_ppm / 1e6` of `frequency`.
pub fn compute_timebase_with_tolerance(
    input_clock: Hertz,
    frequency: Hertz,
    period: PwmCount,
    width: CounterWidth,
    tolerance_ppm: u32,
) -> PwmResult<Timebase> {
    let prescaler = compute_prescaler(input_clock, frequency, tolerance_ppm)?;
    let reload = compute_reload(period, width)?;
    Ok(Timebase { prescaler, reload })
}

/// Auto-reload value for `period` ticks.
pub fn compute_reload(period: PwmCount, width: CounterWidth) -> PwmResult<u32> {
    if period == 0 {
        return Err(ConfigError::ZeroPeriod.into());
    }
    if period > width.max_period() {
        return Err(ConfigError::PeriodOutOfRange.into());
    }
    Ok(period - 1)
}

/// Prescaler register value dividing `input_clock` down to `frequency`.
pub fn compute_prescaler(input_clock: Hertz, frequency: Hertz, tolerance_ppm: u32) -> PwmResult<u16> {
    let clock = input_clock.raw() as u128;
    let freq = frequency.raw() as u128;
    let tol = tolerance_ppm as u128;

    if freq == 0 {
        return Err(ConfigError::ZeroFrequency.into());
    }
    if freq > clock {
        return Err(ConfigError::FrequencyAboveClock.into());
    }
    // Smallest d with clock / d <= freq * (1 + tol), i.e.
    // d >= clock * 1e6 / (freq * (1e6 + tol)).
    let den = freq * (PPM + tol);
    let divisor = ((clock * PPM + den - 1) / den).max(1);
    if divisor > MAX_DIVISOR as u128 {
        return Err(ConfigError::PrescalerOverflow.into());
    }

    // The rate must not drop below freq * (1 - tol) either.
    let low_ok = tol >= PPM || clock * PPM >= divisor * freq * (PPM - tol);
    if !low_ok {
        return Err(ConfigError::InexactDivision.into());
    }
    Ok((divisor - 1) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwm_core::PwmError;

    fn cfg_err(err: ConfigError) -> PwmError {
        PwmError::Configuration(err)
    }

    #[test]
    fn test_exact_division() {
        let tb = compute_timebase(Hertz::mhz(72), Hertz::mhz(1), 1000, CounterWidth::Bits16).unwrap();
        assert_eq!(tb, Timebase { prescaler: 71, reload: 999 });
        assert_eq!(tb.tick_rate(Hertz::mhz(72)), Hertz::mhz(1));

        let tb = compute_timebase(Hertz::mhz(1), Hertz::mhz(1), 1, CounterWidth::Bits16).unwrap();
        assert_eq!(tb, Timebase { prescaler: 0, reload: 0 });
    }

    #[test]
    fn test_inexact_division_rejected() {
        assert_eq!(
            compute_timebase(Hertz::mhz(72), Hertz::hz(7_000_000), 100, CounterWidth::Bits16),
            Err(cfg_err(ConfigError::InexactDivision))
        );
    }

    #[test]
    fn test_tolerance_accepts_close_rate() {
        // 72 MHz / 10 = 7.2 MHz, 2.9% above 7 MHz
        let tb = compute_timebase_with_tolerance(
            Hertz::mhz(72),
            Hertz::hz(7_000_000),
            100,
            CounterWidth::Bits16,
            50_000,
        )
        .unwrap();
        assert_eq!(tb.prescaler, 9);

        assert!(compute_timebase_with_tolerance(
            Hertz::mhz(72),
            Hertz::hz(7_000_000),
            100,
            CounterWidth::Bits16,
            10_000,
        )
        .is_err());
    }

    #[test]
    fn test_tolerance_prefers_exact_divisor() {
        let tb = compute_timebase_with_tolerance(Hertz::mhz(72), Hertz::mhz(1), 10, CounterWidth::Bits16, 1_000)
            .unwrap();
        assert_eq!(tb.prescaler, 71);
    }

    #[test]
    fn test_frequency_limits() {
        assert_eq!(
            compute_timebase(Hertz::mhz(72), Hertz(0), 10, CounterWidth::Bits16),
            Err(cfg_err(ConfigError::ZeroFrequency))
        );
        assert_eq!(
            compute_timebase(Hertz::mhz(8), Hertz::mhz(9), 10, CounterWidth::Bits16),
            Err(cfg_err(ConfigError::FrequencyAboveClock))
        );
        // 72 MHz / 1 kHz = 72000 > 65536
        assert_eq!(
            compute_timebase(Hertz::mhz(72), Hertz::khz(1), 10, CounterWidth::Bits16),
            Err(cfg_err(ConfigError::PrescalerOverflow))
        );
        // 65.536 MHz / 1 kHz = 65536 fits exactly
        let tb = compute_timebase(Hertz(65_536_000), Hertz::khz(1), 10, CounterWidth::Bits16).unwrap();
        assert_eq!(tb.prescaler, 0xFFFF);
    }

    #[test]
    fn test_period_limits() {
        assert_eq!(compute_reload(0, CounterWidth::Bits16), Err(cfg_err(ConfigError::ZeroPeriod)));
        assert_eq!(compute_reload(65_536, CounterWidth::Bits16), Ok(0xFFFF));
        assert_eq!(
            compute_reload(65_537, CounterWidth::Bits16),
            Err(cfg_err(ConfigError::PeriodOutOfRange))
        );
        assert_eq!(compute_reload(65_537, CounterWidth::Bits32), Ok(65_536));
        assert_eq!(compute_reload(u32::MAX, CounterWidth::Bits32), Ok(u32::MAX - 1));
    }
}
