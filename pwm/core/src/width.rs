//! Helpers converting duty ratios to widths in ticks.
//!
//! Widths are absolute tick counts, so they have to be recomputed by the
//! caller after a period change if the duty ratio should be preserved.

use crate::PwmCount;

/// `numerator / denominator` of `period`, rounded down.
///
/// A zero denominator yields zero, a result above `PwmCount::MAX`
/// saturates.
pub const fn fraction_to_width(period: PwmCount, denominator: u32, numerator: u32) -> PwmCount {
    if denominator == 0 {
        return 0;
    }
    let width = (period as u64 * numerator as u64) / denominator as u64;
    if width > PwmCount::MAX as u64 {
        PwmCount::MAX
    } else {
        width as PwmCount
    }
}

/// Width for an angle in hundredths of a degree, `0..=36000`
pub const fn degrees_to_width(period: PwmCount, centidegrees: u32) -> PwmCount {
    fraction_to_width(period, 36_000, centidegrees)
}

/// Width for a percentage in hundredths of a percent, `0..=10000`
pub const fn percentage_to_width(period: PwmCount, centipercent: u32) -> PwmCount {
    fraction_to_width(period, 10_000, centipercent)
}
