//! TIMx register block layout

use pwm_core::{PwmChannel, CHANNELS};

/// Registers of a TIMx block used by the PWM driver, valued by byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    Cr1 = 0x00,
    Cr2 = 0x04,
    Dier = 0x0C,
    Sr = 0x10,
    Egr = 0x14,
    Ccmr1 = 0x18,
    Ccmr2 = 0x1C,
    Ccer = 0x20,
    Cnt = 0x24,
    Psc = 0x28,
    Arr = 0x2C,
    Ccr1 = 0x34,
    Ccr2 = 0x38,
    Ccr3 = 0x3C,
    Ccr4 = 0x40,
    /// Break and dead-time register, advanced units only
    Bdtr = 0x44,
}

impl Register {
    /// Every modelled register, in address order
    pub const ALL: [Register; 16] = [
        Register::Cr1,
        Register::Cr2,
        Register::Dier,
        Register::Sr,
        Register::Egr,
        Register::Ccmr1,
        Register::Ccmr2,
        Register::Ccer,
        Register::Cnt,
        Register::Psc,
        Register::Arr,
        Register::Ccr1,
        Register::Ccr2,
        Register::Ccr3,
        Register::Ccr4,
        Register::Bdtr,
    ];

    /// Byte offset from the block base address
    pub const fn offset(self) -> usize {
        self as usize
    }

    /// Position of this register in [`Register::ALL`]
    pub const fn index(self) -> usize {
        match self {
            Register::Cr1 => 0,
            Register::Cr2 => 1,
            Register::Dier => 2,
            Register::Sr => 3,
            Register::Egr => 4,
            Register::Ccmr1 => 5,
            Register::Ccmr2 => 6,
            Register::Ccer => 7,
            Register::Cnt => 8,
            Register::Psc => 9,
            Register::Arr => 10,
            Register::Ccr1 => 11,
            Register::Ccr2 => 12,
            Register::Ccr3 => 13,
            Register::Ccr4 => 14,
            Register::Bdtr => 15,
        }
    }

    /// Capture/compare register of `channel`
    pub const fn ccr(channel: PwmChannel) -> Option<Register> {
        match channel {
            0 => Some(Register::Ccr1),
            1 => Some(Register::Ccr2),
            2 => Some(Register::Ccr3),
            3 => Some(Register::Ccr4),
            _ => None,
        }
    }

    /// Registers whose writes can be buffered until the next update event
    pub const fn is_preloaded(self) -> bool {
        matches!(
            self,
            Register::Arr | Register::Ccr1 | Register::Ccr2 | Register::Ccr3 | Register::Ccr4
        )
    }
}

/// Control register 1
pub mod cr1 {
    /// Counter enable
    pub const CEN: u32 = 1 << 0;
    /// Only counter overflow raises the update interrupt
    pub const URS: u32 = 1 << 2;
    /// Auto-reload preload enable
    pub const ARPE: u32 = 1 << 7;
}

/// DMA/interrupt enable register
pub mod dier {
    use pwm_core::PwmChannel;

    /// Update interrupt enable
    pub const UIE: u32 = 1 << 0;
    /// Break interrupt enable
    pub const BIE: u32 = 1 << 7;

    /// Capture/compare interrupt enable of `channel`
    pub const fn ccie(channel: PwmChannel) -> u32 {
        2 << channel
    }
}

/// Status register, flags are cleared by writing 0
pub mod sr {
    use pwm_core::PwmChannel;

    /// Update (counter reset) flag
    pub const UIF: u32 = 1 << 0;
    /// Break flag
    pub const BIF: u32 = 1 << 7;

    /// Capture/compare flag of `channel`
    pub const fn ccif(channel: PwmChannel) -> u32 {
        2 << channel
    }

    /// Overcapture flag of `channel`
    pub const fn ccof(channel: PwmChannel) -> u32 {
        1 << (9 + channel)
    }
}

/// Event generation register
pub mod egr {
    /// Update generation, reinitializes the counter and loads shadow registers
    pub const UG: u32 = 1 << 0;
}

/// Capture/compare enable register
pub mod ccer {
    use pwm_core::PwmChannel;

    /// Output enable, channel 0 position
    pub const CCE: u32 = 1 << 0;
    /// Output polarity active low, channel 0 position
    pub const CCP: u32 = 1 << 1;

    /// Shift of the 4-bit field of `channel`
    pub const fn shift(channel: PwmChannel) -> u32 {
        4 * channel as u32
    }

    /// Every bit owned by `channel`
    pub const fn field(channel: PwmChannel) -> u32 {
        0xF << shift(channel)
    }
}

/// Break and dead-time register
pub mod bdtr {
    /// Main output enable
    pub const MOE: u32 = 1 << 15;
}

/// Capture/compare mode registers
pub mod ccmr {
    /// Output compare preload enable, low channel position
    pub const OCPE: u32 = 1 << 3;
    /// PWM mode 1: active while the counter is below the compare value
    pub const OCM_PWM1: u32 = 0b110 << 4;
}

/// One channel's slice of a capture/compare mode register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcmrField {
    pub register: Register,
    /// Bits to set
    pub bits: u32,
}

/// PWM mode 1 with compare preload for `channel`.
pub const fn ccmr_pwm_mode(channel: PwmChannel) -> Option<CcmrField> {
    if channel as usize >= CHANNELS {
        return None;
    }
    let register = if channel < 2 { Register::Ccmr1 } else { Register::Ccmr2 };
    let shift = (channel as u32 % 2) * 8;
    Some(CcmrField {
        register,
        bits: (ccmr::OCM_PWM1 | ccmr::OCPE) << shift,
    })
}
