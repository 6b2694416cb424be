//! Timer interrupt lines and the interrupt controller seam

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::NVIC;
use pwm_core::{IrqPriority, PwmResult};

/// Timer interrupt lines, valued by vector number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Irq {
    /// TIM1 break
    Tim1Brk = 24,
    /// TIM1 update
    Tim1Up = 25,
    /// TIM1 trigger and commutation
    Tim1TrgCom = 26,
    /// TIM1 capture/compare
    Tim1Cc = 27,
    Tim2 = 28,
    Tim3 = 29,
    Tim4 = 30,
    Tim5 = 50,
}

impl Irq {
    /// Every timer interrupt line
    pub const ALL: [Irq; 8] = [
        Irq::Tim1Brk,
        Irq::Tim1Up,
        Irq::Tim1TrgCom,
        Irq::Tim1Cc,
        Irq::Tim2,
        Irq::Tim3,
        Irq::Tim4,
        Irq::Tim5,
    ];

    /// Vector number
    pub const fn number(self) -> u16 {
        self as u16
    }

    /// Position in [`Irq::ALL`]
    pub const fn index(self) -> usize {
        match self {
            Irq::Tim1Brk => 0,
            Irq::Tim1Up => 1,
            Irq::Tim1TrgCom => 2,
            Irq::Tim1Cc => 3,
            Irq::Tim2 => 4,
            Irq::Tim3 => 5,
            Irq::Tim4 => 6,
            Irq::Tim5 => 7,
        }
    }
}

// SAFETY: every variant is a valid STM32F1 vector number.
#[allow(unsafe_code)]
unsafe impl InterruptNumber for Irq {
    fn number(self) -> u16 {
        self as u16
    }
}

/// Interrupt controller used by the registry to route timer interrupts.
pub trait InterruptController {
    /// Unmask an interrupt line
    fn enable(&mut self, irq: Irq) -> PwmResult<()>;

    /// Mask an interrupt line
    fn disable(&mut self, irq: Irq) -> PwmResult<()>;

    /// Set the priority of an interrupt line
    fn set_priority(&mut self, irq: Irq, priority: IrqPriority) -> PwmResult<()>;

    /// Check if interrupt is pending
    fn is_pending(&self, irq: Irq) -> bool;

    /// Clear pending interrupt
    fn clear_pending(&mut self, irq: Irq) -> PwmResult<()>;
}

/// Cortex-M NVIC.
pub struct Nvic {
    nvic: NVIC,
}

impl Nvic {
    /// Take over the core NVIC peripheral
    pub fn new(nvic: NVIC) -> Self {
        Self { nvic }
    }

    /// Give the peripheral back
    pub fn free(self) -> NVIC {
        self.nvic
    }
}

impl InterruptController for Nvic {
    #[allow(unsafe_code)]
    fn enable(&mut self, irq: Irq) -> PwmResult<()> {
        // SAFETY: the timer handlers only take the registry's critical
        // section, unmasking cannot break a mask-based critical section.
        unsafe { NVIC::unmask(irq) };
        Ok(())
    }

    fn disable(&mut self, irq: Irq) -> PwmResult<()> {
        NVIC::mask(irq);
        Ok(())
    }

    #[allow(unsafe_code)]
    fn set_priority(&mut self, irq: Irq, priority: IrqPriority) -> PwmResult<()> {
        let priority = IrqPriority::new(priority.raw())?;
        // SAFETY: priorities are only changed during registry setup.
        unsafe { self.nvic.set_priority(irq, priority.hw_value()) };
        Ok(())
    }

    fn is_pending(&self, irq: Irq) -> bool {
        NVIC::is_pending(irq)
    }

    fn clear_pending(&mut self, irq: Irq) -> PwmResult<()> {
        NVIC::unpend(irq);
        Ok(())
    }
}
