//! Driver registry: one statically allocated driver per compiled-in timer
//!
//! Units are selected with the `tim1`..`tim5` features. Each unit gets a
//! [`DriverSlot`] static (`PWMD1`..`PWMD5`) guarding its [`PwmDriver`] with
//! a critical-section mutex, and interrupt handlers forward their line to
//! [`on_interrupt`].

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use pwm_core::{DriverId, DriverState, Hertz, IrqPriority, PwmResult};

use crate::driver::PwmDriver;
use crate::hw::{ClockControl, TimerCaps, TimerRegisters};
use crate::irq::{InterruptController, Irq};
use crate::mmio::{MmioTimer, RccClock};

#[cfg(not(any(
    feature = "tim1",
    feature = "tim2",
    feature = "tim3",
    feature = "tim4",
    feature = "tim5"
)))]
compile_error!("pwm-driver enabled without a timer unit, select at least one of the tim1..tim5 features");

/// Build-time configuration of the registry
pub mod config {
    use pwm_core::{Hertz, IrqPriority};

    pub const TIM1_IRQ_PRIORITY: IrqPriority = IrqPriority::new_unchecked(7);
    pub const TIM2_IRQ_PRIORITY: IrqPriority = IrqPriority::new_unchecked(7);
    pub const TIM3_IRQ_PRIORITY: IrqPriority = IrqPriority::new_unchecked(7);
    pub const TIM4_IRQ_PRIORITY: IrqPriority = IrqPriority::new_unchecked(7);
    pub const TIM5_IRQ_PRIORITY: IrqPriority = IrqPriority::new_unchecked(7);

    const _: () = assert!(TIM1_IRQ_PRIORITY.is_valid(), "TIM1_IRQ_PRIORITY out of range");
    const _: () = assert!(TIM2_IRQ_PRIORITY.is_valid(), "TIM2_IRQ_PRIORITY out of range");
    const _: () = assert!(TIM3_IRQ_PRIORITY.is_valid(), "TIM3_IRQ_PRIORITY out of range");
    const _: () = assert!(TIM4_IRQ_PRIORITY.is_valid(), "TIM4_IRQ_PRIORITY out of range");
    const _: () = assert!(TIM5_IRQ_PRIORITY.is_valid(), "TIM5_IRQ_PRIORITY out of range");

    /// Timer input clock of units on APB1, twice the bus clock
    pub const APB1_TIMER_CLOCK: Hertz = Hertz::mhz(72);
    /// Timer input clock of units on APB2
    pub const APB2_TIMER_CLOCK: Hertz = Hertz::mhz(72);

    pub const RCC_APB2ENR: usize = 0x4002_1018;
    pub const RCC_APB1ENR: usize = 0x4002_101C;
}

/// Peripheral bus a unit is clocked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockDomain {
    Apb1,
    Apb2,
}

impl ClockDomain {
    /// Timer input clock on this bus
    pub const fn timer_clock(self) -> Hertz {
        match self {
            ClockDomain::Apb1 => config::APB1_TIMER_CLOCK,
            ClockDomain::Apb2 => config::APB2_TIMER_CLOCK,
        }
    }

    /// Address of the RCC enable register for this bus
    pub const fn enable_register(self) -> usize {
        match self {
            ClockDomain::Apb1 => config::RCC_APB1ENR,
            ClockDomain::Apb2 => config::RCC_APB2ENR,
        }
    }
}

/// Static description of a timer unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitInfo {
    pub name: &'static str,
    /// Register block address
    pub base: usize,
    pub caps: TimerCaps,
    pub clock_domain: ClockDomain,
    /// Bit in the bus's RCC enable register
    pub rcc_bit: u8,
    pub irq_priority: IrqPriority,
    /// Interrupt lines of the unit
    pub irqs: &'static [Irq],
}

/// Timer units compiled into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerUnit {
    #[cfg(feature = "tim1")]
    Tim1,
    #[cfg(feature = "tim2")]
    Tim2,
    #[cfg(feature = "tim3")]
    Tim3,
    #[cfg(feature = "tim4")]
    Tim4,
    #[cfg(feature = "tim5")]
    Tim5,
}

impl TimerUnit {
    /// Every compiled-in unit
    pub const ALL: &'static [TimerUnit] = &[
        #[cfg(feature = "tim1")]
        TimerUnit::Tim1,
        #[cfg(feature = "tim2")]
        TimerUnit::Tim2,
        #[cfg(feature = "tim3")]
        TimerUnit::Tim3,
        #[cfg(feature = "tim4")]
        TimerUnit::Tim4,
        #[cfg(feature = "tim5")]
        TimerUnit::Tim5,
    ];

    /// Driver identity, the timer number
    pub const fn id(self) -> DriverId {
        match self {
            #[cfg(feature = "tim1")]
            TimerUnit::Tim1 => DriverId(1),
            #[cfg(feature = "tim2")]
            TimerUnit::Tim2 => DriverId(2),
            #[cfg(feature = "tim3")]
            TimerUnit::Tim3 => DriverId(3),
            #[cfg(feature = "tim4")]
            TimerUnit::Tim4 => DriverId(4),
            #[cfg(feature = "tim5")]
            TimerUnit::Tim5 => DriverId(5),
        }
    }

    pub fn from_id(id: DriverId) -> Option<TimerUnit> {
        TimerUnit::ALL.iter().copied().find(|unit| unit.id() == id)
    }

    pub const fn info(self) -> UnitInfo {
        match self {
            #[cfg(feature = "tim1")]
            TimerUnit::Tim1 => UnitInfo {
                name: "TIM1",
                base: 0x4001_2C00,
                caps: TimerCaps::ADVANCED,
                clock_domain: ClockDomain::Apb2,
                rcc_bit: 11,
                irq_priority: config::TIM1_IRQ_PRIORITY,
                irqs: &[Irq::Tim1Brk, Irq::Tim1Up, Irq::Tim1TrgCom, Irq::Tim1Cc],
            },
            #[cfg(feature = "tim2")]
            TimerUnit::Tim2 => UnitInfo {
                name: "TIM2",
                base: 0x4000_0000,
                caps: TimerCaps::GENERAL_PURPOSE,
                clock_domain: ClockDomain::Apb1,
                rcc_bit: 0,
                irq_priority: config::TIM2_IRQ_PRIORITY,
                irqs: &[Irq::Tim2],
            },
            #[cfg(feature = "tim3")]
            TimerUnit::Tim3 => UnitInfo {
                name: "TIM3",
                base: 0x4000_0400,
                caps: TimerCaps::GENERAL_PURPOSE,
                clock_domain: ClockDomain::Apb1,
                rcc_bit: 1,
                irq_priority: config::TIM3_IRQ_PRIORITY,
                irqs: &[Irq::Tim3],
            },
            #[cfg(feature = "tim4")]
            TimerUnit::Tim4 => UnitInfo {
                name: "TIM4",
                base: 0x4000_0800,
                caps: TimerCaps::GENERAL_PURPOSE,
                clock_domain: ClockDomain::Apb1,
                rcc_bit: 2,
                irq_priority: config::TIM4_IRQ_PRIORITY,
                irqs: &[Irq::Tim4],
            },
            #[cfg(feature = "tim5")]
            TimerUnit::Tim5 => UnitInfo {
                name: "TIM5",
                base: 0x4000_0C00,
                caps: TimerCaps::GENERAL_PURPOSE,
                clock_domain: ClockDomain::Apb1,
                rcc_bit: 3,
                irq_priority: config::TIM5_IRQ_PRIORITY,
                irqs: &[Irq::Tim5],
            },
        }
    }
}

impl Irq {
    /// Unit owning this line, `None` if that unit is not compiled in
    pub const fn unit(self) -> Option<TimerUnit> {
        match self {
            #[cfg(feature = "tim1")]
            Irq::Tim1Brk | Irq::Tim1Up | Irq::Tim1TrgCom | Irq::Tim1Cc => Some(TimerUnit::Tim1),
            #[cfg(feature = "tim2")]
            Irq::Tim2 => Some(TimerUnit::Tim2),
            #[cfg(feature = "tim3")]
            Irq::Tim3 => Some(TimerUnit::Tim3),
            #[cfg(feature = "tim4")]
            Irq::Tim4 => Some(TimerUnit::Tim4),
            #[cfg(feature = "tim5")]
            Irq::Tim5 => Some(TimerUnit::Tim5),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }
}

/// A driver shared between foreground code and its interrupt handler.
pub struct DriverSlot<T, C> {
    driver: Mutex<RefCell<PwmDriver<'static, T, C>>>,
}

impl<T, C> DriverSlot<T, C>
where
    T: TimerRegisters,
    C: ClockControl,
{
    pub const fn new(driver: PwmDriver<'static, T, C>) -> Self {
        Self {
            driver: Mutex::new(RefCell::new(driver)),
        }
    }

    /// Run `f` with exclusive access to the driver
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut PwmDriver<'static, T, C>) -> R,
    {
        critical_section::with(|cs| {
            let mut driver = self.driver.borrow_ref_mut(cs);
            f(&mut driver)
        })
    }

    pub fn init(&self) -> PwmResult<()> {
        self.with(|driver| driver.init())
    }

    /// Serve the unit's interrupt.
    ///
    /// Callbacks run after the driver is released and may use the slot.
    pub fn on_interrupt(&self) {
        let notifications = self.with(|driver| driver.serve_interrupt());
        notifications.deliver();
    }
}

type HwSlot = DriverSlot<MmioTimer, RccClock>;

macro_rules! hw_driver {
    ($unit:expr) => {{
        let info = $unit.info();
        #[allow(unsafe_code)]
        // SAFETY: each unit's block and enable bit are handed out once, here.
        let (regs, clock) = unsafe {
            (
                MmioTimer::new(info.base),
                RccClock::new(
                    info.clock_domain.enable_register(),
                    info.rcc_bit,
                    info.clock_domain.timer_clock(),
                ),
            )
        };
        DriverSlot::new(PwmDriver::new($unit.id(), info.caps, regs, clock))
    }};
}

/// PWM driver on TIM1
#[cfg(feature = "tim1")]
pub static PWMD1: HwSlot = hw_driver!(TimerUnit::Tim1);
/// PWM driver on TIM2
#[cfg(feature = "tim2")]
pub static PWMD2: HwSlot = hw_driver!(TimerUnit::Tim2);
/// PWM driver on TIM3
#[cfg(feature = "tim3")]
pub static PWMD3: HwSlot = hw_driver!(TimerUnit::Tim3);
/// PWM driver on TIM4
#[cfg(feature = "tim4")]
pub static PWMD4: HwSlot = hw_driver!(TimerUnit::Tim4);
/// PWM driver on TIM5
#[cfg(feature = "tim5")]
pub static PWMD5: HwSlot = hw_driver!(TimerUnit::Tim5);

/// Driver slot of `unit`
pub fn driver(unit: TimerUnit) -> &'static DriverSlot<MmioTimer, RccClock> {
    match unit {
        #[cfg(feature = "tim1")]
        TimerUnit::Tim1 => &PWMD1,
        #[cfg(feature = "tim2")]
        TimerUnit::Tim2 => &PWMD2,
        #[cfg(feature = "tim3")]
        TimerUnit::Tim3 => &PWMD3,
        #[cfg(feature = "tim4")]
        TimerUnit::Tim4 => &PWMD4,
        #[cfg(feature = "tim5")]
        TimerUnit::Tim5 => &PWMD5,
    }
}

/// Get access to the driver of `unit`
pub fn with_driver<F, R>(unit: TimerUnit, f: F) -> R
where
    F: FnOnce(&mut PwmDriver<'static, MmioTimer, RccClock>) -> R,
{
    driver(unit).with(f)
}

static INITIALIZED: Mutex<Cell<bool>> = Mutex::new(Cell::new(false));

/// Initialize every driver and route its interrupt lines.
///
/// Drivers already initialized through their slot are left as they are.
/// Once a call succeeds, later calls return without touching anything; a
/// failed call can be repeated.
pub fn init<I: InterruptController>(controller: &mut I) -> PwmResult<()> {
    if critical_section::with(|cs| INITIALIZED.borrow(cs).get()) {
        log_debug!("registry already initialized");
        return Ok(());
    }

    for &unit in TimerUnit::ALL {
        let info = unit.info();
        driver(unit).with(|d| match d.state() {
            DriverState::Uninitialized => d.init(),
            _ => Ok(()),
        })?;
        for &irq in info.irqs {
            controller.set_priority(irq, info.irq_priority)?;
            controller.clear_pending(irq)?;
            controller.enable(irq)?;
        }
        log_debug!("{}: registered", unit.id());
    }
    critical_section::with(|cs| INITIALIZED.borrow(cs).set(true));
    Ok(())
}

/// Forward a timer interrupt to the owning driver
pub fn on_interrupt(irq: Irq) {
    match irq.unit() {
        Some(unit) => driver(unit).on_interrupt(),
        None => log_warn!("unexpected interrupt {}", irq.number()),
    }
}
