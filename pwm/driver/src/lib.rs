#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

//! # PWM Driver
//!
//! Driver core for STM32-style timer blocks used as multi-channel PWM
//! generators.
//!
//! - [`PwmDriver`]: lifecycle state machine, channel operations and the
//!   interrupt service routine for one timer unit
//! - [`registry`]: one statically allocated driver per compiled-in unit and
//!   the interrupt entry points
//! - [`TimerRegisters`] / [`ClockControl`] / [`InterruptController`]: the
//!   hardware seams, with MMIO backends and, behind the `mock` feature,
//!   software models for host tests
//!
//! ## Example
//!
//! ```ignore
//! use pwm_driver::{registry::{self, TimerUnit}, ChannelConfig, DriverConfig, Hertz};
//!
//! static CONFIG: DriverConfig = DriverConfig::new(Hertz::mhz(1), 1000)
//!     .channel(0, ChannelConfig::active_high());
//!
//! registry::with_driver(TimerUnit::Tim2, |pwm| {
//!     pwm.start(&CONFIG)?;
//!     pwm.enable_channel(0, 500)
//! })?;
//! ```

#[macro_use]
mod fmt;

pub mod dispatch;
pub mod driver;
pub mod hw;
pub mod irq;
pub mod mmio;
pub mod registry;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use dispatch::{Notification, Notifications};
pub use driver::PwmDriver;
pub use hw::{ClockControl, TimerCaps, TimerRegisters};
pub use irq::{InterruptController, Irq, Nvic};

pub use pwm_core::*;
pub use pwm_regmap::CounterWidth;
