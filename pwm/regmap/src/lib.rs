#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! # PWM Register Mapping
//!
//! Stateless translation of a PWM configuration into timer register values.
//!
//! - [`regs`]: register offsets and bit fields of the TIMx block
//! - [`timebase`]: prescaler and auto-reload from tick rate and period
//! - [`channel`]: compare value and output polarity of one channel
//!
//! Every function in here is pure and deterministic. Invalid requests are
//! reported as [`pwm_core::ConfigError`], never clamped silently.

pub mod channel;
pub mod regs;
pub mod timebase;

pub use channel::{compute_channel_register, ChannelRegister};
pub use regs::Register;
pub use timebase::{
    compute_reload, compute_timebase, compute_timebase_with_tolerance, CounterWidth, Timebase,
    MAX_DIVISOR,
};
