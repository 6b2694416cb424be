//! Driver lifecycle tests for pwm-driver

use pwm_driver::mock::{FakeClock, FakeTimer};
use pwm_driver::{
    ChannelConfig, ClockControl, ConfigError, DriverConfig, DriverId, DriverState, Hertz, PwmChannel, PwmDriver, PwmError,
    TimerCaps, TimerRegisters, CHANNELS,
};
use pwm_regmap::Register;

type TestDriver<'a> = PwmDriver<'a, FakeTimer, FakeClock>;

fn new_driver<'a>() -> TestDriver<'a> {
    let mut pwm = PwmDriver::new(
        DriverId(2),
        TimerCaps::GENERAL_PURPOSE,
        FakeTimer::new(),
        FakeClock::new(Hertz::mhz(72)),
    );
    pwm.init().unwrap();
    pwm
}

fn all_channels() -> DriverConfig {
    DriverConfig::new(Hertz::mhz(1), 1000)
        .channel(0, ChannelConfig::active_high())
        .channel(1, ChannelConfig::active_low())
        .channel(2, ChannelConfig::active_high())
        .channel(3, ChannelConfig::active_low())
}

#[test]
fn test_start_then_stop_returns_to_stopped() {
    let config = all_channels();
    for enabled in 0..=CHANNELS as PwmChannel {
        let mut pwm = new_driver();
        pwm.start(&config).unwrap();
        for ch in 0..enabled {
            pwm.enable_channel(ch, 100 * (ch as u32 + 1)).unwrap();
        }
        assert_eq!(pwm.enabled_channels().count(), enabled as u32);

        pwm.stop().unwrap();
        assert_eq!(pwm.state(), DriverState::Stopped);
        assert!(pwm.enabled_channels().is_empty());
        assert!(pwm.config().is_none());
        assert!(!pwm.clock().is_enabled());
        assert_eq!(pwm.registers().read(Register::Cr1), 0);
        assert_eq!(pwm.registers().read(Register::Dier), 0);
    }
}

#[test]
fn test_stop_is_idempotent() {
    let config = all_channels();
    let mut pwm = new_driver();
    pwm.start(&config).unwrap();
    pwm.enable_channel(1, 300).unwrap();

    pwm.stop().unwrap();
    let regs = pwm.registers().clone();
    let clock = pwm.clock().clone();

    pwm.stop().unwrap();
    assert_eq!(pwm.registers(), &regs);
    assert_eq!(pwm.clock(), &clock);
    assert_eq!(pwm.state(), DriverState::Stopped);
}

#[test]
fn test_channel_ops_require_running_driver() {
    let mut pwm = new_driver();
    let stopped = PwmError::InvalidStateTransition(DriverState::Stopped);
    assert_eq!(pwm.enable_channel(0, 10), Err(stopped));
    assert_eq!(pwm.disable_channel(0), Err(stopped));
    assert_eq!(pwm.change_period(10), Err(stopped));
}

#[test]
fn test_enable_sets_active() {
    let config = all_channels();
    let mut pwm = new_driver();
    pwm.start(&config).unwrap();
    assert_eq!(pwm.state(), DriverState::Ready);

    pwm.enable_channel(3, 10).unwrap();
    assert_eq!(pwm.state(), DriverState::Active);
    assert!(pwm.is_channel_enabled(3));

    // Disabling the last channel keeps the counter running
    pwm.disable_channel(3).unwrap();
    assert_eq!(pwm.state(), DriverState::Active);
    assert!(pwm.enabled_channels().is_empty());
}

#[test]
fn test_invalid_channel_leaves_mask_unchanged() {
    let config = all_channels();
    let mut pwm = new_driver();
    pwm.start(&config).unwrap();
    pwm.enable_channel(1, 10).unwrap();
    let mask = pwm.enabled_channels();

    let bad = CHANNELS as PwmChannel;
    assert_eq!(pwm.enable_channel(bad, 10), Err(PwmError::InvalidChannel(bad)));
    assert_eq!(pwm.disable_channel(bad), Err(PwmError::InvalidChannel(bad)));
    assert_eq!(pwm.enable_channel(u8::MAX, 10), Err(PwmError::InvalidChannel(u8::MAX)));
    assert_eq!(pwm.enabled_channels(), mask);
}

#[test]
fn test_restart_reconfigures() {
    let first = all_channels();
    let second = DriverConfig::new(Hertz::khz(500), 50).channel(0, ChannelConfig::active_low());
    let mut pwm = new_driver();
    pwm.start(&first).unwrap();
    pwm.enable_channel(0, 10).unwrap();
    pwm.enable_channel(2, 10).unwrap();

    pwm.start(&second).unwrap();
    assert_eq!(pwm.state(), DriverState::Ready);
    assert!(pwm.enabled_channels().is_empty());
    assert_eq!(pwm.period(), 50);
    assert_eq!(pwm.registers().read(Register::Psc), 143);
    assert_eq!(pwm.registers().read(Register::Ccr3), 0);
    // The gate was opened once for both starts
    assert_eq!(pwm.clock().enables(), 1);
}

#[test]
fn test_failed_start_from_stopped() {
    let config = DriverConfig::new(Hertz::hz(7_000_000), 100);
    let relaxed = config.tolerance_ppm(50_000);
    let mut pwm = new_driver();
    assert_eq!(
        pwm.start(&config),
        Err(PwmError::Configuration(ConfigError::InexactDivision))
    );
    assert_eq!(pwm.state(), DriverState::Stopped);
    assert!(!pwm.clock().is_enabled());
    assert_eq!(pwm.registers(), &FakeTimer::new());

    // Same rate within 5% is accepted
    pwm.start(&relaxed).unwrap();
    assert_eq!(pwm.registers().read(Register::Psc), 9);
}

#[test]
fn test_change_period_bounds() {
    let config = all_channels();
    let mut pwm = new_driver();
    pwm.start(&config).unwrap();
    assert_eq!(
        pwm.change_period(0),
        Err(PwmError::Configuration(ConfigError::ZeroPeriod))
    );
    assert_eq!(
        pwm.change_period(65_537),
        Err(PwmError::Configuration(ConfigError::PeriodOutOfRange))
    );
    assert_eq!(pwm.period(), 1000);
    pwm.change_period(65_536).unwrap();
    assert_eq!(pwm.registers().read(Register::Arr), 0xFFFF);
}
