//! Driver lifecycle states

use core::fmt;

/// Driver state machine.
///
/// ```text
/// Uninitialized --init--> Stopped --start--> Ready --enable_channel--> Active
///                            ^                 |  ^                      |
///                            +------stop-------+  +-------start----------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverState {
    /// Not yet initialized
    #[default]
    Uninitialized,
    /// Initialized, peripheral clock gated off
    Stopped,
    /// Counter running, no channel enabled since the last start
    Ready,
    /// Counter running, at least one channel enabled since the last start
    Active,
}

impl DriverState {
    /// Whether the counter is running and channel operations are allowed
    pub const fn is_running(self) -> bool {
        matches!(self, DriverState::Ready | DriverState::Active)
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverState::Uninitialized => "Uninitialized",
            DriverState::Stopped => "Stopped",
            DriverState::Ready => "Ready",
            DriverState::Active => "Active",
        };
        f.write_str(name)
    }
}
