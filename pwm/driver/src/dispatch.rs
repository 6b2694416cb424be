//! Callback notifications produced by the interrupt service routine
//!
//! Servicing the hardware flags and running user callbacks are separate
//! steps: the registry collects notifications while it holds the driver
//! and delivers them after releasing it, so a callback may go back to the
//! registry, for instance to update a channel width.

use heapless::Vec;
use pwm_core::{CompareCallback, DriverId, PeriodCallback, PeriodEvent, PwmChannel, CHANNELS};

/// Upper bound of notifications from a single interrupt: a compare event
/// and an overcapture fault per channel, a counter reset and a break fault.
pub const MAX_NOTIFICATIONS: usize = 2 * CHANNELS + 2;

/// A callback invocation waiting to be delivered.
#[derive(Debug, Clone, Copy)]
pub enum Notification {
    /// Channel compare event
    Compare(CompareCallback, PwmChannel),
    /// Counter reset or hardware fault
    Period(PeriodCallback, PeriodEvent),
}

impl Notification {
    /// Invoke the callback on behalf of driver `id`
    pub fn deliver(self, id: DriverId) {
        match self {
            Notification::Compare(callback, channel) => callback(id, channel),
            Notification::Period(callback, event) => callback(id, event),
        }
    }
}

/// Notifications of one interrupt, in hardware flag order.
#[derive(Debug, Clone)]
pub struct Notifications {
    id: DriverId,
    pending: Vec<Notification, MAX_NOTIFICATIONS>,
}

impl Notifications {
    pub const fn new(id: DriverId) -> Self {
        Self { id, pending: Vec::new() }
    }

    /// Driver the notifications belong to
    pub const fn id(&self) -> DriverId {
        self.id
    }

    pub(crate) fn push(&mut self, notification: Notification) {
        // Bounded by MAX_NOTIFICATIONS, cannot overflow
        let _ = self.pending.push(notification);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.pending.iter()
    }

    /// Run every callback, in order
    pub fn deliver(self) {
        let id = self.id;
        for notification in self.pending {
            notification.deliver(id);
        }
    }
}
