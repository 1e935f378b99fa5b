//! Notification port for facility state changes.
//!
//! Observers run synchronously on the mutating task while the facility lock is
//! held. They must not call back into any `Facility` method: doing so deadlocks.
//! Everything an observer needs is on the `FacilityView` it receives.

use crate::event_log::EventLog;
use crate::permit::Slot;
use crate::status::{FacilitySnapshot, Occupancy};

/// Borrowed view of the facility, valid for the duration of one notification.
#[derive(Debug, Clone, Copy)]
pub struct FacilityView<'a> {
    pub(crate) slots: &'a [Slot],
    pub(crate) parked: usize,
    pub(crate) total_vehicles: usize,
    pub(crate) log: &'a EventLog,
}

impl<'a> FacilityView<'a> {
    pub fn slots(&self) -> &'a [Slot] {
        self.slots
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn parked(&self) -> usize {
        self.parked
    }

    pub fn available(&self) -> usize {
        self.capacity().saturating_sub(self.parked)
    }

    pub fn total_vehicles(&self) -> usize {
        self.total_vehicles
    }

    pub fn occupancy(&self) -> Occupancy {
        Occupancy::from_counts(self.parked, self.capacity())
    }

    /// Log messages, oldest first.
    pub fn messages(self) -> impl Iterator<Item = &'a str> {
        self.log.iter()
    }

    pub fn last_message(&self) -> Option<&'a str> {
        self.log.last()
    }

    pub fn snapshot(&self) -> FacilitySnapshot {
        FacilitySnapshot {
            capacity: self.capacity(),
            total_vehicles: self.total_vehicles,
            parked: self.parked,
            available: self.available(),
            occupancy: self.occupancy(),
            slots: self.slots.to_vec(),
            messages: self.log.to_vec(),
        }
    }
}

/// Listener invoked after every committed facility mutation.
pub trait Observer: Send + Sync {
    fn on_change(&self, view: &FacilityView<'_>);
}

/// Adapts a zero-argument callback into an `Observer`.
pub(crate) struct CallbackObserver<F> {
    callback: F,
}

impl<F> CallbackObserver<F>
where
    F: Fn() + Send + Sync,
{
    pub(crate) fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> Observer for CallbackObserver<F>
where
    F: Fn() + Send + Sync,
{
    fn on_change(&self, _view: &FacilityView<'_>) {
        (self.callback)();
    }
}
