//! Facility: owns the slots, the admission gate, the event log and the observers.
//!
//! Admission is two-stage:
//! 1. the admission ticket (single holder) serializes the acquire-and-scan sequence
//! 2. the admission pool (capacity tokens) bounds how many vehicles are inside
//!
//! All slot, count, log and observer state sits behind one lock. Each public
//! mutation takes it once, commits, and notifies observers before releasing it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use tokio::sync::{Mutex, MutexGuard as AsyncMutexGuard};

use crate::event_log::EventLog;
use crate::observer::{CallbackObserver, FacilityView, Observer};
use crate::permit::{AdmissionPool, ParkedSlot, Slot};
use crate::status::FacilitySnapshot;
use crate::vehicle::VehicleId;

#[derive(Debug, thiserror::Error)]
pub enum FacilityError {
    #[error("invalid capacity {0}: a facility needs at least one slot")]
    InvalidCapacity(usize),
    /// A token was held but every slot was taken: token and slot accounting disagree.
    #[error("slot accounting violated: vehicle {vehicle} holds a token but no slot is free")]
    SlotAccounting { vehicle: VehicleId },
    #[error("admission pool closed")]
    AdmissionClosed,
}

/// Held while a vehicle runs the acquire-and-scan sequence.
pub type AdmissionTicket<'a> = AsyncMutexGuard<'a, ()>;

struct FacilityState {
    slots: Vec<Slot>,
    parked: usize,
    total_vehicles: usize,
    log: EventLog,
    observers: Vec<Arc<dyn Observer>>,
}

impl FacilityState {
    fn view(&self) -> FacilityView<'_> {
        FacilityView {
            slots: &self.slots,
            parked: self.parked,
            total_vehicles: self.total_vehicles,
            log: &self.log,
        }
    }

    fn notify(&self) {
        let view = self.view();
        for observer in &self.observers {
            observer.on_change(&view);
        }
    }

    fn debug_check(&self) {
        debug_assert_eq!(
            self.parked,
            self.slots.iter().filter(|s| s.is_occupied()).count(),
            "parked count out of sync with slots"
        );
        debug_assert!(self.parked <= self.slots.len(), "parked count above capacity");
    }
}

pub struct Facility {
    state: StdMutex<FacilityState>,
    admission: AdmissionPool,
    ticket: Mutex<()>,
    opened: AtomicBool,
}

impl Facility {
    /// Build a facility with `capacity` free slots numbered `1..=capacity`.
    ///
    /// The admission pool starts empty; `open` fills it.
    pub fn new(capacity: usize) -> Result<Arc<Self>, FacilityError> {
        if capacity == 0 {
            return Err(FacilityError::InvalidCapacity(capacity));
        }

        let slots = (1..=capacity).map(Slot::new).collect();

        Ok(Arc::new(Self {
            state: StdMutex::new(FacilityState {
                slots,
                parked: 0,
                total_vehicles: 0,
                log: EventLog::default(),
                observers: Vec::new(),
            }),
            admission: AdmissionPool::new(capacity),
            ticket: Mutex::new(()),
            opened: AtomicBool::new(false),
        }))
    }

    pub fn capacity(&self) -> usize {
        self.admission.capacity()
    }

    /// Load the admission pool with one token per slot. Only the first call has an effect.
    pub fn open(&self) {
        if self.opened.swap(true, Ordering::AcqRel) {
            return;
        }
        for _ in 0..self.admission.capacity() {
            self.admission.add_token();
        }
        tracing::debug!(tokens = self.admission.available(), "Facility opened");
    }

    pub fn is_open(&self) -> bool {
        self.opened.load(Ordering::Acquire)
    }

    /// Tokens currently in the pool.
    pub fn available_tokens(&self) -> usize {
        self.admission.available()
    }

    fn lock_state(&self) -> MutexGuard<'_, FacilityState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // An observer panicked mid-notification; the committed state is still consistent.
                tracing::error!("Facility state mutex poisoned - recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Register a zero-argument callback. Duplicates are allowed; order is preserved.
    pub fn register_observer<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.add_observer(Arc::new(CallbackObserver::new(callback)));
    }

    /// Register a listener that receives a view of the state on each change.
    pub fn add_observer(&self, observer: Arc<dyn Observer>) {
        self.lock_state().observers.push(observer);
    }

    /// Invoke every observer in registration order on the calling task.
    pub fn notify_observers(&self) {
        self.lock_state().notify();
    }

    /// Record how many vehicles the current run expects, and notify.
    pub fn set_total_vehicles(&self, total: usize) {
        let mut state = self.lock_state();
        state.total_vehicles = total;
        state.notify();
    }

    /// Wait for the admission ticket. Hold the guard across `acquire_slot`.
    pub async fn admission_ticket(&self) -> AdmissionTicket<'_> {
        self.ticket.lock().await
    }

    /// Wait for an admission token, then take the lowest-numbered free slot.
    ///
    /// A free slot always exists while token accounting holds; if none is found
    /// the token goes back to the pool and `SlotAccounting` is returned.
    pub async fn acquire_slot(&self, vehicle: VehicleId) -> Result<ParkedSlot, FacilityError> {
        let token = self
            .admission
            .acquire()
            .await
            .ok_or(FacilityError::AdmissionClosed)?;

        let mut state = self.lock_state();

        let Some(index) = state.slots.iter().position(|s| !s.is_occupied()) else {
            drop(state);
            self.admission.release(token);
            tracing::error!(%vehicle, "Bug: admission token held but no free slot");
            return Err(FacilityError::SlotAccounting { vehicle });
        };

        let slot = &mut state.slots[index];
        slot.occupy(vehicle);
        let number = slot.number();
        state.parked += 1;
        state.debug_check();
        tracing::debug!(%vehicle, slot = number, parked = state.parked, "Slot acquired");

        state.notify();
        Ok(ParkedSlot::new(number, vehicle, token))
    }

    /// Free the slot, return the admission token to the pool, and notify.
    pub fn release_slot(&self, mut parked: ParkedSlot) {
        let mut state = self.lock_state();

        let number = parked.number();
        let vehicle = parked.vehicle();
        match state.slots.get_mut(number - 1).map(Slot::vacate) {
            Some(Some(occupant)) if occupant == vehicle => {}
            other => {
                debug_assert!(false, "slot {number} not held by vehicle {vehicle}");
                tracing::error!(
                    slot = number,
                    %vehicle,
                    found = ?other,
                    "Bug: released slot was not held by this vehicle"
                );
            }
        }
        state.parked = state.parked.saturating_sub(1);

        if let Some(token) = parked.take_token() {
            self.admission.release(token);
        }
        state.debug_check();
        tracing::debug!(%vehicle, slot = number, parked = state.parked, "Slot released");

        state.notify();
    }

    /// Append to the bounded log, evicting the oldest message past ten, and notify.
    pub fn append_message(&self, message: impl Into<String>) {
        let mut state = self.lock_state();
        state.log.push(message.into());
        state.notify();
    }

    pub fn snapshot(&self) -> FacilitySnapshot {
        self.lock_state().view().snapshot()
    }

    pub fn parked(&self) -> usize {
        self.lock_state().parked
    }

    pub fn messages(&self) -> Vec<String> {
        self.lock_state().log.to_vec()
    }

    #[cfg(test)]
    pub(crate) fn ticket_is_held(&self) -> bool {
        self.ticket.try_lock().is_err()
    }
}
