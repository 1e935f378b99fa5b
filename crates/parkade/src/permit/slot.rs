//! Slot record and the lease a vehicle holds while parked.

use serde::Serialize;

use super::AdmissionToken;
use crate::vehicle::VehicleId;

/// A single parking space. Mutated only by the facility under its lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    number: usize,
    vehicle: Option<VehicleId>,
}

impl Slot {
    pub(crate) fn new(number: usize) -> Self {
        Self {
            number,
            vehicle: None,
        }
    }

    /// Stable identifier, `1..=capacity`.
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn is_occupied(&self) -> bool {
        self.vehicle.is_some()
    }

    pub fn occupant(&self) -> Option<VehicleId> {
        self.vehicle
    }

    pub(crate) fn occupy(&mut self, vehicle: VehicleId) {
        debug_assert!(self.vehicle.is_none(), "slot {} already occupied", self.number);
        self.vehicle = Some(vehicle);
    }

    pub(crate) fn vacate(&mut self) -> Option<VehicleId> {
        self.vehicle.take()
    }
}

/// Proof that a vehicle holds a slot and an admission token.
///
/// Must be handed back through `Facility::release_slot`. Dropping it anywhere
/// else leaks both the slot and the token for the rest of the run.
#[must_use = "a parked slot must be released through Facility::release_slot"]
#[derive(Debug)]
pub struct ParkedSlot {
    number: usize,
    vehicle: VehicleId,
    token: Option<AdmissionToken>,
}

impl ParkedSlot {
    pub(crate) fn new(number: usize, vehicle: VehicleId, token: AdmissionToken) -> Self {
        Self {
            number,
            vehicle,
            token: Some(token),
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    pub(crate) fn take_token(&mut self) -> Option<AdmissionToken> {
        self.token.take()
    }
}

impl Drop for ParkedSlot {
    fn drop(&mut self) {
        if self.token.is_some() {
            tracing::error!(
                slot = self.number,
                vehicle = %self.vehicle,
                "ParkedSlot dropped without release - slot and token leaked"
            );
        }
    }
}
