//! Vehicle lifecycle.
//!
//! `Arriving → ParkingAttempt → Parked → Departing → Done`. A failed attempt
//! stays in `ParkingAttempt` and retries after a fixed backoff.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::facility::Facility;

/// Vehicle identity, `1..=total_vehicles` within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VehicleId(pub usize);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    Arriving,
    ParkingAttempt,
    Parked,
    Departing,
    Done,
}

impl VehicleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arriving => "arriving",
            Self::ParkingAttempt => "parking_attempt",
            Self::Parked => "parked",
            Self::Departing => "departing",
            Self::Done => "done",
        }
    }
}

/// Outcome of one finished lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleReport {
    pub id: VehicleId,
    pub slot: usize,
    /// Parking attempts made, including the successful one.
    pub attempts: u32,
}

pub struct Vehicle {
    id: VehicleId,
    dwell: Duration,
    slot: Option<usize>,
    state: VehicleState,
}

impl Vehicle {
    /// Create a vehicle with its dwell time already sampled.
    pub fn new(id: VehicleId, dwell: Duration) -> Self {
        Self {
            id,
            dwell,
            slot: None,
            state: VehicleState::Arriving,
        }
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    fn transition(&mut self, next: VehicleState) {
        tracing::trace!(
            vehicle = %self.id,
            from = self.state.as_str(),
            to = next.as_str(),
            "Vehicle state transition"
        );
        self.state = next;
    }

    /// Drive the full lifecycle against `facility`. Returns once the vehicle has left.
    pub async fn run(mut self, facility: Arc<Facility>, backoff: Duration) -> VehicleReport {
        facility.append_message(format!("Vehicle {} attempting to park...", self.id));
        self.transition(VehicleState::ParkingAttempt);

        let mut attempts = 0u32;
        let parked = loop {
            attempts += 1;
            let result = {
                let _ticket = facility.admission_ticket().await;
                facility.acquire_slot(self.id).await
            };

            match result {
                Ok(parked) => break parked,
                Err(e) => {
                    tracing::warn!(
                        vehicle = %self.id,
                        attempts,
                        error = %e,
                        "Parking attempt failed"
                    );
                    facility.append_message(format!("Vehicle {} waiting for a slot...", self.id));
                    tokio::time::sleep(backoff).await;
                }
            }
        };

        let number = parked.number();
        self.slot = Some(number);
        self.transition(VehicleState::Parked);
        facility.append_message(format!("Vehicle {} parked in slot {}", self.id, number));

        tokio::time::sleep(self.dwell).await;

        self.transition(VehicleState::Departing);
        facility.release_slot(parked);
        facility.append_message(format!("Vehicle {} left slot {}", self.id, number));
        self.slot = None;
        self.transition(VehicleState::Done);

        tracing::debug!(vehicle = %self.id, slot = number, attempts, "Vehicle done");
        VehicleReport {
            id: self.id,
            slot: number,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: Duration = Duration::from_secs(1);

    #[test]
    fn new_vehicle_is_arriving_without_slot() {
        let vehicle = Vehicle::new(VehicleId(3), Duration::from_secs(30));
        assert_eq!(vehicle.id(), VehicleId(3));
        assert_eq!(vehicle.state(), VehicleState::Arriving);
        assert_eq!(vehicle.slot(), None);
        assert_eq!(vehicle.dwell(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_logs_each_step() {
        let facility = Facility::new(2).unwrap();
        facility.open();

        let report = Vehicle::new(VehicleId(1), 30 * UNIT)
            .run(Arc::clone(&facility), UNIT)
            .await;

        assert_eq!(
            report,
            VehicleReport {
                id: VehicleId(1),
                slot: 1,
                attempts: 1,
            }
        );
        assert_eq!(
            facility.messages(),
            vec![
                "Vehicle 1 attempting to park...",
                "Vehicle 1 parked in slot 1",
                "Vehicle 1 left slot 1",
            ]
        );
        assert_eq!(facility.parked(), 0);
        assert_eq!(facility.available_tokens(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn vehicle_occupies_slot_for_dwell() {
        let facility = Facility::new(1).unwrap();
        facility.open();

        let start = tokio::time::Instant::now();
        let task =
            tokio::spawn(Vehicle::new(VehicleId(1), 40 * UNIT).run(Arc::clone(&facility), UNIT));

        tokio::time::sleep(20 * UNIT).await;
        assert_eq!(facility.snapshot().slots[0].occupant(), Some(VehicleId(1)));

        task.await.unwrap();
        assert!(start.elapsed() >= 40 * UNIT);
        assert_eq!(facility.parked(), 0);
    }

    // Capacity 1: the second vehicle waits in ParkingAttempt until the first releases.
    #[tokio::test(start_paused = true)]
    async fn second_vehicle_waits_for_release() {
        let facility = Facility::new(1).unwrap();
        facility.open();

        let first =
            tokio::spawn(Vehicle::new(VehicleId(1), 10 * UNIT).run(Arc::clone(&facility), UNIT));
        tokio::time::sleep(UNIT).await;
        assert_eq!(facility.parked(), 1);

        let second =
            tokio::spawn(Vehicle::new(VehicleId(2), 5 * UNIT).run(Arc::clone(&facility), UNIT));
        tokio::time::sleep(5 * UNIT).await;
        assert!(!second.is_finished());
        assert_eq!(facility.snapshot().slots[0].occupant(), Some(VehicleId(1)));

        let first = first.await.unwrap();
        let second = second.await.unwrap();
        assert_eq!(first.slot, 1);
        assert_eq!(second.slot, 1);
        assert_eq!(second.attempts, 1);

        let log = facility.messages();
        let left = log.iter().position(|m| m == "Vehicle 1 left slot 1").unwrap();
        let parked = log.iter().position(|m| m == "Vehicle 2 parked in slot 1").unwrap();
        assert!(left < parked);
        assert_eq!(facility.parked(), 0);
    }

    // The waiting vehicle keeps the admission ticket until it gets a slot.
    #[tokio::test(start_paused = true)]
    async fn waiting_vehicle_holds_admission_ticket() {
        let facility = Facility::new(1).unwrap();
        facility.open();

        let first =
            tokio::spawn(Vehicle::new(VehicleId(1), 10 * UNIT).run(Arc::clone(&facility), UNIT));
        tokio::time::sleep(UNIT).await;
        assert_eq!(facility.parked(), 1);
        assert!(!facility.ticket_is_held());

        let second =
            tokio::spawn(Vehicle::new(VehicleId(2), 5 * UNIT).run(Arc::clone(&facility), UNIT));
        tokio::time::sleep(2 * UNIT).await;
        assert!(!second.is_finished());
        assert!(facility.ticket_is_held());

        // First leaves at t=10, second parks and dwells until t=15.
        tokio::time::sleep(9 * UNIT).await;
        assert_eq!(facility.snapshot().slots[0].occupant(), Some(VehicleId(2)));
        assert!(!facility.ticket_is_held());

        first.await.unwrap();
        second.await.unwrap();
        assert!(!facility.ticket_is_held());
    }

    #[test]
    fn vehicle_id_serializes_as_number() {
        insta::assert_json_snapshot!(
            VehicleReport { id: VehicleId(4), slot: 2, attempts: 1 },
            @r#"
        {
          "id": 4,
          "slot": 2,
          "attempts": 1
        }
        "#
        );
    }
}
