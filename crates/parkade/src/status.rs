//! Occupancy status and owned facility snapshots.

use serde::{Deserialize, Serialize};

use crate::permit::Slot;

/// Coarse occupancy of the facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Occupancy {
    /// No vehicle parked
    Empty,
    /// Some slots free
    Available,
    /// Every slot taken
    Full,
}

impl Occupancy {
    pub fn from_counts(parked: usize, capacity: usize) -> Self {
        if parked == 0 {
            Occupancy::Empty
        } else if parked >= capacity {
            Occupancy::Full
        } else {
            Occupancy::Available
        }
    }
}

/// Point-in-time copy of the facility state, safe to keep after the lock is released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacilitySnapshot {
    pub capacity: usize,
    pub total_vehicles: usize,
    pub parked: usize,
    pub available: usize,
    pub occupancy: Occupancy,
    pub slots: Vec<Slot>,
    pub messages: Vec<String>,
}

impl FacilitySnapshot {
    /// Number of slots currently marked occupied.
    pub fn occupied_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_occupied()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupancy_from_counts() {
        assert_eq!(Occupancy::from_counts(0, 5), Occupancy::Empty);
        assert_eq!(Occupancy::from_counts(3, 5), Occupancy::Available);
        assert_eq!(Occupancy::from_counts(5, 5), Occupancy::Full);
    }

    #[test]
    fn occupancy_serializes_screaming_snake_case() {
        insta::assert_json_snapshot!(
            [Occupancy::Empty, Occupancy::Available, Occupancy::Full],
            @r#"
        [
          "EMPTY",
          "AVAILABLE",
          "FULL"
        ]
        "#
        );
    }

    #[test]
    fn occupancy_deserializes_screaming_snake_case() {
        assert_eq!(
            serde_json::from_str::<Occupancy>("\"FULL\"").unwrap(),
            Occupancy::Full
        );
    }
}
