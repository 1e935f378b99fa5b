//! parkade: concurrent parking facility simulation.
//!
//! Vehicles arrive as a Poisson process, compete for a fixed set of slots,
//! dwell, and leave. The facility fires observer notifications after every
//! committed state change.

pub mod event_log;
pub mod facility;
pub mod observer;
pub mod permit;
pub mod sampler;
pub mod simulation;
mod status;
pub mod vehicle;

pub use event_log::{DEFAULT_LOG_CAPACITY, EventLog};
pub use facility::{AdmissionTicket, Facility, FacilityError};
pub use observer::{FacilityView, Observer};
pub use permit::{ParkedSlot, Slot};
pub use sampler::{DwellWindow, FixedSampler, RandomSampler, Sampler};
pub use simulation::{
    Simulation, SimulationConfig, SimulationError, SimulationReport, run_simulation,
};
pub use status::{FacilitySnapshot, Occupancy};
pub use vehicle::{Vehicle, VehicleId, VehicleReport, VehicleState};
