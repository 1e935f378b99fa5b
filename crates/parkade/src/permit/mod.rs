//! Admission tokens and slot leases.
//!
//! A vehicle holds an `AdmissionToken` for as long as it is inside the facility.
//! The token travels inside the `ParkedSlot` lease:
//! - `AdmissionPool::acquire` → token
//! - `Facility::acquire_slot` → `ParkedSlot` (token moved in)
//! - `Facility::release_slot` → token back to the pool

mod pool;
mod slot;

pub use pool::{AdmissionPool, AdmissionToken};
pub use slot::{ParkedSlot, Slot};
