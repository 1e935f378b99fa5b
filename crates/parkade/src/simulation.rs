//! Arrival generator: launches vehicles spaced by Poisson-process gaps and waits for them.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::facility::Facility;
use crate::sampler::{DwellWindow, RandomSampler, Sampler};
use crate::vehicle::{Vehicle, VehicleId, VehicleReport};

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("invalid arrival rate {0}: must be a positive finite number")]
    InvalidRate(f64),
    #[error("invalid dwell window {min}..{max}: min must be below max")]
    InvalidDwellWindow { min: u32, max: u32 },
    #[error("invalid time unit: must be non-zero")]
    InvalidTimeUnit,
    #[error("vehicle task failed: {0}")]
    VehicleTask(String),
}

/// Run parameters. Defaults match the reference scenario.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub total_vehicles: usize,
    /// Mean arrivals per time unit.
    pub arrival_rate: f64,
    pub dwell: DwellWindow,
    /// Real duration of one simulation time unit.
    pub time_unit: Duration,
    /// Wait after a failed parking attempt, in time units.
    pub backoff_units: f64,
    /// Fixed seed for reproducible runs; entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            total_vehicles: 100,
            arrival_rate: 0.5,
            dwell: DwellWindow::default(),
            time_unit: Duration::from_secs(1),
            backoff_units: 1.0,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn new(total_vehicles: usize, arrival_rate: f64) -> Self {
        Self {
            total_vehicles,
            arrival_rate,
            ..Self::default()
        }
    }

    pub fn with_dwell(mut self, dwell: DwellWindow) -> Self {
        self.dwell = dwell;
        self
    }

    pub fn with_time_unit(mut self, time_unit: Duration) -> Self {
        self.time_unit = time_unit;
        self
    }

    pub fn with_backoff_units(mut self, backoff_units: f64) -> Self {
        self.backoff_units = backoff_units;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.arrival_rate.is_finite() && self.arrival_rate > 0.0) {
            return Err(SimulationError::InvalidRate(self.arrival_rate));
        }
        if !self.dwell.is_valid() {
            return Err(SimulationError::InvalidDwellWindow {
                min: self.dwell.min,
                max: self.dwell.max,
            });
        }
        if self.time_unit.is_zero() {
            return Err(SimulationError::InvalidTimeUnit);
        }
        Ok(())
    }

    /// Convert time units to real time, saturating on overflow.
    pub fn to_duration(&self, units: f64) -> Duration {
        let secs = units.max(0.0) * self.time_unit.as_secs_f64();
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub total_vehicles: usize,
    pub elapsed_ms: u64,
    /// Reports ordered by vehicle id.
    pub vehicles: Vec<VehicleReport>,
}

impl SimulationReport {
    /// Vehicles that needed more than one parking attempt.
    pub fn retried(&self) -> usize {
        self.vehicles.iter().filter(|v| v.attempts > 1).count()
    }
}

/// A configured run with its sampling source.
pub struct Simulation {
    config: SimulationConfig,
    sampler: Box<dyn Sampler>,
}

impl Simulation {
    /// Validate the config and build a `RandomSampler` from it.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let sampler = match config.seed {
            Some(seed) => RandomSampler::new(seed, config.dwell, config.arrival_rate),
            None => RandomSampler::from_entropy(config.dwell, config.arrival_rate),
        };
        Ok(Self {
            config,
            sampler: Box::new(sampler),
        })
    }

    /// Replace the sampling source, e.g. with a `FixedSampler` in tests.
    pub fn with_sampler(mut self, sampler: impl Sampler + 'static) -> Self {
        self.sampler = Box::new(sampler);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Launch every vehicle, then block until all of them have departed.
    pub async fn run(
        &mut self,
        facility: &Arc<Facility>,
    ) -> Result<SimulationReport, SimulationError> {
        let total = self.config.total_vehicles;
        let backoff = self.config.to_duration(self.config.backoff_units);
        let started = Instant::now();

        facility.set_total_vehicles(total);
        facility.open();
        tracing::info!(
            capacity = facility.capacity(),
            total_vehicles = total,
            lambda = self.config.arrival_rate,
            "Simulation starting"
        );

        let mut tasks = JoinSet::new();
        for i in 1..=total {
            let dwell = self.config.to_duration(self.sampler.dwell());
            let vehicle = Vehicle::new(VehicleId(i), dwell);
            tasks.spawn(vehicle.run(Arc::clone(facility), backoff));

            let gap = self.config.to_duration(self.sampler.inter_arrival());
            tracing::trace!(vehicle = i, gap = ?gap, "Next arrival scheduled");
            tokio::time::sleep(gap).await;
        }

        let mut vehicles = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => vehicles.push(report),
                Err(e) => {
                    tracing::error!(error = %e, "Vehicle task failed");
                    tasks.abort_all();
                    return Err(SimulationError::VehicleTask(e.to_string()));
                }
            }
        }
        vehicles.sort_by_key(|r| r.id);

        let report = SimulationReport {
            total_vehicles: total,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            vehicles,
        };
        tracing::info!(
            vehicles = report.vehicles.len(),
            retried = report.retried(),
            elapsed_ms = report.elapsed_ms,
            "Simulation finished"
        );
        Ok(report)
    }
}

/// Run `total_vehicles` arrivals at rate `lambda` with default dwell and timing.
pub async fn run_simulation(
    facility: &Arc<Facility>,
    total_vehicles: usize,
    lambda: f64,
) -> Result<SimulationReport, SimulationError> {
    Simulation::new(SimulationConfig::new(total_vehicles, lambda))?
        .run(facility)
        .await
}
