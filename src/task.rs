//! Tasks: simulated workloads with a time-varying resource demand curve.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cluster::TaskId;
use crate::cores::CoreType;
use crate::error::FailureKind;
use crate::load::LoadProfile;

/// Immutable construction-time parameters of a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskProfile {
    /// Peak memory demand in MB.
    pub max_mem: u64,
    /// Fractional jitter applied to memory demand, in [0.0, 1.0).
    pub mem_volatility: f64,
    /// Preferred core class.
    pub core_type: CoreType,
    /// Demand intensity curve over the day.
    pub load_profile: LoadProfile,
    /// Integer multiplier of compute demand.
    pub load_factor: u32,
    /// Total runtime ask in hours.
    pub run_time: u32,
}

/// Snapshot returned by [`Task::resource_demand`]: the new demand alongside
/// the previous footprint the host must give back before allocating.
#[derive(Debug, Clone, Copy)]
pub struct ResourceDemand {
    pub compute_demand: f64,
    pub prev_compute: f64,
    pub core_type: CoreType,
    pub memory_demand: u64,
    pub prev_memory: u64,
}

/// One simulated workload.
///
/// A task is created with its full runtime remaining, mutated every simulated
/// hour through [`Task::resource_demand`] and [`Task::execute`], and reset to
/// its initial launch state if a resource failure evicts it from its host.
/// The same instance is then re-associated with a new host; identity persists
/// across reschedules.
#[derive(Debug, Clone)]
pub struct Task {
    id: TaskId,
    profile: TaskProfile,
    remaining_hours: u32,
    compute_deficit: f64,
    current_mem: u64,
    current_compute: f64,
    effective_compute: f64,
    failed: bool,
    failure_cause: Option<FailureKind>,
    cost: f64,
}

impl Task {
    pub fn new(id: TaskId, profile: TaskProfile) -> Self {
        Task {
            id,
            remaining_hours: profile.run_time,
            profile,
            compute_deficit: 0.0,
            current_mem: 0,
            current_compute: 0.0,
            effective_compute: 0.0,
            failed: false,
            failure_cause: None,
            cost: 0.0,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn profile(&self) -> &TaskProfile {
        &self.profile
    }

    pub fn core_type(&self) -> CoreType {
        self.profile.core_type
    }

    /// True once the full runtime ask has been executed.
    pub fn done(&self) -> bool {
        self.remaining_hours == 0
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn failure_cause(&self) -> Option<FailureKind> {
        self.failure_cause
    }

    pub fn remaining_hours(&self) -> u32 {
        self.remaining_hours
    }

    /// Backlog of unsatisfied compute demand carried forward hour-to-hour.
    pub fn compute_deficit(&self) -> f64 {
        self.compute_deficit
    }

    pub fn current_mem(&self) -> u64 {
        self.current_mem
    }

    pub fn current_compute(&self) -> f64 {
        self.current_compute
    }

    /// Compute actually received last hour, in the supplying host's unit.
    pub fn effective_compute(&self) -> f64 {
        self.effective_compute
    }

    /// Monetary cost accumulated over the task's lifetime. Never decreases.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Compute the demand for the given local hour and record it as the
    /// task's current footprint.
    ///
    /// Compute demand is the load factor scaled by the hour's shape value
    /// plus any accumulated deficit, so an undersupplied task asks for
    /// progressively more until it catches up. Memory demand follows the
    /// shape with a bounded random perturbation, clamped to [0, max_mem].
    /// Does not advance time.
    pub fn resource_demand(&mut self, local_hour_of_day: u32, rng: &mut impl Rng) -> ResourceDemand {
        let shape = self.profile.load_profile.shape()[local_hour_of_day as usize % 24];
        let prev_compute = self.current_compute;
        let prev_memory = self.current_mem;

        let compute_demand = self.profile.load_factor as f64 * shape + self.compute_deficit;
        let memory_demand = self.memory_demand(shape, rng);

        self.current_compute = compute_demand;
        self.current_mem = memory_demand;

        ResourceDemand {
            compute_demand,
            prev_compute,
            core_type: self.profile.core_type,
            memory_demand,
            prev_memory,
        }
    }

    fn memory_demand(&self, shape: f64, rng: &mut impl Rng) -> u64 {
        let vol = self.profile.mem_volatility;
        let jitter = if vol > 0.0 {
            rng.gen_range(-vol..=vol)
        } else {
            0.0
        };
        let raw = self.profile.max_mem as f64 * shape * (1.0 + jitter);
        (raw.ceil().max(0.0) as u64).min(self.profile.max_mem)
    }

    /// Run one hour of the task against the compute it was actually given.
    ///
    /// Both arguments are in the host's compute unit (the demand already
    /// translated through the core equivalency). Decrements the remaining
    /// runtime, records the shortfall as the new deficit and returns the
    /// compute consumed.
    pub fn execute(&mut self, compute_available: f64, compute_demand: f64) -> f64 {
        if self.done() {
            return 0.0;
        }
        self.remaining_hours -= 1;
        self.compute_deficit = (compute_demand - compute_available).max(0.0);
        self.effective_compute = compute_demand.min(compute_available);
        self.effective_compute
    }

    /// Accumulate monetary cost for compute consumed. `amount` is expected
    /// to be non-negative; negative inputs are ignored rather than refunded.
    pub fn book_cost(&mut self, amount: f64) {
        self.cost += amount.max(0.0);
    }

    /// Mark the task failed with `cause` and reset it to its initial launch
    /// state: full runtime remaining, zero utilisation and deficit.
    ///
    /// A rescheduled task restarts its demand curve from scratch; it does not
    /// resume where it left off. Accumulated cost is kept.
    pub fn fail(&mut self, cause: FailureKind) {
        self.failed = true;
        self.failure_cause = Some(cause);
        self.remaining_hours = self.profile.run_time;
        self.compute_deficit = 0.0;
        self.current_mem = 0;
        self.current_compute = 0.0;
        self.effective_compute = 0.0;
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let run = self.profile.run_time.max(1);
        let progress = ((run - self.remaining_hours) * 100) / run;
        write!(
            f,
            "{}: profile: {}: core type: {}: Mem(Max,Curr): {}/{} - Progress: {}%",
            self.id,
            self.profile.load_profile,
            self.profile.core_type,
            self.profile.max_mem,
            self.current_mem,
            progress,
        )
    }
}
