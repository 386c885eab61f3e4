//! Error taxonomy for the simulation.
//!
//! Resource exhaustion during a host execution step is a recoverable,
//! scheduler-visible condition and travels as a [`FailureKind`] inside the
//! typed result of `Host::run_next_task`. Only configuration defects and
//! placement exhaustion abort a whole run.

use serde::Serialize;
use thiserror::Error;

use crate::cluster::TaskId;

/// A defect in simulation wiring. Fatal, never retried.
#[derive(Debug, Clone, Error)]
#[error("configuration error: {reason}")]
pub struct ConfigurationError {
    pub reason: String,
}

impl ConfigurationError {
    pub fn new(reason: impl Into<String>) -> Self {
        ConfigurationError {
            reason: reason.into(),
        }
    }
}

/// Why a task was evicted from the host it was running on.
///
/// Recorded on the task as its failure cause and surfaced to the scheduler,
/// which reschedules the task through the placement policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Error)]
pub enum FailureKind {
    /// The task's memory demand would have exceeded host capacity.
    #[error("out of memory: demanded {demanded} MB with {in_use} of {capacity} MB in use")]
    OutOfMemory {
        demanded: u64,
        in_use: u64,
        capacity: u64,
    },
    /// The task reached the end of its runtime still carrying a compute
    /// deficit: it was never given enough compute to finish its work.
    #[error("failed to complete: runtime exhausted with compute deficit {deficit:.4}")]
    FailedToComplete { deficit: f64 },
}

/// A policy could not produce a placement.
#[derive(Debug, Clone, Error)]
pub enum PolicyError {
    #[error("no compute available for placement")]
    NoComputeAvailable,
}

/// Errors that terminate a scheduler run.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The placement policy had no host to offer a failed task. Placement
    /// failure is deliberately fatal; only in-host resource failures are
    /// retried.
    #[error("no compute available to place task {task_id}")]
    NoComputeAvailable { task_id: TaskId },
    #[error("task {task_id} rescheduled onto unknown host {host_id}")]
    UnknownHost { task_id: TaskId, host_id: String },
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
