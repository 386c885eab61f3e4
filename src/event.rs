//! Structured simulation events and the sink boundary they are emitted to.
//!
//! The core only constructs and emits events; rendering and persistence are
//! the sink's concern and the core never blocks on delivery.

use serde::Serialize;
use tracing::{info, warn};

use crate::cluster::{HostId, TaskId};
use crate::error::FailureKind;

/// Simulated wall clock: day of run and GMT hour of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimTime {
    pub day: u32,
    pub hour: u32,
}

impl SimTime {
    pub fn new(day: u32, hour: u32) -> Self {
        SimTime { day, hour }
    }
}

/// One observable occurrence inside a run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum SimEvent {
    SchedulerStart,
    NewDay {
        day: u32,
    },
    SchedulerComplete,
    TaskExecuted {
        task: TaskId,
        host: HostId,
        compute_used: f64,
    },
    TaskCompleted {
        task: TaskId,
        host: HostId,
    },
    TaskFailed {
        task: TaskId,
        host: HostId,
        cause: FailureKind,
    },
    TaskAssociated {
        task: TaskId,
        host: HostId,
    },
    HostStatus {
        host: HostId,
        memory_used: u64,
        memory_capacity: u64,
        compute_used: f64,
        core_count: u32,
        tasks: usize,
    },
    TaskStatus {
        task: TaskId,
        host: HostId,
        remaining_hours: u32,
        compute_deficit: f64,
        cost: f64,
        failed: bool,
    },
}

/// Where the scheduler sends its events.
pub trait EventSink {
    fn record(&mut self, time: SimTime, event: &SimEvent);
}

/// Default sink: renders events through the `tracing` macros, failures at
/// warn level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&mut self, time: SimTime, event: &SimEvent) {
        match event {
            SimEvent::TaskFailed { task, host, cause } => {
                warn!(day = time.day, hour = time.hour, %task, %host, %cause, "task failed");
            }
            other => {
                info!(day = time.day, hour = time.hour, event = ?other, "sim event");
            }
        }
    }
}

/// Collects events in memory. Used by tests and by callers that post-process
/// a run's history.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<(SimTime, SimEvent)>,
}

impl EventSink for MemorySink {
    fn record(&mut self, time: SimTime, event: &SimEvent) {
        self.events.push((time, event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_a_kind_tag() {
        let event = SimEvent::NewDay { day: 2 };
        let json = serde_json::to_value(&event).expect("event serializes");
        assert_eq!(json["kind"], "NewDay");
        assert_eq!(json["day"], 2);
    }

    #[test]
    fn memory_sink_preserves_order() {
        let mut sink = MemorySink::default();
        sink.record(SimTime::new(0, 0), &SimEvent::SchedulerStart);
        sink.record(SimTime::new(0, 1), &SimEvent::NewDay { day: 1 });
        assert_eq!(sink.events.len(), 2);
        assert!(matches!(sink.events[0].1, SimEvent::SchedulerStart));
    }
}
