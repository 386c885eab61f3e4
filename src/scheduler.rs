//! The day/hour event loop driving hosts, tasks and failure recovery.

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::cluster::{Cluster, HostId};
use crate::error::{FailureKind, SchedulerError};
use crate::event::{EventSink, SimEvent, SimTime};
use crate::host::{RunOutcome, TaskFailure};
use crate::load::HOURS_PER_DAY;
use crate::policy::PlacementPolicy;
use crate::shuffle::RandomInfiniteIter;
use crate::task::Task;

/// Everything a run needs: a populated cluster, a placement policy and a
/// duration. Test cases produce these.
pub struct SimSetup {
    pub cluster: Cluster,
    pub policy: Box<dyn PlacementPolicy>,
    pub num_days: u32,
}

/// Aggregate outcome of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub days: u32,
    pub hosts: usize,
    pub completed_tasks: usize,
    pub unfinished_tasks: usize,
    pub failures: usize,
    pub out_of_memory_failures: usize,
    pub failed_to_complete_failures: usize,
    pub total_cost: f64,
}

/// Time-stepped scheduler over a cluster of hosts.
///
/// Each simulated hour every host gets one turn per pass of a fair random
/// iteration; on its turn a host runs as many scheduling steps as it had
/// tasks at the start of the turn, so late-associated tasks wait for the
/// next turn. Failed tasks are rescheduled through the policy immediately.
pub struct Scheduler<S: EventSink> {
    cluster: Cluster,
    policy: Box<dyn PlacementPolicy>,
    num_days: u32,
    host_iter: RandomInfiniteIter<HostId>,
    sink: S,
    completed: Vec<Task>,
    failures: usize,
    out_of_memory_failures: usize,
    failed_to_complete_failures: usize,
}

impl<S: EventSink> Scheduler<S> {
    pub fn new(setup: SimSetup, sink: S, seed_rng: &mut impl Rng) -> Self {
        let host_iter = RandomInfiniteIter::new(setup.cluster.host_ids(), seed_rng);
        Scheduler {
            cluster: setup.cluster,
            policy: setup.policy,
            num_days: setup.num_days,
            host_iter,
            sink,
            completed: Vec::new(),
            failures: 0,
            out_of_memory_failures: 0,
            failed_to_complete_failures: 0,
        }
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn completed(&self) -> &[Task] {
        &self.completed
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run the full simulation and summarize it.
    pub fn run(&mut self) -> Result<RunReport, SchedulerError> {
        info!(days = self.num_days, hosts = self.cluster.host_count(), "run starting");
        self.sink
            .record(SimTime::new(1, 0), &SimEvent::SchedulerStart);

        for day in 1..=self.num_days {
            self.sink
                .record(SimTime::new(day, 0), &SimEvent::NewDay { day });
            for hour in 0..HOURS_PER_DAY as u32 {
                self.run_hour(SimTime::new(day, hour))?;
            }
            self.record_end_of_day(day);
        }

        self.sink
            .record(SimTime::new(self.num_days, 0), &SimEvent::SchedulerComplete);

        let report = self.report();
        info!(
            completed = report.completed_tasks,
            unfinished = report.unfinished_tasks,
            failures = report.failures,
            cost = report.total_cost,
            "run complete"
        );
        Ok(report)
    }

    // One GMT hour: every host gets one turn, in fair random order.
    fn run_hour(&mut self, time: SimTime) -> Result<(), SchedulerError> {
        for _ in 0..self.cluster.host_count() {
            let Some(host_id) = self.host_iter.next_item() else {
                return Ok(());
            };
            // Snapshot the batch size: tasks associated mid-turn wait for
            // the host's next turn.
            let batch = self
                .cluster
                .host(&host_id)
                .map(|h| h.task_count())
                .unwrap_or(0);
            for _ in 0..batch {
                match self.cluster.run_host(&host_id, time.hour) {
                    Ok(RunOutcome::Idle) => break,
                    Ok(RunOutcome::Executed {
                        task_id,
                        compute_used,
                    }) => {
                        self.sink.record(
                            time,
                            &SimEvent::TaskExecuted {
                                task: task_id,
                                host: host_id.clone(),
                                compute_used,
                            },
                        );
                    }
                    Ok(RunOutcome::Completed(task)) => {
                        self.sink.record(
                            time,
                            &SimEvent::TaskCompleted {
                                task: task.id().clone(),
                                host: host_id.clone(),
                            },
                        );
                        self.completed.push(task);
                    }
                    Err(failure) => self.handle_failure(time, failure)?,
                }
            }
        }
        Ok(())
    }

    // Count the failure, then hand the evicted task back to the policy for
    // a fresh placement. A policy with nothing to offer ends the run.
    fn handle_failure(&mut self, time: SimTime, failure: TaskFailure) -> Result<(), SchedulerError> {
        self.failures += 1;
        match failure.kind {
            FailureKind::OutOfMemory { .. } => self.out_of_memory_failures += 1,
            FailureKind::FailedToComplete { .. } => self.failed_to_complete_failures += 1,
        }
        self.sink.record(
            time,
            &SimEvent::TaskFailed {
                task: failure.task.id().clone(),
                host: failure.host.clone(),
                cause: failure.kind,
            },
        );

        let task = failure.task;
        let new_host = self
            .policy
            .select_optimal_compute(&task, &self.cluster)
            .map_err(|_| SchedulerError::NoComputeAvailable {
                task_id: task.id().clone(),
            })?;
        debug!(task = %task.id(), from = %failure.host, to = %new_host, "rescheduling");
        self.sink.record(
            time,
            &SimEvent::TaskAssociated {
                task: task.id().clone(),
                host: new_host.clone(),
            },
        );
        self.cluster.associate_task(&new_host, task)
    }

    fn record_end_of_day(&mut self, day: u32) {
        let time = SimTime::new(day, (HOURS_PER_DAY - 1) as u32);
        let mut events = Vec::new();
        for host in self.cluster.hosts() {
            events.push(SimEvent::HostStatus {
                host: host.id().clone(),
                memory_used: host.current_memory(),
                memory_capacity: host.max_memory(),
                compute_used: host.current_compute(),
                core_count: host.core().core_count,
                tasks: host.task_count(),
            });
            for task in host.tasks() {
                events.push(SimEvent::TaskStatus {
                    task: task.id().clone(),
                    host: host.id().clone(),
                    remaining_hours: task.remaining_hours(),
                    compute_deficit: task.compute_deficit(),
                    cost: task.cost(),
                    failed: task.failed(),
                });
            }
        }
        for event in &events {
            self.sink.record(time, event);
        }
    }

    fn report(&self) -> RunReport {
        let associated_cost: f64 = self
            .cluster
            .hosts()
            .flat_map(|h| h.tasks())
            .map(|t| t.cost())
            .sum();
        let completed_cost: f64 = self.completed.iter().map(|t| t.cost()).sum();
        RunReport {
            days: self.num_days,
            hosts: self.cluster.host_count(),
            completed_tasks: self.completed.len(),
            unfinished_tasks: self.cluster.associated_task_count(),
            failures: self.failures,
            out_of_memory_failures: self.out_of_memory_failures,
            failed_to_complete_failures: self.failed_to_complete_failures,
            total_cost: completed_cost + associated_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::cores::{Core, CoreEquivalency, CoreType};
    use crate::datacenter::{CountryCode, DataCenter};
    use crate::event::MemorySink;
    use crate::host::HostProfile;
    use crate::load::LoadProfile;
    use crate::policy::SequentialPolicy;
    use crate::task::TaskProfile;

    fn single_host_setup(run_time: u32) -> SimSetup {
        let mut rng = StdRng::seed_from_u64(99);
        let mut cluster = Cluster::new(CoreEquivalency::default(), &mut rng);
        let host = cluster
            .add_host(
                DataCenter::new(CountryCode::Gbr),
                HostProfile {
                    core: Core::new(CoreType::General, 8),
                    memory: 64,
                },
            )
            .expect("fresh id pool");
        let task = cluster
            .create_task(TaskProfile {
                max_mem: 8,
                mem_volatility: 0.0,
                core_type: CoreType::General,
                load_profile: LoadProfile::Flat,
                load_factor: 2,
                run_time,
            })
            .expect("fresh id pool");
        cluster
            .associate_task(&host, task)
            .expect("host was just added");
        SimSetup {
            cluster,
            policy: Box::new(SequentialPolicy::new(vec![host])),
            num_days: 2,
        }
    }

    #[test]
    fn satisfied_task_completes_without_failures() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut scheduler = Scheduler::new(single_host_setup(10), MemorySink::default(), &mut rng);
        let report = scheduler.run().expect("run succeeds");
        assert_eq!(report.completed_tasks, 1);
        assert_eq!(report.unfinished_tasks, 0);
        assert_eq!(report.failures, 0);
        assert!(report.total_cost > 0.0);
    }

    #[test]
    fn run_emits_start_days_and_completion_in_order() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut scheduler = Scheduler::new(single_host_setup(10), MemorySink::default(), &mut rng);
        scheduler.run().expect("run succeeds");

        let events = &scheduler.sink().events;
        assert!(matches!(events[0].1, SimEvent::SchedulerStart));
        assert!(matches!(events[1].1, SimEvent::NewDay { day: 1 }));
        assert!(matches!(
            events.last().map(|(_, e)| e),
            Some(SimEvent::SchedulerComplete)
        ));
        let days: Vec<u32> = events
            .iter()
            .filter_map(|(_, e)| match e {
                SimEvent::NewDay { day } => Some(*day),
                _ => None,
            })
            .collect();
        assert_eq!(days, vec![1, 2]);
    }

    #[test]
    fn task_outliving_the_run_is_reported_unfinished() {
        // 2 days is 48 hours; a 60 hour ask cannot finish.
        let mut rng = StdRng::seed_from_u64(5);
        let mut scheduler = Scheduler::new(single_host_setup(60), MemorySink::default(), &mut rng);
        let report = scheduler.run().expect("run succeeds");
        assert_eq!(report.completed_tasks, 0);
        assert_eq!(report.unfinished_tasks, 1);
    }
}
