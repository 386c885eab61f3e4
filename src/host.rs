//! Hosts: simulated machines with finite memory and compute capacity.

use std::collections::HashMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::cluster::{HostId, TaskId};
use crate::cores::{Core, CoreEquivalency};
use crate::datacenter::DataCenter;
use crate::error::FailureKind;
use crate::shuffle::RandomInfiniteIter;
use crate::task::Task;

/// Capacity profile a host is provisioned with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HostProfile {
    pub core: Core,
    /// Maximum memory in MB.
    pub memory: u64,
}

/// Successful outcome of one host scheduling step.
#[derive(Debug)]
pub enum RunOutcome {
    /// Nothing to run this turn.
    Idle,
    /// The picked task executed for one hour.
    Executed { task_id: TaskId, compute_used: f64 },
    /// The picked task had finished cleanly; it is disassociated and handed
    /// back to the caller.
    Completed(Task),
}

/// A resource-exhaustion failure from one host scheduling step.
///
/// Fatal for the current placement but recoverable at the scheduler level:
/// the evicted task travels inside so the scheduler can reschedule it.
#[derive(Debug)]
pub struct TaskFailure {
    pub task: Task,
    pub host: HostId,
    pub kind: FailureKind,
}

/// One simulated machine. Owns the tasks currently associated with it.
#[derive(Debug)]
pub struct Host {
    id: HostId,
    datacenter: DataCenter,
    core: Core,
    max_memory: u64,
    current_memory: u64,
    current_compute: f64,
    tasks: HashMap<TaskId, Task>,
    task_iter: RandomInfiniteIter<TaskId>,
    rng: StdRng,
}

impl Host {
    pub fn new(
        id: HostId,
        datacenter: DataCenter,
        profile: HostProfile,
        seed_rng: &mut impl Rng,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed_rng.gen());
        let task_iter = RandomInfiniteIter::new(Vec::new(), &mut rng);
        Host {
            id,
            datacenter,
            core: profile.core,
            max_memory: profile.memory,
            current_memory: 0,
            current_compute: 0.0,
            tasks: HashMap::new(),
            task_iter,
            rng,
        }
    }

    pub fn id(&self) -> &HostId {
        &self.id
    }

    pub fn datacenter(&self) -> &DataCenter {
        &self.datacenter
    }

    pub fn core(&self) -> Core {
        self.core
    }

    pub fn max_memory(&self) -> u64 {
        self.max_memory
    }

    pub fn current_memory(&self) -> u64 {
        self.current_memory
    }

    pub fn current_compute(&self) -> f64 {
        self.current_compute
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn has_task(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Associate `task` with this host so it runs during the host's turns.
    pub fn associate_task(&mut self, task: Task) {
        self.tasks.insert(task.id().clone(), task);
        self.rebuild_task_iter();
    }

    /// Remove a task from this host, returning ownership to the caller.
    pub fn disassociate_task(&mut self, id: &TaskId) -> Option<Task> {
        let task = self.tasks.remove(id);
        if task.is_some() {
            self.rebuild_task_iter();
        }
        task
    }

    // The iterator snapshots membership; any add/remove invalidates it.
    fn rebuild_task_iter(&mut self) {
        let ids: Vec<TaskId> = self.tasks.keys().cloned().collect();
        self.task_iter = RandomInfiniteIter::new(ids, &mut self.rng);
    }

    /// Run one scheduling step: pick the next associated task fairly at
    /// random and give it an hour of resources.
    ///
    /// Previous-hour footprints are released before the new demand is
    /// applied. A task whose memory demand cannot be met, or which finishes
    /// its runtime still in deficit, is marked failed, evicted and returned
    /// in the error for the scheduler to reschedule.
    pub fn run_next_task(
        &mut self,
        gmt_hour_of_day: u32,
        equivalency: &CoreEquivalency,
    ) -> Result<RunOutcome, TaskFailure> {
        let local_hour = self.datacenter.local_hour_of_day(gmt_hour_of_day);

        let Some(task_id) = self.task_iter.next_item() else {
            tracing::trace!(host = %self.id, "no tasks to run");
            return Ok(RunOutcome::Idle);
        };

        let done = match self.tasks.get(&task_id) {
            Some(task) => task.done(),
            None => return Ok(RunOutcome::Idle),
        };

        if done {
            let Some(mut task) = self.disassociate_task(&task_id) else {
                return Ok(RunOutcome::Idle);
            };
            if task.compute_deficit() > 0.0 {
                let kind = FailureKind::FailedToComplete {
                    deficit: task.compute_deficit(),
                };
                task.fail(kind);
                return Err(TaskFailure {
                    task,
                    host: self.id.clone(),
                    kind,
                });
            }
            return Ok(RunOutcome::Completed(task));
        }

        let demand = match self.tasks.get_mut(&task_id) {
            Some(task) => task.resource_demand(local_hour, &mut self.rng),
            None => return Ok(RunOutcome::Idle),
        };

        // Give back last hour's footprint before allocating the new one.
        self.current_compute = (self.current_compute - demand.prev_compute).max(0.0);
        self.current_memory = self.current_memory.saturating_sub(demand.prev_memory);

        // Memory is finite: fail the task before committing the allocation.
        if self.current_memory + demand.memory_demand > self.max_memory {
            let kind = FailureKind::OutOfMemory {
                demanded: demand.memory_demand,
                in_use: self.current_memory,
                capacity: self.max_memory,
            };
            let Some(mut task) = self.disassociate_task(&task_id) else {
                return Ok(RunOutcome::Idle);
            };
            task.fail(kind);
            return Err(TaskFailure {
                task,
                host: self.id.clone(),
                kind,
            });
        }
        self.current_memory += demand.memory_demand;

        let available = (self.core.core_count as f64 - self.current_compute).max(0.0);
        let factor = equivalency.factor(demand.core_type, self.core.core_type);
        let adjusted_demand = demand.compute_demand / factor;
        self.current_compute += adjusted_demand.min(available);

        let unit_cost = self.datacenter.compute_cost() * self.core.core_type.unit_cost();
        let compute_used = match self.tasks.get_mut(&task_id) {
            Some(task) => {
                let used = task.execute(available, adjusted_demand);
                task.book_cost(unit_cost * used);
                used
            }
            None => return Ok(RunOutcome::Idle),
        };

        Ok(RunOutcome::Executed {
            task_id,
            compute_used,
        })
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mem_pct = if self.max_memory > 0 {
            self.current_memory * 100 / self.max_memory
        } else {
            0
        };
        write!(
            f,
            "{}:{}-Core:{}-Mem:{}-Mem Util:{}%",
            self.id,
            self.core.core_type,
            self.core.core_count,
            self.max_memory,
            mem_pct,
        )
    }
}
