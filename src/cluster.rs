//! The host registry for one simulation run, with id allocation.
//!
//! Replaces process-wide registries with an explicit object whose lifetime is
//! the run: hosts live here, tasks are owned by whichever host they are
//! associated with, and ids come from a bounded random-with-retry pool.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::cores::CoreEquivalency;
use crate::datacenter::DataCenter;
use crate::error::{ConfigurationError, SchedulerError};
use crate::host::{Host, HostProfile, RunOutcome, TaskFailure};
use crate::task::{Task, TaskProfile};

/// Unique task identifier, a zero-padded numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(String);

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_owned())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique host identifier: country mnemonic plus a pool-allocated number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostId(String);

impl From<&str> for HostId {
    fn from(s: &str) -> Self {
        HostId(s.to_owned())
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Allocates unique zero-padded ids from `0..=max` by random draw with
/// retry on collision.
#[derive(Debug)]
pub struct IdPool {
    max: u32,
    width: usize,
    used: HashSet<u32>,
    rng: StdRng,
}

impl IdPool {
    pub fn new(max: u32, seed_rng: &mut impl Rng) -> Self {
        IdPool {
            max,
            width: max.to_string().len(),
            used: HashSet::new(),
            rng: StdRng::seed_from_u64(seed_rng.gen()),
        }
    }

    /// A fresh id, or `None` once the pool is exhausted.
    pub fn allocate(&mut self) -> Option<String> {
        if self.used.len() > self.max as usize {
            return None;
        }
        loop {
            let candidate = self.rng.gen_range(0..=self.max);
            if self.used.insert(candidate) {
                return Some(format!("{candidate:0width$}", width = self.width));
            }
        }
    }
}

/// All hosts of one simulation run, keyed by id.
pub struct Cluster {
    hosts: BTreeMap<HostId, Host>,
    equivalency: CoreEquivalency,
    host_ids: IdPool,
    task_ids: IdPool,
    rng: StdRng,
}

impl Cluster {
    const ID_POOL_MAX: u32 = 999_999;

    pub fn new(equivalency: CoreEquivalency, seed_rng: &mut impl Rng) -> Self {
        let mut rng = StdRng::seed_from_u64(seed_rng.gen());
        let host_ids = IdPool::new(Self::ID_POOL_MAX, &mut rng);
        let task_ids = IdPool::new(Self::ID_POOL_MAX, &mut rng);
        Cluster {
            hosts: BTreeMap::new(),
            equivalency,
            host_ids,
            task_ids,
            rng,
        }
    }

    pub fn equivalency(&self) -> &CoreEquivalency {
        &self.equivalency
    }

    /// Provision a new host in `datacenter` with the given capacity profile.
    pub fn add_host(
        &mut self,
        datacenter: DataCenter,
        profile: HostProfile,
    ) -> Result<HostId, ConfigurationError> {
        let number = self
            .host_ids
            .allocate()
            .ok_or_else(|| ConfigurationError::new("host id pool exhausted"))?;
        let id = HostId(format!("{}_{}", datacenter.country().mnemonic(), number));
        let host = Host::new(id.clone(), datacenter, profile, &mut self.rng);
        self.hosts.insert(id.clone(), host);
        Ok(id)
    }

    /// Create a task with a fresh id. The caller owns it until it is
    /// associated with a host.
    pub fn create_task(&mut self, profile: TaskProfile) -> Result<Task, ConfigurationError> {
        let number = self
            .task_ids
            .allocate()
            .ok_or_else(|| ConfigurationError::new("task id pool exhausted"))?;
        Ok(Task::new(TaskId(number), profile))
    }

    pub fn host(&self, id: &HostId) -> Option<&Host> {
        self.hosts.get(id)
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn host_ids(&self) -> Vec<HostId> {
        self.hosts.keys().cloned().collect()
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    /// Hand `task` to the host with id `host_id`.
    pub fn associate_task(&mut self, host_id: &HostId, task: Task) -> Result<(), SchedulerError> {
        match self.hosts.get_mut(host_id) {
            Some(host) => {
                host.associate_task(task);
                Ok(())
            }
            None => Err(SchedulerError::UnknownHost {
                task_id: task.id().clone(),
                host_id: host_id.to_string(),
            }),
        }
    }

    /// Run one scheduling step on the named host. Unknown hosts are treated
    /// as idle; the host set never shrinks during a run.
    pub fn run_host(
        &mut self,
        host_id: &HostId,
        gmt_hour_of_day: u32,
    ) -> Result<RunOutcome, TaskFailure> {
        match self.hosts.get_mut(host_id) {
            Some(host) => host.run_next_task(gmt_hour_of_day, &self.equivalency),
            None => Ok(RunOutcome::Idle),
        }
    }

    /// Number of tasks currently associated across all hosts.
    pub fn associated_task_count(&self) -> usize {
        self.hosts.values().map(|h| h.task_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cores::{Core, CoreType};
    use crate::datacenter::CountryCode;

    #[test]
    fn id_pool_yields_unique_zero_padded_ids() {
        let mut seed = StdRng::seed_from_u64(5);
        let mut pool = IdPool::new(99, &mut seed);
        let mut seen = HashSet::new();
        for _ in 0..=99 {
            let id = pool.allocate().expect("pool not yet exhausted");
            assert_eq!(id.len(), 2);
            assert!(seen.insert(id));
        }
        assert!(pool.allocate().is_none(), "pool of 100 ids must exhaust");
    }

    #[test]
    fn host_ids_carry_the_country_mnemonic() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut cluster = Cluster::new(CoreEquivalency::default(), &mut rng);
        let id = cluster
            .add_host(
                DataCenter::new(CountryCode::Hkg),
                HostProfile {
                    core: Core::new(CoreType::Batch, 2),
                    memory: 16,
                },
            )
            .expect("id pool fresh");
        assert!(id.to_string().starts_with("HKG_"));
        assert_eq!(cluster.host_count(), 1);
    }
}
