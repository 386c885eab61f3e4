//! Placement policies: which host a task is assigned or reassigned to.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cluster::{Cluster, HostId};
use crate::error::PolicyError;
use crate::task::Task;

/// Strategy for placing a task on a host, consulted on initial placement and
/// on every failure-driven reschedule.
pub trait PlacementPolicy {
    /// Select the compute resource the given task should be associated with.
    fn select_optimal_compute(
        &mut self,
        task: &Task,
        cluster: &Cluster,
    ) -> Result<HostId, PolicyError>;
}

/// Picks a host uniformly at random from the cluster.
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed_rng: &mut impl Rng) -> Self {
        RandomPolicy {
            rng: StdRng::seed_from_u64(seed_rng.gen()),
        }
    }
}

impl PlacementPolicy for RandomPolicy {
    fn select_optimal_compute(
        &mut self,
        _task: &Task,
        cluster: &Cluster,
    ) -> Result<HostId, PolicyError> {
        let ids = cluster.host_ids();
        if ids.is_empty() {
            return Err(PolicyError::NoComputeAvailable);
        }
        let pick = self.rng.gen_range(0..ids.len());
        Ok(ids[pick].clone())
    }
}

/// Hands out a fixed list of hosts in order, one per selection, and fails
/// once the list is exhausted. Used by test cases that script an exact
/// failover sequence.
pub struct SequentialPolicy {
    hosts: Vec<HostId>,
    next: usize,
}

impl SequentialPolicy {
    pub fn new(hosts: Vec<HostId>) -> Self {
        SequentialPolicy { hosts, next: 0 }
    }
}

impl PlacementPolicy for SequentialPolicy {
    fn select_optimal_compute(
        &mut self,
        _task: &Task,
        _cluster: &Cluster,
    ) -> Result<HostId, PolicyError> {
        let Some(id) = self.hosts.get(self.next) else {
            return Err(PolicyError::NoComputeAvailable);
        };
        self.next += 1;
        Ok(id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cores::{Core, CoreEquivalency, CoreType};
    use crate::datacenter::{CountryCode, DataCenter};
    use crate::host::HostProfile;
    use crate::load::LoadProfile;
    use crate::task::TaskProfile;

    fn sample_task(cluster: &mut Cluster) -> Task {
        cluster
            .create_task(TaskProfile {
                max_mem: 4,
                mem_volatility: 0.0,
                core_type: CoreType::General,
                load_profile: LoadProfile::Flat,
                load_factor: 1,
                run_time: 10,
            })
            .expect("fresh id pool")
    }

    fn cluster_with_hosts(n: usize) -> (Cluster, Vec<HostId>) {
        let mut rng = StdRng::seed_from_u64(23);
        let mut cluster = Cluster::new(CoreEquivalency::default(), &mut rng);
        let mut ids = Vec::new();
        for _ in 0..n {
            let id = cluster
                .add_host(
                    DataCenter::new(CountryCode::Isl),
                    HostProfile {
                        core: Core::new(CoreType::General, 4),
                        memory: 32,
                    },
                )
                .expect("fresh id pool");
            ids.push(id);
        }
        (cluster, ids)
    }

    #[test]
    fn random_policy_returns_a_member_host() {
        let (mut cluster, ids) = cluster_with_hosts(3);
        let task = sample_task(&mut cluster);
        let mut seed = StdRng::seed_from_u64(3);
        let mut policy = RandomPolicy::new(&mut seed);
        for _ in 0..20 {
            let pick = policy
                .select_optimal_compute(&task, &cluster)
                .expect("hosts exist");
            assert!(ids.contains(&pick));
        }
    }

    #[test]
    fn random_policy_fails_on_empty_cluster() {
        let (mut cluster, _) = cluster_with_hosts(0);
        let task = sample_task(&mut cluster);
        let mut seed = StdRng::seed_from_u64(3);
        let mut policy = RandomPolicy::new(&mut seed);
        assert!(policy.select_optimal_compute(&task, &cluster).is_err());
    }

    #[test]
    fn sequential_policy_exhausts_after_its_list() {
        let (mut cluster, ids) = cluster_with_hosts(2);
        let task = sample_task(&mut cluster);
        let mut policy = SequentialPolicy::new(ids.clone());
        assert_eq!(
            policy.select_optimal_compute(&task, &cluster).unwrap(),
            ids[0]
        );
        assert_eq!(
            policy.select_optimal_compute(&task, &cluster).unwrap(),
            ids[1]
        );
        assert!(matches!(
            policy.select_optimal_compute(&task, &cluster),
            Err(PolicyError::NoComputeAvailable)
        ));
    }
}
