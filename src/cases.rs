//! Canned simulation scenarios, each exercising one failure mode or
//! scheduling behaviour, plus a fully randomized fleet.

use std::fmt;

use clap::ValueEnum;
use rand::Rng;

use crate::cluster::Cluster;
use crate::cores::{Core, CoreEquivalency, CoreType};
use crate::datacenter::{CountryCode, DataCenter};
use crate::error::ConfigurationError;
use crate::host::HostProfile;
use crate::load::LoadProfile;
use crate::policy::{PlacementPolicy, RandomPolicy, SequentialPolicy};
use crate::profile::random_country;
use crate::scheduler::SimSetup;
use crate::task::{Task, TaskProfile};

/// The scenario to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestCase {
    /// An undersized host starves a task of compute; it fails at the end of
    /// its runtime and is rescheduled onto a host that can feed it.
    ComputeRestricted,
    /// A task's peak memory demand exceeds its first host; it is evicted
    /// mid-run and restarted on a larger host.
    MemoryRestricted,
    /// Two datacenters in different timezones sharing one workload.
    MultiDatacenter,
    /// A general-purpose task placed on GPU-only supply, paying the
    /// cross-class translation.
    CoreMismatch,
    /// A randomized fleet and workload drawn from the standard profiles.
    Random,
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestCase::ComputeRestricted => "compute-restricted",
            TestCase::MemoryRestricted => "memory-restricted",
            TestCase::MultiDatacenter => "multi-datacenter",
            TestCase::CoreMismatch => "core-mismatch",
            TestCase::Random => "random",
        };
        f.write_str(name)
    }
}

impl TestCase {
    /// Build the cluster, workload and policy for this scenario.
    pub fn set_up(&self, rng: &mut impl Rng) -> Result<SimSetup, ConfigurationError> {
        match self {
            TestCase::ComputeRestricted => compute_restricted(rng),
            TestCase::MemoryRestricted => memory_restricted(rng),
            TestCase::MultiDatacenter => multi_datacenter(rng),
            TestCase::CoreMismatch => core_mismatch(rng),
            TestCase::Random => random_fleet(rng),
        }
    }
}

// Initial placement goes through the same policy that handles reschedules.
fn place(
    cluster: &mut Cluster,
    policy: &mut dyn PlacementPolicy,
    task: Task,
) -> Result<(), ConfigurationError> {
    let host = policy
        .select_optimal_compute(&task, cluster)
        .map_err(|e| ConfigurationError::new(format!("initial placement failed: {e}")))?;
    cluster
        .associate_task(&host, task)
        .map_err(|e| ConfigurationError::new(e.to_string()))
}

fn compute_restricted(rng: &mut impl Rng) -> Result<SimSetup, ConfigurationError> {
    let mut cluster = Cluster::new(CoreEquivalency::default(), rng);
    let dc = DataCenter::new(CountryCode::Isl);
    let small = cluster.add_host(
        dc,
        HostProfile {
            core: Core::new(CoreType::General, 2),
            memory: 16,
        },
    )?;
    let large = cluster.add_host(
        dc,
        HostProfile {
            core: Core::new(CoreType::General, 16),
            memory: 256,
        },
    )?;
    let task = cluster.create_task(TaskProfile {
        max_mem: 4,
        mem_volatility: 0.0,
        core_type: CoreType::General,
        load_profile: LoadProfile::SawTooth,
        load_factor: 5,
        run_time: 30,
    })?;
    let mut policy = SequentialPolicy::new(vec![small, large]);
    place(&mut cluster, &mut policy, task)?;
    Ok(SimSetup {
        cluster,
        policy: Box::new(policy),
        num_days: 3,
    })
}

fn memory_restricted(rng: &mut impl Rng) -> Result<SimSetup, ConfigurationError> {
    let mut cluster = Cluster::new(CoreEquivalency::default(), rng);
    let dc = DataCenter::new(CountryCode::Isl);
    let small = cluster.add_host(
        dc,
        HostProfile {
            core: Core::new(CoreType::General, 4),
            memory: 16,
        },
    )?;
    let large = cluster.add_host(
        dc,
        HostProfile {
            core: Core::new(CoreType::General, 4),
            memory: 32,
        },
    )?;
    // Saw peak demands ceil(18 * 0.9) = 17 MB, over the small host's 16.
    let task = cluster.create_task(TaskProfile {
        max_mem: 18,
        mem_volatility: 0.0,
        core_type: CoreType::General,
        load_profile: LoadProfile::SawTooth,
        load_factor: 1,
        run_time: 30,
    })?;
    let mut policy = SequentialPolicy::new(vec![small, large]);
    place(&mut cluster, &mut policy, task)?;
    Ok(SimSetup {
        cluster,
        policy: Box::new(policy),
        num_days: 3,
    })
}

fn multi_datacenter(rng: &mut impl Rng) -> Result<SimSetup, ConfigurationError> {
    let mut cluster = Cluster::new(CoreEquivalency::default(), rng);
    for country in [CountryCode::Isl, CountryCode::Gbr] {
        cluster.add_host(
            DataCenter::new(country),
            HostProfile {
                core: Core::new(CoreType::General, 8),
                memory: 64,
            },
        )?;
    }
    let mut policy = RandomPolicy::new(rng);
    for _ in 0..2 {
        let task = cluster.create_task(TaskProfile {
            max_mem: 8,
            mem_volatility: 0.0,
            core_type: CoreType::General,
            load_profile: LoadProfile::MiddaySpike,
            load_factor: 2,
            run_time: 15,
        })?;
        place(&mut cluster, &mut policy, task)?;
    }
    Ok(SimSetup {
        cluster,
        policy: Box::new(policy),
        num_days: 1,
    })
}

fn core_mismatch(rng: &mut impl Rng) -> Result<SimSetup, ConfigurationError> {
    let mut cluster = Cluster::new(CoreEquivalency::default(), rng);
    let gpu_host = cluster.add_host(
        DataCenter::new(CountryCode::Isl),
        HostProfile {
            core: Core::new(CoreType::Gpu, 4),
            memory: 10,
        },
    )?;
    let task = cluster.create_task(TaskProfile {
        max_mem: 5,
        mem_volatility: 0.0,
        core_type: CoreType::General,
        load_profile: LoadProfile::SawTooth,
        load_factor: 20,
        run_time: 30,
    })?;
    // The only supply is the same GPU host, once for the initial placement
    // and once for the reschedule after the inevitable deficit failure.
    let mut policy = SequentialPolicy::new(vec![gpu_host.clone(), gpu_host]);
    place(&mut cluster, &mut policy, task)?;
    Ok(SimSetup {
        cluster,
        policy: Box::new(policy),
        num_days: 2,
    })
}

fn random_fleet(rng: &mut impl Rng) -> Result<SimSetup, ConfigurationError> {
    let mut cluster = Cluster::new(CoreEquivalency::default(), rng);
    let host_count = rng.gen_range(5..=15);
    for _ in 0..host_count {
        let dc = DataCenter::new(random_country(rng));
        let profile = HostProfile::random(&dc, rng);
        cluster.add_host(dc, profile)?;
    }
    let mut policy = RandomPolicy::new(rng);
    let task_count = rng.gen_range(10..=30);
    for _ in 0..task_count {
        let task = cluster.create_task(TaskProfile::random(rng))?;
        place(&mut cluster, &mut policy, task)?;
    }
    Ok(SimSetup {
        cluster,
        policy: Box::new(policy),
        num_days: 7,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::error::FailureKind;
    use crate::event::{MemorySink, SimEvent};
    use crate::scheduler::Scheduler;

    #[test]
    fn compute_restricted_fails_once_then_completes_on_larger_supply() {
        let mut rng = StdRng::seed_from_u64(42);
        let setup = TestCase::ComputeRestricted
            .set_up(&mut rng)
            .expect("scenario wires up");
        let mut scheduler = Scheduler::new(setup, MemorySink::default(), &mut rng);
        let report = scheduler.run().expect("run succeeds");

        assert_eq!(report.failures, 1);
        assert_eq!(report.failed_to_complete_failures, 1);
        assert_eq!(report.out_of_memory_failures, 0);
        assert_eq!(report.completed_tasks, 1);
        assert_eq!(report.unfinished_tasks, 0);

        let task = &scheduler.completed()[0];
        assert!(task.done());
        assert_eq!(task.compute_deficit(), 0.0);
        assert!(task.failed(), "failure history must survive completion");
        assert!(matches!(
            task.failure_cause(),
            Some(FailureKind::FailedToComplete { .. })
        ));
        assert!(task.cost() > 0.0);
    }

    #[test]
    fn memory_restricted_evicts_and_restarts_on_the_larger_host() {
        let mut rng = StdRng::seed_from_u64(42);
        let setup = TestCase::MemoryRestricted
            .set_up(&mut rng)
            .expect("scenario wires up");
        let mut scheduler = Scheduler::new(setup, MemorySink::default(), &mut rng);
        let report = scheduler.run().expect("run succeeds");

        assert_eq!(report.out_of_memory_failures, 1);
        assert_eq!(report.completed_tasks, 1);
        assert_eq!(report.unfinished_tasks, 0);

        // The eviction and the reassociation must both be on record, in
        // that order.
        let events = &scheduler.sink().events;
        let failed_at = events
            .iter()
            .position(|(_, e)| {
                matches!(
                    e,
                    SimEvent::TaskFailed {
                        cause: FailureKind::OutOfMemory { .. },
                        ..
                    }
                )
            })
            .expect("an out of memory failure is recorded");
        let reassociated_at = events
            .iter()
            .position(|(_, e)| matches!(e, SimEvent::TaskAssociated { .. }))
            .expect("the evicted task is rescheduled");
        assert!(failed_at < reassociated_at);

        let task = &scheduler.completed()[0];
        assert!(matches!(
            task.failure_cause(),
            Some(FailureKind::OutOfMemory { .. })
        ));
    }

    #[test]
    fn core_mismatch_keeps_failing_on_the_same_starved_supply() {
        let mut rng = StdRng::seed_from_u64(42);
        let setup = TestCase::CoreMismatch
            .set_up(&mut rng)
            .expect("scenario wires up");
        let mut scheduler = Scheduler::new(setup, MemorySink::default(), &mut rng);
        let report = scheduler.run().expect("run succeeds");

        assert_eq!(report.failed_to_complete_failures, 1);
        assert_eq!(report.completed_tasks, 0);
        assert_eq!(report.unfinished_tasks, 1, "the retry cannot finish in time");
    }

    #[test]
    fn multi_datacenter_workload_completes_within_a_day() {
        let mut rng = StdRng::seed_from_u64(42);
        let setup = TestCase::MultiDatacenter
            .set_up(&mut rng)
            .expect("scenario wires up");
        let mut scheduler = Scheduler::new(setup, MemorySink::default(), &mut rng);
        let report = scheduler.run().expect("run succeeds");

        assert_eq!(report.hosts, 2);
        assert_eq!(report.failures, 0);
        assert_eq!(report.completed_tasks, 2);
    }

    #[test]
    fn random_fleet_sets_up_within_its_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let setup = TestCase::Random.set_up(&mut rng).expect("scenario wires up");
        assert!((5..=15).contains(&setup.cluster.host_count()));
        assert!((10..=30).contains(&setup.cluster.associated_task_count()));
        assert_eq!(setup.num_days, 7);
    }
}
