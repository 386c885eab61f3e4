//! Randomized task and host profiles for synthetic workloads.
//!
//! The distributions here are deliberately skewed rather than uniform so that
//! a random run produces a believable mix: mostly mid-sized tasks with the
//! occasional monster, host fleets shaped by their datacenter's tier.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;

use crate::cores::{Core, CoreType};
use crate::datacenter::{CountryCode, DataCenter};
use crate::host::HostProfile;
use crate::load::LoadProfile;
use crate::task::TaskProfile;

const TASK_MEM_MB: [u64; 7] = [128, 64, 32, 16, 8, 2, 1];
const TASK_MEM_WEIGHTS: [f64; 7] = [0.05, 0.1, 0.25, 0.3, 0.15, 0.1, 0.05];

const TASK_CLASS_WEIGHTS: [f64; 3] = [0.2, 0.6, 0.2];

fn weighted_pick<T: Copy>(items: &[T], weights: &[f64], rng: &mut impl Rng) -> T {
    let dist = WeightedIndex::new(weights).expect("static weights are positive");
    items[dist.sample(rng)]
}

/// Draw a datacenter country according to the per-country placement weights.
pub fn random_country(rng: &mut impl Rng) -> CountryCode {
    let weights: Vec<f64> = CountryCode::ALL
        .iter()
        .map(|c| c.placement_weight())
        .collect();
    weighted_pick(&CountryCode::ALL, &weights, rng)
}

impl TaskProfile {
    /// A randomly drawn task profile.
    pub fn random(rng: &mut impl Rng) -> Self {
        TaskProfile {
            max_mem: weighted_pick(&TASK_MEM_MB, &TASK_MEM_WEIGHTS, rng),
            mem_volatility: rng.gen_range(0.0..0.1),
            core_type: weighted_pick(&CoreType::ALL, &TASK_CLASS_WEIGHTS, rng),
            load_profile: LoadProfile::ALL[rng.gen_range(0..LoadProfile::ALL.len())],
            load_factor: rng.gen_range(0..10),
            run_time: rng.gen_range(1..=72),
        }
    }
}

impl HostProfile {
    /// A randomly drawn host profile for a datacenter.
    ///
    /// The core class follows the datacenter tier's class mix; core count and
    /// memory then follow per-class distributions, so GPU hosts skew to fewer
    /// cores and less memory than general-purpose ones.
    pub fn random(datacenter: &DataCenter, rng: &mut impl Rng) -> Self {
        let class_weights = datacenter.tier().core_class_weights();
        let core_type = weighted_pick(&CoreType::ALL, &class_weights, rng);

        let (counts, count_weights): (&[u32], &[f64]) = match core_type {
            CoreType::Gpu => (&[16, 8, 4], &[0.1, 0.8, 0.1]),
            CoreType::General => (&[8, 4, 2], &[0.7, 0.2, 0.1]),
            CoreType::Batch => (&[4, 2, 1], &[0.1, 0.8, 0.1]),
        };
        let (memories, memory_weights): (&[u64], &[f64]) = match core_type {
            CoreType::Gpu => (&[64, 32, 16], &[0.1, 0.8, 0.1]),
            CoreType::General => (&[256, 128, 64], &[0.7, 0.2, 0.1]),
            CoreType::Batch => (&[32, 16, 8], &[0.1, 0.8, 0.1]),
        };

        HostProfile {
            core: Core::new(core_type, weighted_pick(counts, count_weights, rng)),
            memory: weighted_pick(memories, memory_weights, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_task_profiles_stay_within_their_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let p = TaskProfile::random(&mut rng);
            assert!(TASK_MEM_MB.contains(&p.max_mem));
            assert!((0.0..0.1).contains(&p.mem_volatility));
            assert!(p.load_factor < 10);
            assert!((1..=72).contains(&p.run_time));
        }
    }

    #[test]
    fn top_tier_hosts_never_supply_batch_cores() {
        let mut rng = StdRng::seed_from_u64(13);
        let dc = DataCenter::new(CountryCode::Isl);
        for _ in 0..200 {
            let p = HostProfile::random(&dc, &mut rng);
            assert_ne!(
                p.core.core_type,
                CoreType::Batch,
                "top tier weights exclude the batch class"
            );
            assert!(p.core.core_count >= 1);
            assert!(p.memory >= 8);
        }
    }

    #[test]
    fn low_tier_hosts_never_supply_gpu_cores() {
        let mut rng = StdRng::seed_from_u64(29);
        let dc = DataCenter::new(CountryCode::Pol);
        for _ in 0..200 {
            let p = HostProfile::random(&dc, &mut rng);
            assert_ne!(p.core.core_type, CoreType::Gpu);
        }
    }

    #[test]
    fn country_draw_covers_the_heavier_weights() {
        let mut rng = StdRng::seed_from_u64(31);
        let mut saw_isl = false;
        for _ in 0..100 {
            if random_country(&mut rng) == CountryCode::Isl {
                saw_isl = true;
            }
        }
        assert!(saw_isl, "a 0.4 weight should appear in 100 draws");
    }
}
