//! Datacenter locations: country, cost, performance tier and timezone.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cost/performance classification of a datacenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Top,
    Mid,
    Low,
}

impl Tier {
    /// Probability weights over core classes (GPU, GENERAL, BATCH) for hosts
    /// provisioned in this tier.
    pub fn core_class_weights(&self) -> [f64; 3] {
        match self {
            Tier::Top => [0.75, 0.25, 0.00],
            Tier::Mid => [0.20, 0.70, 0.10],
            Tier::Low => [0.00, 0.20, 0.80],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Europe,
    NorthAmerica,
    AsiaPacific,
}

impl Region {
    /// Offset from GMT, in whole hours.
    pub fn gmt_offset(&self) -> i32 {
        match self {
            Region::Europe => 0,
            Region::NorthAmerica => -5,
            Region::AsiaPacific => 7,
        }
    }
}

/// Countries a datacenter can be located in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CountryCode {
    Usa,
    Gbr,
    Aus,
    Pol,
    Isl,
    Hkg,
}

impl CountryCode {
    pub const ALL: [CountryCode; 6] = [
        CountryCode::Usa,
        CountryCode::Gbr,
        CountryCode::Aus,
        CountryCode::Pol,
        CountryCode::Isl,
        CountryCode::Hkg,
    ];

    pub fn mnemonic(&self) -> &'static str {
        match self {
            CountryCode::Usa => "USA",
            CountryCode::Gbr => "GBR",
            CountryCode::Aus => "AUS",
            CountryCode::Pol => "POL",
            CountryCode::Isl => "ISL",
            CountryCode::Hkg => "HKG",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CountryCode::Usa => "United States",
            CountryCode::Gbr => "Great Britain",
            CountryCode::Aus => "Australia",
            CountryCode::Pol => "Poland",
            CountryCode::Isl => "Iceland",
            CountryCode::Hkg => "Hong Kong",
        }
    }

    /// Probability of a randomly provisioned host landing in this country.
    pub fn placement_weight(&self) -> f64 {
        match self {
            CountryCode::Usa => 0.2,
            CountryCode::Gbr => 0.2,
            CountryCode::Aus => 0.1,
            CountryCode::Pol => 0.05,
            CountryCode::Isl => 0.4,
            CountryCode::Hkg => 0.05,
        }
    }

    /// Unit compute cost in (0, 1], where 1 is the most expensive location.
    pub fn compute_cost(&self) -> f64 {
        match self {
            CountryCode::Usa => 0.6,
            CountryCode::Gbr => 0.6,
            CountryCode::Aus => 0.95,
            CountryCode::Pol => 0.8,
            CountryCode::Isl => 0.5,
            CountryCode::Hkg => 0.95,
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            CountryCode::Usa | CountryCode::Gbr | CountryCode::Hkg => Tier::Mid,
            CountryCode::Aus | CountryCode::Pol => Tier::Low,
            CountryCode::Isl => Tier::Top,
        }
    }

    pub fn region(&self) -> Region {
        match self {
            CountryCode::Usa => Region::NorthAmerica,
            CountryCode::Gbr | CountryCode::Pol | CountryCode::Isl => Region::Europe,
            CountryCode::Aus | CountryCode::Hkg => Region::AsiaPacific,
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A datacenter location. Everything about it derives from its country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCenter {
    country: CountryCode,
}

impl DataCenter {
    pub fn new(country: CountryCode) -> Self {
        DataCenter { country }
    }

    pub fn country(&self) -> CountryCode {
        self.country
    }

    pub fn compute_cost(&self) -> f64 {
        self.country.compute_cost()
    }

    pub fn tier(&self) -> Tier {
        self.country.tier()
    }

    pub fn region(&self) -> Region {
        self.country.region()
    }

    /// Local hour of day for this datacenter's timezone, always in [0, 23].
    pub fn local_hour_of_day(&self, gmt_hour_of_day: u32) -> u32 {
        let offset = self.country.region().gmt_offset();
        (gmt_hour_of_day as i32 + offset).rem_euclid(24) as u32
    }
}

impl fmt::Display for DataCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-Cost:{}-{:?}",
            self.country.mnemonic(),
            self.country.name(),
            self.country.compute_cost(),
            self.country.tier(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_hour_is_always_normalized() {
        for country in CountryCode::ALL {
            let dc = DataCenter::new(country);
            for gmt_hour in 0..24 {
                let local = dc.local_hour_of_day(gmt_hour);
                assert!(local < 24, "{country} gmt {gmt_hour} gave {local}");
            }
        }
    }

    #[test]
    fn offsets_wrap_modularly() {
        let ny = DataCenter::new(CountryCode::Usa);
        assert_eq!(ny.local_hour_of_day(0), 19);
        assert_eq!(ny.local_hour_of_day(5), 0);

        let hk = DataCenter::new(CountryCode::Hkg);
        assert_eq!(hk.local_hour_of_day(20), 3);

        let london = DataCenter::new(CountryCode::Gbr);
        assert_eq!(london.local_hour_of_day(13), 13);
    }

    #[test]
    fn tier_weights_sum_to_one() {
        for tier in [Tier::Top, Tier::Mid, Tier::Low] {
            let total: f64 = tier.core_class_weights().iter().sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }
}
