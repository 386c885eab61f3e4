//! The catalogue of 24-hour load shapes a task's demand can follow.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hours in one simulated day.
pub const HOURS_PER_DAY: usize = 24;

const FLAT: [f64; HOURS_PER_DAY] = [0.33; HOURS_PER_DAY];

const START_END_OF_DAY_SPIKE: [f64; HOURS_PER_DAY] = [
    0.1, 0.3, 0.8, 0.9, 1.0, 0.9, 0.6, 0.2, 0.2, 0.1, 0.1, 0.1, 0.2, 0.2, 0.2, 0.3, 0.8, 0.9, 1.0,
    0.9, 0.7, 0.3, 0.2, 0.1,
];

const MIDDAY_SPIKE: [f64; HOURS_PER_DAY] = [
    0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.3, 0.8, 0.9, 1.0, 0.9, 0.6, 0.2, 0.1, 0.1, 0.1, 0.1,
    0.1, 0.1, 0.1, 0.1, 0.1,
];

const SAW_TOOTH: [f64; HOURS_PER_DAY] = [
    0.1, 0.2, 0.4, 0.6, 0.9, 0.1, 0.1, 0.2, 0.4, 0.6, 0.9, 0.1, 0.2, 0.4, 0.6, 0.9, 0.1, 0.1, 0.2,
    0.4, 0.6, 0.9, 0.1, 0.1,
];

/// Relative demand intensity per hour-of-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadProfile {
    Flat,
    StartEndOfDaySpike,
    MiddaySpike,
    SawTooth,
}

impl LoadProfile {
    pub const ALL: [LoadProfile; 4] = [
        LoadProfile::Flat,
        LoadProfile::StartEndOfDaySpike,
        LoadProfile::MiddaySpike,
        LoadProfile::SawTooth,
    ];

    /// One multiplier in [0, 1] per hour of day.
    pub fn shape(&self) -> &'static [f64; HOURS_PER_DAY] {
        match self {
            LoadProfile::Flat => &FLAT,
            LoadProfile::StartEndOfDaySpike => &START_END_OF_DAY_SPIKE,
            LoadProfile::MiddaySpike => &MIDDAY_SPIKE,
            LoadProfile::SawTooth => &SAW_TOOTH,
        }
    }
}

impl fmt::Display for LoadProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadProfile::Flat => "Flat",
            LoadProfile::StartEndOfDaySpike => "Sod-Eod",
            LoadProfile::MiddaySpike => "Midday",
            LoadProfile::SawTooth => "Saw",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes_cover_the_day_and_stay_in_unit_range() {
        for profile in LoadProfile::ALL {
            let shape = profile.shape();
            assert_eq!(shape.len(), HOURS_PER_DAY);
            for (hour, &value) in shape.iter().enumerate() {
                assert!(
                    (0.0..=1.0).contains(&value),
                    "{profile} hour {hour} out of range: {value}"
                );
            }
        }
    }
}
