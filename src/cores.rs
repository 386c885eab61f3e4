//! Compute core classes and the cross-class equivalency table.
//!
//! A task declares the class of core it would prefer to run on; a host
//! supplies some class of core. When the two differ, the equivalency table
//! translates compute demand expressed in the task's preferred unit into the
//! equivalent amount of the host's actual unit.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// The class of compute unit a task prefers or a host supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoreType {
    Gpu,
    General,
    Batch,
}

impl CoreType {
    pub const ALL: [CoreType; 3] = [CoreType::Gpu, CoreType::General, CoreType::Batch];

    /// Three letter mnemonic used in ids and log lines.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            CoreType::Gpu => "GPU",
            CoreType::General => "CPU",
            CoreType::Batch => "BAT",
        }
    }

    /// Relative cost of one core-hour of this class, used when booking cost
    /// onto a task.
    pub fn unit_cost(&self) -> f64 {
        match self {
            CoreType::Gpu => 1.0,
            CoreType::General => 0.5,
            CoreType::Batch => 0.25,
        }
    }

    fn index(&self) -> usize {
        match self {
            CoreType::Gpu => 0,
            CoreType::General => 1,
            CoreType::Batch => 2,
        }
    }
}

impl fmt::Display for CoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// The compute capability of a host: a class of core and how many of them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Core {
    pub core_type: CoreType,
    pub core_count: u32,
}

impl Core {
    pub fn new(core_type: CoreType, core_count: u32) -> Self {
        Core {
            core_type,
            core_count,
        }
    }
}

/// Dense translation table over every ordered (required, supplied) pair.
///
/// `factor > 1.0` means the supplied class is overqualified for the demand,
/// `factor < 1.0` means it is weaker: a task asking for `D` units of its
/// preferred class needs `D / factor` units of the supplied class to get the
/// same effective work done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreEquivalency {
    // Rows indexed by required class, columns by supplied class.
    factors: [[f64; 3]; 3],
}

impl Default for CoreEquivalency {
    fn default() -> Self {
        CoreEquivalency {
            factors: [
                // supplied:  GPU   CPU   BAT
                /* GPU */ [1.0, 0.5, 0.25],
                /* CPU */ [1.25, 1.0, 0.5],
                /* BAT */ [1.5, 1.25, 1.0],
            ],
        }
    }
}

impl CoreEquivalency {
    /// Build a table from explicit factors, rows indexed by required class
    /// and columns by supplied class in [`CoreType::ALL`] order.
    ///
    /// Every multiplier must be positive and finite and same-class pairs must
    /// map to exactly 1.0; anything else is a wiring defect, not a runtime
    /// condition.
    pub fn new(factors: [[f64; 3]; 3]) -> Result<Self, ConfigurationError> {
        for required in CoreType::ALL {
            for supplied in CoreType::ALL {
                let f = factors[required.index()][supplied.index()];
                if !f.is_finite() || f <= 0.0 {
                    return Err(ConfigurationError::new(format!(
                        "equivalency for ({required}, {supplied}) must be a positive number, got {f}"
                    )));
                }
            }
            let diag = factors[required.index()][required.index()];
            if diag != 1.0 {
                return Err(ConfigurationError::new(format!(
                    "same-class equivalency for {required} must be 1.0, got {diag}"
                )));
            }
        }
        Ok(CoreEquivalency { factors })
    }

    /// Translation factor between the class a task asks for and the class a
    /// host supplies. Total over the closed enum domain, so a lookup can
    /// never miss.
    pub fn factor(&self, required: CoreType, supplied: CoreType) -> f64 {
        self.factors[required.index()][supplied.index()]
    }
}
