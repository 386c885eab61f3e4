//! Multi-datacenter compute scheduling simulator.
//!
//! Models tasks with hourly demand curves running on heterogeneous hosts
//! spread across datacenters in different timezones. A time-stepped scheduler
//! advances the fleet one simulated hour at a time; tasks that exhaust their
//! host's memory or finish in compute deficit are evicted and rescheduled
//! through a placement policy.

pub mod cases;
pub mod cluster;
pub mod cores;
pub mod datacenter;
pub mod error;
pub mod event;
pub mod host;
pub mod load;
pub mod policy;
pub mod profile;
pub mod scheduler;
pub mod shuffle;
pub mod task;
