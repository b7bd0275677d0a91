//! Iteration scheduling module
//!
//! Computes, per ramp iteration, how many visitor sessions to launch and the
//! time window in which they begin navigating.

mod plan;

pub use plan::{plan, plan_all, ConfigError, DelayWindow, GrowthStrategy, IterationPlan, SchedulerConfig};
