//! Iteration planning
//!
//! Pure functions from (iteration index, static config) to an iteration plan:
//! session count per the selected growth strategy, plus the start window the
//! sessions draw their initial delay from.

use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;

/// Configuration errors. All of these are fatal and surfaced before any
/// session launches.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown growth strategy: {0}")]
    UnknownStrategy(String),

    #[error("Strategy yields zero sessions at iteration {0}")]
    ZeroSessions(u32),

    #[error("Session count overflows at iteration {0}")]
    CountOverflow(u32),

    #[error("Start window overflows at iteration {0}")]
    WindowOverflow(u32),

    #[error("Invalid delay window: min {min}s exceeds max {max}s")]
    InvalidWindow { min: u64, max: u64 },

    #[error("{0} must be at least 1")]
    NotPositive(&'static str),

    #[error("Invalid {field} URL: {message}")]
    InvalidUrl { field: &'static str, message: String },
}

/// How the session count grows from one iteration to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GrowthStrategy {
    /// Linear ramp: initial + iteration
    Additive,
    /// Compounding ramp: initial ^ iteration
    Exponential,
    /// Constant load: initial every iteration
    Slow,
}

impl FromStr for GrowthStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "additive" => Ok(GrowthStrategy::Additive),
            "exponential" => Ok(GrowthStrategy::Exponential),
            "slow" => Ok(GrowthStrategy::Slow),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

impl std::fmt::Display for GrowthStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrowthStrategy::Additive => write!(f, "additive"),
            GrowthStrategy::Exponential => write!(f, "exponential"),
            GrowthStrategy::Slow => write!(f, "slow"),
        }
    }
}

/// A bounded window to draw a random delay from, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayWindow {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl DelayWindow {
    /// Create a window, rejecting min > max
    pub fn new(min_secs: u64, max_secs: u64) -> Result<Self, ConfigError> {
        if min_secs > max_secs {
            return Err(ConfigError::InvalidWindow { min: min_secs, max: max_secs });
        }
        Ok(Self { min_secs, max_secs })
    }

    /// Draw a uniform random delay from [min, max]. A degenerate window
    /// (min == max) always yields that exact value.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        Duration::from_secs(rng.gen_range(self.min_secs..=self.max_secs))
    }
}

/// Static scheduling configuration shared by all iterations
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Session count seed for the growth strategy
    pub initial_sessions: u64,
    /// Number of ramp iterations
    pub iterations: u32,
    /// Seconds each iteration's start window shifts later than the previous
    pub spacing_secs: u64,
    /// Width of each iteration's start window in seconds
    pub max_wait_secs: u64,
    /// Growth strategy
    pub strategy: GrowthStrategy,
}

/// Plan for one iteration: how many sessions, and when they may start
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationPlan {
    pub iteration: u32,
    pub session_count: u64,
    pub start_window: DelayWindow,
}

/// Compute the plan for a single iteration.
///
/// Pure function of the iteration index and the static config. Growth that
/// would wrap (exponential with large seeds) is rejected via checked integer
/// arithmetic instead of silently truncating.
pub fn plan(iteration: u32, config: &SchedulerConfig) -> Result<IterationPlan, ConfigError> {
    let session_count = match config.strategy {
        GrowthStrategy::Additive => config
            .initial_sessions
            .checked_add(iteration as u64)
            .ok_or(ConfigError::CountOverflow(iteration))?,
        // initial^0 == 1 for every seed, including iteration 0 of a ramp
        // seeded above 1.
        GrowthStrategy::Exponential => config
            .initial_sessions
            .checked_pow(iteration)
            .ok_or(ConfigError::CountOverflow(iteration))?,
        GrowthStrategy::Slow => config.initial_sessions,
    };

    if session_count == 0 {
        return Err(ConfigError::ZeroSessions(iteration));
    }

    let min_secs = (iteration as u64)
        .checked_mul(config.spacing_secs)
        .ok_or(ConfigError::WindowOverflow(iteration))?;
    let max_secs = min_secs
        .checked_add(config.max_wait_secs)
        .ok_or(ConfigError::WindowOverflow(iteration))?;

    Ok(IterationPlan {
        iteration,
        session_count,
        start_window: DelayWindow { min_secs, max_secs },
    })
}

/// Compute every iteration's plan up front, so configuration errors surface
/// before the first session launches.
pub fn plan_all(config: &SchedulerConfig) -> Result<Vec<IterationPlan>, ConfigError> {
    (0..config.iterations).map(|i| plan(i, config)).collect()
}
