//! Sitewave
//!
//! Generates ramped synthetic visitor traffic against a multi-page website by
//! driving many concurrent, isolated browser sessions through its page chain,
//! with per-iteration growth and randomized start/dwell times.

pub mod browser;
pub mod scheduler;
pub mod stats;
pub mod traffic;
pub mod visitor;

use std::path::PathBuf;

use tracing::info;

use scheduler::{ConfigError, DelayWindow, GrowthStrategy, SchedulerConfig};
use visitor::PageMarkers;

/// Full configuration for one traffic run
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Remote browser automation endpoint (DevTools websocket URL)
    pub endpoint: String,
    /// URL every visitor session loads first
    pub visit_url: String,
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
    /// Minimum per-page dwell in seconds
    pub min_linger_secs: u64,
    /// Maximum per-page dwell in seconds
    pub max_linger_secs: u64,
    /// Element ids the visited pages expose
    #[serde(default)]
    pub markers: PageMarkers,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            visit_url: String::new(),
            initial_sessions: 1,
            iterations: 1,
            spacing_secs: 0,
            max_wait_secs: 0,
            strategy: GrowthStrategy::Additive,
            min_linger_secs: 0,
            max_linger_secs: 0,
            markers: PageMarkers::default(),
        }
    }
}

impl RunConfig {
    /// Reject configurations that can never produce a valid run. Called
    /// before anything launches.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_sessions == 0 {
            return Err(ConfigError::NotPositive("initialSessions"));
        }
        if self.iterations == 0 {
            return Err(ConfigError::NotPositive("iterations"));
        }
        url::Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidUrl {
            field: "endpoint",
            message: e.to_string(),
        })?;
        url::Url::parse(&self.visit_url).map_err(|e| ConfigError::InvalidUrl {
            field: "visit",
            message: e.to_string(),
        })?;
        self.linger_window()?;
        Ok(())
    }

    /// The static scheduling inputs shared by all iterations
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            initial_sessions: self.initial_sessions,
            iterations: self.iterations,
            spacing_secs: self.spacing_secs,
            max_wait_secs: self.max_wait_secs,
            strategy: self.strategy,
        }
    }

    /// The per-page dwell window, constant across all sessions
    pub fn linger_window(&self) -> Result<DelayWindow, ConfigError> {
        DelayWindow::new(self.min_linger_secs, self.max_linger_secs)
    }
}

/// Get log directory path (shared across modules)
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sitewave").join("logs"))
}

/// Initialize logging: console always, daily rolling file when a log
/// directory is available.
pub fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false);

    if let Some(log_dir) = log_dir() {
        let _ = std::fs::create_dir_all(&log_dir);
        let file_appender = tracing_appender::rolling::daily(&log_dir, "sitewave.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Log files saved to: {}", log_dir.display());
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> RunConfig {
        RunConfig {
            endpoint: "ws://127.0.0.1:9222/devtools/browser/abc".to_string(),
            visit_url: "http://site.test/start".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn zero_counts_are_rejected() {
        let config = RunConfig { initial_sessions: 0, ..valid() };
        assert_eq!(config.validate(), Err(ConfigError::NotPositive("initialSessions")));

        let config = RunConfig { iterations: 0, ..valid() };
        assert_eq!(config.validate(), Err(ConfigError::NotPositive("iterations")));
    }

    #[test]
    fn malformed_urls_are_rejected() {
        let config = RunConfig { endpoint: "not a url".to_string(), ..valid() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { field: "endpoint", .. })));

        let config = RunConfig { visit_url: "also not a url".to_string(), ..valid() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { field: "visit", .. })));
    }

    #[test]
    fn inverted_linger_window_is_rejected() {
        let config = RunConfig { min_linger_secs: 9, max_linger_secs: 3, ..valid() };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidWindow { min: 9, max: 3 })
        );
    }
}
