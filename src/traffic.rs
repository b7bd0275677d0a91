//! Traffic generation loop
//!
//! Launches the planned visitor waves: one readiness barrier per iteration,
//! one task per session, fire-and-forget across iterations so successive
//! waves can overlap.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Barrier;
use tracing::info;

use crate::browser::SessionFactory;
use crate::scheduler::{self, ConfigError};
use crate::stats::RunStats;
use crate::visitor::{Visitor, VisitorIdentity};
use crate::RunConfig;

/// Run a full traffic generation session.
///
/// Every iteration plan is computed before the first session launches, so
/// configuration errors abort the run with nothing started. Iterations are
/// then launched back-to-back without waiting on earlier waves. The final
/// join only keeps the process alive until every visitor has finished;
/// individual outcomes are reported by the visitors themselves and are not
/// inspected or retried here.
pub async fn generate(
    config: &RunConfig,
    factory: Arc<dyn SessionFactory>,
    stats: Arc<RunStats>,
) -> Result<(), ConfigError> {
    config.validate()?;
    let plans = scheduler::plan_all(&config.scheduler())?;
    let linger = config.linger_window()?;

    let mut workers = Vec::new();
    for plan in plans {
        let barrier = Arc::new(Barrier::new(plan.session_count as usize));
        info!("---- Iteration #{} ({} sessions) ----", plan.iteration, plan.session_count);

        for index in 0..plan.session_count {
            info!(
                "Visitor(index = {}, window = [{}s, {}s])",
                index, plan.start_window.min_secs, plan.start_window.max_secs
            );
            let visitor = Visitor::new(
                VisitorIdentity { iteration: plan.iteration, index },
                config.visit_url.clone(),
                plan.start_window,
                linger,
                config.markers.clone(),
                barrier.clone(),
                factory.clone(),
                stats.clone(),
            );
            stats.record_launched();
            workers.push(tokio::spawn(visitor.run()));
        }
    }

    join_all(workers).await;

    let snapshot = stats.snapshot();
    info!(
        "Run finished: {} launched, {} completed, {} failed, {} pages visited",
        snapshot.sessions_launched,
        snapshot.sessions_completed,
        snapshot.sessions_failed,
        snapshot.pages_visited,
    );

    Ok(())
}
