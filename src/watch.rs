//! The `watch` loop: a `check` on every tick, never two at once.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::config::Endpoint;
use crate::monitor::{Auditor, CheckReport, Pipeline};
use crate::rebuild::{BuildCoordinator, CompleteAction, RequestAction};

/// Run a check on every tick of `period` until `shutdown` completes.
///
/// Ticks that land while a check is running collapse into one follow-up
/// check. Every finished check is handed to `on_done`, including one whose
/// task panicked, and releases the coordinator. A check still running at
/// shutdown is cancelled.
pub async fn watch<S, F>(
    pipeline: Arc<Pipeline>,
    auditor: Arc<dyn Auditor>,
    pages: Arc<Vec<Endpoint>>,
    period: Duration,
    shutdown: S,
    mut on_done: F,
) -> Result<()>
where
    S: Future<Output = ()>,
    F: FnMut(Result<CheckReport>),
{
    if period.is_zero() {
        bail!("Watch interval must be greater than zero");
    }

    let mut coordinator = BuildCoordinator::new();
    let mut checks: JoinSet<Result<CheckReport>> = JoinSet::new();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!("Watching {} pages every {:?}", pages.len(), period);

    loop {
        tokio::select! {
            _ = ticker.tick() => match coordinator.request() {
                RequestAction::Start => spawn_check(&mut checks, &pipeline, &auditor, &pages),
                RequestAction::Queued => info!("Check still running; queued one follow-up"),
                RequestAction::Coalesced => info!("Check still running; follow-up already queued"),
            },
            Some(joined) = checks.join_next() => {
                on_done(joined.unwrap_or_else(|e| Err(anyhow!("Check task failed: {}", e))));
                if coordinator.complete() == CompleteAction::Restart {
                    spawn_check(&mut checks, &pipeline, &auditor, &pages);
                }
            }
            _ = &mut shutdown => {
                info!("Stopping watch ({})", coordinator.state());
                return Ok(());
            }
        }
    }
}

fn spawn_check(
    checks: &mut JoinSet<Result<CheckReport>>,
    pipeline: &Arc<Pipeline>,
    auditor: &Arc<dyn Auditor>,
    pages: &Arc<Vec<Endpoint>>,
) {
    let pipeline = Arc::clone(pipeline);
    let auditor = Arc::clone(auditor);
    let pages = Arc::clone(pages);
    checks.spawn(async move { pipeline.run_check(auditor.as_ref(), &pages, Utc::now()).await });
}
