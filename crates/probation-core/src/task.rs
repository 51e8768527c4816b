//! Periodic task runner.
//!
//! Each job runs on its own task so a wedged platform call in one job never
//! holds up another. Cancellation takes effect between ticks or by dropping
//! the in-flight cycle; ledger mutations are single atomic commits, so a
//! dropped cycle never leaves a half-applied record.

use crate::error::{Error, Result};
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How often each periodic job runs, and how long one cycle may take.
#[derive(Debug, Clone)]
pub struct TaskSchedule {
    pub reconcile_every: Duration,
    pub promote_every: Duration,
    pub cycle_timeout: Duration,
}

impl Default for TaskSchedule {
    fn default() -> Self {
        Self {
            reconcile_every: Duration::from_secs(15 * 60),
            promote_every: Duration::from_secs(60 * 60),
            cycle_timeout: Duration::from_secs(5 * 60),
        }
    }
}

/// Run `cycle` every `every` until `cancel` fires. The first cycle runs
/// immediately.
///
/// Cycle errors and timeouts are logged and the loop carries on; the next
/// tick starts from scratch.
pub async fn run_periodic<F, Fut, T>(
    name: &'static str,
    every: Duration,
    cycle_timeout: Duration,
    cancel: CancellationToken,
    mut cycle: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    T: Debug,
{
    info!(task = name, every_secs = every.as_secs(), "Periodic task starting");
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = timeout(cycle_timeout, cycle()) => {
                outcome.unwrap_or(Err(Error::Timeout(cycle_timeout)))
            }
        };

        match outcome {
            Ok(summary) => debug!(task = name, ?summary, "Cycle complete"),
            Err(e) => warn!(task = name, error = %e, "Cycle failed"),
        }
    }

    info!(task = name, "Periodic task stopped");
}
