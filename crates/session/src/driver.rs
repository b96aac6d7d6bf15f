//! Async countdown driver

use crate::{ProctorSession, SessionOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Tick `session` every `period` until it terminates, by expiry or any
/// other path. Returns the final outcome.
pub async fn drive_countdown(
    session: Arc<Mutex<ProctorSession>>,
    period: Duration,
) -> Option<SessionOutcome> {
    let guard = session.lock().await.termination_guard();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while !guard.is_terminated() {
        interval.tick().await;
        if guard.is_terminated() {
            break;
        }
        if session.lock().await.on_tick() {
            debug!("Countdown driver fired expiry");
        }
    }

    session.lock().await.outcome().cloned()
}
