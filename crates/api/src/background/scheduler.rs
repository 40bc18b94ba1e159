//! Interval-driven dispatch for deployments without an external cron.
//!
//! Runs the same cycle as the HTTP trigger on a fixed period. Started from
//! `main.rs` only when `DISPATCH_INTERVAL_SECS` is set.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::dispatch::{run_dispatch, DispatchReport};
use crate::state::AppState;

/// Run the dispatch loop every `period` until `cancel` is triggered.
///
/// A tick that overruns the period delays the next one instead of firing
/// a burst, so runs never overlap.
pub async fn run(state: AppState, period: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = period.as_secs(), "Dispatch scheduler started");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Dispatch scheduler stopping");
                break;
            }
            _ = interval.tick() => {
                run_once(&state).await;
            }
        }
    }
}

/// One scheduled cycle. Errors are logged; the loop keeps going.
pub async fn run_once(state: &AppState) -> Option<DispatchReport> {
    let Some(transport) = state.transport.as_deref() else {
        tracing::error!("Dispatch scheduler: VAPID keys not configured, skipping run");
        return None;
    };

    match run_dispatch(
        state.store.as_ref(),
        transport,
        state.config.dispatch.concurrency,
    )
    .await
    {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::error!(error = %e, "Dispatch scheduler: failed to fetch notifications");
            None
        }
    }
}
