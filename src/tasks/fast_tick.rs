//! Fast in-app tick driving the timer while it runs

use std::{sync::Arc, time::Duration};
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::debug;

use crate::state::AppState;

/// Spawn the tick loop for one run of the timer.
///
/// The loop ends by itself once the state reports the run is over; the
/// owner also aborts it on stop and reset.
pub fn spawn_fast_tick(
    runtime: &Handle,
    state: Arc<AppState>,
    generation: u64,
    period: Duration,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if !state.tick(generation) {
                debug!("Fast tick for run {} finished", generation);
                break;
            }
        }
    })
}
