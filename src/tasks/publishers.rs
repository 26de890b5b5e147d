//! Once-per-second publishers for the widget and the live activity
//!
//! Both run as independent tasks reading the same snapshot channel. Each
//! publishes immediately on a state change event and otherwise at most
//! once per coarse second while the timer runs.

use std::{sync::Arc, time::Duration};
use chrono::{DateTime, Utc};
use tokio::{
    sync::broadcast::error::RecvError,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    services::{publish_snapshot, LiveActivityPublisher, SharedStore, WidgetHost},
    state::{AppState, SnapshotThrottler, TimerEvent, TimerSnapshot},
};

/// Writes snapshots to the widget's shared store
pub struct WidgetPublisher {
    store: Arc<dyn SharedStore>,
    host: Arc<dyn WidgetHost>,
    throttler: SnapshotThrottler,
}

impl WidgetPublisher {
    pub fn new(store: Arc<dyn SharedStore>, host: Arc<dyn WidgetHost>) -> Self {
        Self {
            store,
            host,
            throttler: SnapshotThrottler::new(),
        }
    }

    /// Publish after a state change, bypassing the throttle
    pub fn on_state_change(&mut self, snapshot: &TimerSnapshot) {
        self.throttler.force(snapshot.current_time_ms);
        self.write(snapshot);
    }

    /// Periodic check; returns true when something was published
    pub fn on_interval(&mut self, snapshot: &TimerSnapshot) -> bool {
        if !snapshot.is_running() || !self.throttler.should_publish(snapshot.current_time_ms) {
            return false;
        }
        self.write(snapshot);
        true
    }

    fn write(&self, snapshot: &TimerSnapshot) {
        // Best effort: the next publish supersedes a missed one
        if let Err(e) = publish_snapshot(self.store.as_ref(), self.host.as_ref(), snapshot) {
            warn!("Failed to publish widget state: {}", e);
        }
    }
}

/// Drives a live activity from timer events
pub struct LiveActivityDriver {
    publisher: LiveActivityPublisher,
    throttler: SnapshotThrottler,
}

impl LiveActivityDriver {
    pub fn new(publisher: LiveActivityPublisher) -> Self {
        Self {
            publisher,
            throttler: SnapshotThrottler::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.publisher.is_active()
    }

    pub fn on_event(&mut self, event: &TimerEvent, snapshot: &TimerSnapshot, now: DateTime<Utc>) {
        match event {
            TimerEvent::Started { .. } => {
                self.throttler.force(snapshot.current_time_ms);
                self.publisher.begin(snapshot, now);
            }
            event if event.ends_run() => self.publisher.end(now),
            _ => {}
        }
    }

    /// End whatever activity is still shown
    pub fn finish(&mut self, now: DateTime<Utc>) {
        self.publisher.end(now);
    }

    /// Periodic check; returns true when an update was sent
    pub fn on_interval(&mut self, snapshot: &TimerSnapshot, now: DateTime<Utc>) -> bool {
        if !snapshot.is_running()
            || !self.publisher.is_active()
            || !self.throttler.should_publish(snapshot.current_time_ms)
        {
            return false;
        }
        self.publisher.update(snapshot, now);
        true
    }
}

/// Background task keeping the widget's shared store current
pub async fn widget_publisher_task(
    state: Arc<AppState>,
    mut publisher: WidgetPublisher,
    period: Duration,
) {
    info!("Starting widget publisher task");

    let mut events = state.subscribe_events();
    let snapshots = state.watch_snapshots();
    let mut shutdown = state.watch_shutdown();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Overwrite whatever a previous process left in the store
    publisher.on_state_change(&snapshots.borrow().clone());

    loop {
        // Pending events are handled before the shutdown request
        tokio::select! {
            biased;
            received = events.recv() => match received {
                Ok(event) => {
                    let snapshot = snapshots.borrow().clone();
                    debug!("Publishing widget state after {}", event.name());
                    publisher.on_state_change(&snapshot);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Widget publisher lagged by {} events", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("Event channel closed, stopping widget publisher");
                    break;
                }
            },
            _ = shutdown.changed() => {
                info!("Stopping widget publisher");
                break;
            }
            _ = ticker.tick() => {
                let snapshot = snapshots.borrow().clone();
                publisher.on_interval(&snapshot);
            }
        }
    }
}

/// Background task mirroring the timer into a live activity
pub async fn live_activity_task(
    state: Arc<AppState>,
    mut driver: LiveActivityDriver,
    period: Duration,
) {
    info!("Starting live activity task");

    let clock = state.clock();
    let mut events = state.subscribe_events();
    let snapshots = state.watch_snapshots();
    let mut shutdown = state.watch_shutdown();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            received = events.recv() => match received {
                Ok(event) => {
                    let snapshot = snapshots.borrow().clone();
                    driver.on_event(&event, &snapshot, clock.wall_now());
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Live activity task lagged by {} events", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("Event channel closed, stopping live activity task");
                    break;
                }
            },
            _ = shutdown.changed() => {
                driver.finish(clock.wall_now());
                info!("Stopping live activity task");
                break;
            }
            _ = ticker.tick() => {
                let snapshot = snapshots.borrow().clone();
                driver.on_interval(&snapshot, clock.wall_now());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::{
        services::{
            ActivityHandle, ActivityKind, LiveActivityHost, LiveActivityRecord, MemoryStore,
            WidgetEntry,
        },
        state::{CoarseState, ModeTag, TimerMode},
    };

    #[derive(Default)]
    struct CountingWidgetHost(AtomicUsize);

    impl WidgetHost for CountingWidgetHost {
        fn reload_timelines(&self) -> Result<(), String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingActivityHost {
        requests: AtomicUsize,
        updates: AtomicUsize,
        ends: AtomicUsize,
    }

    impl LiveActivityHost for CountingActivityHost {
        fn request(&self, kind: ActivityKind, _record: &LiveActivityRecord) -> Result<ActivityHandle, String> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(ActivityHandle { id: "test".to_string(), kind })
        }

        fn update(&self, _handle: &ActivityHandle, _record: &LiveActivityRecord) -> Result<(), String> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn end(&self, _handle: &ActivityHandle, _record: &LiveActivityRecord) -> Result<(), String> {
            self.ends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn running(current_time_ms: u64) -> TimerSnapshot {
        TimerSnapshot {
            formatted_time: crate::state::format_hms(current_time_ms),
            coarse_state: CoarseState::Running,
            mode_tag: ModeTag::Stopwatch,
            current_time_ms,
            is_muted: false,
        }
    }

    #[test]
    fn test_widget_publishes_once_per_second_at_sixty_hz() {
        let store = Arc::new(MemoryStore::new());
        let host = Arc::new(CountingWidgetHost::default());
        let mut publisher = WidgetPublisher::new(store.clone(), host.clone());

        publisher.on_state_change(&running(0));
        for frame in 1..=120u64 {
            publisher.on_interval(&running(frame * 1000 / 60));
        }

        // One forced publish at 0s, then 1s and 2s
        assert_eq!(host.0.load(Ordering::SeqCst), 3);
        let entry = WidgetEntry::load(store.as_ref(), Utc::now());
        assert_eq!(entry.timer_value, "00:00:02");
        assert_eq!(entry.timer_state, "running");
    }

    #[test]
    fn test_widget_skips_periodic_publish_when_not_running() {
        let store = Arc::new(MemoryStore::new());
        let host = Arc::new(CountingWidgetHost::default());
        let mut publisher = WidgetPublisher::new(store, host.clone());

        let paused = TimerSnapshot {
            coarse_state: CoarseState::Paused,
            ..running(4000)
        };
        assert!(!publisher.on_interval(&paused));
        assert_eq!(host.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_live_activity_lifecycle() {
        let host = Arc::new(CountingActivityHost::default());
        let mut driver = LiveActivityDriver::new(LiveActivityPublisher::new(host.clone()));
        let now = Utc::now();

        let started = TimerEvent::Started { mode: TimerMode::Stopwatch, current_ms: 0 };
        driver.on_event(&started, &running(0), now);
        assert!(driver.is_active());

        assert!(!driver.on_interval(&running(500), now));
        assert!(driver.on_interval(&running(1000), now));
        assert!(!driver.on_interval(&running(1016), now));

        driver.on_event(&TimerEvent::Paused { current_ms: 1016 }, &running(1016), now);
        assert!(!driver.is_active());
        assert!(!driver.on_interval(&running(2000), now));

        assert_eq!(host.requests.load(Ordering::SeqCst), 1);
        assert_eq!(host.updates.load(Ordering::SeqCst), 1);
        assert_eq!(host.ends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_expiry_and_reset_end_the_activity() {
        let host = Arc::new(CountingActivityHost::default());
        let mut driver = LiveActivityDriver::new(LiveActivityPublisher::new(host.clone()));
        let now = Utc::now();
        let countdown = |current_time_ms| TimerSnapshot { mode_tag: ModeTag::Timer, ..running(current_time_ms) };
        let finished = TimerSnapshot { coarse_state: CoarseState::Stopped, ..countdown(0) };

        driver.on_event(&TimerEvent::Started { mode: TimerMode::Countdown, current_ms: 3000 }, &countdown(3000), now);
        assert!(driver.is_active());
        driver.on_event(&TimerEvent::Expired, &finished, now);
        assert!(!driver.is_active());

        driver.on_event(&TimerEvent::Started { mode: TimerMode::Countdown, current_ms: 3000 }, &countdown(3000), now);
        assert!(driver.is_active());
        let reset = TimerSnapshot { coarse_state: CoarseState::Stopped, ..countdown(3000) };
        driver.on_event(&TimerEvent::Reset { start_value_ms: 3000 }, &reset, now);
        assert!(!driver.is_active());

        assert_eq!(host.requests.load(Ordering::SeqCst), 2);
        assert_eq!(host.ends.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_far_future_countdown_starts_an_activity() {
        let host = Arc::new(CountingActivityHost::default());
        let mut driver = LiveActivityDriver::new(LiveActivityPublisher::new(host.clone()));
        let now = Utc::now();
        let huge = TimerSnapshot { mode_tag: ModeTag::Timer, ..running(9_000_000_000_000_000) };

        driver.on_event(&TimerEvent::Started { mode: TimerMode::Countdown, current_ms: huge.current_time_ms }, &huge, now);
        assert!(driver.is_active());
        assert!(driver.on_interval(&TimerSnapshot { current_time_ms: 8_999_999_999_998_000, ..huge.clone() }, now));
        driver.finish(now);

        assert!(!driver.is_active());
        assert_eq!(host.updates.load(Ordering::SeqCst), 1);
        assert_eq!(host.ends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mute_event_leaves_activity_alone() {
        let host = Arc::new(CountingActivityHost::default());
        let mut driver = LiveActivityDriver::new(LiveActivityPublisher::new(host.clone()));
        let now = Utc::now();

        driver.on_event(&TimerEvent::Started { mode: TimerMode::Countdown, current_ms: 5000 }, &running(5000), now);
        driver.on_event(&TimerEvent::MuteToggled { muted: true }, &running(4800), now);

        assert!(driver.is_active());
        assert_eq!(host.ends.load(Ordering::SeqCst), 0);
    }
}
