//! Test doubles shared by the integration tests

#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use supertime::{
    services::{
        ActivityHandle, ActivityKind, AlarmPlayer, ExpiryNotification, LiveActivityHost,
        LiveActivityRecord, MemoryStore, NotificationScheduler,
    },
    state::{AppState, Platform},
    utils::ManualClock,
};

#[derive(Default)]
pub struct RecordingNotifications {
    pub scheduled: Mutex<Vec<Duration>>,
    pub cancellations: AtomicUsize,
}

impl RecordingNotifications {
    pub fn scheduled(&self) -> Vec<Duration> {
        self.scheduled.lock().unwrap().clone()
    }

    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }
}

impl NotificationScheduler for RecordingNotifications {
    fn schedule(&self, notification: ExpiryNotification) -> Result<(), String> {
        self.scheduled.lock().unwrap().push(notification.fire_after);
        Ok(())
    }

    fn cancel_all(&self) {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingAlarm {
    pub plays: AtomicUsize,
    pub broken: bool,
}

impl RecordingAlarm {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

impl AlarmPlayer for RecordingAlarm {
    fn play(&self) -> Result<(), String> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err("audio session unavailable".to_string());
        }
        Ok(())
    }
}

/// Live-activity host recording each call with the record's running flag
#[derive(Default)]
pub struct RecordingActivityHost {
    pub calls: Mutex<Vec<(&'static str, bool)>>,
}

impl RecordingActivityHost {
    pub fn calls(&self) -> Vec<(&'static str, bool)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ended(&self) -> bool {
        self.calls().iter().any(|(call, _)| *call == "end")
    }
}

impl LiveActivityHost for RecordingActivityHost {
    fn request(&self, kind: ActivityKind, record: &LiveActivityRecord) -> Result<ActivityHandle, String> {
        self.calls.lock().unwrap().push(("request", record.is_running));
        Ok(ActivityHandle { id: "activity-1".to_string(), kind })
    }

    fn update(&self, _handle: &ActivityHandle, record: &LiveActivityRecord) -> Result<(), String> {
        self.calls.lock().unwrap().push(("update", record.is_running));
        Ok(())
    }

    fn end(&self, _handle: &ActivityHandle, record: &LiveActivityRecord) -> Result<(), String> {
        self.calls.lock().unwrap().push(("end", record.is_running));
        Ok(())
    }
}

pub struct Harness {
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub notifications: Arc<RecordingNotifications>,
    pub alarm: Arc<RecordingAlarm>,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_alarm(RecordingAlarm::default())
    }

    pub fn with_alarm(alarm: RecordingAlarm) -> Self {
        let clock = Arc::new(ManualClock::new());
        let notifications = Arc::new(RecordingNotifications::default());
        let alarm = Arc::new(alarm);
        let store = Arc::new(MemoryStore::new());

        let platform = Platform {
            clock: clock.clone(),
            notifications: notifications.clone(),
            alarm: alarm.clone(),
            store: store.clone(),
        };
        let state = Arc::new(AppState::new(
            0,
            "127.0.0.1".to_string(),
            Duration::from_millis(16),
            platform,
        ));

        Self { state, clock, notifications, alarm, store }
    }

    /// Advance the clock and deliver one tick for the current run
    pub fn tick_after(&self, ms: u64) -> bool {
        self.clock.advance_ms(ms);
        let generation = self.state.run_generation().unwrap();
        self.state.tick(generation)
    }
}
