//! Main application state: the single owner of the timer engine

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};
use chrono::{DateTime, Utc};
use tokio::{
    runtime::Handle,
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    services::{AlarmPlayer, ExpiryNotification, NotificationScheduler, SharedStore},
    tasks::spawn_fast_tick,
    utils::Clock,
};
use super::{
    engine::{TickOutcome, TimerEngine},
    events::TimerEvent,
    snapshot::TimerSnapshot,
    timer_state::TimerState,
};

/// Platform services the application state calls into
#[derive(Clone)]
pub struct Platform {
    pub clock: Arc<dyn Clock>,
    pub notifications: Arc<dyn NotificationScheduler>,
    pub alarm: Arc<dyn AlarmPlayer>,
    pub store: Arc<dyn SharedStore>,
}

/// Owns the timer engine and serializes every mutation and tick on it.
///
/// Side effects that must be synchronous with a transition (fast-tick
/// subscription, expiry notification, alarm) run while the engine lock is
/// held. Publishers observe the result through the event and snapshot
/// channels and never touch the engine.
pub struct AppState {
    engine: Mutex<TimerEngine>,
    platform: Platform,
    /// Fast tick period
    tick_interval: Duration,
    /// Fast-tick task of the current run
    tick_task: Mutex<Option<JoinHandle<()>>>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    last_action: Mutex<Option<String>>,
    last_action_time: Mutex<Option<DateTime<Utc>>>,
    /// Channel for state change notifications
    event_tx: broadcast::Sender<TimerEvent>,
    /// Channel carrying the latest snapshot
    snapshot_tx: watch::Sender<TimerSnapshot>,
    /// Keep the receiver alive to prevent channel closure
    _snapshot_rx: watch::Receiver<TimerSnapshot>,
    /// Set once the process is shutting down
    shutdown_tx: watch::Sender<bool>,
}

impl AppState {
    pub fn new(port: u16, host: String, tick_interval: Duration, platform: Platform) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let (snapshot_tx, snapshot_rx) = watch::channel(TimerSnapshot::default());
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            engine: Mutex::new(TimerEngine::new()),
            platform,
            tick_interval,
            tick_task: Mutex::new(None),
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
            last_action_time: Mutex::new(None),
            event_tx,
            snapshot_tx,
            _snapshot_rx: snapshot_rx,
            shutdown_tx,
        }
    }

    fn lock_engine(&self) -> Result<MutexGuard<'_, TimerEngine>, String> {
        self.engine.lock()
            .map_err(|e| format!("Failed to lock timer engine: {}", e))
    }

    /// Start or resume the timer
    pub fn start(self: &Arc<Self>) -> Result<TimerSnapshot, String> {
        let runtime = Handle::try_current()
            .map_err(|e| format!("Cannot start timer outside a runtime: {}", e))?;
        let mut engine = self.lock_engine()?;
        Ok(self.apply_start(&runtime, &mut engine))
    }

    /// Pause the timer
    pub fn stop(&self) -> Result<TimerSnapshot, String> {
        let mut engine = self.lock_engine()?;
        Ok(self.apply_stop(&mut engine))
    }

    /// Start when stopped, stop when running
    pub fn toggle_start_stop(self: &Arc<Self>) -> Result<TimerSnapshot, String> {
        let runtime = Handle::try_current()
            .map_err(|e| format!("Cannot start timer outside a runtime: {}", e))?;
        let mut engine = self.lock_engine()?;
        match engine.toggle_start_stop(self.platform.clock.now()) {
            Some(event @ TimerEvent::Started { .. }) => Ok(self.after_start(&runtime, &mut engine, event)),
            Some(event) => Ok(self.after_stop(&mut engine, event)),
            None => {
                debug!("Toggle ignored while {:?}", engine.state().run_status);
                Ok(engine.snapshot())
            }
        }
    }

    /// Return to the mode's start value and cancel everything pending
    pub fn reset(&self) -> Result<TimerSnapshot, String> {
        let mut engine = self.lock_engine()?;
        self.cancel_fast_tick();
        self.platform.notifications.cancel_all();

        let event = engine.reset();
        info!("Timer reset");
        Ok(self.publish(&engine, event))
    }

    /// Switch mode; returns `None` when rejected because the timer runs
    pub fn set_mode(&self, is_countdown: bool, duration_ms: u64) -> Result<Option<TimerSnapshot>, String> {
        let mut engine = self.lock_engine()?;
        match engine.set_mode(is_countdown, duration_ms) {
            Some(event) => {
                info!("Timer mode set: countdown={}, duration={}ms", is_countdown, duration_ms);
                Ok(Some(self.publish(&engine, event)))
            }
            None => {
                warn!("Mode change rejected while the timer is running");
                Ok(None)
            }
        }
    }

    pub fn toggle_mute(&self) -> Result<TimerSnapshot, String> {
        let mut engine = self.lock_engine()?;
        let event = engine.toggle_mute();
        info!("Alarm muted: {}", engine.state().is_muted);
        Ok(self.publish(&engine, event))
    }

    /// Fast-tick callback. Returns false once the tick for `generation`
    /// should stop firing.
    pub fn tick(&self, generation: u64) -> bool {
        let mut engine = match self.engine.lock() {
            Ok(engine) => engine,
            Err(e) => {
                error!("Failed to lock timer engine for tick: {}", e);
                return false;
            }
        };

        match engine.on_tick(self.platform.clock.now(), generation) {
            TickOutcome::Ignored => false,
            TickOutcome::Advanced { .. } => {
                self.snapshot_tx.send_replace(engine.snapshot());
                true
            }
            TickOutcome::Expired(event) => {
                self.cancel_fast_tick();
                info!("Countdown reached zero, triggering alarm");
                self.sound_alarm(engine.state());
                self.publish(&engine, event);
                false
            }
        }
    }

    fn apply_start(self: &Arc<Self>, runtime: &Handle, engine: &mut TimerEngine) -> TimerSnapshot {
        let Some(event) = engine.start(self.platform.clock.now()) else {
            debug!("Start ignored while {:?}", engine.state().run_status);
            return engine.snapshot();
        };
        self.after_start(runtime, engine, event)
    }

    fn after_start(self: &Arc<Self>, runtime: &Handle, engine: &mut TimerEngine, event: TimerEvent) -> TimerSnapshot {
        self.subscribe_fast_tick(runtime, engine.generation());

        let remaining_ms = engine.state().current_time_ms();
        if engine.state().is_countdown() {
            self.arm_expiry(remaining_ms);
        }

        info!("Timer started at {}ms", remaining_ms);
        self.publish(engine, event)
    }

    fn apply_stop(&self, engine: &mut TimerEngine) -> TimerSnapshot {
        let Some(event) = engine.stop(self.platform.clock.now()) else {
            debug!("Stop ignored while {:?}", engine.state().run_status);
            return engine.snapshot();
        };
        self.after_stop(engine, event)
    }

    fn after_stop(&self, engine: &mut TimerEngine, event: TimerEvent) -> TimerSnapshot {
        self.cancel_fast_tick();
        if event == TimerEvent::Expired {
            info!("Countdown reached zero on stop, triggering alarm");
            self.sound_alarm(engine.state());
        } else {
            self.platform.notifications.cancel_all();
            info!("Timer stopped at {}ms", engine.state().current_time_ms());
        }

        self.publish(engine, event)
    }

    fn subscribe_fast_tick(self: &Arc<Self>, runtime: &Handle, generation: u64) {
        let handle = spawn_fast_tick(runtime, Arc::clone(self), generation, self.tick_interval);
        match self.tick_task.lock() {
            Ok(mut task) => {
                if let Some(previous) = task.replace(handle) {
                    previous.abort();
                }
            }
            Err(e) => {
                // The generation check still retires the task on the next stop
                error!("Failed to lock fast tick handle: {}", e);
            }
        }
    }

    fn cancel_fast_tick(&self) {
        match self.tick_task.lock() {
            Ok(mut task) => {
                if let Some(handle) = task.take() {
                    handle.abort();
                }
            }
            Err(e) => error!("Failed to lock fast tick handle: {}", e),
        }
    }

    fn arm_expiry(&self, remaining_ms: u64) {
        if remaining_ms == 0 {
            warn!("Invalid time interval for notification, must be greater than 0");
            return;
        }

        let notification = ExpiryNotification::countdown_finished(Duration::from_millis(remaining_ms));
        if let Err(e) = self.platform.notifications.schedule(notification) {
            warn!("Error scheduling notification: {}", e);
        }
    }

    fn sound_alarm(&self, state: &TimerState) {
        if state.is_muted {
            info!("Alarm is muted");
            return;
        }
        if let Err(e) = self.platform.alarm.play() {
            warn!("Failed to play alarm: {}", e);
        }
    }

    /// Push the new snapshot and broadcast the event
    fn publish(&self, engine: &TimerEngine, event: TimerEvent) -> TimerSnapshot {
        let snapshot = engine.snapshot();
        self.snapshot_tx.send_replace(snapshot.clone());

        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(event.name().to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(self.platform.clock.wall_now());
        }

        if self.event_tx.send(event).is_err() {
            debug!("No publishers listening for {}", event.name());
        }

        snapshot
    }

    /// Get current snapshot
    pub fn get_snapshot(&self) -> Result<TimerSnapshot, String> {
        self.lock_engine().map(|engine| engine.snapshot())
    }

    /// Get current timer state
    pub fn get_timer_state(&self) -> Result<TimerState, String> {
        self.lock_engine().map(|engine| engine.state().clone())
    }

    /// Generation of the current (or most recent) run, as passed to `tick`
    pub fn run_generation(&self) -> Result<u64, String> {
        self.lock_engine().map(|engine| engine.generation())
    }

    /// Check whether a fast-tick task is currently subscribed
    pub fn has_fast_tick(&self) -> bool {
        self.tick_task
            .lock()
            .map(|task| task.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    /// Subscribe to state change events
    pub fn subscribe_events(&self) -> broadcast::Receiver<TimerEvent> {
        self.event_tx.subscribe()
    }

    /// Watch the latest snapshot
    pub fn watch_snapshots(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Ask the publisher tasks to finish and exit
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn watch_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub fn shared_store(&self) -> Arc<dyn SharedStore> {
        Arc::clone(&self.platform.store)
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.platform.clock)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
