//! Countdown expiry alerts: scheduled notifications and the alarm sound

use std::{
    io::Write,
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};
use tokio::{task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};

pub const EXPIRY_NOTIFICATION_ID: &str = "timerNotification";

/// One-shot alert fired when a countdown should have reached zero
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryNotification {
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub fire_after: Duration,
}

impl ExpiryNotification {
    pub fn countdown_finished(fire_after: Duration) -> Self {
        Self {
            identifier: EXPIRY_NOTIFICATION_ID.to_string(),
            title: "Timer Finished".to_string(),
            body: "Your countdown timer has reached zero.".to_string(),
            fire_after,
        }
    }
}

/// System notification center
pub trait NotificationScheduler: Send + Sync {
    fn schedule(&self, notification: ExpiryNotification) -> Result<(), String>;

    /// Remove every pending notification
    fn cancel_all(&self);
}

/// Notification center backed by tokio sleeps; delivery is a log line
#[derive(Debug, Default)]
pub struct TokioNotificationScheduler {
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl TokioNotificationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of notifications scheduled and not yet delivered
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .map(|pending| pending.iter().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }
}

impl NotificationScheduler for TokioNotificationScheduler {
    fn schedule(&self, notification: ExpiryNotification) -> Result<(), String> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| format!("No runtime to schedule notification on: {}", e))?;

        let mut pending = self.pending.lock()
            .map_err(|e| format!("Failed to lock pending notifications: {}", e))?;
        pending.retain(|handle| !handle.is_finished());

        debug!(
            "Scheduling notification {} in {:?}",
            notification.identifier, notification.fire_after
        );
        pending.push(runtime.spawn(async move {
            sleep(notification.fire_after).await;
            info!("{}: {}", notification.title, notification.body);
        }));
        Ok(())
    }

    fn cancel_all(&self) {
        match self.pending.lock() {
            Ok(mut pending) => {
                for handle in pending.drain(..) {
                    handle.abort();
                }
            }
            Err(e) => warn!("Failed to lock pending notifications: {}", e),
        }
    }
}

/// Audible alert played when a countdown finishes
pub trait AlarmPlayer: Send + Sync {
    fn play(&self) -> Result<(), String>;
}

/// Alarm that rings the terminal bell, optionally requiring a sound asset
#[derive(Debug, Default, Clone)]
pub struct BellAlarm {
    sound: Option<PathBuf>,
}

impl BellAlarm {
    pub fn new(sound: Option<PathBuf>) -> Self {
        Self { sound }
    }
}

impl AlarmPlayer for BellAlarm {
    fn play(&self) -> Result<(), String> {
        if let Some(sound) = &self.sound {
            if !sound.is_file() {
                return Err(format!("Alarm sound file not found: {}", sound.display()));
            }
        }

        let mut stderr = std::io::stderr();
        stderr.write_all(b"\x07")
            .and_then(|_| stderr.flush())
            .map_err(|e| format!("Error playing alarm sound: {}", e))?;

        info!("Alarm sound played successfully");
        Ok(())
    }
}
