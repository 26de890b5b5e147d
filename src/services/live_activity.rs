//! Live activity: the ambient lock-screen display of a running timer

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::state::{ModeTag, TimerSnapshot};

/// Kind of activity, fixed when the activity is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    Stopwatch,
    Countdown,
}

impl From<ModeTag> for ActivityKind {
    fn from(tag: ModeTag) -> Self {
        match tag {
            ModeTag::Stopwatch => ActivityKind::Stopwatch,
            ModeTag::Timer => ActivityKind::Countdown,
        }
    }
}

/// Handle to an activity granted by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityHandle {
    pub id: String,
    pub kind: ActivityKind,
}

/// Content pushed to the activity.
///
/// The display counts from a date on its own, so only anchors are sent:
/// a stopwatch anchors on `start_date` (`end_date` is a placeholder), a
/// countdown anchors on `end_date` (`start_date` is a placeholder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveActivityRecord {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_running: bool,
}

impl LiveActivityRecord {
    /// Anchors past the representable date range saturate at its bounds
    pub fn for_snapshot(snapshot: &TimerSnapshot, now: DateTime<Utc>) -> Self {
        let current = Duration::milliseconds(i64::try_from(snapshot.current_time_ms).unwrap_or(i64::MAX));
        let (start_date, end_date) = match snapshot.mode_tag {
            ModeTag::Stopwatch => (
                now.checked_sub_signed(current).unwrap_or(DateTime::<Utc>::MIN_UTC),
                now,
            ),
            ModeTag::Timer => (
                now,
                now.checked_add_signed(current).unwrap_or(DateTime::<Utc>::MAX_UTC),
            ),
        };

        Self {
            start_date,
            end_date,
            is_running: snapshot.is_running(),
        }
    }

    /// Final record sent when the activity ends
    pub fn ended(now: DateTime<Utc>) -> Self {
        Self {
            start_date: now,
            end_date: now,
            is_running: false,
        }
    }

    /// A surface shows a countdown while the end anchor is in the future
    pub fn shows_countdown(&self, now: DateTime<Utc>) -> bool {
        self.end_date > now
    }
}

/// OS service owning live activities
pub trait LiveActivityHost: Send + Sync {
    fn request(&self, kind: ActivityKind, record: &LiveActivityRecord) -> Result<ActivityHandle, String>;
    fn update(&self, handle: &ActivityHandle, record: &LiveActivityRecord) -> Result<(), String>;
    fn end(&self, handle: &ActivityHandle, record: &LiveActivityRecord) -> Result<(), String>;
}

/// Host that logs activity traffic instead of rendering it
#[derive(Debug, Default)]
pub struct LoggingLiveActivityHost {
    next_id: AtomicU64,
}

impl LiveActivityHost for LoggingLiveActivityHost {
    fn request(&self, kind: ActivityKind, record: &LiveActivityRecord) -> Result<ActivityHandle, String> {
        let id = format!("activity-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        info!("{:?} live activity started. ID: {}", kind, id);
        debug!("Live activity {} content: {:?}", id, record);
        Ok(ActivityHandle { id, kind })
    }

    fn update(&self, handle: &ActivityHandle, record: &LiveActivityRecord) -> Result<(), String> {
        debug!(
            "Updating live activity {}: start={} end={} running={}",
            handle.id, record.start_date, record.end_date, record.is_running
        );
        Ok(())
    }

    fn end(&self, handle: &ActivityHandle, _record: &LiveActivityRecord) -> Result<(), String> {
        info!("Live activity {} ended", handle.id);
        Ok(())
    }
}

/// Keeps at most one activity alive and degrades to "no activity" on errors
pub struct LiveActivityPublisher {
    host: Arc<dyn LiveActivityHost>,
    current: Option<ActivityHandle>,
}

impl LiveActivityPublisher {
    pub fn new(host: Arc<dyn LiveActivityHost>) -> Self {
        Self { host, current: None }
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Request an activity for a run that just began, unless one is held
    pub fn begin(&mut self, snapshot: &TimerSnapshot, now: DateTime<Utc>) {
        if self.current.is_some() {
            return;
        }

        let record = LiveActivityRecord::for_snapshot(snapshot, now);
        match self.host.request(snapshot.mode_tag.into(), &record) {
            Ok(handle) => self.current = Some(handle),
            Err(e) => warn!("Failed to start live activity: {}", e),
        }
    }

    pub fn update(&mut self, snapshot: &TimerSnapshot, now: DateTime<Utc>) {
        let Some(handle) = &self.current else {
            return;
        };

        let record = LiveActivityRecord::for_snapshot(snapshot, now);
        if let Err(e) = self.host.update(handle, &record) {
            warn!("Failed to update live activity {}: {}", handle.id, e);
        }
    }

    /// Send the final record and release the handle
    pub fn end(&mut self, now: DateTime<Utc>) {
        let Some(handle) = self.current.take() else {
            return;
        };

        if let Err(e) = self.host.end(&handle, &LiveActivityRecord::ended(now)) {
            warn!("Failed to end live activity {}: {}", handle.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use crate::state::CoarseState;

    #[derive(Default)]
    struct RecordingHost {
        calls: Mutex<Vec<String>>,
        refuse: bool,
    }

    impl LiveActivityHost for RecordingHost {
        fn request(&self, kind: ActivityKind, _record: &LiveActivityRecord) -> Result<ActivityHandle, String> {
            if self.refuse {
                return Err("activities disabled".to_string());
            }
            self.calls.lock().unwrap().push("request".to_string());
            Ok(ActivityHandle { id: "a1".to_string(), kind })
        }

        fn update(&self, _handle: &ActivityHandle, _record: &LiveActivityRecord) -> Result<(), String> {
            self.calls.lock().unwrap().push("update".to_string());
            Ok(())
        }

        fn end(&self, _handle: &ActivityHandle, record: &LiveActivityRecord) -> Result<(), String> {
            assert!(!record.is_running);
            self.calls.lock().unwrap().push("end".to_string());
            Ok(())
        }
    }

    fn snapshot(mode_tag: ModeTag, current_time_ms: u64) -> TimerSnapshot {
        TimerSnapshot {
            formatted_time: crate::state::format_hms(current_time_ms),
            coarse_state: CoarseState::Running,
            mode_tag,
            current_time_ms,
            is_muted: false,
        }
    }

    #[test]
    fn test_stopwatch_record_anchors_on_start() {
        let now = Utc::now();
        let record = LiveActivityRecord::for_snapshot(&snapshot(ModeTag::Stopwatch, 90_000), now);
        assert_eq!(now - record.start_date, Duration::seconds(90));
        assert_eq!(record.end_date, now);
        assert!(record.is_running);
        assert!(!record.shows_countdown(now));
    }

    #[test]
    fn test_countdown_record_anchors_on_end() {
        let now = Utc::now();
        let record = LiveActivityRecord::for_snapshot(&snapshot(ModeTag::Timer, 30_000), now);
        assert_eq!(record.start_date, now);
        assert_eq!(record.end_date - now, Duration::seconds(30));
        assert!(record.shows_countdown(now));
    }

    #[test]
    fn test_huge_durations_saturate_instead_of_overflowing() {
        let now = Utc::now();

        let countdown = LiveActivityRecord::for_snapshot(&snapshot(ModeTag::Timer, u64::MAX), now);
        assert_eq!(countdown.start_date, now);
        assert_eq!(countdown.end_date, DateTime::<Utc>::MAX_UTC);
        assert!(countdown.shows_countdown(now));

        let stopwatch = LiveActivityRecord::for_snapshot(&snapshot(ModeTag::Stopwatch, u64::MAX), now);
        assert_eq!(stopwatch.start_date, DateTime::<Utc>::MIN_UTC);
        assert_eq!(stopwatch.end_date, now);

        // Within i64 milliseconds but past the calendar range
        let far = LiveActivityRecord::for_snapshot(&snapshot(ModeTag::Timer, 9_000_000_000_000_000), now);
        assert_eq!(far.end_date, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_publisher_holds_one_activity() {
        let host = Arc::new(RecordingHost::default());
        let mut publisher = LiveActivityPublisher::new(host.clone());
        let now = Utc::now();

        publisher.begin(&snapshot(ModeTag::Stopwatch, 0), now);
        publisher.begin(&snapshot(ModeTag::Stopwatch, 0), now);
        publisher.update(&snapshot(ModeTag::Stopwatch, 1000), now);
        publisher.end(now);
        publisher.end(now);
        publisher.update(&snapshot(ModeTag::Stopwatch, 2000), now);

        assert_eq!(*host.calls.lock().unwrap(), vec!["request", "update", "end"]);
        assert!(!publisher.is_active());
    }

    #[test]
    fn test_refused_request_leaves_no_activity() {
        let host = Arc::new(RecordingHost { refuse: true, ..Default::default() });
        let mut publisher = LiveActivityPublisher::new(host.clone());
        let now = Utc::now();

        publisher.begin(&snapshot(ModeTag::Timer, 5000), now);
        publisher.update(&snapshot(ModeTag::Timer, 4000), now);
        publisher.end(now);

        assert!(!publisher.is_active());
        assert!(host.calls.lock().unwrap().is_empty());
    }
}
