//! Home-screen widget: publishing side and reading side of the shared store

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::state::TimerSnapshot;
use super::shared_store::{SharedStore, TIMER_MODE_KEY, TIMER_STATE_KEY, TIMER_VALUE_KEY};

pub const DEFAULT_TIMER_VALUE: &str = "00:00:00";
pub const DEFAULT_TIMER_STATE: &str = "stopped";
pub const DEFAULT_TIMER_MODE: &str = "stopwatch";

/// Host that renders the widget and can be asked to refresh it
pub trait WidgetHost: Send + Sync {
    fn reload_timelines(&self) -> Result<(), String>;
}

/// Widget host that only records the refresh request in the log
#[derive(Debug, Default)]
pub struct LoggingWidgetHost;

impl WidgetHost for LoggingWidgetHost {
    fn reload_timelines(&self) -> Result<(), String> {
        debug!("Widget timelines reload requested");
        Ok(())
    }
}

/// Write a snapshot into the shared store and ask the widget to refresh
pub fn publish_snapshot(
    store: &dyn SharedStore,
    host: &dyn WidgetHost,
    snapshot: &TimerSnapshot,
) -> Result<(), String> {
    store.set(TIMER_VALUE_KEY, &snapshot.formatted_time)?;
    store.set(TIMER_STATE_KEY, snapshot.coarse_state.as_str())?;
    store.set(TIMER_MODE_KEY, snapshot.mode_tag.as_str())?;
    host.reload_timelines()
}

/// What the widget shows at a given moment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetEntry {
    pub date: DateTime<Utc>,
    pub timer_value: String,
    pub timer_state: String,
    pub timer_mode: String,
}

impl WidgetEntry {
    /// Entry shown before any data is available
    pub fn placeholder(date: DateTime<Utc>) -> Self {
        Self {
            date,
            timer_value: DEFAULT_TIMER_VALUE.to_string(),
            timer_state: DEFAULT_TIMER_STATE.to_string(),
            timer_mode: DEFAULT_TIMER_MODE.to_string(),
        }
    }

    /// Read the current entry, falling back to defaults per key
    pub fn load(store: &dyn SharedStore, date: DateTime<Utc>) -> Self {
        Self {
            date,
            timer_value: store.get(TIMER_VALUE_KEY)
                .unwrap_or_else(|| DEFAULT_TIMER_VALUE.to_string()),
            timer_state: store.get(TIMER_STATE_KEY)
                .unwrap_or_else(|| DEFAULT_TIMER_STATE.to_string()),
            timer_mode: store.get(TIMER_MODE_KEY)
                .unwrap_or_else(|| DEFAULT_TIMER_MODE.to_string()),
        }
    }

    /// When the widget should ask for the next entry
    pub fn next_refresh(&self) -> DateTime<Utc> {
        self.date + Duration::seconds(1)
    }
}
