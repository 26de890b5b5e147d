//! Snapshot of the timer for external surfaces, plus time formatting

use std::fmt;
use serde::{Deserialize, Serialize};

use super::timer_state::TimerState;

/// Run status as seen by the widget: `running`, `paused` or `stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoarseState {
    Running,
    Paused,
    Stopped,
}

impl CoarseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoarseState::Running => "running",
            CoarseState::Paused => "paused",
            CoarseState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for CoarseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode as seen by the widget: `stopwatch` or `timer`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeTag {
    Stopwatch,
    Timer,
}

impl ModeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeTag::Stopwatch => "stopwatch",
            ModeTag::Timer => "timer",
        }
    }
}

impl fmt::Display for ModeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    /// `HH:MM:SS`, zero padded
    pub formatted_time: String,
    pub coarse_state: CoarseState,
    pub mode_tag: ModeTag,
    pub current_time_ms: u64,
    pub is_muted: bool,
}

impl TimerSnapshot {
    pub fn from_state(state: &TimerState) -> Self {
        let current_time_ms = state.current_time_ms();
        Self {
            formatted_time: format_hms(current_time_ms),
            coarse_state: state.coarse_state(),
            mode_tag: state.mode_tag(),
            current_time_ms,
            is_muted: state.is_muted,
        }
    }

    pub fn is_running(&self) -> bool {
        self.coarse_state == CoarseState::Running
    }
}

impl Default for TimerSnapshot {
    fn default() -> Self {
        Self::from_state(&TimerState::new())
    }
}

/// Format milliseconds as `HH:MM:SS`
pub fn format_hms(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Split of the current time used by the in-app display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayParts {
    /// Total whole minutes
    pub minutes: u64,
    /// Seconds within the current minute
    pub seconds: u64,
    /// Milliseconds within the current second
    pub millis: u64,
}

impl DisplayParts {
    pub fn from_ms(ms: u64) -> Self {
        Self {
            minutes: ms / 60_000,
            seconds: (ms % 60_000) / 1000,
            millis: ms % 1000,
        }
    }
}

impl fmt::Display for DisplayParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} m {} s {:03} ms", self.minutes, self.seconds, self.millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::timer_state::{RunStatus, TimerMode};

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(999), "00:00:00");
        assert_eq!(format_hms(61_000), "00:01:01");
        assert_eq!(format_hms(3_723_456), "01:02:03");
        assert_eq!(format_hms(100 * 3_600_000), "100:00:00");
    }

    #[test]
    fn test_display_parts() {
        let parts = DisplayParts::from_ms(125_042);
        assert_eq!(parts.minutes, 2);
        assert_eq!(parts.seconds, 5);
        assert_eq!(parts.millis, 42);
        assert_eq!(parts.to_string(), "2 m 5 s 042 ms");
    }

    #[test]
    fn test_snapshot_of_paused_countdown() {
        let state = TimerState {
            mode: TimerMode::Countdown,
            run_status: RunStatus::Paused,
            elapsed_ms: 1_500,
            target_ms: 90_000,
            is_muted: true,
        };

        let snapshot = state.snapshot();
        assert_eq!(snapshot.formatted_time, "00:01:28");
        assert_eq!(snapshot.coarse_state, CoarseState::Paused);
        assert_eq!(snapshot.mode_tag, ModeTag::Timer);
        assert_eq!(snapshot.current_time_ms, 88_500);
        assert!(snapshot.is_muted);
    }

    #[test]
    fn test_tags_serialize_as_widget_strings() {
        assert_eq!(serde_json::to_string(&CoarseState::Stopped).unwrap(), "\"stopped\"");
        assert_eq!(serde_json::to_string(&ModeTag::Timer).unwrap(), "\"timer\"");
    }
}
