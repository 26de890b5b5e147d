//! Timer state structure and derived values

use serde::{Deserialize, Serialize};

use super::snapshot::{CoarseState, DisplayParts, ModeTag, TimerSnapshot};

/// Counting direction of the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    /// Counts up from zero with no target
    Stopwatch,
    /// Counts down from `target_ms` to zero
    Countdown,
}

/// Run status of the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Paused,
    /// Countdown reached zero; only `reset` leaves this state
    Finished,
}

/// Timer state owned by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub mode: TimerMode,
    pub run_status: RunStatus,
    /// Milliseconds accumulated (stopwatch) or consumed (countdown)
    pub elapsed_ms: u64,
    /// Countdown duration, unused in stopwatch mode
    pub target_ms: u64,
    pub is_muted: bool,
}

impl TimerState {
    /// Create the start-up state: idle stopwatch
    pub fn new() -> Self {
        Self {
            mode: TimerMode::Stopwatch,
            run_status: RunStatus::Idle,
            elapsed_ms: 0,
            target_ms: 0,
            is_muted: false,
        }
    }

    /// Time shown to the user, in milliseconds
    pub fn current_time_ms(&self) -> u64 {
        match self.mode {
            TimerMode::Stopwatch => self.elapsed_ms,
            TimerMode::Countdown => self.target_ms.saturating_sub(self.elapsed_ms),
        }
    }

    /// Value `current_time_ms` takes after a reset in the current mode
    pub fn start_value_ms(&self) -> u64 {
        match self.mode {
            TimerMode::Stopwatch => 0,
            TimerMode::Countdown => self.target_ms,
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_status == RunStatus::Running
    }

    pub fn is_countdown(&self) -> bool {
        self.mode == TimerMode::Countdown
    }

    /// Collapse the run status into the three values external surfaces know
    pub fn coarse_state(&self) -> CoarseState {
        match self.run_status {
            RunStatus::Running => CoarseState::Running,
            RunStatus::Paused => CoarseState::Paused,
            RunStatus::Idle | RunStatus::Finished => CoarseState::Stopped,
        }
    }

    pub fn mode_tag(&self) -> ModeTag {
        match self.mode {
            TimerMode::Stopwatch => ModeTag::Stopwatch,
            TimerMode::Countdown => ModeTag::Timer,
        }
    }

    /// Minutes, seconds and milliseconds of the current time
    pub fn display_parts(&self) -> DisplayParts {
        DisplayParts::from_ms(self.current_time_ms())
    }

    /// Derive the snapshot consumed by external publishers
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot::from_state(self)
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}
