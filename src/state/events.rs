//! Events emitted by the timer engine

use super::timer_state::TimerMode;

/// State changes announced to publishers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// A run began (fresh or resumed)
    Started { mode: TimerMode, current_ms: u64 },
    /// A run was paused
    Paused { current_ms: u64 },
    /// The timer went back to its start value
    Reset { start_value_ms: u64 },
    /// A countdown reached zero
    Expired,
    /// Mode or countdown target changed while not running
    ModeChanged { mode: TimerMode, target_ms: u64 },
    MuteToggled { muted: bool },
}

impl TimerEvent {
    /// Check if this event ends a run
    pub fn ends_run(&self) -> bool {
        matches!(
            self,
            TimerEvent::Paused { .. } | TimerEvent::Reset { .. } | TimerEvent::Expired
        )
    }

    /// Short name used in logs and last-action tracking
    pub fn name(&self) -> &'static str {
        match self {
            TimerEvent::Started { .. } => "start",
            TimerEvent::Paused { .. } => "stop",
            TimerEvent::Reset { .. } => "reset",
            TimerEvent::Expired => "expired",
            TimerEvent::ModeChanged { .. } => "mode",
            TimerEvent::MuteToggled { .. } => "mute",
        }
    }
}
