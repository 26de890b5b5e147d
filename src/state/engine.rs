//! Timer engine: the stopwatch/countdown state machine
//!
//! The engine is synchronous and never reads a clock itself. Every
//! time-dependent operation takes the current instant, and elapsed time is
//! always re-derived from the reference start instant instead of being
//! incremented per tick, so irregular tick intervals cannot accumulate
//! drift.

use std::time::{Duration, Instant};
use tracing::debug;

use super::{
    events::TimerEvent,
    snapshot::TimerSnapshot,
    timer_state::{RunStatus, TimerMode, TimerState},
};

/// Result of feeding a tick to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running, or the tick belongs to an earlier run
    Ignored,
    /// Elapsed time re-derived, still running
    Advanced { current_ms: u64 },
    /// The countdown reached zero on this tick
    Expired(TimerEvent),
}

/// Owner of the timer state and its transitions
#[derive(Debug, Clone)]
pub struct TimerEngine {
    state: TimerState,
    /// Time banked by earlier runs
    banked: Duration,
    /// Start of the current run; `Some` exactly while running
    segment_start: Option<Instant>,
    /// Identifies the current run so ticks from an earlier run are dropped
    generation: u64,
}

impl TimerEngine {
    pub fn new() -> Self {
        Self {
            state: TimerState::new(),
            banked: Duration::ZERO,
            segment_start: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.state.snapshot()
    }

    /// Generation of the current (or most recent) run
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start or resume the timer.
    ///
    /// Returns `None` when already running, or when a finished countdown
    /// has not been reset yet.
    pub fn start(&mut self, now: Instant) -> Option<TimerEvent> {
        match self.state.run_status {
            RunStatus::Running | RunStatus::Finished => return None,
            RunStatus::Idle | RunStatus::Paused => {}
        }

        self.segment_start = Some(now);
        self.generation += 1;
        self.state.run_status = RunStatus::Running;
        debug!("Timer run {} started at {}ms", self.generation, self.state.current_time_ms());

        Some(TimerEvent::Started {
            mode: self.state.mode,
            current_ms: self.state.current_time_ms(),
        })
    }

    /// Pause the timer, keeping the elapsed time.
    ///
    /// A countdown that is already at zero when stopped finishes instead
    /// of pausing, so its expiry is still reported once.
    pub fn stop(&mut self, now: Instant) -> Option<TimerEvent> {
        if !self.state.is_running() {
            return None;
        }

        if self.settle(now) {
            return Some(self.finish());
        }

        self.banked = self.elapsed_at(now);
        self.segment_start = None;
        self.state.run_status = RunStatus::Paused;

        Some(TimerEvent::Paused {
            current_ms: self.state.current_time_ms(),
        })
    }

    /// Start when stopped, stop when running
    pub fn toggle_start_stop(&mut self, now: Instant) -> Option<TimerEvent> {
        if self.state.is_running() {
            self.stop(now)
        } else {
            self.start(now)
        }
    }

    /// Return to the mode's start value from any state
    pub fn reset(&mut self) -> TimerEvent {
        self.clear_elapsed();
        self.state.run_status = RunStatus::Idle;

        TimerEvent::Reset {
            start_value_ms: self.state.start_value_ms(),
        }
    }

    /// Switch mode. Rejected while running.
    ///
    /// The countdown target is only replaced when switching to countdown;
    /// either way the timer goes back to the new mode's start value.
    pub fn set_mode(&mut self, is_countdown: bool, duration_ms: u64) -> Option<TimerEvent> {
        if self.state.is_running() {
            return None;
        }

        if is_countdown {
            self.state.mode = TimerMode::Countdown;
            self.state.target_ms = duration_ms;
        } else {
            self.state.mode = TimerMode::Stopwatch;
        }
        self.clear_elapsed();
        self.state.run_status = RunStatus::Idle;

        Some(TimerEvent::ModeChanged {
            mode: self.state.mode,
            target_ms: self.state.target_ms,
        })
    }

    pub fn toggle_mute(&mut self) -> TimerEvent {
        self.state.is_muted = !self.state.is_muted;
        TimerEvent::MuteToggled {
            muted: self.state.is_muted,
        }
    }

    /// Re-derive elapsed time for a fast-tick callback
    pub fn on_tick(&mut self, now: Instant, generation: u64) -> TickOutcome {
        if !self.state.is_running() || generation != self.generation {
            return TickOutcome::Ignored;
        }

        if self.settle(now) {
            return TickOutcome::Expired(self.finish());
        }

        TickOutcome::Advanced {
            current_ms: self.state.current_time_ms(),
        }
    }

    fn elapsed_at(&self, now: Instant) -> Duration {
        match self.segment_start {
            Some(start) => self.banked + now.saturating_duration_since(start),
            None => self.banked,
        }
    }

    /// Write the elapsed time at `now` into the state.
    ///
    /// This is the only place countdown expiry is detected. Returns true
    /// when the countdown has run out, with elapsed time clamped to the
    /// target.
    fn settle(&mut self, now: Instant) -> bool {
        let elapsed_ms = u64::try_from(self.elapsed_at(now).as_millis()).unwrap_or(u64::MAX);

        if self.state.is_countdown() && elapsed_ms >= self.state.target_ms {
            self.state.elapsed_ms = self.state.target_ms;
            return true;
        }

        self.state.elapsed_ms = elapsed_ms;
        false
    }

    fn finish(&mut self) -> TimerEvent {
        self.banked = Duration::from_millis(self.state.target_ms);
        self.segment_start = None;
        self.state.run_status = RunStatus::Finished;
        debug!("Timer run {} finished", self.generation);
        TimerEvent::Expired
    }

    fn clear_elapsed(&mut self) {
        self.banked = Duration::ZERO;
        self.segment_start = None;
        self.state.elapsed_ms = 0;
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}
