//! State management module
//!
//! The timer data model, the engine that mutates it, the snapshot handed
//! to external surfaces, and the application state that owns it all.

pub mod app_state;
pub mod engine;
pub mod events;
pub mod snapshot;
pub mod throttle;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, Platform};
pub use engine::{TickOutcome, TimerEngine};
pub use events::TimerEvent;
pub use snapshot::{format_hms, CoarseState, DisplayParts, ModeTag, TimerSnapshot};
pub use throttle::SnapshotThrottler;
pub use timer_state::{RunStatus, TimerMode, TimerState};
