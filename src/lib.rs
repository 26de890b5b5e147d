//! SuperTime - a stopwatch and countdown timer engine
//!
//! This library provides the timer state machine, the application state
//! that owns it, and the publishers that mirror the timer into a
//! home-screen widget and a lock-screen live activity.

pub mod config;
pub mod state;
pub mod api;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use state::{AppState, Platform, TimerEngine, TimerSnapshot};
pub use api::create_router;
pub use utils::signals::shutdown_signal;
