//! Background tasks module
//!
//! The fast tick that advances a running timer and the publishers that
//! mirror it to external surfaces.

pub mod fast_tick;
pub mod publishers;

// Re-export main functions
pub use fast_tick::spawn_fast_tick;
pub use publishers::{live_activity_task, widget_publisher_task, LiveActivityDriver, WidgetPublisher};
