//! Platform services the timer calls into
//!
//! Each service is a trait so the engine's owner can be wired to real
//! surfaces or to test doubles: the widget's shared store and host, the
//! live-activity host, the notification center and the alarm.

pub mod live_activity;
pub mod notifications;
pub mod shared_store;
pub mod widget;

// Re-export main items
pub use live_activity::{
    ActivityHandle, ActivityKind, LiveActivityHost, LiveActivityPublisher, LiveActivityRecord,
    LoggingLiveActivityHost,
};
pub use notifications::{
    AlarmPlayer, BellAlarm, ExpiryNotification, NotificationScheduler, TokioNotificationScheduler,
};
pub use shared_store::{JsonFileStore, MemoryStore, SharedStore};
pub use widget::{publish_snapshot, LoggingWidgetHost, WidgetEntry, WidgetHost};
