//! SuperTime - a stopwatch and countdown timer service
//!
//! This is the main entry point for the supertime application.

use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::info;

use supertime::{
    api::create_router,
    config::Config,
    services::{
        BellAlarm, JsonFileStore, LiveActivityPublisher, LoggingLiveActivityHost,
        LoggingWidgetHost, TokioNotificationScheduler,
    },
    state::{AppState, Platform},
    tasks::{live_activity_task, widget_publisher_task, LiveActivityDriver, WidgetPublisher},
    utils::{shutdown_signal, SystemClock},
};

/// How long publishers get to flush their final state on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("supertime={},tower_http=info", config.log_level()))
        .init();

    info!("Starting supertime v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, store={}, tick={}Hz",
          config.host, config.port, config.store.display(), config.tick_hz);

    let platform = Platform {
        clock: Arc::new(SystemClock),
        notifications: Arc::new(TokioNotificationScheduler::new()),
        alarm: Arc::new(BellAlarm::new(config.alarm_sound.clone())),
        store: Arc::new(JsonFileStore::new(config.store.clone())),
    };

    // Create application state
    let state = Arc::new(AppState::new(
        config.port,
        config.host.clone(),
        config.tick_interval(),
        platform,
    ));

    // Start the external-surface publishers
    let widget_state = Arc::clone(&state);
    let widget = WidgetPublisher::new(state.shared_store(), Arc::new(LoggingWidgetHost));
    let publish_interval = config.publish_interval();
    let widget_task = tokio::spawn(async move {
        widget_publisher_task(widget_state, widget, publish_interval).await;
    });

    let activity_state = Arc::clone(&state);
    let activity = LiveActivityDriver::new(LiveActivityPublisher::new(
        Arc::new(LoggingLiveActivityHost::default()),
    ));
    let activity_task = tokio::spawn(async move {
        live_activity_task(activity_state, activity, publish_interval).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /start   - Start or resume the timer");
    info!("  POST /stop    - Pause the timer");
    info!("  POST /toggle  - Start or pause");
    info!("  POST /reset   - Reset to the start value");
    info!("  POST /mode    - Switch stopwatch/countdown");
    info!("  POST /mute    - Toggle the alarm sound");
    info!("  GET  /status  - Current timer status");
    info!("  GET  /widget  - Widget view of the shared store");
    info!("  GET  /health  - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // Drop pending alerts, then let the publishers end the live activity
    if let Err(e) = state.reset() {
        tracing::warn!("Failed to reset timer on shutdown: {}", e);
    }
    state.shutdown();

    let publishers = async {
        let _ = widget_task.await;
        let _ = activity_task.await;
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, publishers).await.is_err() {
        tracing::warn!("Publishers did not stop within {:?}", SHUTDOWN_GRACE);
    }

    info!("Server shutdown complete");
    Ok(())
}
