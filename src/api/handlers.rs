//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::{error, info};

use crate::{
    services::WidgetEntry,
    state::AppState,
};
use super::responses::{ApiResponse, HealthResponse, ModeRequest, StatusResponse};

/// Handle POST /start - Start or resume the timer
pub async fn start_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    match state.start() {
        Ok(timer) => {
            info!("Start endpoint called - timer is {}", timer.coarse_state);
            Ok(Json(ApiResponse::ok("Timer started".to_string(), timer)))
        }
        Err(e) => {
            error!("Failed to start timer: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /stop - Pause the timer
pub async fn stop_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    match state.stop() {
        Ok(timer) => {
            info!("Stop endpoint called - timer is {}", timer.coarse_state);
            Ok(Json(ApiResponse::ok("Timer stopped".to_string(), timer)))
        }
        Err(e) => {
            error!("Failed to stop timer: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /toggle - Start when stopped, stop when running
pub async fn toggle_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    match state.toggle_start_stop() {
        Ok(timer) => {
            info!("Toggle endpoint called - timer is {}", timer.coarse_state);
            Ok(Json(ApiResponse::ok(format!("Timer {}", timer.coarse_state), timer)))
        }
        Err(e) => {
            error!("Failed to toggle timer: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /reset - Return the timer to its start value
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    match state.reset() {
        Ok(timer) => {
            info!("Reset endpoint called");
            Ok(Json(ApiResponse::ok("Timer reset".to_string(), timer)))
        }
        Err(e) => {
            error!("Failed to reset timer: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /mode - Switch between stopwatch and countdown
pub async fn mode_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ModeRequest>,
) -> Result<(StatusCode, Json<ApiResponse>), StatusCode> {
    match state.set_mode(request.countdown, request.duration_ms) {
        Ok(Some(timer)) => {
            info!("Mode endpoint called - mode is {}", timer.mode_tag);
            Ok((StatusCode::OK, Json(ApiResponse::ok(format!("Mode set to {}", timer.mode_tag), timer))))
        }
        Ok(None) => {
            let timer = state.get_snapshot().map_err(|e| {
                error!("Failed to get timer snapshot: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            Ok((
                StatusCode::CONFLICT,
                Json(ApiResponse::rejected("Cannot change mode while the timer is running".to_string(), timer)),
            ))
        }
        Err(e) => {
            error!("Failed to set timer mode: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /mute - Toggle the alarm sound
pub async fn mute_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    match state.toggle_mute() {
        Ok(timer) => {
            let message = if timer.is_muted { "Alarm muted" } else { "Alarm unmuted" };
            Ok(Json(ApiResponse::ok(message.to_string(), timer)))
        }
        Err(e) => {
            error!("Failed to toggle mute: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /status - Return the full timer status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let timer_state = match state.get_timer_state() {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to get timer state: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer: timer_state.snapshot(),
        mode: timer_state.mode,
        run_status: timer_state.run_status,
        elapsed_ms: timer_state.elapsed_ms,
        target_ms: timer_state.target_ms,
        display: timer_state.display_parts(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /widget - What the widget reads from the shared store
pub async fn widget_handler(State(state): State<Arc<AppState>>) -> Json<WidgetEntry> {
    let store = state.shared_store();
    Json(WidgetEntry::load(store.as_ref(), state.clock().wall_now()))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
