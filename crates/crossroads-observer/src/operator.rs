//! Operator REST API handlers for runtime control of the control loop.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/pause` | Pause polling; signals hold |
//! | `POST` | `/api/operator/resume` | Resume polling |
//! | `POST` | `/api/operator/speed` | Set poll interval (ms) |
//! | `GET` | `/api/operator/status` | Current control loop status |
//! | `POST` | `/api/operator/stop` | Trigger clean shutdown |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use crossroads_core::operator::{ControllerStatus, MIN_POLL_INTERVAL_MS, OperatorState};

use crate::error::ObserverError;
use crate::state::AppState;

/// Request body for `POST /api/operator/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New poll interval in milliseconds (minimum 10).
    pub poll_interval_ms: u64,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

fn operator(state: &AppState) -> Result<&Arc<OperatorState>, ObserverError> {
    state
        .operator_state
        .as_ref()
        .ok_or_else(|| ObserverError::Internal("operator state not available".to_owned()))
}

// ---------------------------------------------------------------------------
// POST /api/operator/pause
// ---------------------------------------------------------------------------

/// Pause the control loop. The current signals are held until resumed.
pub async fn pause(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.pause();

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Controller paused".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/resume
// ---------------------------------------------------------------------------

/// Resume the control loop after a pause.
pub async fn resume(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.resume();

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Controller resumed".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/speed
// ---------------------------------------------------------------------------

/// Change the poll interval at runtime.
///
/// Takes effect before the next sleep. Values below 10 ms are rejected.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator(&state)?;

    operator.set_poll_interval_ms(body.poll_interval_ms).map_or_else(
        || {
            Err(ObserverError::InvalidQuery(format!(
                "poll_interval_ms must be at least {MIN_POLL_INTERVAL_MS}"
            )))
        },
        |prev| {
            Ok(Json(serde_json::json!({
                "ok": true,
                "message": format!("Poll interval changed from {}ms to {}ms", prev, body.poll_interval_ms),
                "previous_interval_ms": prev,
                "new_interval_ms": body.poll_interval_ms,
            })))
        },
    )
}

// ---------------------------------------------------------------------------
// GET /api/operator/status
// ---------------------------------------------------------------------------

/// Return the control loop status: tick, pause state, interval, bounds,
/// rejected ticks, and end reason.
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator(&state)?;
    let tick = state.snapshot.read().await.signals.tick;
    let end_reason = operator.end_reason().await;

    Ok(Json(ControllerStatus {
        tick,
        paused: operator.is_paused(),
        stop_requested: operator.is_stop_requested(),
        poll_interval_ms: operator.poll_interval_ms(),
        elapsed_seconds: operator.elapsed_seconds(),
        max_ticks: operator.max_ticks(),
        max_real_time_seconds: operator.max_real_time_seconds(),
        rejected_ticks: operator.rejected_ticks(),
        end_reason,
        started_at: operator.started_at().to_rfc3339(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/stop
// ---------------------------------------------------------------------------

/// Trigger a clean shutdown of the control loop.
///
/// The HTTP server keeps serving the final state until the process is
/// interrupted.
pub async fn stop(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.request_stop();

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Stop requested -- controller will end before its next tick".to_owned(),
    }))
}
