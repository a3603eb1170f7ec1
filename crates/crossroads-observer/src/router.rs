//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::operator;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/signals` -- `WebSocket` signal snapshot stream
/// - `GET /api/signals` -- current signal table
/// - `GET /api/signals/{lane}` -- single lane
/// - `GET /api/phase` -- phase controller diagnostics
/// - `GET /api/transitions` -- recent phase transitions
/// - `POST /api/operator/{pause,resume,speed,stop}` and
///   `GET /api/operator/status` -- runtime control
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/signals", get(ws::ws_signals))
        // REST API
        .route("/api/signals", get(handlers::get_signals))
        .route("/api/signals/{lane}", get(handlers::get_lane))
        .route("/api/phase", get(handlers::get_phase))
        .route("/api/transitions", get(handlers::list_transitions))
        // Operator
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/resume", post(operator::resume))
        .route("/api/operator/speed", post(operator::set_speed))
        .route("/api/operator/status", get(operator::status))
        .route("/api/operator/stop", post(operator::stop))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
