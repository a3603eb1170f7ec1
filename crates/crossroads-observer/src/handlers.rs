//! REST API endpoint handlers for the Observer server.
//!
//! All handlers read from the in-memory [`IntersectionSnapshot`] via the
//! shared [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/signals` | Current signal table and diagnostics |
//! | `GET` | `/api/signals/{lane}` | Single lane state |
//! | `GET` | `/api/phase` | Phase, selection, remaining time, waiting lanes |
//! | `GET` | `/api/transitions` | Recent phase transitions |
//!
//! [`IntersectionSnapshot`]: crate::state::IntersectionSnapshot

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use crossroads_types::{Lane, SignalState};

use crate::error::ObserverError;
use crate::state::{AppState, MAX_TRANSITIONS};

/// Default number of transitions returned by `/api/transitions`.
const DEFAULT_TRANSITION_LIMIT: usize = 50;

/// Query parameters for the `GET /api/transitions` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct TransitionsQuery {
    /// Maximum number of transitions to return (default 50).
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing the four lights and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    let name = &snapshot.name;
    let signals = &snapshot.signals;
    let tick = signals.tick;
    let phase = format!("{:?}", signals.phase).to_uppercase();
    let remaining = signals
        .remaining_ms
        .map_or_else(|| "-".to_owned(), |ms| format!("{ms} ms"));

    let lights: String = Lane::ALL
        .into_iter()
        .map(|lane| {
            let class = match signals.signal(lane) {
                SignalState::Red => "red",
                SignalState::Yellow => "yellow",
                SignalState::Green => "green",
            };
            let waiting = if signals.waiting_since_ms.contains_key(&lane) {
                "waiting"
            } else {
                ""
            };
            format!(
                r#"<div class="lane"><div class="light {class}"></div><div class="label">Lane {id}</div><div class="waiting">{waiting}</div></div>"#,
                id = lane.id()
            )
        })
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta http-equiv="refresh" content="1">
    <title>{name} Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .lane {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            text-align: center;
        }}
        .light {{ width: 48px; height: 48px; border-radius: 50%; margin: 0 auto 0.5rem; }}
        .red {{ background: #f85149; }}
        .yellow {{ background: #d29922; }}
        .green {{ background: #3fb950; }}
        .label {{ color: #8b949e; }}
        .waiting {{ color: #d29922; font-size: 0.8rem; min-height: 1rem; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>{name}</h1>
    <p class="subtitle">Tick {tick} -- phase {phase} -- remaining {remaining}</p>

    <div>{lights}</div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li><a href="/api/signals">/api/signals</a> -- Signal table and diagnostics</li>
        <li><a href="/api/signals/1">/api/signals/{{lane}}</a> -- Single lane</li>
        <li><a href="/api/phase">/api/phase</a> -- Phase controller state</li>
        <li><a href="/api/transitions">/api/transitions</a> -- Recent transitions (?limit=N)</li>
        <li><a href="/api/operator/status">/api/operator/status</a> -- Control loop status</li>
        <li><code>ws://host:port/ws/signals</code> -- Live signal stream</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/signals -- full signal snapshot
// ---------------------------------------------------------------------------

/// Return the latest published [`SignalSnapshot`](crossroads_types::SignalSnapshot).
pub async fn get_signals(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    Ok(Json(serde_json::json!({
        "intersection": snapshot.name,
        "run_id": snapshot.run_id,
        "snapshot": serde_json::to_value(&snapshot.signals)?,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/signals/{lane} -- single lane
// ---------------------------------------------------------------------------

/// Return the colour and wait state of one lane.
///
/// Responds `400` for a lane id outside 1-4.
pub async fn get_lane(
    State(state): State<Arc<AppState>>,
    Path(lane_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = lane_str
        .parse::<u8>()
        .map_err(|e| ObserverError::InvalidQuery(format!("lane {lane_str}: {e}")))?;
    let lane = Lane::new(id)?;

    let snapshot = state.snapshot.read().await;
    let signals = &snapshot.signals;

    Ok(Json(serde_json::json!({
        "lane": lane,
        "state": signals.signal(lane),
        "active": signals.active_lanes.contains(&lane),
        "waiting_since_ms": signals.waiting_since_ms.get(&lane),
        "tick": signals.tick,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/phase -- phase controller diagnostics
// ---------------------------------------------------------------------------

/// Return the phase, active selection, remaining time, and waiting lanes.
pub async fn get_phase(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let signals = &snapshot.signals;
    let waiting: Vec<Lane> = signals.waiting_since_ms.keys().copied().collect();

    Ok(Json(serde_json::json!({
        "tick": signals.tick,
        "now_ms": signals.now_ms,
        "phase": signals.phase,
        "selection": signals.selection,
        "active_lanes": signals.active_lanes,
        "remaining_ms": signals.remaining_ms,
        "waiting_lanes": waiting,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/transitions -- recent transitions
// ---------------------------------------------------------------------------

/// Return recent phase transitions, most recent first.
///
/// # Query Parameters
///
/// - `limit`: Maximum number of transitions (default 50, max 500).
pub async fn list_transitions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransitionsQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_TRANSITION_LIMIT)
        .min(MAX_TRANSITIONS);

    let snapshot = state.snapshot.read().await;
    let transitions: Vec<_> = snapshot.transitions.iter().rev().take(limit).collect();

    Ok(Json(serde_json::json!({
        "count": transitions.len(),
        "transitions": transitions,
    })))
}
