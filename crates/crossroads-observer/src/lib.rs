//! Observer API server for the Crossroads intersection controller.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/signals`) streaming a
//!   [`SignalSnapshot`] after every tick via [`tokio::sync::broadcast`]
//! - **REST endpoints** for the current signal table, phase diagnostics,
//!   and recent phase transitions
//! - **Operator REST endpoints** for runtime control (pause, resume,
//!   poll interval, status, stop)
//! - **Minimal HTML dashboard** (`GET /`) showing the four lights
//!
//! # Architecture
//!
//! The observer reads from an in-memory [`IntersectionSnapshot`] that the
//! controller replaces after each completed tick. Handlers only ever see
//! whole published snapshots, never a half-applied tick. `WebSocket`
//! clients receive snapshots through a broadcast channel with automatic
//! lag handling.
//!
//! [`SignalSnapshot`]: crossroads_types::SignalSnapshot
//! [`IntersectionSnapshot`]: state::IntersectionSnapshot

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError};
pub use startup::{StartupError, spawn_observer};
pub use state::{AppState, IntersectionSnapshot};
