//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the broadcast channel for signal snapshots and the
//! in-memory [`IntersectionSnapshot`] that the REST endpoints serve.

use std::sync::Arc;

use crossroads_core::operator::OperatorState;
use crossroads_types::{RunId, SignalSnapshot, TransitionRecord};
use tokio::sync::{RwLock, broadcast};

/// Capacity of the broadcast channel for signal snapshots.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// Maximum number of phase transitions kept for `/api/transitions`.
pub const MAX_TRANSITIONS: usize = 500;

/// In-memory view of the intersection served by the REST endpoints.
#[derive(Debug, Clone)]
pub struct IntersectionSnapshot {
    /// Human-readable intersection name.
    pub name: String,
    /// Identifier of this controller run.
    pub run_id: RunId,
    /// The latest published signal snapshot.
    pub signals: SignalSnapshot,
    /// Recent phase transitions, oldest first, capped at [`MAX_TRANSITIONS`].
    pub transitions: Vec<TransitionRecord>,
}

impl IntersectionSnapshot {
    /// An empty view of a freshly started controller.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run_id: RunId::new(),
            signals: SignalSnapshot::initial(),
            transitions: Vec::new(),
        }
    }

    /// Replace the signal snapshot and append transitions to the history.
    pub fn apply(&mut self, signals: SignalSnapshot, transitions: impl IntoIterator<Item = TransitionRecord>) {
        self.transitions.extend(transitions);
        if self.transitions.len() > MAX_TRANSITIONS {
            let drain_count = self.transitions.len().saturating_sub(MAX_TRANSITIONS);
            self.transitions.drain(..drain_count);
        }
        self.signals = signals;
    }
}

impl Default for IntersectionSnapshot {
    fn default() -> Self {
        Self::new("Crossroads")
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for signal snapshots.
    pub tx: broadcast::Sender<SignalSnapshot>,
    /// The current intersection view (replaced after each tick).
    pub snapshot: Arc<RwLock<IntersectionSnapshot>>,
    /// Shared operator control state (present when the control loop runs).
    pub operator_state: Option<Arc<OperatorState>>,
}

impl AppState {
    /// Create a new application state with an all-red snapshot.
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            snapshot: Arc::new(RwLock::new(IntersectionSnapshot::new(name))),
            operator_state: None,
        }
    }

    /// Create a new application state with operator control state attached.
    pub fn with_operator(name: impl Into<String>, operator: Arc<OperatorState>) -> Self {
        Self {
            operator_state: Some(operator),
            ..Self::new(name)
        }
    }

    /// Subscribe to the snapshot broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<SignalSnapshot> {
        self.tx.subscribe()
    }

    /// Publish a snapshot to all connected clients.
    ///
    /// Returns the number of receivers. Zero is normal when no
    /// `WebSocket` client is connected.
    pub fn broadcast(&self, snapshot: &SignalSnapshot) -> usize {
        self.tx.send(snapshot.clone()).unwrap_or(0)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new("Crossroads")
    }
}
