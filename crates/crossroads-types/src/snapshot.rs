//! Published, serializable views of the scheduler state.
//!
//! The scheduling core hands a [`SignalSnapshot`] to renderers after every
//! completed tick. Because the snapshot is taken only once the tick has
//! fully applied, readers never observe a partially published selection.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::enums::{Phase, Selection, SelectionRule, SignalState};
use crate::lane::Lane;

/// Identifier of one controller process run (UUID v7, time-ordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RunId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A phase transition as published to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TransitionRecord {
    /// Tick on which the transition happened.
    pub tick: u64,
    /// Phase before the transition.
    pub from: Phase,
    /// Phase after the transition.
    pub to: Phase,
    /// The selection that was entered or left.
    pub selection: Option<Selection>,
    /// Lanes whose signal changed.
    pub lanes: Vec<Lane>,
    /// The selector rule that produced the selection (only on entry to green).
    pub rule: Option<SelectionRule>,
    /// Controller time of the transition, in milliseconds since start.
    pub at_ms: u64,
}

/// The complete published state of the intersection after one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SignalSnapshot {
    /// Tick number that produced this snapshot (1-based; 0 before any tick).
    pub tick: u64,
    /// Controller time of the tick, in milliseconds since start.
    pub now_ms: u64,
    /// Current controller phase.
    pub phase: Phase,
    /// The active selection, if any.
    pub selection: Option<Selection>,
    /// Lanes of the active selection.
    pub active_lanes: Vec<Lane>,
    /// Milliseconds left in the current green or yellow phase.
    pub remaining_ms: Option<u64>,
    /// Signal colour per lane.
    pub signals: BTreeMap<Lane, SignalState>,
    /// Start of continuous waiting per lane, in milliseconds since start.
    pub waiting_since_ms: BTreeMap<Lane, u64>,
    /// The transition performed on this tick, if any.
    pub transition: Option<TransitionRecord>,
    /// Wall-clock time the snapshot was published.
    pub published_at: DateTime<Utc>,
}

impl SignalSnapshot {
    /// Snapshot of a freshly started controller: idle, all lanes red.
    pub fn initial() -> Self {
        Self {
            tick: 0,
            now_ms: 0,
            phase: Phase::Idle,
            selection: None,
            active_lanes: Vec::new(),
            remaining_ms: None,
            signals: Lane::ALL
                .iter()
                .map(|lane| (*lane, SignalState::Red))
                .collect(),
            waiting_since_ms: BTreeMap::new(),
            transition: None,
            published_at: Utc::now(),
        }
    }

    /// Signal colour of a lane (red if absent).
    pub fn signal(&self, lane: Lane) -> SignalState {
        self.signals.get(&lane).copied().unwrap_or_default()
    }
}

impl Default for SignalSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}
