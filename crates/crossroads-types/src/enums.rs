//! Enumeration types for the Crossroads controller.
//!
//! Signal colours, controller phases, and the selection vocabulary used by
//! the pair selector.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::lane::PairId;

// ---------------------------------------------------------------------------
// Signal state
// ---------------------------------------------------------------------------

/// The colour currently shown to a lane.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum SignalState {
    /// Stop. Every lane starts here.
    #[default]
    Red,
    /// Clearing interval after green.
    Yellow,
    /// Proceed.
    Green,
}

impl SignalState {
    /// Whether the lane is currently being served (green or yellow).
    pub const fn is_serving(self) -> bool {
        matches!(self, Self::Yellow | Self::Green)
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Mode of the phase controller.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Phase {
    /// No selection; every lane is red.
    #[default]
    Idle,
    /// The active selection is green until the green deadline.
    Green,
    /// The active selection is yellow until the yellow deadline.
    Yellow,
}

impl Phase {
    /// The signal colour shown to lanes of the active selection in this
    /// phase.
    pub const fn signal(self) -> SignalState {
        match self {
            Self::Idle => SignalState::Red,
            Self::Green => SignalState::Green,
            Self::Yellow => SignalState::Yellow,
        }
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// The set of lanes the controller serves in one green/yellow cycle.
///
/// Either one conflict-free pair, or the union of both pairs. The union is
/// the only case where more than one pair is lit at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case", tag = "kind", content = "pair")]
#[ts(export, export_to = "bindings/")]
pub enum Selection {
    /// A single two-lane pair.
    Pair(PairId),
    /// Both pairs together (all four lanes).
    Both,
}

impl Selection {
    /// Whether the given pair is part of this selection.
    pub const fn includes(self, pair: PairId) -> bool {
        match self {
            Self::Both => true,
            Self::Pair(p) => matches!(
                (p, pair),
                (PairId::A, PairId::A) | (PairId::B, PairId::B)
            ),
        }
    }
}

/// Which rule of the ordered selection list produced a [`Selection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SelectionRule {
    /// Two adjacent lanes from different pairs are both waiting; the one
    /// that started waiting first wins.
    AdjacencyConflict,
    /// Both pairs have waiting lanes and no adjacency conflict holds.
    DualPair,
    /// Only one pair has waiting lanes.
    SinglePair,
    /// Fallback: the pair of the earliest waiting lane.
    EarliestWaiting,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn phase_maps_to_signal() {
        assert_eq!(Phase::Idle.signal(), SignalState::Red);
        assert_eq!(Phase::Green.signal(), SignalState::Green);
        assert_eq!(Phase::Yellow.signal(), SignalState::Yellow);
    }

    #[test]
    fn serving_states() {
        assert!(!SignalState::Red.is_serving());
        assert!(SignalState::Yellow.is_serving());
        assert!(SignalState::Green.is_serving());
    }

    #[test]
    fn selection_includes() {
        assert!(Selection::Both.includes(PairId::A));
        assert!(Selection::Both.includes(PairId::B));
        assert!(Selection::Pair(PairId::A).includes(PairId::A));
        assert!(!Selection::Pair(PairId::A).includes(PairId::B));
    }

    #[test]
    fn signal_state_serializes_upper_case() {
        let json = serde_json::to_string(&SignalState::Yellow).unwrap();
        assert_eq!(json, "\"YELLOW\"");
    }

    #[test]
    fn selection_serializes_tagged() {
        let json = serde_json::to_value(Selection::Pair(PairId::B)).unwrap();
        assert_eq!(json["kind"], "pair");
        assert_eq!(json["pair"], "B");
        let both = serde_json::to_value(Selection::Both).unwrap();
        assert_eq!(both["kind"], "both");
    }
}
