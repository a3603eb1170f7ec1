//! Lane identifiers and the two conflict-free lane pairs.
//!
//! An intersection has exactly four approach lanes, numbered 1 through 4.
//! A [`Lane`] can only be constructed from one of those ids, so any value
//! of this type is valid by construction. Raw ids coming from the vision
//! collaborator are converted with [`Lane::new`] (or `TryFrom<u8>`), which
//! fails with [`InvalidLaneError`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lowest valid lane id.
const MIN_LANE_ID: u8 = 1;

/// Highest valid lane id.
const MAX_LANE_ID: u8 = 4;

/// A lane id outside the fixed lane set was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid lane id {id}: lanes are numbered 1..=4")]
pub struct InvalidLaneError {
    /// The rejected raw lane id.
    pub id: u8,
}

/// One of the four approach lanes of the intersection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(try_from = "u8", into = "u8")]
#[ts(export, export_to = "bindings/")]
pub struct Lane(u8);

impl Lane {
    /// Lane 1.
    pub const ONE: Self = Self(1);
    /// Lane 2.
    pub const TWO: Self = Self(2);
    /// Lane 3.
    pub const THREE: Self = Self(3);
    /// Lane 4.
    pub const FOUR: Self = Self(4);

    /// Every lane of the intersection in ascending id order.
    pub const ALL: [Self; 4] = [Self::ONE, Self::TWO, Self::THREE, Self::FOUR];

    /// Build a lane from its raw id.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLaneError`] if `id` is not in `1..=4`.
    pub const fn new(id: u8) -> Result<Self, InvalidLaneError> {
        if id >= MIN_LANE_ID && id <= MAX_LANE_ID {
            Ok(Self(id))
        } else {
            Err(InvalidLaneError { id })
        }
    }

    /// Return the raw lane id.
    pub const fn id(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Lane {
    type Error = InvalidLaneError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<Lane> for u8 {
    fn from(lane: Lane) -> Self {
        lane.0
    }
}

impl core::fmt::Display for Lane {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "lane_{}", self.0)
    }
}

/// Identifies one of the two disjoint, mutually non-conflicting lane pairs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum PairId {
    /// Pair A (lanes 1 and 3 by default).
    A,
    /// Pair B (lanes 2 and 4 by default).
    B,
}
