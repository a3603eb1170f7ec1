//! Validated lane layout: the two conflict-free pairs and the adjacency
//! conflicts between them.
//!
//! A [`LaneLayout`] is built once at startup from [`IntersectionConfig`]
//! and never changes. Construction enforces that the pairs partition the
//! four lanes into exactly two disjoint two-lane groups, and that every
//! adjacency conflict spans both pairs.

use std::collections::BTreeSet;
use std::time::Duration;

use crossroads_types::{InvalidLaneError, Lane, PairId, Selection};

use crate::config::IntersectionConfig;

/// The configuration cannot describe a safe intersection. Fatal at startup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    /// A configured lane id is not one of the four lanes.
    #[error("configured lane is invalid: {source}")]
    InvalidLane {
        /// The underlying lane error.
        #[from]
        source: InvalidLaneError,
    },

    /// The pairs do not partition the four lanes into two disjoint pairs.
    #[error("pairs must partition lanes 1-4 into two disjoint pairs: {reason}")]
    PairPartition {
        /// Explanation of what is wrong with the pairing.
        reason: String,
    },

    /// An adjacency conflict does not couple one lane from each pair.
    #[error("adjacency conflict ({first}, {second}) must couple one lane of each pair")]
    AdjacencyWithinPair {
        /// First lane of the conflict.
        first: Lane,
        /// Second lane of the conflict.
        second: Lane,
    },

    /// A phase duration is not a finite, positive number of seconds.
    #[error("{name} must be a finite number of seconds greater than zero, got {value}")]
    InvalidDuration {
        /// The configuration key.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The occupancy source kind is not one of `none`, `random`, `scripted`.
    #[error("unknown occupancy source {name:?} (expected none, random or scripted)")]
    UnknownOccupancySource {
        /// The configured source kind.
        name: String,
    },

    /// The arrival probability is not within `[0, 1]`.
    #[error("arrival_probability must be within [0, 1], got {value}")]
    InvalidProbability {
        /// The rejected value.
        value: f64,
    },

    /// The dwell range is empty or not positive.
    #[error("dwell range {min}..={max} seconds is invalid")]
    InvalidDwell {
        /// Configured minimum dwell.
        min: f64,
        /// Configured maximum dwell.
        max: f64,
    },

    /// A scripted occupancy window has a negative or reversed interval.
    #[error("occupancy window {from}..{until} seconds is invalid")]
    InvalidWindow {
        /// Window start.
        from: f64,
        /// Window end.
        until: f64,
    },
}

/// Two adjacent lanes from different pairs that contend for service.
///
/// When both are waiting, the pair of the one that started waiting first is
/// served; `first` wins ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjacencyConflict {
    /// The lane favoured on equal waiting times.
    pub first: Lane,
    /// The other lane.
    pub second: Lane,
}

/// The validated pairing of the four lanes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneLayout {
    pair_a: [Lane; 2],
    pair_b: [Lane; 2],
    adjacent: Vec<AdjacencyConflict>,
}

impl LaneLayout {
    /// Build and validate a layout from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if any lane id is invalid, the pairs
    /// do not partition lanes 1-4, or an adjacency conflict lies within a
    /// single pair.
    pub fn from_config(config: &IntersectionConfig) -> Result<Self, ConfigurationError> {
        let pair_a = [Lane::new(config.pair_a.0)?, Lane::new(config.pair_a.1)?];
        let pair_b = [Lane::new(config.pair_b.0)?, Lane::new(config.pair_b.1)?];

        let all: BTreeSet<Lane> = pair_a.iter().chain(pair_b.iter()).copied().collect();
        if all.len() != Lane::ALL.len() {
            return Err(ConfigurationError::PairPartition {
                reason: format!(
                    "pair_a {:?} and pair_b {:?} cover only {} distinct lanes",
                    config.pair_a,
                    config.pair_b,
                    all.len()
                ),
            });
        }

        let mut layout = Self {
            pair_a,
            pair_b,
            adjacent: Vec::with_capacity(config.adjacent_conflicts.len()),
        };

        for &(first, second) in &config.adjacent_conflicts {
            let first = Lane::new(first)?;
            let second = Lane::new(second)?;
            if layout.pair_of(first) == layout.pair_of(second) {
                return Err(ConfigurationError::AdjacencyWithinPair { first, second });
            }
            layout.adjacent.push(AdjacencyConflict { first, second });
        }

        Ok(layout)
    }

    /// The standard layout: A = {1,3}, B = {2,4}, conflicts (1,2) and (3,4).
    pub fn standard() -> Self {
        Self {
            pair_a: [Lane::ONE, Lane::THREE],
            pair_b: [Lane::TWO, Lane::FOUR],
            adjacent: vec![
                AdjacencyConflict {
                    first: Lane::ONE,
                    second: Lane::TWO,
                },
                AdjacencyConflict {
                    first: Lane::THREE,
                    second: Lane::FOUR,
                },
            ],
        }
    }

    /// The two lanes of a pair.
    pub const fn pair(&self, pair: PairId) -> [Lane; 2] {
        match pair {
            PairId::A => self.pair_a,
            PairId::B => self.pair_b,
        }
    }

    /// The pair a lane belongs to.
    pub fn pair_of(&self, lane: Lane) -> PairId {
        if self.pair_a.contains(&lane) {
            PairId::A
        } else {
            // Construction guarantees the pairs partition every lane.
            PairId::B
        }
    }

    /// Adjacency conflicts in evaluation order.
    pub fn adjacency_conflicts(&self) -> &[AdjacencyConflict] {
        &self.adjacent
    }

    /// The lanes lit by a selection, in ascending order.
    pub fn lanes_of(&self, selection: Selection) -> BTreeSet<Lane> {
        match selection {
            Selection::Pair(pair) => self.pair(pair).into_iter().collect(),
            Selection::Both => Lane::ALL.into_iter().collect(),
        }
    }
}

impl Default for LaneLayout {
    fn default() -> Self {
        Self::standard()
    }
}

/// Convert a configured duration in seconds into a [`Duration`].
///
/// # Errors
///
/// Returns [`ConfigurationError::InvalidDuration`] for negative, zero,
/// non-finite, or out-of-range values.
pub fn positive_duration(name: &'static str, value: f64) -> Result<Duration, ConfigurationError> {
    match Duration::try_from_secs_f64(value) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(ConfigurationError::InvalidDuration { name, value }),
    }
}
