//! Per-lane wait tracking.
//!
//! The [`WaitRegistry`] remembers, for every lane, when it started
//! continuously requesting service. A lane without an entry has no
//! outstanding request and can never be selected.
//!
//! Entries are cleared in two ways:
//!
//! - the vehicle is no longer observed and the lane is not being served;
//! - the lane finishes a green/yellow service ([`WaitRegistry::clear`],
//!   called by the phase controller), even if the vehicle is still there.
//!   A fresh detection is then required before the lane is served again.

use std::collections::{BTreeMap, BTreeSet};

use crossroads_types::{InvalidLaneError, Lane};

use crate::clock::Timestamp;

/// Start of continuous waiting, per lane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitRegistry {
    waiting_since: BTreeMap<Lane, Timestamp>,
}

impl WaitRegistry {
    /// An empty registry: no lane is waiting.
    pub const fn new() -> Self {
        Self {
            waiting_since: BTreeMap::new(),
        }
    }

    /// Apply one occupancy reading.
    ///
    /// - Occupied lanes without an entry start waiting at `now`; existing
    ///   entries keep their earlier timestamp.
    /// - Lanes that are neither occupied nor in `currently_served` lose
    ///   their entry.
    /// - Served lanes keep their entry regardless of occupancy.
    pub fn update(
        &mut self,
        occupied: &BTreeSet<Lane>,
        now: Timestamp,
        currently_served: &BTreeSet<Lane>,
    ) {
        for lane in Lane::ALL {
            if occupied.contains(&lane) {
                self.waiting_since.entry(lane).or_insert(now);
            } else if !currently_served.contains(&lane) {
                self.waiting_since.remove(&lane);
            }
        }
    }

    /// Apply an occupancy reading given as raw lane ids and return the
    /// resolved lane set.
    ///
    /// Every id is validated before anything is changed, so a single bad id
    /// rejects the whole reading. Duplicate ids collapse.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidLaneError`] encountered; the registry is
    /// left untouched.
    pub fn update_ids(
        &mut self,
        occupied: &[u8],
        now: Timestamp,
        currently_served: &BTreeSet<Lane>,
    ) -> Result<BTreeSet<Lane>, InvalidLaneError> {
        let lanes = occupied
            .iter()
            .map(|&id| Lane::new(id))
            .collect::<Result<BTreeSet<_>, _>>()?;
        self.update(&lanes, now, currently_served);
        Ok(lanes)
    }

    /// Drop the entries of lanes that just finished service.
    pub fn clear<'a>(&mut self, lanes: impl IntoIterator<Item = &'a Lane>) {
        for lane in lanes {
            self.waiting_since.remove(lane);
        }
    }

    /// When the lane started waiting, if it is waiting.
    pub fn waiting_since(&self, lane: Lane) -> Option<Timestamp> {
        self.waiting_since.get(&lane).copied()
    }

    /// Whether the lane has an outstanding request.
    pub fn is_waiting(&self, lane: Lane) -> bool {
        self.waiting_since.contains_key(&lane)
    }

    /// All waiting lanes, ascending.
    pub fn waiting_lanes(&self) -> impl Iterator<Item = Lane> + '_ {
        self.waiting_since.keys().copied()
    }

    /// All entries, ascending by lane.
    pub const fn entries(&self) -> &BTreeMap<Lane, Timestamp> {
        &self.waiting_since
    }

    /// Whether no lane is waiting.
    pub fn is_empty(&self) -> bool {
        self.waiting_since.is_empty()
    }
}
