//! The authoritative lane to signal colour mapping.

use std::collections::{BTreeMap, BTreeSet};

use crossroads_types::{Lane, SignalState};

/// Current colour of every lane.
///
/// Only the phase controller writes to the table. Every lane is always
/// present; lanes start red.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalStateTable {
    states: BTreeMap<Lane, SignalState>,
}

impl SignalStateTable {
    /// A table with every lane red.
    pub fn new() -> Self {
        Self {
            states: Lane::ALL
                .into_iter()
                .map(|lane| (lane, SignalState::Red))
                .collect(),
        }
    }

    /// Colour of one lane.
    pub fn get(&self, lane: Lane) -> SignalState {
        self.states.get(&lane).copied().unwrap_or_default()
    }

    /// Set the colour of the given lanes together.
    pub fn publish(&mut self, lanes: &BTreeSet<Lane>, state: SignalState) {
        for lane in lanes {
            self.states.insert(*lane, state);
        }
    }

    /// Set every lane red.
    pub fn all_red(&mut self) {
        for state in self.states.values_mut() {
            *state = SignalState::Red;
        }
    }

    /// Copy of the full mapping.
    pub fn snapshot(&self) -> BTreeMap<Lane, SignalState> {
        self.states.clone()
    }

    /// Lanes currently showing green or yellow.
    pub fn non_red_lanes(&self) -> BTreeSet<Lane> {
        self.states
            .iter()
            .filter(|(_, state)| state.is_serving())
            .map(|(lane, _)| *lane)
            .collect()
    }
}

impl Default for SignalStateTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_all_red() {
        let table = SignalStateTable::new();
        for lane in Lane::ALL {
            assert_eq!(table.get(lane), SignalState::Red);
        }
        assert!(table.non_red_lanes().is_empty());
    }

    #[test]
    fn publish_sets_only_given_lanes() {
        let mut table = SignalStateTable::new();
        let pair: BTreeSet<Lane> = [Lane::ONE, Lane::THREE].into_iter().collect();
        table.publish(&pair, SignalState::Green);
        assert_eq!(table.get(Lane::ONE), SignalState::Green);
        assert_eq!(table.get(Lane::TWO), SignalState::Red);
        assert_eq!(table.non_red_lanes(), pair);

        table.all_red();
        assert!(table.non_red_lanes().is_empty());
        assert_eq!(table.snapshot().len(), 4);
    }
}
