//! Pair selection: which lanes to serve next.
//!
//! [`select`] is a pure function of the wait registry and the lane layout.
//! It evaluates an ordered list of rules and returns the first match,
//! tagged with the [`SelectionRule`] that produced it:
//!
//! 1. **Adjacency conflict** -- two adjacent lanes from different pairs
//!    (1&2, then 3&4 in the standard layout) are both waiting. The pair of
//!    the lane that started waiting first is served; the first lane of the
//!    conflict wins ties.
//! 2. **Dual pair** -- both pairs have a waiting lane. Both pairs are lit
//!    together.
//! 3. **Single pair** -- only one pair has a waiting lane.
//! 4. **Earliest waiting** -- the pair of the earliest waiting lane.
//!
//! With no waiting lane the result is `None`. Rule order is significant:
//! lanes 1, 2 and 4 waiting is an adjacency conflict, never a dual pair.

use crossroads_types::{Lane, PairId, Selection, SelectionRule};

use crate::layout::LaneLayout;
use crate::registry::WaitRegistry;

/// The outcome of one selection: what to serve and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionDecision {
    /// Lanes to serve.
    pub selection: Selection,
    /// The rule that fired.
    pub rule: SelectionRule,
}

/// Signature shared by every selection rule.
type Rule = fn(&WaitRegistry, &LaneLayout) -> Option<Selection>;

/// The rules in evaluation order.
const RULES: [(SelectionRule, Rule); 4] = [
    (SelectionRule::AdjacencyConflict, adjacency_conflict),
    (SelectionRule::DualPair, dual_pair),
    (SelectionRule::SinglePair, single_pair),
    (SelectionRule::EarliestWaiting, earliest_waiting),
];

/// Decide which selection to activate next, if any.
pub fn select(registry: &WaitRegistry, layout: &LaneLayout) -> Option<SelectionDecision> {
    if registry.is_empty() {
        return None;
    }
    RULES.iter().find_map(|(rule, apply)| {
        apply(registry, layout).map(|selection| SelectionDecision {
            selection,
            rule: *rule,
        })
    })
}

/// Rule 1: both lanes of an adjacency conflict are waiting.
fn adjacency_conflict(registry: &WaitRegistry, layout: &LaneLayout) -> Option<Selection> {
    layout.adjacency_conflicts().iter().find_map(|conflict| {
        let first = registry.waiting_since(conflict.first)?;
        let second = registry.waiting_since(conflict.second)?;
        let winner = if first <= second {
            conflict.first
        } else {
            conflict.second
        };
        Some(Selection::Pair(layout.pair_of(winner)))
    })
}

/// Rule 2: both pairs have at least one waiting lane.
fn dual_pair(registry: &WaitRegistry, layout: &LaneLayout) -> Option<Selection> {
    (pair_has_waiting(registry, layout, PairId::A) && pair_has_waiting(registry, layout, PairId::B))
        .then_some(Selection::Both)
}

/// Rule 3: exactly one pair has a waiting lane.
fn single_pair(registry: &WaitRegistry, layout: &LaneLayout) -> Option<Selection> {
    match (
        pair_has_waiting(registry, layout, PairId::A),
        pair_has_waiting(registry, layout, PairId::B),
    ) {
        (true, false) => Some(Selection::Pair(PairId::A)),
        (false, true) => Some(Selection::Pair(PairId::B)),
        _ => None,
    }
}

/// Rule 4: the pair containing the earliest waiting lane (lowest id on ties).
fn earliest_waiting(registry: &WaitRegistry, layout: &LaneLayout) -> Option<Selection> {
    registry
        .entries()
        .iter()
        .min_by_key(|(lane, since)| (**since, **lane))
        .map(|(lane, _)| Selection::Pair(layout.pair_of(*lane)))
}

fn pair_has_waiting(registry: &WaitRegistry, layout: &LaneLayout, pair: PairId) -> bool {
    layout
        .pair(pair)
        .iter()
        .any(|lane: &Lane| registry.is_waiting(*lane))
}
