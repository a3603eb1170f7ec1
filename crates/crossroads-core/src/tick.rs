//! The tick function: one discrete evaluation step of the scheduler.
//!
//! Each call to [`Scheduler::tick`] runs these steps in order:
//!
//! 1. **Validate** -- every occupied lane id is checked. A single invalid
//!    id rejects the whole tick and nothing is mutated.
//! 2. **Register** -- the [`WaitRegistry`] records new requests and drops
//!    withdrawn ones. Lanes currently being served keep their entries.
//! 3. **Advance** -- the [`PhaseController`] evaluates its transition
//!    rules. While idle this consults the pair selector, so a request seen
//!    for the first time can turn green within the same tick.
//! 4. **Summarize** -- the resulting state is returned as a
//!    [`TickSummary`] for renderers and observers.
//!
//! The scheduler is single-owner and synchronous. Ticks must be delivered
//! in non-decreasing time order; an out-of-order `now` is applied as given
//! and logged.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::Utc;
use crossroads_types::{InvalidLaneError, Lane, Phase, Selection, SignalSnapshot, SignalState};
use tracing::{debug, warn};

use crate::clock::Timestamp;
use crate::config::{ControllerConfig, IntersectionConfig, TimingConfig};
use crate::layout::{ConfigurationError, LaneLayout};
use crate::phase::{PhaseController, PhaseTiming, PhaseTransition};
use crate::registry::WaitRegistry;
use crate::signal_table::SignalStateTable;

/// Errors that reject a single tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// The occupancy reading named a lane that does not exist.
    #[error("occupancy reading rejected: {source}")]
    InvalidLane {
        /// The underlying lane error.
        #[from]
        source: InvalidLaneError,
    },
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick number that was executed (1-based).
    pub tick: u64,
    /// Controller time of the tick.
    pub now: Timestamp,
    /// Lanes reported occupied on this tick.
    pub occupied: BTreeSet<Lane>,
    /// Phase after the tick.
    pub phase: Phase,
    /// Active selection after the tick.
    pub selection: Option<Selection>,
    /// Lanes of the active selection.
    pub active_lanes: BTreeSet<Lane>,
    /// Time left in the current green or yellow phase.
    pub remaining: Option<Duration>,
    /// The transition performed on this tick, if any.
    pub transition: Option<PhaseTransition>,
    /// Signal colour per lane after the tick.
    pub signals: BTreeMap<Lane, SignalState>,
    /// Wait entries after the tick.
    pub waiting_since: BTreeMap<Lane, Timestamp>,
}

/// The signal scheduling core.
///
/// Owns the wait registry, the signal state table, and the phase
/// controller. Collaborators feed occupancy in through [`Self::tick`] and
/// read published state through [`Self::snapshot`].
#[derive(Debug, Clone)]
pub struct Scheduler {
    layout: LaneLayout,
    timing: PhaseTiming,
    registry: WaitRegistry,
    table: SignalStateTable,
    controller: PhaseController,
    tick: u64,
    last_now: Option<Timestamp>,
    last_transition: Option<(u64, PhaseTransition)>,
}

impl Scheduler {
    /// Build a scheduler from intersection and timing configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the lane pairing or the phase
    /// durations are invalid. No tick can run against a bad configuration.
    pub fn new(
        intersection: &IntersectionConfig,
        timing: &TimingConfig,
    ) -> Result<Self, ConfigurationError> {
        let layout = LaneLayout::from_config(intersection)?;
        let timing = PhaseTiming::from_config(timing)?;
        Ok(Self::with_layout(layout, timing))
    }

    /// Build a scheduler from the full controller configuration.
    pub fn from_config(config: &ControllerConfig) -> Result<Self, ConfigurationError> {
        Self::new(&config.intersection, &config.timing)
    }

    /// Build a scheduler from an already validated layout and timing.
    pub fn with_layout(layout: LaneLayout, timing: PhaseTiming) -> Self {
        Self {
            layout,
            timing,
            registry: WaitRegistry::new(),
            table: SignalStateTable::new(),
            controller: PhaseController::new(),
            tick: 0,
            last_now: None,
            last_transition: None,
        }
    }

    /// Execute one tick.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidLane`] if any id is not a lane of
    /// the intersection. The scheduler state is unchanged in that case.
    pub fn tick(&mut self, occupied_ids: &[u8], now: Timestamp) -> Result<TickSummary, SchedulerError> {
        let served = self.controller.active_lanes().clone();
        let occupied = self.registry.update_ids(occupied_ids, now, &served)?;

        if let Some(previous) = self.last_now.filter(|previous| now < *previous) {
            warn!(%previous, %now, "Tick time went backwards; applying as given");
        }

        self.tick = self.tick.saturating_add(1);
        self.last_now = Some(now);

        let transition = self.controller.advance(
            now,
            &mut self.registry,
            &mut self.table,
            &self.layout,
            &self.timing,
        );
        self.last_transition = transition.clone().map(|t| (self.tick, t));

        debug!(
            tick = self.tick,
            %now,
            occupied = ?occupied,
            phase = ?self.controller.phase(),
            phase_since = %self.controller.phase_entered_at(),
            waiting = ?self.registry.waiting_lanes().collect::<Vec<_>>(),
            "Tick complete"
        );

        Ok(TickSummary {
            tick: self.tick,
            now,
            occupied,
            phase: self.controller.phase(),
            selection: self.controller.active_selection(),
            active_lanes: self.controller.active_lanes().clone(),
            remaining: self.controller.remaining(now),
            transition,
            signals: self.table.snapshot(),
            waiting_since: self.registry.entries().clone(),
        })
    }

    /// The published view of the intersection after the last tick.
    pub fn snapshot(&self) -> SignalSnapshot {
        let now = self.last_now.unwrap_or(Timestamp::ZERO);
        SignalSnapshot {
            tick: self.tick,
            now_ms: now.as_millis(),
            phase: self.controller.phase(),
            selection: self.controller.active_selection(),
            active_lanes: self.controller.active_lanes().iter().copied().collect(),
            remaining_ms: self
                .controller
                .remaining(now)
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            signals: self.table.snapshot(),
            waiting_since_ms: self
                .registry
                .entries()
                .iter()
                .map(|(lane, since)| (*lane, since.as_millis()))
                .collect(),
            transition: self
                .last_transition
                .as_ref()
                .map(|(tick, transition)| transition.record(*tick)),
            published_at: Utc::now(),
        }
    }

    /// Number of ticks applied so far.
    pub const fn ticks(&self) -> u64 {
        self.tick
    }

    /// The validated lane layout.
    pub const fn layout(&self) -> &LaneLayout {
        &self.layout
    }

    /// The validated phase durations.
    pub const fn timing(&self) -> &PhaseTiming {
        &self.timing
    }

    /// Current wait entries.
    pub const fn registry(&self) -> &WaitRegistry {
        &self.registry
    }

    /// Current signal colours.
    pub const fn signals(&self) -> &SignalStateTable {
        &self.table
    }

    /// The phase controller, for diagnostics.
    pub const fn controller(&self) -> &PhaseController {
        &self.controller
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use crossroads_types::{PairId, SelectionRule};

    use super::*;

    fn scheduler() -> Scheduler {
        Scheduler::new(&IntersectionConfig::default(), &TimingConfig::default()).unwrap()
    }

    fn at(secs: f64) -> Timestamp {
        Timestamp::from_secs_f64(secs).unwrap()
    }

    /// Every published table shows exactly the active selection, in one colour.
    fn assert_consistent(summary: &TickSummary) {
        let non_red: BTreeSet<Lane> = summary
            .signals
            .iter()
            .filter(|(_, s)| s.is_serving())
            .map(|(l, _)| *l)
            .collect();
        assert_eq!(non_red, summary.active_lanes, "tick {}", summary.tick);
        let colours: BTreeSet<SignalState> = non_red.iter().map(|l| summary.signals[l]).collect();
        assert!(colours.len() <= 1, "mixed colours on tick {}", summary.tick);
        if summary.phase == Phase::Idle {
            assert!(non_red.is_empty());
        }
    }

    #[test]
    fn single_lane_full_cycle() {
        let mut s = scheduler();

        let t0 = s.tick(&[1], at(0.0)).unwrap();
        assert_eq!(t0.phase, Phase::Green);
        assert_eq!(t0.selection, Some(Selection::Pair(PairId::A)));
        assert_eq!(s.controller().deadline(), Some(at(15.0)));
        assert_eq!(t0.signals[&Lane::ONE], SignalState::Green);
        assert_eq!(t0.signals[&Lane::THREE], SignalState::Green);
        assert_eq!(t0.signals[&Lane::TWO], SignalState::Red);

        let t15 = s.tick(&[1], at(15.0)).unwrap();
        assert_eq!(t15.phase, Phase::Yellow);
        assert_eq!(s.controller().deadline(), Some(at(18.0)));

        let t18 = s.tick(&[], at(18.0)).unwrap();
        assert_eq!(t18.phase, Phase::Idle);
        assert_eq!(t18.signals[&Lane::ONE], SignalState::Red);
        assert_eq!(t18.signals[&Lane::THREE], SignalState::Red);
        assert!(t18.waiting_since.is_empty());
        for summary in [&t0, &t15, &t18] {
            assert_consistent(summary);
        }
    }

    #[test]
    fn adjacency_conflict_serves_earlier_lane() {
        let mut s = scheduler();
        // Lane 1 at t=0 already turns pair A green; lane 2 arrives next tick.
        let first = s.tick(&[1], at(0.0)).unwrap();
        assert_eq!(first.selection, Some(Selection::Pair(PairId::A)));
        let second = s.tick(&[1, 2], at(0.1)).unwrap();
        assert_eq!(second.selection, Some(Selection::Pair(PairId::A)));
        assert_eq!(second.signals[&Lane::TWO], SignalState::Red);
        assert_eq!(second.waiting_since[&Lane::TWO], at(0.1));
    }

    #[test]
    fn simultaneous_adjacent_detection_uses_adjacency_rule() {
        let mut s = scheduler();
        let t = s.tick(&[1, 2], at(0.0)).unwrap();
        let transition = t.transition.unwrap();
        assert_eq!(transition.rule, Some(SelectionRule::AdjacencyConflict));
        assert_eq!(t.selection, Some(Selection::Pair(PairId::A)));
    }

    #[test]
    fn non_adjacent_lanes_of_both_pairs_turn_green_together() {
        let mut s = scheduler();
        // Pair A is green from t=0; lane 4 arrives at t=1 and waits.
        s.tick(&[1], at(0.0)).unwrap();
        s.tick(&[1, 4], at(1.0)).unwrap();
        s.tick(&[1, 4], at(15.0)).unwrap();
        s.tick(&[1, 4], at(18.0)).unwrap();
        // Lane 1 is still there and is detected afresh; lane 4 kept waiting.
        let t = s.tick(&[1, 4], at(18.1)).unwrap();
        assert_eq!(t.selection, Some(Selection::Both));
        assert_eq!(t.active_lanes.len(), 4);
        assert!(t.signals.values().all(|s| *s == SignalState::Green));
        assert_consistent(&t);
    }

    #[test]
    fn idle_detection_of_lanes_one_and_four_selects_union() {
        let mut s = scheduler();
        let t = s.tick(&[1, 4], at(1.0)).unwrap();
        assert_eq!(t.selection, Some(Selection::Both));
        assert_eq!(t.transition.unwrap().rule, Some(SelectionRule::DualPair));
    }

    #[test]
    fn persistent_vehicle_is_redetected_after_service() {
        let mut s = scheduler();
        s.tick(&[1], at(0.0)).unwrap();
        s.tick(&[1], at(15.0)).unwrap();
        let end = s.tick(&[1], at(18.0)).unwrap();
        assert_eq!(end.phase, Phase::Idle);
        assert!(!end.waiting_since.contains_key(&Lane::ONE));

        let next = s.tick(&[1], at(18.1)).unwrap();
        assert_eq!(next.waiting_since[&Lane::ONE], at(18.1));
        assert_eq!(next.phase, Phase::Green);
    }

    #[test]
    fn deadline_boundary_is_inclusive() {
        let mut s = scheduler();
        s.tick(&[2], at(0.0)).unwrap();
        assert_eq!(s.tick(&[2], at(14.999)).unwrap().phase, Phase::Green);
        assert_eq!(s.tick(&[2], at(15.0)).unwrap().phase, Phase::Yellow);
        assert_eq!(s.tick(&[2], at(17.999)).unwrap().phase, Phase::Yellow);
        assert_eq!(s.tick(&[2], at(18.0)).unwrap().phase, Phase::Idle);
    }

    #[test]
    fn invalid_lane_rejects_tick_without_mutation() {
        let mut s = scheduler();
        s.tick(&[2], at(0.0)).unwrap();
        let registry = s.registry().clone();
        let signals = s.signals().clone();

        let err = s.tick(&[1, 7], at(1.0)).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::InvalidLane {
                source: InvalidLaneError { id: 7 }
            }
        );
        assert_eq!(s.ticks(), 1);
        assert_eq!(s.registry(), &registry);
        assert_eq!(s.signals(), &signals);
        assert!(s.tick(&[0], at(1.0)).is_err());
    }

    #[test]
    fn backwards_time_is_applied() {
        let mut s = scheduler();
        s.tick(&[], at(5.0)).unwrap();
        let t = s.tick(&[3], at(4.0)).unwrap();
        assert_eq!(t.now, at(4.0));
        assert_eq!(t.phase, Phase::Green);
    }

    #[test]
    fn invalid_configuration_is_rejected_before_any_tick() {
        let intersection = IntersectionConfig {
            pair_b: (1, 4),
            ..IntersectionConfig::default()
        };
        assert!(Scheduler::new(&intersection, &TimingConfig::default()).is_err());

        let timing = TimingConfig {
            yellow_duration_seconds: -3.0,
            ..TimingConfig::default()
        };
        assert!(Scheduler::new(&IntersectionConfig::default(), &timing).is_err());
    }

    #[test]
    fn invariants_hold_under_busy_traffic() {
        let mut s = scheduler();
        let pattern: [&[u8]; 6] = [&[1, 2], &[2, 3], &[4], &[], &[1, 3, 4], &[2]];
        for step in 0u32..600 {
            let ids = pattern[usize::try_from(step).unwrap() % pattern.len()];
            let summary = s.tick(ids, Timestamp::from_millis(u64::from(step) * 100)).unwrap();
            assert_consistent(&summary);
            if summary.phase != Phase::Idle {
                assert!(summary.selection.is_some());
                assert!(summary.remaining.is_some());
            }
        }
    }

    #[test]
    fn snapshot_reflects_last_tick() {
        let mut s = scheduler();
        let initial = s.snapshot();
        assert_eq!(initial.tick, 0);
        assert_eq!(initial.phase, Phase::Idle);

        s.tick(&[3], at(2.0)).unwrap();
        let snap = s.snapshot();
        assert_eq!(snap.tick, 1);
        assert_eq!(snap.now_ms, 2000);
        assert_eq!(snap.phase, Phase::Green);
        assert_eq!(snap.remaining_ms, Some(15_000));
        assert_eq!(snap.signal(Lane::THREE), SignalState::Green);
        assert_eq!(snap.waiting_since_ms[&Lane::THREE], 2000);
        assert_eq!(snap.transition.unwrap().tick, 1);

        s.tick(&[3], at(3.0)).unwrap();
        assert!(s.snapshot().transition.is_none());
    }
}
