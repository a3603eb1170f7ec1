//! The phase controller: `idle -> green -> yellow -> idle`.
//!
//! The controller owns the active selection and its deadline. It is the
//! only writer of the [`SignalStateTable`] and the only component that
//! clears wait entries after service.
//!
//! Transition rules, evaluated once per tick:
//!
//! | From   | Condition              | To     | Effect                                   |
//! |--------|------------------------|--------|------------------------------------------|
//! | IDLE   | selector returns some  | GREEN  | selection GREEN, deadline = now + green  |
//! | IDLE   | selector returns none  | IDLE   | all lanes RED                            |
//! | GREEN  | `now >= deadline`      | YELLOW | selection YELLOW, deadline = now + yellow |
//! | YELLOW | `now >= deadline`      | IDLE   | selection RED, wait entries cleared      |
//!
//! Selection only happens while already idle. A tick that ends a yellow
//! phase does not select in the same tick.

use std::collections::BTreeSet;
use std::time::Duration;

use crossroads_types::{Lane, Phase, Selection, SelectionRule, SignalState, TransitionRecord};
use tracing::{debug, info};

use crate::clock::Timestamp;
use crate::config::TimingConfig;
use crate::layout::{ConfigurationError, LaneLayout, positive_duration};
use crate::registry::WaitRegistry;
use crate::selector;
use crate::signal_table::SignalStateTable;

/// Validated phase durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTiming {
    /// How long a selection stays green.
    pub green: Duration,
    /// How long a selection stays yellow.
    pub yellow: Duration,
}

impl PhaseTiming {
    /// Standard timing: 15 s green, 3 s yellow.
    pub const STANDARD: Self = Self {
        green: Duration::from_secs(15),
        yellow: Duration::from_secs(3),
    };

    /// Validate the configured durations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidDuration`] if either duration
    /// is zero, negative, or not finite.
    pub fn from_config(config: &TimingConfig) -> Result<Self, ConfigurationError> {
        Ok(Self {
            green: positive_duration("green_duration_seconds", config.green_duration_seconds)?,
            yellow: positive_duration("yellow_duration_seconds", config.yellow_duration_seconds)?,
        })
    }
}

impl Default for PhaseTiming {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// One phase change, as performed by [`PhaseController::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTransition {
    /// Phase before the change.
    pub from: Phase,
    /// Phase after the change.
    pub to: Phase,
    /// The selection entered (to green) or left (to yellow/idle).
    pub selection: Selection,
    /// Lanes whose signal changed.
    pub lanes: BTreeSet<Lane>,
    /// The selector rule, set only when entering green.
    pub rule: Option<SelectionRule>,
    /// Controller time of the change.
    pub at: Timestamp,
}

impl PhaseTransition {
    /// Convert into the published form for the given tick.
    pub fn record(&self, tick: u64) -> TransitionRecord {
        TransitionRecord {
            tick,
            from: self.from,
            to: self.to,
            selection: Some(self.selection),
            lanes: self.lanes.iter().copied().collect(),
            rule: self.rule,
            at_ms: self.at.as_millis(),
        }
    }
}

/// The phase state machine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhaseController {
    phase: Phase,
    selection: Option<Selection>,
    active_lanes: BTreeSet<Lane>,
    deadline: Option<Timestamp>,
    entered_at: Timestamp,
}

impl PhaseController {
    /// A controller in IDLE with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// The active selection (`None` in IDLE).
    pub const fn active_selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Lanes of the active selection (empty in IDLE).
    pub const fn active_lanes(&self) -> &BTreeSet<Lane> {
        &self.active_lanes
    }

    /// End of the current green or yellow phase.
    pub const fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    /// When the current phase was entered.
    pub const fn phase_entered_at(&self) -> Timestamp {
        self.entered_at
    }

    /// Time left in the current phase, zero once the deadline has passed.
    pub fn remaining(&self, now: Timestamp) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_since(now))
    }

    /// Evaluate the transition rules for one tick.
    ///
    /// The registry must already reflect this tick's occupancy. Returns
    /// the transition performed, if any.
    pub fn advance(
        &mut self,
        now: Timestamp,
        registry: &mut WaitRegistry,
        table: &mut SignalStateTable,
        layout: &LaneLayout,
        timing: &PhaseTiming,
    ) -> Option<PhaseTransition> {
        match self.phase {
            Phase::Idle => self.try_start(now, registry, table, layout, timing),
            Phase::Green if self.deadline_reached(now) => self.enter_yellow(now, table, timing),
            Phase::Yellow if self.deadline_reached(now) => self.finish(now, registry, table),
            Phase::Green | Phase::Yellow => None,
        }
    }

    fn deadline_reached(&self, now: Timestamp) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// IDLE: pick a selection and turn it green, or keep every lane red.
    fn try_start(
        &mut self,
        now: Timestamp,
        registry: &WaitRegistry,
        table: &mut SignalStateTable,
        layout: &LaneLayout,
        timing: &PhaseTiming,
    ) -> Option<PhaseTransition> {
        table.all_red();
        let decision = selector::select(registry, layout)?;

        let lanes = layout.lanes_of(decision.selection);
        table.publish(&lanes, SignalState::Green);
        let deadline = now.saturating_add(timing.green);

        self.phase = Phase::Green;
        self.selection = Some(decision.selection);
        self.active_lanes.clone_from(&lanes);
        self.deadline = Some(deadline);
        self.entered_at = now;

        info!(
            selection = ?decision.selection,
            rule = ?decision.rule,
            lanes = ?lanes,
            %now,
            %deadline,
            "Phase IDLE -> GREEN"
        );

        Some(PhaseTransition {
            from: Phase::Idle,
            to: Phase::Green,
            selection: decision.selection,
            lanes,
            rule: Some(decision.rule),
            at: now,
        })
    }

    /// GREEN deadline reached: the same lanes turn yellow.
    fn enter_yellow(
        &mut self,
        now: Timestamp,
        table: &mut SignalStateTable,
        timing: &PhaseTiming,
    ) -> Option<PhaseTransition> {
        let selection = self.selection?;
        table.publish(&self.active_lanes, SignalState::Yellow);
        let deadline = now.saturating_add(timing.yellow);

        self.phase = Phase::Yellow;
        self.deadline = Some(deadline);
        self.entered_at = now;

        info!(selection = ?selection, %now, %deadline, "Phase GREEN -> YELLOW");

        Some(PhaseTransition {
            from: Phase::Green,
            to: Phase::Yellow,
            selection,
            lanes: self.active_lanes.clone(),
            rule: None,
            at: now,
        })
    }

    /// YELLOW deadline reached: lanes go red and must be detected afresh.
    fn finish(
        &mut self,
        now: Timestamp,
        registry: &mut WaitRegistry,
        table: &mut SignalStateTable,
    ) -> Option<PhaseTransition> {
        let selection = self.selection.take()?;
        let lanes = std::mem::take(&mut self.active_lanes);
        table.publish(&lanes, SignalState::Red);
        registry.clear(&lanes);

        self.phase = Phase::Idle;
        self.deadline = None;
        self.entered_at = now;

        info!(selection = ?selection, %now, "Phase YELLOW -> IDLE");
        debug!(cleared = ?lanes, "Wait entries cleared after service");

        Some(PhaseTransition {
            from: Phase::Yellow,
            to: Phase::Idle,
            selection,
            lanes,
            rule: None,
            at: now,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crossroads_types::PairId;

    use super::*;

    struct Rig {
        controller: PhaseController,
        registry: WaitRegistry,
        table: SignalStateTable,
        layout: LaneLayout,
        timing: PhaseTiming,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                controller: PhaseController::new(),
                registry: WaitRegistry::new(),
                table: SignalStateTable::new(),
                layout: LaneLayout::standard(),
                timing: PhaseTiming::STANDARD,
            }
        }

        fn step(&mut self, occupied: &[u8], secs: f64) -> Option<PhaseTransition> {
            let now = Timestamp::from_secs_f64(secs).unwrap();
            let served = self.controller.active_lanes().clone();
            self.registry.update_ids(occupied, now, &served).unwrap();
            self.controller.advance(
                now,
                &mut self.registry,
                &mut self.table,
                &self.layout,
                &self.timing,
            )
        }
    }

    #[test]
    fn timing_rejects_non_positive_durations() {
        let config = TimingConfig {
            green_duration_seconds: 0.0,
            ..TimingConfig::default()
        };
        assert!(matches!(
            PhaseTiming::from_config(&config),
            Err(ConfigurationError::InvalidDuration {
                name: "green_duration_seconds",
                ..
            })
        ));
        let config = TimingConfig {
            yellow_duration_seconds: f64::NAN,
            ..TimingConfig::default()
        };
        assert!(PhaseTiming::from_config(&config).is_err());
        assert_eq!(
            PhaseTiming::from_config(&TimingConfig::default()).unwrap(),
            PhaseTiming::STANDARD
        );
    }

    #[test]
    fn idle_without_requests_stays_idle() {
        let mut rig = Rig::new();
        assert_eq!(rig.step(&[], 0.0), None);
        assert_eq!(rig.controller.phase(), Phase::Idle);
        assert!(rig.table.non_red_lanes().is_empty());
        assert_eq!(rig.controller.deadline(), None);
    }

    #[test]
    fn full_cycle_for_single_pair() {
        let mut rig = Rig::new();

        let t = rig.step(&[1], 0.0).unwrap();
        assert_eq!((t.from, t.to), (Phase::Idle, Phase::Green));
        assert_eq!(t.rule, Some(SelectionRule::SinglePair));
        assert_eq!(rig.controller.active_selection(), Some(Selection::Pair(PairId::A)));
        assert_eq!(rig.controller.deadline(), Some(Timestamp::from_secs(15)));
        assert_eq!(rig.table.get(Lane::ONE), SignalState::Green);
        assert_eq!(rig.table.get(Lane::THREE), SignalState::Green);

        assert_eq!(rig.step(&[1], 14.9), None);
        assert_eq!(
            rig.controller.remaining(Timestamp::from_secs(14)),
            Some(Duration::from_secs(1))
        );

        let t = rig.step(&[1], 15.0).unwrap();
        assert_eq!((t.from, t.to), (Phase::Green, Phase::Yellow));
        assert_eq!(rig.controller.deadline(), Some(Timestamp::from_secs(18)));
        assert_eq!(rig.table.get(Lane::THREE), SignalState::Yellow);

        let t = rig.step(&[1], 18.0).unwrap();
        assert_eq!((t.from, t.to), (Phase::Yellow, Phase::Idle));
        assert_eq!(rig.controller.phase(), Phase::Idle);
        assert!(rig.controller.active_lanes().is_empty());
        assert!(rig.table.non_red_lanes().is_empty());
        assert!(!rig.registry.is_waiting(Lane::ONE));
    }

    #[test]
    fn yellow_end_does_not_select_in_same_tick() {
        let mut rig = Rig::new();
        rig.step(&[2], 0.0);
        rig.step(&[2, 1], 15.0);
        // Lane 1 is waiting when yellow ends, but selection waits a tick.
        let t = rig.step(&[1], 18.0).unwrap();
        assert_eq!(t.to, Phase::Idle);
        assert_eq!(rig.controller.phase(), Phase::Idle);

        let t = rig.step(&[1], 18.1).unwrap();
        assert_eq!(t.to, Phase::Green);
        assert_eq!(rig.controller.active_selection(), Some(Selection::Pair(PairId::A)));
    }

    #[test]
    fn served_lane_keeps_request_while_lit() {
        let mut rig = Rig::new();
        rig.step(&[1], 0.0);
        // The vehicle leaves while green; the entry survives until service ends.
        rig.step(&[], 5.0);
        assert!(rig.registry.is_waiting(Lane::ONE));
        rig.step(&[], 15.0);
        rig.step(&[], 18.0);
        assert!(rig.registry.is_empty());
    }

    #[test]
    fn phase_entered_at_tracks_transitions() {
        let mut rig = Rig::new();
        rig.step(&[4], 2.0);
        assert_eq!(rig.controller.phase_entered_at(), Timestamp::from_secs(2));
        rig.step(&[4], 17.0);
        assert_eq!(rig.controller.phase_entered_at(), Timestamp::from_secs(17));
    }

    #[test]
    fn transition_record_carries_lanes_and_rule() {
        let mut rig = Rig::new();
        let t = rig.step(&[1, 4], 0.0).unwrap();
        let record = t.record(1);
        assert_eq!(record.tick, 1);
        assert_eq!(record.lanes.len(), 4);
        assert_eq!(record.rule, Some(SelectionRule::DualPair));
        assert_eq!(record.selection, Some(Selection::Both));
    }
}
