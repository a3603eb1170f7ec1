//! Control loop runner with operator controls.
//!
//! This module provides [`run_controller`], the top-level async function
//! that drives the scheduler with support for:
//!
//! - **Bounded runs**: stop after `max_ticks` or `max_real_time_seconds`
//! - **Pause/resume**: signals hold their state while polling is halted
//! - **Variable poll rate**: poll interval adjustable at runtime
//! - **Operator stop**: clean stop via the REST API
//!
//! One iteration polls the occupancy source, applies a tick at the
//! clock's current time, hands the result to the renderer, and sleeps for
//! the poll interval. A failed occupancy read counts as an empty reading.
//! A reading naming an unknown lane rejects that tick; the loop logs it,
//! counts it, and carries on with the next poll.

use std::sync::Arc;

use tracing::{info, warn};

use crate::clock::Clock;
use crate::occupancy::OccupancySource;
use crate::operator::{ControllerEndReason, OperatorState};
use crate::render::SignalRenderer;
use crate::tick::{Scheduler, TickSummary};

/// Result of a control loop run.
#[derive(Debug)]
pub struct ControllerResult {
    /// The reason the loop ended.
    pub end_reason: ControllerEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks applied.
    pub total_ticks: u64,
    /// Ticks rejected because of an invalid lane id.
    pub rejected_ticks: u64,
}

/// Run the control loop until a termination condition is met.
///
/// # Arguments
///
/// * `scheduler` - The scheduling core, already validated
/// * `source` - Where occupancy readings come from
/// * `clock` - Controller time for each tick
/// * `operator` - Shared operator control state
/// * `renderer` - Called after each completed tick
pub async fn run_controller(
    scheduler: &mut Scheduler,
    source: &mut dyn OccupancySource,
    clock: &dyn Clock,
    operator: &Arc<OperatorState>,
    renderer: &mut dyn SignalRenderer,
) -> ControllerResult {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        source = source.name(),
        max_ticks = operator.max_ticks(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        poll_interval_ms = operator.poll_interval_ms(),
        "Controller starting"
    );

    let end_reason = loop {
        // --- Check pause ---
        if operator.is_paused() {
            info!("Controller paused, signals held");
            operator.wait_if_paused().await;
            info!("Controller resumed");
        }

        // --- Check stop and time limit (before tick) ---
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            break ControllerEndReason::OperatorStop;
        }
        if operator.time_limit_reached() {
            info!(
                max_seconds = operator.max_real_time_seconds(),
                elapsed = operator.elapsed_seconds(),
                "Real-time limit reached"
            );
            break ControllerEndReason::MaxRealTimeReached;
        }

        // --- Poll and tick ---
        let now = clock.now();
        let occupied = source.poll(now).unwrap_or_else(|err| {
            warn!(source = source.name(), %err, %now, "Occupancy read failed, treating as empty");
            Vec::new()
        });

        match scheduler.tick(&occupied, now) {
            Ok(summary) => {
                total_ticks = total_ticks.saturating_add(1);
                let snapshot = scheduler.snapshot();
                renderer.render(&summary, &snapshot);

                let reached = operator.tick_limit_reached(summary.tick);
                last_summary = Some(summary);
                if reached {
                    info!(
                        tick = total_ticks,
                        max_ticks = operator.max_ticks(),
                        "Tick limit reached"
                    );
                    break ControllerEndReason::MaxTicksReached;
                }
            }
            Err(err) => {
                let rejected = operator.record_rejected_tick();
                warn!(%err, ids = ?occupied, %now, rejected, "Tick rejected");
            }
        }

        // --- Sleep for poll interval ---
        let interval_ms = operator.poll_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        }
    };

    operator.set_end_reason(end_reason).await;
    ControllerResult {
        end_reason,
        final_summary: last_summary,
        total_ticks,
        rejected_ticks: operator.rejected_ticks(),
    }
}

/// Log the end of a control loop run.
pub fn log_controller_end(result: &ControllerResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        rejected_ticks = result.rejected_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        final_phase = ?result.final_summary.as_ref().map(|s| s.phase),
        "Controller stopped"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use crossroads_types::{Phase, SignalSnapshot};

    use super::*;
    use crate::clock::{ManualClock, Timestamp};
    use crate::config::{IntersectionConfig, SimulationBoundsConfig, TimingConfig};
    use crate::occupancy::{NoTraffic, OccupancyError, OccupancyWindow, ScriptedOccupancy};
    use crate::render::NoOpRenderer;

    fn scheduler() -> Scheduler {
        Scheduler::new(&IntersectionConfig::default(), &TimingConfig::default()).unwrap()
    }

    fn operator(max_ticks: u64) -> Arc<OperatorState> {
        let bounds = SimulationBoundsConfig {
            max_ticks,
            max_real_time_seconds: 0,
        };
        Arc::new(OperatorState::new(0, &bounds))
    }

    /// A 100 ms tick clock starting at zero.
    fn clock() -> ManualClock {
        ManualClock::stepping(Timestamp::ZERO, Duration::from_millis(100))
    }

    #[derive(Default)]
    struct Recorder {
        snapshots: Vec<SignalSnapshot>,
    }

    impl SignalRenderer for Recorder {
        fn render(&mut self, _summary: &TickSummary, snapshot: &SignalSnapshot) {
            self.snapshots.push(snapshot.clone());
        }
    }

    struct Failing;

    impl OccupancySource for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn poll(&mut self, _now: Timestamp) -> Result<Vec<u8>, OccupancyError> {
            Err(OccupancyError::Unavailable {
                reason: "camera offline".to_owned(),
            })
        }
    }

    #[tokio::test]
    async fn stops_at_tick_limit() {
        let mut s = scheduler();
        let result = run_controller(
            &mut s,
            &mut NoTraffic,
            &clock(),
            &operator(25),
            &mut NoOpRenderer,
        )
        .await;
        assert_eq!(result.end_reason, ControllerEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 25);
        assert_eq!(result.final_summary.unwrap().tick, 25);
    }

    #[tokio::test]
    async fn operator_stop_before_first_tick() {
        let op = operator(0);
        op.request_stop();
        let mut s = scheduler();
        let result = run_controller(&mut s, &mut NoTraffic, &clock(), &op, &mut NoOpRenderer).await;
        assert_eq!(result.end_reason, ControllerEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 0);
        assert_eq!(op.end_reason().await, Some(ControllerEndReason::OperatorStop));
    }

    #[tokio::test]
    async fn scripted_traffic_runs_a_full_cycle() {
        let mut source = ScriptedOccupancy::new(vec![OccupancyWindow {
            lanes: vec![1],
            from: Timestamp::ZERO,
            until: Timestamp::from_secs(1),
        }]);
        let mut recorder = Recorder::default();
        let mut s = scheduler();
        // 200 ticks of 100 ms cover 20 s: green 0-15, yellow 15-18, idle after.
        let result = run_controller(&mut s, &mut source, &clock(), &operator(200), &mut recorder).await;

        assert_eq!(result.total_ticks, 200);
        let phases: Vec<Phase> = recorder.snapshots.iter().map(|s| s.phase).collect();
        assert_eq!(phases[0], Phase::Green);
        assert_eq!(phases[150], Phase::Yellow);
        assert_eq!(phases[180], Phase::Idle);
        let transitions = recorder
            .snapshots
            .iter()
            .filter(|s| s.transition.is_some())
            .count();
        assert_eq!(transitions, 3);
    }

    #[tokio::test]
    async fn invalid_lanes_are_counted_and_skipped() {
        let mut source = ScriptedOccupancy::new(vec![OccupancyWindow {
            lanes: vec![5],
            from: Timestamp::ZERO,
            until: Timestamp::from_millis(500),
        }]);
        let mut s = scheduler();
        let result = run_controller(&mut s, &mut source, &clock(), &operator(10), &mut NoOpRenderer).await;
        assert_eq!(result.rejected_ticks, 5);
        assert_eq!(result.total_ticks, 10);
        assert_eq!(s.ticks(), 10);
    }

    #[tokio::test]
    async fn failed_reads_count_as_empty() {
        let mut s = scheduler();
        let result = run_controller(&mut s, &mut Failing, &clock(), &operator(3), &mut NoOpRenderer).await;
        assert_eq!(result.total_ticks, 3);
        assert_eq!(result.rejected_ticks, 0);
        assert_eq!(result.final_summary.unwrap().phase, Phase::Idle);
    }
}
