//! Renderer that publishes each tick to the Observer API state.
//!
//! After every completed tick the renderer broadcasts the
//! [`SignalSnapshot`] to `WebSocket` clients and replaces the in-memory
//! [`IntersectionSnapshot`](crossroads_observer::IntersectionSnapshot).

use std::sync::Arc;

use crossroads_core::render::SignalRenderer;
use crossroads_core::tick::TickSummary;
use crossroads_observer::AppState;
use crossroads_types::{SignalSnapshot, TransitionRecord};
use tracing::debug;

/// Bridges the control loop to the Observer API.
pub struct ObserverRenderer {
    state: Arc<AppState>,
    /// Transitions not yet written because the snapshot lock was busy.
    pending: Vec<TransitionRecord>,
}

impl ObserverRenderer {
    /// Create a renderer backed by the given app state.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            pending: Vec::new(),
        }
    }
}

impl SignalRenderer for ObserverRenderer {
    fn render(&mut self, summary: &TickSummary, snapshot: &SignalSnapshot) {
        let receivers = self.state.broadcast(snapshot);
        debug!(tick = summary.tick, receivers, "Signal snapshot broadcast");

        if let Some(transition) = &summary.transition {
            self.pending.push(transition.record(summary.tick));
        }

        // Never block the control loop on a REST reader. A skipped update
        // is caught up on the next tick; transitions are kept until then.
        if let Ok(mut snap) = self.state.snapshot.try_write() {
            snap.apply(snapshot.clone(), self.pending.drain(..));
        } else {
            debug!(
                tick = summary.tick,
                pending = self.pending.len(),
                "Observer snapshot busy, deferring update"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crossroads_core::clock::Timestamp;
    use crossroads_core::config::ControllerConfig;
    use crossroads_core::tick::Scheduler;
    use crossroads_types::Phase;

    use super::*;

    fn step(scheduler: &mut Scheduler, renderer: &mut ObserverRenderer, ids: &[u8], ms: u64) {
        let summary = scheduler.tick(ids, Timestamp::from_millis(ms)).unwrap();
        renderer.render(&summary, &scheduler.snapshot());
    }

    #[tokio::test]
    async fn publishes_snapshot_and_transitions() {
        let state = Arc::new(AppState::default());
        let mut rx = state.subscribe();
        let mut renderer = ObserverRenderer::new(Arc::clone(&state));
        let mut scheduler = Scheduler::from_config(&ControllerConfig::default()).unwrap();

        step(&mut scheduler, &mut renderer, &[2], 0);

        let published = rx.recv().await.unwrap();
        assert_eq!(published.phase, Phase::Green);

        let snap = state.snapshot.read().await;
        assert_eq!(snap.signals.tick, 1);
        assert_eq!(snap.transitions.len(), 1);
    }

    #[tokio::test]
    async fn busy_snapshot_defers_transitions() {
        let state = Arc::new(AppState::default());
        let mut renderer = ObserverRenderer::new(Arc::clone(&state));
        let mut scheduler = Scheduler::from_config(&ControllerConfig::default()).unwrap();

        {
            let _reader = state.snapshot.read().await;
            step(&mut scheduler, &mut renderer, &[1], 0);
        }
        assert_eq!(state.snapshot.read().await.signals.tick, 0);

        step(&mut scheduler, &mut renderer, &[1], 100);
        let snap = state.snapshot.read().await;
        assert_eq!(snap.signals.tick, 2);
        assert_eq!(snap.transitions.len(), 1);
        assert_eq!(snap.transitions.first().unwrap().to, Phase::Green);
    }
}
