//! Signal renderers: consumers of the published signal table.
//!
//! The control loop calls every renderer once after each completed tick.
//! Renderers only observe; they cannot influence scheduling.

use tracing::{debug, info};

use crossroads_types::SignalSnapshot;

use crate::tick::TickSummary;

/// A consumer of published signal state.
pub trait SignalRenderer: Send {
    /// Called after a tick completes successfully.
    fn render(&mut self, summary: &TickSummary, snapshot: &SignalSnapshot);
}

/// Renders to the log: transitions at `info`, every tick at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRenderer;

impl SignalRenderer for LogRenderer {
    fn render(&mut self, summary: &TickSummary, snapshot: &SignalSnapshot) {
        if let Some(transition) = &summary.transition {
            info!(
                tick = summary.tick,
                from = ?transition.from,
                to = ?transition.to,
                lanes = ?transition.lanes,
                "Signals changed"
            );
        }
        debug!(
            tick = summary.tick,
            phase = ?snapshot.phase,
            remaining_ms = ?snapshot.remaining_ms,
            signals = ?snapshot.signals,
            "Signal table"
        );
    }
}

/// A renderer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpRenderer;

impl SignalRenderer for NoOpRenderer {
    fn render(&mut self, _summary: &TickSummary, _snapshot: &SignalSnapshot) {}
}

impl<R: SignalRenderer + ?Sized> SignalRenderer for Box<R> {
    fn render(&mut self, summary: &TickSummary, snapshot: &SignalSnapshot) {
        (**self).render(summary, snapshot);
    }
}

impl<R: SignalRenderer> SignalRenderer for Vec<R> {
    fn render(&mut self, summary: &TickSummary, snapshot: &SignalSnapshot) {
        for renderer in self {
            renderer.render(summary, snapshot);
        }
    }
}
