//! Operator control state for the running controller.
//!
//! This module provides shared atomic state used by the control loop and
//! the operator REST API. The operator can pause/resume polling, change
//! the poll interval, and trigger a clean shutdown without restarting the
//! process.
//!
//! # Architecture
//!
//! All mutable control fields use [`std::sync::atomic`] types so the
//! struct can be wrapped in an [`Arc`](std::sync::Arc) and shared between
//! the control loop task and the Axum handler tasks without locks on the
//! hot path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::config::SimulationBoundsConfig;

/// Shortest poll interval the operator may set, in milliseconds.
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Reason why the control loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// Reached the configured `max_real_time_seconds` limit.
    MaxRealTimeReached,
    /// An operator issued a stop command.
    OperatorStop,
}

/// Shared operator control state.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether polling is currently paused.
    paused: AtomicBool,

    /// Wakes the control loop on resume or stop.
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Current poll interval in milliseconds (runtime-adjustable).
    poll_interval_ms: AtomicU64,

    /// Wall-clock time when the controller started.
    started_at: DateTime<Utc>,

    /// Maximum number of ticks (0 = unlimited).
    max_ticks: u64,

    /// Maximum wall-clock seconds (0 = unlimited).
    max_real_time_seconds: u64,

    /// Ticks rejected because the reading named an unknown lane.
    rejected_ticks: AtomicU64,

    /// Reason the loop ended, if it has.
    end_reason: Mutex<Option<ControllerEndReason>>,
}

impl OperatorState {
    /// Create a new operator state from configuration.
    pub fn new(poll_interval_ms: u64, bounds: &SimulationBoundsConfig) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            poll_interval_ms: AtomicU64::new(poll_interval_ms),
            started_at: Utc::now(),
            max_ticks: bounds.max_ticks,
            max_real_time_seconds: bounds.max_real_time_seconds,
            rejected_ticks: AtomicU64::new(0),
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether polling is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause polling. The signals hold their current state until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume polling and wake the control loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Wait until polling is no longer paused or a stop is requested.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() && !self.is_stop_requested() {
            self.resume_notify.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop. Also wakes a paused loop so it can exit.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record the reason the loop ended.
    pub async fn set_end_reason(&self, reason: ControllerEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// Get the reason the loop ended, if it has.
    pub async fn end_reason(&self) -> Option<ControllerEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Poll interval
    // -----------------------------------------------------------------------

    /// Get the current poll interval in milliseconds.
    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms.load(Ordering::Acquire)
    }

    /// Set the poll interval in milliseconds.
    ///
    /// Returns the previous interval, or `None` if the value is below
    /// [`MIN_POLL_INTERVAL_MS`] and was rejected.
    pub fn set_poll_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms < MIN_POLL_INTERVAL_MS {
            return None;
        }
        Some(self.poll_interval_ms.swap(ms, Ordering::AcqRel))
    }

    // -----------------------------------------------------------------------
    // Rejections
    // -----------------------------------------------------------------------

    /// Count one rejected tick and return the new total.
    pub fn record_rejected_tick(&self) -> u64 {
        self.rejected_ticks
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1)
    }

    /// Number of ticks rejected so far.
    pub fn rejected_ticks(&self) -> u64 {
        self.rejected_ticks.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Whether `max_ticks > 0` and `current_tick >= max_ticks`.
    pub const fn tick_limit_reached(&self, current_tick: u64) -> bool {
        self.max_ticks > 0 && current_tick >= self.max_ticks
    }

    /// Whether `max_real_time_seconds > 0` and that much wall-clock time
    /// has passed since start.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // Negative if the wall clock stepped back; treat as 0.
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Get the configured max ticks.
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Get the configured max real-time seconds.
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }
}

/// JSON-serializable status of the control loop for the operator API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerStatus {
    /// Last completed tick.
    pub tick: u64,
    /// Whether polling is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Current poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Elapsed wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Configured maximum ticks (0 = unlimited).
    pub max_ticks: u64,
    /// Configured maximum real-time seconds (0 = unlimited).
    pub max_real_time_seconds: u64,
    /// Ticks rejected because of an invalid lane id.
    pub rejected_ticks: u64,
    /// The reason the loop ended, if applicable.
    pub end_reason: Option<ControllerEndReason>,
    /// ISO 8601 timestamp of when the controller started.
    pub started_at: String,
}
