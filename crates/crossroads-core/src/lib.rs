//! Signal scheduling core and control loop for the Crossroads intersection
//! controller.
//!
//! This crate turns per-lane "vehicle present" readings into safe, fair,
//! time-bounded signal phases. One call to [`Scheduler::tick`] updates the
//! wait registry, lets the phase controller advance (consulting the pair
//! selector while idle), and publishes the signal table.
//!
//! # Modules
//!
//! - [`clock`] -- Controller timestamps and the [`Clock`] trait.
//! - [`config`] -- Configuration loading from `crossroads-config.yaml` into
//!   strongly-typed structs.
//! - [`layout`] -- Validated lane pairing and adjacency conflicts.
//! - [`registry`] -- [`WaitRegistry`]: when each lane started waiting.
//! - [`selector`] -- The ordered pair selection rules.
//! - [`phase`] -- [`PhaseController`]: the idle/green/yellow state machine.
//! - [`signal_table`] -- [`SignalStateTable`]: lane to colour mapping.
//! - [`tick`] -- [`Scheduler`] and the per-tick [`TickSummary`].
//! - [`occupancy`] -- [`OccupancySource`] trait and built-in sources.
//! - [`render`] -- [`SignalRenderer`] trait and built-in renderers.
//! - [`operator`] -- Pause/resume/stop/speed state shared with the API.
//! - [`runner`] -- The async control loop.
//!
//! [`Clock`]: clock::Clock
//! [`WaitRegistry`]: registry::WaitRegistry
//! [`PhaseController`]: phase::PhaseController
//! [`SignalStateTable`]: signal_table::SignalStateTable
//! [`Scheduler`]: tick::Scheduler
//! [`Scheduler::tick`]: tick::Scheduler::tick
//! [`TickSummary`]: tick::TickSummary
//! [`OccupancySource`]: occupancy::OccupancySource
//! [`SignalRenderer`]: render::SignalRenderer

pub mod clock;
pub mod config;
pub mod layout;
pub mod occupancy;
pub mod operator;
pub mod phase;
pub mod registry;
pub mod render;
pub mod runner;
pub mod selector;
pub mod signal_table;
pub mod tick;
