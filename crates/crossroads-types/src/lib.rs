//! Shared type definitions for the Crossroads intersection controller.
//!
//! This crate is the single source of truth for the vocabulary shared by
//! the scheduling core, the observer API, and the controller binary. Types
//! flow downstream to `TypeScript` via `ts-rs` for the observer dashboard.
//!
//! # Modules
//!
//! - [`lane`] -- Validated lane ids and the two pair identifiers
//! - [`enums`] -- Signal colours, controller phases, selection vocabulary
//! - [`snapshot`] -- Published per-tick views of the intersection

pub mod enums;
pub mod lane;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use enums::{Phase, Selection, SelectionRule, SignalState};
pub use lane::{InvalidLaneError, Lane, PairId};
pub use snapshot::{RunId, SignalSnapshot, TransitionRecord};
