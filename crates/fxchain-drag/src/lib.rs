#![forbid(unsafe_code)]

//! Drag interaction engine for fxchain.
//!
//! Converts a pointer gesture over the pipeline panel into debounced
//! preview orderings and, on release, into exactly one structural edit (or
//! none). The engine never mutates the pipeline itself: the host applies
//! [`DragEffect`]s to its view and [`DropResolution`]s to its
//! [`fxchain_model::FilterSequence`].
//!
//! Geometry comes from a [`LayoutOracle`] supplied by the view, read when a
//! gesture starts and on explicit refresh.

pub mod affordance;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod offsets;
pub mod oracle;
pub mod target;

pub use affordance::{Eligibility, hit_test};
pub use config::DragConfig;
pub use debounce::PreviewDebouncer;
pub use engine::{CancelReason, DragEffect, DragEngine, DragPhase, DropResolution, GestureToken};
pub use error::{ConfigError, DragError};
pub use geometry::{Point, Rect};
pub use offsets::{logical_offsets, preview_order};
pub use oracle::{Affordance, AffordanceKind, LayoutOracle, StaticLayout};
pub use target::{Direction, DirectionTracker, TargetRow, candidate_index};
