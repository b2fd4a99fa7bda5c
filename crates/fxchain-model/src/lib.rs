#![forbid(unsafe_code)]

//! Structural model of an effect pipeline.
//!
//! A pipeline is a flat, ordered list of [`Filter`] records. Groups, masks
//! and dimension links are plain id fields on those records; the nested view
//! is derived on demand by [`resolve_display_order`]. All structural edits
//! are pure functions in [`mutate`], and [`FilterSequence`] is the single
//! owner that applies their results.

pub mod error;
pub mod filter;
pub mod id;
pub mod invariants;
pub mod mutate;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod units;

pub use error::{PreviewError, StructuralViolation};
pub use filter::{BlendMode, Filter, FilterType, HEIGHT_PARAM, WIDTH_PARAM, is_dimension_param};
pub use id::{FilterId, IdError};
pub use invariants::{InvariantCode, InvariantIssue, InvariantReport, invariant_report};
pub use mutate::{MutationResult, PipelineEdit, PipelineEditKind, apply_edit};
pub use registry::{FilterDefaults, FilterTypeRegistry, ParamRange, StaticRegistry, TypeFlags};
pub use resolver::{DisplayEntry, DisplayOrder, resolve_display_order};
pub use store::{FilterSequence, SharedRegistry};
pub use units::{FilterIndex, UnitSpan, composite_spans, unit_span, unit_spans};
