#![forbid(unsafe_code)]

//! fxchain public facade crate.
//!
//! Re-exports the pipeline model and the drag engine, and adds the pieces a
//! host needs to embed them: [`PipelineSession`], [`NoticeQueue`],
//! [`SessionConfig`] loading and [`logging::init`].

pub mod config;
pub mod error;
pub mod logging;
pub mod notice;
pub mod session;

pub use config::SessionConfig;
pub use error::{Error, Result};
pub use logging::LogFormat;
pub use notice::{Notice, NoticeAction, NoticeConfig, NoticeId, NoticeQueue, NoticeStats};
pub use session::{PipelineSession, SessionTick};

// --- Model re-exports ------------------------------------------------------

pub use fxchain_model::{
    BlendMode, DisplayEntry, DisplayOrder, Filter, FilterId, FilterSequence, FilterType,
    FilterTypeRegistry, InvariantReport, PipelineEdit, SharedRegistry, StaticRegistry,
    StructuralViolation, TypeFlags,
};

// --- Drag re-exports -------------------------------------------------------

pub use fxchain_drag::{
    Affordance, AffordanceKind, CancelReason, DragConfig, DragEffect, DragEngine, DropResolution,
    GestureToken, LayoutOracle, Point, Rect, StaticLayout,
};

pub use fxchain_drag as drag;
pub use fxchain_model as model;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        AffordanceKind, CancelReason, DragEffect, DropResolution, Error, Filter, FilterId,
        LayoutOracle, PipelineEdit, PipelineSession, Point, Rect, Result, SessionConfig,
        StaticRegistry, TypeFlags,
    };

    pub use crate::{drag, model};
}
