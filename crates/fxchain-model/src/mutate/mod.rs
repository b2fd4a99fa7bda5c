#![forbid(unsafe_code)]

//! Structural mutators.
//!
//! Every mutator is a pure `&[Filter] -> Result<Vec<Filter>, _>` function run
//! against one snapshot. Ids that no longer exist turn the call into a silent
//! no-op (the input is returned unchanged and the stale reference is logged
//! at debug). Rule breaks a user can trigger return a
//! [`StructuralViolation`] and nothing changes.
//!
//! [`PipelineEdit`] names each mutator as data so the drag engine can hand a
//! single value to the store, and [`apply_edit`] dispatches it.

mod group;
mod lifecycle;
mod mask;
mod reorder;

use serde::{Deserialize, Serialize};

pub use group::{add_to_group, disband_group, group, ungroup};
pub use lifecycle::{
    duplicate, link_dimensions, remove, set_blend_mode, set_enabled, set_param, unlink_dimensions,
};
pub use mask::{mask, unmask};
pub use reorder::{move_block, move_filter, ungroup_and_move};

use crate::error::StructuralViolation;
use crate::filter::{BlendMode, Filter};
use crate::id::FilterId;
use crate::registry::FilterTypeRegistry;
use crate::units::composite_spans;

/// Result of one mutator call.
pub type MutationResult = Result<Vec<Filter>, StructuralViolation>;

/// One structural or parameter edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PipelineEdit {
    /// Make `dragged` the direct child of `base`, placed directly above it.
    Group { dragged: FilterId, base: FilterId },
    /// Insert `dragged` into `base`'s group at child position `child_index`.
    AddToGroup {
        dragged: FilterId,
        base: FilterId,
        child_index: usize,
    },
    /// Take a child out of its group, or hand a group to its next base.
    Ungroup { filter: FilterId },
    /// Ungroup a child and move it to final index `to`.
    UngroupAndMove { filter: FilterId, to: usize },
    /// Release every child of `base`.
    DisbandGroup { base: FilterId },
    /// Overlay the unit containing `masked` with `masking`.
    Mask { masked: FilterId, masking: FilterId },
    /// Drop the overlay held by `masking`.
    Unmask { masking: FilterId },
    Duplicate { source: FilterId, new_id: FilterId },
    Remove { filter: FilterId },
    LinkDimensions { source: FilterId, target: FilterId },
    UnlinkDimensions { source: FilterId, target: FilterId },
    /// Move one filter (or its whole unit) to final index `to`.
    MoveFilter { filter: FilterId, to: usize },
    /// Move the units containing `filters` as one block to final index `to`.
    MoveBlock { filters: Vec<FilterId>, to: usize },
    SetParam {
        filter: FilterId,
        name: String,
        value: f64,
    },
    SetEnabled { filter: FilterId, enabled: bool },
    SetBlendMode {
        filter: FilterId,
        blend_mode: BlendMode,
    },
}

/// Edit family, for logs and notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineEditKind {
    Group,
    AddToGroup,
    Ungroup,
    UngroupAndMove,
    DisbandGroup,
    Mask,
    Unmask,
    Duplicate,
    Remove,
    LinkDimensions,
    UnlinkDimensions,
    MoveFilter,
    MoveBlock,
    SetParam,
    SetEnabled,
    SetBlendMode,
}

impl PipelineEditKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::AddToGroup => "add_to_group",
            Self::Ungroup => "ungroup",
            Self::UngroupAndMove => "ungroup_and_move",
            Self::DisbandGroup => "disband_group",
            Self::Mask => "mask",
            Self::Unmask => "unmask",
            Self::Duplicate => "duplicate",
            Self::Remove => "remove",
            Self::LinkDimensions => "link_dimensions",
            Self::UnlinkDimensions => "unlink_dimensions",
            Self::MoveFilter => "move_filter",
            Self::MoveBlock => "move_block",
            Self::SetParam => "set_param",
            Self::SetEnabled => "set_enabled",
            Self::SetBlendMode => "set_blend_mode",
        }
    }

    /// Whether the edit can change order or relationships.
    #[must_use]
    pub const fn is_structural(self) -> bool {
        !matches!(self, Self::SetParam | Self::SetEnabled | Self::SetBlendMode)
    }
}

impl PipelineEdit {
    #[must_use]
    pub const fn kind(&self) -> PipelineEditKind {
        match self {
            Self::Group { .. } => PipelineEditKind::Group,
            Self::AddToGroup { .. } => PipelineEditKind::AddToGroup,
            Self::Ungroup { .. } => PipelineEditKind::Ungroup,
            Self::UngroupAndMove { .. } => PipelineEditKind::UngroupAndMove,
            Self::DisbandGroup { .. } => PipelineEditKind::DisbandGroup,
            Self::Mask { .. } => PipelineEditKind::Mask,
            Self::Unmask { .. } => PipelineEditKind::Unmask,
            Self::Duplicate { .. } => PipelineEditKind::Duplicate,
            Self::Remove { .. } => PipelineEditKind::Remove,
            Self::LinkDimensions { .. } => PipelineEditKind::LinkDimensions,
            Self::UnlinkDimensions { .. } => PipelineEditKind::UnlinkDimensions,
            Self::MoveFilter { .. } => PipelineEditKind::MoveFilter,
            Self::MoveBlock { .. } => PipelineEditKind::MoveBlock,
            Self::SetParam { .. } => PipelineEditKind::SetParam,
            Self::SetEnabled { .. } => PipelineEditKind::SetEnabled,
            Self::SetBlendMode { .. } => PipelineEditKind::SetBlendMode,
        }
    }

    /// Filter ids the edit names.
    #[must_use]
    pub fn referenced_filters(&self) -> Vec<FilterId> {
        match self {
            Self::Group { dragged, base } | Self::AddToGroup { dragged, base, .. } => {
                vec![*dragged, *base]
            }
            Self::Mask { masked, masking } => vec![*masked, *masking],
            Self::Duplicate { source, new_id } => vec![*source, *new_id],
            Self::LinkDimensions { source, target } | Self::UnlinkDimensions { source, target } => {
                vec![*source, *target]
            }
            Self::MoveBlock { filters, .. } => filters.clone(),
            Self::Ungroup { filter }
            | Self::UngroupAndMove { filter, .. }
            | Self::Remove { filter }
            | Self::MoveFilter { filter, .. }
            | Self::SetParam { filter, .. }
            | Self::SetEnabled { filter, .. }
            | Self::SetBlendMode { filter, .. } => vec![*filter],
            Self::DisbandGroup { base } => vec![*base],
            Self::Unmask { masking } => vec![*masking],
        }
    }
}

/// Run `edit` against `filters`.
pub fn apply_edit(
    filters: &[Filter],
    edit: &PipelineEdit,
    registry: &dyn FilterTypeRegistry,
) -> MutationResult {
    match edit {
        PipelineEdit::Group { dragged, base } => group(filters, *dragged, *base, registry),
        PipelineEdit::AddToGroup {
            dragged,
            base,
            child_index,
        } => add_to_group(filters, *dragged, *base, *child_index, registry),
        PipelineEdit::Ungroup { filter } => ungroup(filters, *filter, registry),
        PipelineEdit::UngroupAndMove { filter, to } => {
            ungroup_and_move(filters, *filter, *to, registry)
        }
        PipelineEdit::DisbandGroup { base } => Ok(disband_group(filters, *base)),
        PipelineEdit::Mask { masked, masking } => mask(filters, *masked, *masking, registry),
        PipelineEdit::Unmask { masking } => Ok(unmask(filters, *masking)),
        PipelineEdit::Duplicate { source, new_id } => Ok(duplicate(filters, *source, *new_id)),
        PipelineEdit::Remove { filter } => Ok(remove(filters, *filter)),
        PipelineEdit::LinkDimensions { source, target } => {
            Ok(link_dimensions(filters, *source, *target))
        }
        PipelineEdit::UnlinkDimensions { source, target } => {
            Ok(unlink_dimensions(filters, *source, *target))
        }
        PipelineEdit::MoveFilter { filter, to } => Ok(move_filter(filters, *filter, *to)),
        PipelineEdit::MoveBlock { filters: ids, to } => Ok(move_block(filters, ids, *to)),
        PipelineEdit::SetParam {
            filter,
            name,
            value,
        } => Ok(set_param(filters, *filter, name, *value, registry)),
        PipelineEdit::SetEnabled { filter, enabled } => {
            Ok(set_enabled(filters, *filter, *enabled))
        }
        PipelineEdit::SetBlendMode { filter, blend_mode } => {
            Ok(set_blend_mode(filters, *filter, *blend_mode))
        }
    }
}

fn stale(operation: &'static str, id: FilterId) {
    tracing::debug!(
        target: "fxchain.mutate",
        operation,
        filter = %id,
        "stale filter reference, edit ignored"
    );
}

fn find_mut(filters: &mut [Filter], id: FilterId) -> Option<&mut Filter> {
    filters.iter_mut().find(|filter| filter.id == id)
}

fn position_of(filters: &[Filter], id: FilterId) -> Option<usize> {
    filters.iter().position(|filter| filter.id == id)
}

/// Split `filters` into the records not named by `ids` and those named, both
/// in flat order.
fn extract(filters: Vec<Filter>, ids: &[FilterId]) -> (Vec<Filter>, Vec<Filter>) {
    filters.into_iter().partition(|filter| !ids.contains(&filter.id))
}

/// Push an insertion point strictly inside a composite unit of `rest` to
/// that unit's nearest boundary. Ties go to the start.
fn snap_out_of_units(rest: &[Filter], at: usize) -> usize {
    composite_spans(rest)
        .iter()
        .find(|span| span.splits_at(at))
        .map_or(at, |span| {
            if at - span.start <= span.end - at {
                span.start
            } else {
                span.end
            }
        })
}

/// Insert `block` into `rest` at `at` (clamped to the end).
fn splice_block(mut rest: Vec<Filter>, at: usize, block: Vec<Filter>) -> Vec<Filter> {
    let at = at.min(rest.len());
    rest.splice(at..at, block);
    rest
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::filter::Filter;
    use crate::id::FilterId;
    use crate::invariants::invariant_report;
    use crate::registry::{StaticRegistry, TypeFlags};

    pub fn id(raw: u64) -> FilterId {
        FilterId::new(raw).expect("non-zero")
    }

    /// `shape` can anchor groups and be masked; `image` can be masked;
    /// everything else has no capabilities.
    pub fn registry() -> StaticRegistry {
        StaticRegistry::new()
            .with_type("shape", TypeFlags::GROUP_CAPABLE | TypeFlags::MASK_TARGET)
            .with_type("image", TypeFlags::MASK_TARGET)
            .with_type("blur", TypeFlags::empty())
    }

    pub fn shape(raw: u64) -> Filter {
        Filter::new(id(raw), "shape")
    }

    pub fn blur(raw: u64) -> Filter {
        Filter::new(id(raw), "blur")
    }

    pub fn ids(filters: &[Filter]) -> Vec<u64> {
        filters.iter().map(|filter| filter.id.get()).collect()
    }

    pub fn get(filters: &[Filter], raw: u64) -> &Filter {
        filters
            .iter()
            .find(|filter| filter.id == id(raw))
            .expect("filter present")
    }

    #[track_caller]
    pub fn assert_clean(filters: &[Filter]) {
        let report = invariant_report(filters);
        assert!(report.is_clean(), "invariant issues: {:#?}", report.issues);
    }
}
