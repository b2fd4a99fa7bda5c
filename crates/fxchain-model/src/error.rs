#![forbid(unsafe_code)]

//! User-facing structural errors.

use crate::filter::FilterType;
use crate::id::FilterId;

/// A structural edit the user attempted that the pipeline model forbids.
///
/// Violations are returned instead of a changed list; callers surface them as
/// transient notices. Stale ids are *not* violations: mutators treat them as
/// silent no-ops.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralViolation {
    #[error("groups cannot be nested: {filter} cannot join {target}")]
    NestedGroup { filter: FilterId, target: FilterId },

    #[error("{filter_type} filters cannot anchor a group")]
    NotGroupCapable {
        base: FilterId,
        filter_type: FilterType,
    },

    #[error("cannot ungroup base {base}: the filter above it cannot take over the group")]
    BaseSuccession {
        base: FilterId,
        above: Option<FilterId>,
    },

    #[error("{filter_type} filters cannot be masked")]
    NotMaskTarget {
        target: FilterId,
        filter_type: FilterType,
    },

    #[error("{masking} cannot mask a unit it belongs to")]
    SelfMask { masking: FilterId, target: FilterId },

    #[error("masks cannot be nested: {masking} cannot mask {target}")]
    NestedMask { masking: FilterId, target: FilterId },

    #[error("a group cannot be used as a mask")]
    GroupAsMask { masking: FilterId },

    #[error("{filter} takes part in a mask; unmask it first")]
    MaskedMember { filter: FilterId },
}

impl StructuralViolation {
    /// Stable discriminator for logs and notice de-duplication.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NestedGroup { .. } => "nested_group",
            Self::NotGroupCapable { .. } => "not_group_capable",
            Self::BaseSuccession { .. } => "base_succession",
            Self::NotMaskTarget { .. } => "not_mask_target",
            Self::SelfMask { .. } => "self_mask",
            Self::NestedMask { .. } => "nested_mask",
            Self::GroupAsMask { .. } => "group_as_mask",
            Self::MaskedMember { .. } => "masked_member",
        }
    }
}

/// Rejected preview ordering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreviewError {
    #[error("preview lists {actual} filters, the pipeline has {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("preview names unknown filter {0}")]
    UnknownFilter(FilterId),
    #[error("preview names {0} more than once")]
    DuplicateFilter(FilterId),
}
