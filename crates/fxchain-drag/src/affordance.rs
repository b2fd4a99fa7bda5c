#![forbid(unsafe_code)]

//! Structural affordance hit testing.

use fxchain_model::FilterId;
use rustc_hash::FxHashSet;

use crate::geometry::Point;
use crate::oracle::{Affordance, AffordanceKind};

/// What the current gesture is allowed to drop onto.
///
/// Eligibility is computed once when the gesture starts, so hit testing
/// during pointer moves is a pure lookup.
#[derive(Debug, Clone, Default)]
pub struct Eligibility {
    /// Filters being dragged.
    pub members: Vec<FilterId>,
    /// The dragged block is a whole group or mask unit.
    pub composite: bool,
    /// Base of the group the dragged child already belongs to.
    pub own_group: Option<FilterId>,
    /// Bases a single filter may join.
    pub group_bases: FxHashSet<FilterId>,
    /// Rows whose unit the dragged filter may mask.
    pub mask_targets: FxHashSet<FilterId>,
}

impl Eligibility {
    /// Whether `kind` is a legal drop for this gesture.
    #[must_use]
    pub fn allows(&self, kind: &AffordanceKind) -> bool {
        if self.composite || self.members.contains(&kind.owner()) {
            return false;
        }
        match kind {
            AffordanceKind::GroupJoin { base } | AffordanceKind::Groove { base, .. } => {
                self.own_group != Some(*base) && self.group_bases.contains(base)
            }
            AffordanceKind::MaskJoin { target } => self.mask_targets.contains(target),
        }
    }
}

/// Pick the affordance under `pointer`.
///
/// Overlaps resolve by [`AffordanceKind::priority`], then by layout order.
#[must_use]
pub fn hit_test(
    pointer: Point,
    affordances: &[Affordance],
    eligibility: &Eligibility,
) -> Option<Affordance> {
    if eligibility.composite {
        return None;
    }
    affordances
        .iter()
        .filter(|affordance| affordance.rect.contains(pointer))
        .filter(|affordance| eligibility.allows(&affordance.kind))
        .min_by_key(|affordance| affordance.kind.priority())
        .copied()
}
