#![forbid(unsafe_code)]

//! Group membership edits.

use super::{MutationResult, extract, find_mut, position_of, splice_block, stale};
use crate::error::StructuralViolation;
use crate::filter::Filter;
use crate::id::FilterId;
use crate::registry::FilterTypeRegistry;
use crate::units::{FilterIndex, unit_span};

/// Where a joining filter lands inside the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// Directly above the base in the flat list, first in `grouped_filters`.
    AboveBase,
    /// Before the `n`-th existing child (or above the base when past the end).
    ChildIndex(usize),
}

/// Make `dragged` a direct child of `base`.
///
/// The filter is relocated directly above the base and prepended to the
/// base's child list. A filter already in another group is detached from it
/// first.
pub fn group(
    filters: &[Filter],
    dragged: FilterId,
    base: FilterId,
    registry: &dyn FilterTypeRegistry,
) -> MutationResult {
    join_group(filters, dragged, base, Placement::AboveBase, registry, "group")
}

/// Insert `dragged` into `base`'s group at child position `child_index`.
///
/// `child_index` addresses both the flat position among the existing
/// children and the slot in `grouped_filters`; both are clamped.
pub fn add_to_group(
    filters: &[Filter],
    dragged: FilterId,
    base: FilterId,
    child_index: usize,
    registry: &dyn FilterTypeRegistry,
) -> MutationResult {
    join_group(
        filters,
        dragged,
        base,
        Placement::ChildIndex(child_index),
        registry,
        "add_to_group",
    )
}

fn join_group(
    filters: &[Filter],
    dragged: FilterId,
    base: FilterId,
    placement: Placement,
    registry: &dyn FilterTypeRegistry,
    operation: &'static str,
) -> MutationResult {
    let index = FilterIndex::new(filters);
    let (Some(dragged_filter), Some(base_filter)) = (index.get(dragged), index.get(base)) else {
        stale(operation, if index.contains(dragged) { base } else { dragged });
        return Ok(filters.to_vec());
    };
    if dragged == base {
        return Ok(filters.to_vec());
    }

    if base_filter.group_id.is_some() {
        return Err(StructuralViolation::NestedGroup {
            filter: dragged,
            target: base,
        });
    }
    if index.has_children(dragged) || dragged_filter.is_group_base() {
        return Err(StructuralViolation::NestedGroup {
            filter: dragged,
            target: base,
        });
    }
    if !registry.is_group_capable(&base_filter.filter_type) {
        return Err(StructuralViolation::NotGroupCapable {
            base,
            filter_type: base_filter.filter_type.clone(),
        });
    }
    let dragged_is_masking = dragged_filter
        .masked_filter_id
        .is_some_and(|target| index.contains(target));
    if dragged_is_masking || index.mask_of(dragged).is_some() {
        return Err(StructuralViolation::MaskedMember { filter: dragged });
    }
    if base_filter
        .masked_filter_id
        .is_some_and(|target| index.contains(target))
    {
        return Err(StructuralViolation::MaskedMember { filter: base });
    }

    let previous_base = index.group_base(dragged_filter);
    let inherited_mask = index.mask_of(base);
    let siblings: Vec<FilterId> = index
        .children(base)
        .into_iter()
        .filter(|child| *child != dragged)
        .collect();

    let mut list = filters.to_vec();
    if let Some(previous) = previous_base
        && let Some(previous_filter) = find_mut(&mut list, previous)
    {
        previous_filter.grouped_filters.retain(|child| *child != dragged);
    }
    if let Some(filter) = find_mut(&mut list, dragged) {
        filter.group_id = Some(base);
        filter.mask_id = inherited_mask;
    }
    if let Some(filter) = find_mut(&mut list, base) {
        filter.grouped_filters.retain(|child| *child != dragged);
        let slot = match placement {
            Placement::AboveBase => 0,
            Placement::ChildIndex(child_index) => child_index.min(filter.grouped_filters.len()),
        };
        filter.grouped_filters.insert(slot, dragged);
    }

    let (rest, moving) = extract(list, &[dragged]);
    let anchor = match placement {
        Placement::ChildIndex(child_index) if child_index < siblings.len() => {
            siblings[child_index]
        }
        _ => base,
    };
    let at = position_of(&rest, anchor).unwrap_or(rest.len());
    tracing::debug!(
        target: "fxchain.mutate",
        operation,
        filter = %dragged,
        base = %base,
        at,
        "filter joined group"
    );
    Ok(splice_block(rest, at, moving))
}

/// Take `filter` out of its group.
///
/// A child is released and relocated directly above its former group. A
/// base hands the group to the filter directly above it, which must be one
/// of its children and group-capable; otherwise the edit is rejected with
/// [`StructuralViolation::BaseSuccession`]. An ungrouped filter is left
/// untouched.
pub fn ungroup(
    filters: &[Filter],
    filter: FilterId,
    registry: &dyn FilterTypeRegistry,
) -> MutationResult {
    let index = FilterIndex::new(filters);
    let Some(record) = index.get(filter) else {
        stale("ungroup", filter);
        return Ok(filters.to_vec());
    };

    if let Some(base) = index.group_base(record) {
        return Ok(release_child(filters, &index, filter, base));
    }
    if index.has_children(filter) {
        return hand_over_group(filters, &index, filter, registry);
    }
    Ok(filters.to_vec())
}

fn release_child(
    filters: &[Filter],
    index: &FilterIndex<'_>,
    child: FilterId,
    base: FilterId,
) -> Vec<Filter> {
    let block_start = unit_span(filters, base).map_or(0, |span| span.start);
    let mut list = filters.to_vec();
    if let Some(base_filter) = find_mut(&mut list, base) {
        base_filter.grouped_filters.retain(|id| *id != child);
    }
    if let Some(record) = find_mut(&mut list, child) {
        record.group_id = None;
        record.mask_id = None;
    }
    let (rest, moving) = extract(list, &[child]);
    tracing::debug!(
        target: "fxchain.mutate",
        filter = %child,
        base = %base,
        remaining = index.children(base).len().saturating_sub(1),
        "child released from group"
    );
    splice_block(rest, block_start, moving)
}

fn hand_over_group(
    filters: &[Filter],
    index: &FilterIndex<'_>,
    base: FilterId,
    registry: &dyn FilterTypeRegistry,
) -> MutationResult {
    let position = index.position(base).unwrap_or(0);
    let above = position.checked_sub(1).map(|above| &filters[above]);
    let successor = match above {
        Some(candidate)
            if index.group_base(candidate) == Some(base)
                && registry.is_group_capable(&candidate.filter_type) =>
        {
            candidate.id
        }
        _ => {
            return Err(StructuralViolation::BaseSuccession {
                base,
                above: above.map(|candidate| candidate.id),
            });
        }
    };

    let remaining: Vec<FilterId> = index
        .children(base)
        .into_iter()
        .filter(|child| *child != successor)
        .collect();
    let listed: Vec<FilterId> = index
        .get(base)
        .map(|record| {
            record
                .grouped_filters
                .iter()
                .copied()
                .filter(|child| *child != successor && remaining.contains(child))
                .collect()
        })
        .unwrap_or_default();
    let mask = index.mask_of(base);

    let mut list = filters.to_vec();
    for child in &remaining {
        if let Some(record) = find_mut(&mut list, *child) {
            record.group_id = Some(successor);
        }
    }
    if let Some(record) = find_mut(&mut list, successor) {
        record.group_id = None;
        let mut children = listed;
        for child in &remaining {
            if !children.contains(child) {
                children.push(*child);
            }
        }
        record.grouped_filters = children;
    }
    if let Some(record) = find_mut(&mut list, base) {
        record.grouped_filters.clear();
        record.mask_id = None;
    }

    let list = match mask {
        Some(mask) => {
            if let Some(record) = find_mut(&mut list, mask) {
                record.masked_filter_id = Some(successor);
            }
            // The old base sits between the unit and its mask; move it below.
            let (rest, moving) = extract(list, &[base]);
            let at = position_of(&rest, mask).map_or(rest.len(), |at| at + 1);
            splice_block(rest, at, moving)
        }
        None => list,
    };
    tracing::debug!(
        target: "fxchain.mutate",
        base = %base,
        successor = %successor,
        "group handed to new base"
    );
    Ok(list)
}

/// Release every child of `base`; idempotent.
///
/// Children keep their positions and drop any mask inherited from the
/// group. A mask on the base itself stays.
#[must_use]
pub fn disband_group(filters: &[Filter], base: FilterId) -> Vec<Filter> {
    if !filters.iter().any(|filter| filter.id == base) {
        stale("disband_group", base);
        return filters.to_vec();
    }
    let mut list = filters.to_vec();
    for record in &mut list {
        if record.id == base {
            record.grouped_filters.clear();
        } else if record.group_id == Some(base) {
            record.group_id = None;
            record.mask_id = None;
        }
    }
    list
}
