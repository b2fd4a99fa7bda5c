#![forbid(unsafe_code)]

//! Mask overlay edits.

use super::{MutationResult, extract, find_mut, snap_out_of_units, splice_block, stale};
use crate::error::StructuralViolation;
use crate::filter::Filter;
use crate::id::FilterId;
use crate::registry::FilterTypeRegistry;
use crate::units::FilterIndex;

/// Overlay the unit containing `masked` with `masking`.
///
/// `masked` is resolved to its unit base. The unit and the masking filter
/// are gathered into one contiguous block at the earliest position either
/// occupied; a previous mask on either side is replaced.
pub fn mask(
    filters: &[Filter],
    masked: FilterId,
    masking: FilterId,
    registry: &dyn FilterTypeRegistry,
) -> MutationResult {
    let index = FilterIndex::new(filters);
    let (Some(_), Some(masking_filter)) = (index.get(masked), index.get(masking)) else {
        stale("mask", if index.contains(masked) { masking } else { masked });
        return Ok(filters.to_vec());
    };
    let anchor = index.base_of(masked);
    let Some(anchor_filter) = index.get(anchor) else {
        stale("mask", anchor);
        return Ok(filters.to_vec());
    };

    if masking == anchor || index.group_base(masking_filter) == Some(anchor) {
        return Err(StructuralViolation::SelfMask {
            masking,
            target: anchor,
        });
    }
    if index.has_children(masking) || masking_filter.is_group_base() {
        return Err(StructuralViolation::GroupAsMask { masking });
    }
    if anchor_filter.is_masking() || index.mask_of(masking).is_some() {
        return Err(StructuralViolation::NestedMask {
            masking,
            target: anchor,
        });
    }
    if !registry.is_mask_target(&anchor_filter.filter_type) {
        return Err(StructuralViolation::NotMaskTarget {
            target: anchor,
            filter_type: anchor_filter.filter_type.clone(),
        });
    }

    let members = index.unit_members(anchor);
    let previous_group = index.group_base(masking_filter);
    let previous_overlay = index.mask_of(anchor).filter(|mask| *mask != masking);
    let previously_masked: Vec<FilterId> = masking_filter
        .masked_filter_id
        .filter(|target| index.contains(*target))
        .map(|target| index.base_of(target))
        .filter(|old_anchor| *old_anchor != anchor && index.mask_of(*old_anchor) == Some(masking))
        .map(|old_anchor| index.unit_members(old_anchor))
        .unwrap_or_default();
    let earliest = members
        .iter()
        .chain(std::iter::once(&masking))
        .filter_map(|id| index.position(*id))
        .min()
        .unwrap_or(0);

    let mut list = filters.to_vec();
    if let Some(previous) = previous_group
        && let Some(record) = find_mut(&mut list, previous)
    {
        record.grouped_filters.retain(|child| *child != masking);
    }
    if let Some(previous) = previous_overlay
        && let Some(record) = find_mut(&mut list, previous)
    {
        record.masked_filter_id = None;
    }
    for record in &mut list {
        if members.contains(&record.id) {
            record.mask_id = Some(masking);
        } else if previously_masked.contains(&record.id) && record.mask_id == Some(masking) {
            record.mask_id = None;
        }
    }
    if let Some(record) = find_mut(&mut list, masking) {
        record.group_id = None;
        record.mask_id = None;
        record.masked_filter_id = Some(anchor);
    }

    let mut block_ids = members;
    block_ids.push(masking);
    let (rest, mut block) = extract(list, &block_ids);
    // Unit members keep their flat order; the masking filter closes the block.
    block.sort_by_key(|record| record.id == masking);
    let at = snap_out_of_units(&rest, earliest.min(rest.len()));
    tracing::debug!(
        target: "fxchain.mutate",
        masking = %masking,
        target_unit = %anchor,
        at,
        "mask applied"
    );
    Ok(splice_block(rest, at, block))
}

/// Drop the overlay held by `masking`.
///
/// Passing a member of a masked unit drops that unit's overlay. Positions
/// are left as they are.
#[must_use]
pub fn unmask(filters: &[Filter], masking: FilterId) -> Vec<Filter> {
    let Some(record) = filters.iter().find(|filter| filter.id == masking) else {
        stale("unmask", masking);
        return filters.to_vec();
    };
    let masking = if record.is_masking() {
        masking
    } else if let Some(mask) = record.mask_id {
        mask
    } else {
        return filters.to_vec();
    };

    let mut list = filters.to_vec();
    for record in &mut list {
        if record.id == masking {
            record.masked_filter_id = None;
        }
        if record.mask_id == Some(masking) {
            record.mask_id = None;
        }
    }
    list
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::mutate::group;
    use pretty_assertions::assert_eq;

    #[test]
    fn mask_gathers_unit_and_mask_at_earliest_position() {
        let filters = vec![blur(1), blur(2), shape(3), blur(4)];
        let masked = mask(&filters, id(3), id(2), &registry()).expect("legal mask");
        assert_eq!(ids(&masked), vec![1, 3, 2, 4]);
        assert_eq!(get(&masked, 2).masked_filter_id, Some(id(3)));
        assert_eq!(get(&masked, 3).mask_id, Some(id(2)));
        assert_clean(&masked);
    }

    #[test]
    fn masking_a_child_targets_its_base_and_propagates() {
        let mut filters = vec![blur(1), shape(2), blur(3), blur(4)];
        filters = group(&filters, id(1), id(2), &registry()).expect("legal group");
        let masked = mask(&filters, id(1), id(4), &registry()).expect("legal mask");
        assert_eq!(ids(&masked), vec![1, 2, 4, 3]);
        assert_eq!(get(&masked, 4).masked_filter_id, Some(id(2)));
        assert_eq!(get(&masked, 1).mask_id, Some(id(4)));
        assert_eq!(get(&masked, 2).mask_id, Some(id(4)));
        assert_clean(&masked);
    }

    #[test]
    fn member_of_unit_cannot_mask_it() {
        let mut filters = vec![blur(1), shape(2)];
        filters = group(&filters, id(1), id(2), &registry()).expect("legal group");
        assert_eq!(
            mask(&filters, id(2), id(1), &registry()),
            Err(StructuralViolation::SelfMask {
                masking: id(1),
                target: id(2)
            })
        );
    }

    #[test]
    fn group_cannot_be_a_mask() {
        let mut filters = vec![blur(1), shape(2), shape(3)];
        filters = group(&filters, id(1), id(2), &registry()).expect("legal group");
        assert_eq!(
            mask(&filters, id(3), id(2), &registry()),
            Err(StructuralViolation::GroupAsMask { masking: id(2) })
        );
    }

    #[test]
    fn masks_do_not_nest() {
        let filters = vec![shape(1), shape(2), blur(3)];
        let masked = mask(&filters, id(1), id(2), &registry()).expect("legal mask");
        assert_eq!(
            mask(&masked, id(2), id(3), &registry()),
            Err(StructuralViolation::NestedMask {
                masking: id(3),
                target: id(2)
            })
        );
        assert!(matches!(
            mask(&masked, id(3), id(1), &registry()),
            Err(StructuralViolation::NestedMask { .. })
        ));
    }

    #[test]
    fn target_type_must_accept_masks() {
        let filters = vec![blur(1), blur(2)];
        assert!(matches!(
            mask(&filters, id(1), id(2), &registry()),
            Err(StructuralViolation::NotMaskTarget { target, .. }) if target == id(1)
        ));
    }

    #[test]
    fn new_mask_replaces_previous_overlay() {
        let filters = vec![shape(1), blur(2), blur(3)];
        let first = mask(&filters, id(1), id(2), &registry()).expect("legal mask");
        let second = mask(&first, id(1), id(3), &registry()).expect("legal mask");
        assert_eq!(ids(&second), vec![1, 3, 2]);
        assert_eq!(get(&second, 2).masked_filter_id, None);
        assert_eq!(get(&second, 1).mask_id, Some(id(3)));
        assert_clean(&second);
    }

    #[test]
    fn moving_a_mask_to_another_unit_releases_the_old_one() {
        let filters = vec![shape(1), blur(2), shape(3)];
        let first = mask(&filters, id(1), id(2), &registry()).expect("legal mask");
        let moved = mask(&first, id(3), id(2), &registry()).expect("legal mask");
        assert_eq!(ids(&moved), vec![1, 3, 2]);
        assert_eq!(get(&moved, 1).mask_id, None);
        assert_eq!(get(&moved, 3).mask_id, Some(id(2)));
        assert_clean(&moved);
    }

    #[test]
    fn unmask_clears_both_sides_and_keeps_positions() {
        let mut filters = vec![blur(1), shape(2), blur(3)];
        filters = group(&filters, id(1), id(2), &registry()).expect("legal group");
        filters = mask(&filters, id(2), id(3), &registry()).expect("legal mask");
        let cleared = unmask(&filters, id(3));
        assert_eq!(ids(&cleared), ids(&filters));
        assert!(cleared.iter().all(|record| record.mask_id.is_none()));
        assert_eq!(get(&cleared, 3).masked_filter_id, None);
        assert_eq!(unmask(&filters, id(1)), cleared);
        assert_clean(&cleared);
    }
}
