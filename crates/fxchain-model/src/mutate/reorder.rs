#![forbid(unsafe_code)]

//! Plain reordering.
//!
//! Indices are *final* positions: the moved block is removed first and then
//! inserted so that its first record lands at `to`.

use super::group::ungroup;
use super::{MutationResult, extract, position_of, snap_out_of_units, splice_block, stale};
use crate::filter::Filter;
use crate::id::FilterId;
use crate::registry::FilterTypeRegistry;
use crate::units::FilterIndex;

/// Move one filter to final index `to`.
///
/// A group child stays inside its group run. Anything else moves together
/// with its whole unit.
#[must_use]
pub fn move_filter(filters: &[Filter], filter: FilterId, to: usize) -> Vec<Filter> {
    let index = FilterIndex::new(filters);
    let Some(record) = index.get(filter) else {
        stale("move_filter", filter);
        return filters.to_vec();
    };
    let Some(base) = index.group_base(record) else {
        return move_block(filters, &[filter], to);
    };

    let (rest, moving) = extract(filters.to_vec(), &[filter]);
    let run: Vec<usize> = index
        .unit_members(base)
        .into_iter()
        .filter(|member| *member != filter)
        .filter_map(|member| position_of(&rest, member))
        .collect();
    let low = run.iter().copied().min().unwrap_or(0);
    let high = position_of(&rest, base).unwrap_or(rest.len());
    let at = to.clamp(low, high.max(low));
    splice_block(rest, at, moving)
}

/// Move the units containing `ids` as one block to final index `to`.
///
/// Every id expands to its whole unit. A target strictly inside another
/// composite unit snaps to that unit's nearest boundary.
#[must_use]
pub fn move_block(filters: &[Filter], ids: &[FilterId], to: usize) -> Vec<Filter> {
    let index = FilterIndex::new(filters);
    let mut block_ids: Vec<FilterId> = Vec::new();
    for &id in ids {
        let Some(anchor) = index.unit_anchor(id) else {
            stale("move_block", id);
            continue;
        };
        let mut members = index.unit_members(anchor);
        members.extend(index.mask_of(anchor));
        if !members.contains(&id) {
            members = vec![id];
        }
        for member in members {
            if !block_ids.contains(&member) {
                block_ids.push(member);
            }
        }
    }
    if block_ids.is_empty() {
        return filters.to_vec();
    }

    let (rest, block) = extract(filters.to_vec(), &block_ids);
    let at = snap_out_of_units(&rest, to.min(rest.len()));
    tracing::trace!(
        target: "fxchain.mutate",
        moved = block.len(),
        to,
        at,
        "block moved"
    );
    splice_block(rest, at, block)
}

/// Release a child from its group and move it to final index `to`.
pub fn ungroup_and_move(
    filters: &[Filter],
    filter: FilterId,
    to: usize,
    registry: &dyn FilterTypeRegistry,
) -> MutationResult {
    let released = ungroup(filters, filter, registry)?;
    Ok(move_filter(&released, filter, to))
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::mutate::{group, mask};
    use pretty_assertions::assert_eq;

    fn five() -> Vec<Filter> {
        (1..=5).map(blur).collect()
    }

    #[test]
    fn move_is_remove_then_insert() {
        assert_eq!(ids(&move_filter(&five(), id(4), 1)), vec![1, 4, 2, 3, 5]);
        assert_eq!(ids(&move_filter(&five(), id(1), 4)), vec![2, 3, 4, 5, 1]);
        assert_eq!(ids(&move_filter(&five(), id(2), 99)), vec![1, 3, 4, 5, 2]);
        assert_eq!(move_filter(&five(), id(3), 2), five());
    }

    #[test]
    fn child_stays_within_its_group() {
        let mut filters = vec![blur(1), blur(2), blur(3), shape(4), blur(5)];
        filters = group(&filters, id(2), id(4), &registry()).expect("legal group");
        filters = group(&filters, id(3), id(4), &registry()).expect("legal group");
        assert_eq!(ids(&filters), vec![1, 2, 3, 4, 5]);

        let up = move_filter(&filters, id(3), 0);
        assert_eq!(ids(&up), vec![1, 3, 2, 4, 5]);
        let down = move_filter(&filters, id(2), 4);
        assert_eq!(ids(&down), vec![1, 3, 2, 4, 5]);
        assert_clean(&up);
        assert_clean(&down);
    }

    #[test]
    fn base_moves_its_whole_unit() {
        let mut filters = vec![blur(1), blur(2), shape(3), blur(4), blur(5)];
        filters = group(&filters, id(2), id(3), &registry()).expect("legal group");
        filters = mask(&filters, id(3), id(4), &registry()).expect("legal mask");
        assert_eq!(ids(&filters), vec![1, 2, 3, 4, 5]);

        let moved = move_filter(&filters, id(3), 2);
        assert_eq!(ids(&moved), vec![1, 5, 2, 3, 4]);
        assert_clean(&moved);

        let by_mask = move_block(&filters, &[id(4)], 0);
        assert_eq!(ids(&by_mask), vec![2, 3, 4, 1, 5]);
        assert_clean(&by_mask);
    }

    #[test]
    fn target_inside_foreign_unit_snaps_to_boundary() {
        let mut filters = vec![blur(1), blur(2), blur(3), shape(4), blur(5)];
        filters = group(&filters, id(2), id(4), &registry()).expect("legal group");
        filters = group(&filters, id(3), id(4), &registry()).expect("legal group");

        let near_start = move_filter(&filters, id(5), 2);
        assert_eq!(ids(&near_start), vec![1, 5, 2, 3, 4]);
        let near_end = move_filter(&filters, id(1), 2);
        assert_eq!(ids(&near_end), vec![2, 3, 4, 1, 5]);
        assert_clean(&near_start);
        assert_clean(&near_end);
    }

    #[test]
    fn ungroup_and_move_leaves_the_group() {
        let mut filters = vec![blur(1), blur(2), shape(3), blur(4)];
        filters = group(&filters, id(2), id(3), &registry()).expect("legal group");
        let moved = ungroup_and_move(&filters, id(2), 3, &registry()).expect("child ungroup");
        assert_eq!(ids(&moved), vec![1, 3, 4, 2]);
        assert!(!get(&moved, 2).has_relationships());
        assert!(!get(&moved, 3).is_group_base());
        assert_clean(&moved);
    }

    #[test]
    fn stale_block_ids_are_skipped() {
        let moved = move_block(&five(), &[id(42), id(5)], 0);
        assert_eq!(ids(&moved), vec![5, 1, 2, 3, 4]);
        assert_eq!(move_block(&five(), &[id(42)], 0), five());
    }
}
