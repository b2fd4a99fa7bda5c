#![forbid(unsafe_code)]

//! Preview orderings and the row offsets that realise them.
//!
//! Rows are never physically reordered during a drag. The view shifts each
//! row by a logical offset so the list looks like the preview order, and the
//! engine keeps hit testing against the captured rectangles plus those
//! offsets.

use std::collections::BTreeMap;

use fxchain_model::FilterId;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::geometry::Rect;

/// `order` with `members` taken out and reinserted as a block at `index`.
///
/// `index` is a position in the list without the block and is clamped to
/// its length. Members keep their relative order.
#[must_use]
pub fn preview_order(order: &[FilterId], members: &[FilterId], index: usize) -> Vec<FilterId> {
    let member_set: FxHashSet<FilterId> = members.iter().copied().collect();
    let mut block = Vec::with_capacity(members.len());
    let mut rest = Vec::with_capacity(order.len());
    for id in order {
        if member_set.contains(id) {
            block.push(*id);
        } else {
            rest.push(*id);
        }
    }
    let at = index.min(rest.len());
    rest.splice(at..at, block);
    rest
}

/// Vertical offset of every non-member row in the preview layout.
///
/// Slot `k` of the preview keeps the gap that followed slot `k` in the
/// captured layout. Rows without captured geometry get no offset and take
/// no space.
#[must_use]
pub fn logical_offsets(
    captured_order: &[FilterId],
    preview: &[FilterId],
    members: &[FilterId],
    rows: &FxHashMap<FilterId, Rect>,
) -> BTreeMap<FilterId, f32> {
    let member_set: FxHashSet<FilterId> = members.iter().copied().collect();
    let captured: Vec<Option<Rect>> = captured_order
        .iter()
        .map(|id| rows.get(id).copied())
        .collect();
    let gap_after = |slot: usize| -> f32 {
        match (captured.get(slot), captured.get(slot + 1)) {
            (Some(Some(here)), Some(Some(next))) => (next.top() - here.bottom()).max(0.0),
            _ => 0.0,
        }
    };

    let mut cursor = captured
        .iter()
        .flatten()
        .map(Rect::top)
        .reduce(f32::min)
        .unwrap_or(0.0);
    let mut offsets = BTreeMap::new();
    for (slot, id) in preview.iter().enumerate() {
        let Some(rect) = rows.get(id) else {
            continue;
        };
        if !member_set.contains(id) {
            offsets.insert(*id, cursor - rect.top());
        }
        cursor += rect.height + gap_after(slot);
    }
    offsets
}
