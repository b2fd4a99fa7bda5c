#![forbid(unsafe_code)]

//! Flat list → nested display order.
//!
//! Resolution is total: any relationship that cannot be honoured (dangling
//! ids, a child claiming another child as base, a second mask on the same
//! unit) is treated as absent and the record renders standalone.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::id::FilterId;
use crate::units::FilterIndex;

/// One row of the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayEntry {
    Filter { id: FilterId },
    GroupStart { base: FilterId },
    GroupEnd { base: FilterId },
    MaskStart { mask: FilterId, target: FilterId },
    MaskEnd { mask: FilterId, target: FilterId },
}

impl DisplayEntry {
    #[must_use]
    pub const fn filter_id(&self) -> Option<FilterId> {
        match self {
            Self::Filter { id } => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_start(&self) -> bool {
        matches!(self, Self::GroupStart { .. } | Self::MaskStart { .. })
    }

    #[must_use]
    pub const fn is_end(&self) -> bool {
        matches!(self, Self::GroupEnd { .. } | Self::MaskEnd { .. })
    }
}

/// Bracketed render order derived from a flat filter list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayOrder {
    entries: Vec<DisplayEntry>,
}

impl DisplayOrder {
    #[must_use]
    pub fn entries(&self) -> &[DisplayEntry] {
        &self.entries
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<DisplayEntry> {
        self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Filter ids in visit order, brackets skipped.
    #[must_use]
    pub fn filter_ids(&self) -> Vec<FilterId> {
        self.entries
            .iter()
            .filter_map(DisplayEntry::filter_id)
            .collect()
    }

    /// Nesting level of the entry at `index`. Brackets sit at the level of
    /// the block they open or close.
    #[must_use]
    pub fn depth_of(&self, index: usize) -> Option<usize> {
        if index >= self.entries.len() {
            return None;
        }
        let mut depth = 0usize;
        for (position, entry) in self.entries.iter().enumerate() {
            if entry.is_end() {
                depth = depth.saturating_sub(1);
            }
            if position == index {
                return Some(depth);
            }
            if entry.is_start() {
                depth += 1;
            }
        }
        None
    }
}

/// Resolve the nested display order of `filters`.
#[must_use]
pub fn resolve_display_order(filters: &[Filter]) -> DisplayOrder {
    let index = FilterIndex::new(filters);
    let claimed_masks: FxHashSet<FilterId> = filters
        .iter()
        .filter_map(|filter| {
            let target = filter.masked_filter_id?;
            if !index.contains(target) {
                return None;
            }
            index.mask_of(index.base_of(target))
        })
        .collect();

    let mut entries = Vec::with_capacity(filters.len() + 4);
    let mut emitted: FxHashSet<FilterId> = FxHashSet::default();
    for filter in filters {
        if index.group_base(filter).is_some() || claimed_masks.contains(&filter.id) {
            continue;
        }
        if !emitted.insert(filter.id) {
            continue;
        }
        emit_unit(&index, filter.id, &mut entries, &mut emitted);
    }
    DisplayOrder { entries }
}

fn emit_unit(
    index: &FilterIndex<'_>,
    anchor: FilterId,
    entries: &mut Vec<DisplayEntry>,
    emitted: &mut FxHashSet<FilterId>,
) {
    let mask = index.mask_of(anchor);
    if let Some(mask) = mask {
        entries.push(DisplayEntry::MaskStart {
            mask,
            target: anchor,
        });
    }

    let children = index.children(anchor);
    if children.is_empty() {
        entries.push(DisplayEntry::Filter { id: anchor });
    } else {
        entries.push(DisplayEntry::GroupStart { base: anchor });
        for child in children {
            if emitted.insert(child) {
                entries.push(DisplayEntry::Filter { id: child });
            }
        }
        entries.push(DisplayEntry::Filter { id: anchor });
        entries.push(DisplayEntry::GroupEnd { base: anchor });
    }

    if let Some(mask) = mask {
        emitted.insert(mask);
        entries.push(DisplayEntry::Filter { id: mask });
        entries.push(DisplayEntry::MaskEnd {
            mask,
            target: anchor,
        });
    }
}
