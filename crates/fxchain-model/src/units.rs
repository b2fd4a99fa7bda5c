#![forbid(unsafe_code)]

//! Lookup helpers over a flat filter list.
//!
//! A *unit* is what moves as one block: a standalone filter, or a group base
//! with its children, plus the masking filter overlaying either. Every
//! helper here tolerates dangling references by treating them as absent.

use rustc_hash::FxHashMap;

use crate::filter::Filter;
use crate::id::FilterId;

/// Id → position index over one snapshot of the list.
#[derive(Debug, Clone)]
pub struct FilterIndex<'a> {
    filters: &'a [Filter],
    positions: FxHashMap<FilterId, usize>,
}

impl<'a> FilterIndex<'a> {
    /// Index `filters`. With duplicate ids the first occurrence wins.
    #[must_use]
    pub fn new(filters: &'a [Filter]) -> Self {
        let mut positions = FxHashMap::default();
        positions.reserve(filters.len());
        for (index, filter) in filters.iter().enumerate() {
            positions.entry(filter.id).or_insert(index);
        }
        Self { filters, positions }
    }

    #[must_use]
    pub fn filters(&self) -> &'a [Filter] {
        self.filters
    }

    #[must_use]
    pub fn position(&self, id: FilterId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    #[must_use]
    pub fn get(&self, id: FilterId) -> Option<&'a Filter> {
        self.position(id).map(|index| &self.filters[index])
    }

    #[must_use]
    pub fn contains(&self, id: FilterId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Base of the group `filter` belongs to, if its group link is usable.
    ///
    /// The link is ignored when it dangles, points at the filter itself, or
    /// points at a record that is itself a child.
    #[must_use]
    pub fn group_base(&self, filter: &Filter) -> Option<FilterId> {
        let base_id = filter.group_id?;
        if base_id == filter.id {
            return None;
        }
        let base = self.get(base_id)?;
        if base.group_id.is_some() {
            return None;
        }
        Some(base_id)
    }

    /// The id itself, or its group base when it is a child.
    #[must_use]
    pub fn base_of(&self, id: FilterId) -> FilterId {
        self.get(id)
            .and_then(|filter| self.group_base(filter))
            .unwrap_or(id)
    }

    /// Anchor of the unit containing `id`.
    ///
    /// A masking filter belongs to the unit it overlays once it holds the
    /// claim on that unit.
    #[must_use]
    pub fn unit_anchor(&self, id: FilterId) -> Option<FilterId> {
        let filter = self.get(id)?;
        if let Some(target) = filter.masked_filter_id
            && target != id
            && self.contains(target)
        {
            let anchor = self.base_of(target);
            if self.mask_of(anchor) == Some(id) {
                return Some(anchor);
            }
        }
        Some(self.base_of(id))
    }

    /// Children of `base` in flat-list order.
    #[must_use]
    pub fn children(&self, base: FilterId) -> Vec<FilterId> {
        self.filters
            .iter()
            .filter(|filter| self.group_base(filter) == Some(base))
            .map(|filter| filter.id)
            .collect()
    }

    /// Whether any record links to `base` as its group.
    #[must_use]
    pub fn has_children(&self, base: FilterId) -> bool {
        self.filters
            .iter()
            .any(|filter| self.group_base(filter) == Some(base))
    }

    /// Masking filter overlaying the unit anchored at `anchor`.
    ///
    /// The first eligible claimant in flat order wins. A claimant must be a
    /// loose filter (neither child nor base) and the anchor must not itself
    /// be masking something.
    #[must_use]
    pub fn mask_of(&self, anchor: FilterId) -> Option<FilterId> {
        let anchor_filter = self.get(anchor)?;
        if anchor_filter.masked_filter_id.is_some() || self.group_base(anchor_filter).is_some() {
            return None;
        }
        self.filters
            .iter()
            .find(|filter| {
                let Some(target) = filter.masked_filter_id else {
                    return false;
                };
                filter.id != anchor
                    && self.contains(target)
                    && self.base_of(target) == anchor
                    && self.group_base(filter).is_none()
                    && !self.has_children(filter.id)
            })
            .map(|filter| filter.id)
    }

    /// Children then base of the unit anchored at `anchor`, masking filter
    /// excluded.
    #[must_use]
    pub fn unit_members(&self, anchor: FilterId) -> Vec<FilterId> {
        let mut members = self.children(anchor);
        if self.contains(anchor) {
            members.push(anchor);
        }
        members
    }
}

/// Position of one unit in the flat list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpan {
    /// Group base, or the standalone filter.
    pub anchor: FilterId,
    /// Masking filter overlaying the unit.
    pub mask: Option<FilterId>,
    /// Every member in flat order, masking filter included.
    pub members: Vec<FilterId>,
    /// First position covered (inclusive).
    pub start: usize,
    /// Last position covered (exclusive).
    pub end: usize,
}

impl UnitSpan {
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// More than one record moves with this unit.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.members.len() > 1
    }

    /// The unit carries group children.
    #[must_use]
    pub fn is_group(&self) -> bool {
        let overlay = usize::from(self.mask.is_some());
        self.members.len() > 1 + overlay
    }

    /// `index` is an insertion point strictly inside the span.
    #[must_use]
    pub fn splits_at(&self, index: usize) -> bool {
        self.start < index && index < self.end
    }
}

/// Span of the unit containing `id`.
#[must_use]
pub fn unit_span(filters: &[Filter], id: FilterId) -> Option<UnitSpan> {
    let index = FilterIndex::new(filters);
    span_for(&index, id)
}

/// Every unit in the list, ordered by start position.
#[must_use]
pub fn unit_spans(filters: &[Filter]) -> Vec<UnitSpan> {
    let index = FilterIndex::new(filters);
    let mut covered = vec![false; filters.len()];
    let mut spans = Vec::new();
    for (position, filter) in filters.iter().enumerate() {
        if covered[position] {
            continue;
        }
        let Some(span) = span_for(&index, filter.id) else {
            continue;
        };
        for member in &span.members {
            if let Some(member_position) = index.position(*member) {
                covered[member_position] = true;
            }
        }
        spans.push(span);
    }
    spans.sort_by_key(|span| span.start);
    spans
}

/// Units with more than one member.
#[must_use]
pub fn composite_spans(filters: &[Filter]) -> Vec<UnitSpan> {
    unit_spans(filters)
        .into_iter()
        .filter(UnitSpan::is_composite)
        .collect()
}

fn span_for(index: &FilterIndex<'_>, id: FilterId) -> Option<UnitSpan> {
    let mut anchor = index.unit_anchor(id)?;
    let mask = index.mask_of(anchor);
    let mut members = index.unit_members(anchor);
    members.extend(mask);
    if !members.contains(&id) {
        anchor = id;
        members = vec![id];
    }
    let mask = mask.filter(|mask| members.contains(mask));
    let mut positioned: Vec<(usize, FilterId)> = members
        .iter()
        .filter_map(|member| index.position(*member).map(|position| (position, *member)))
        .collect();
    positioned.sort_unstable();
    positioned.dedup();
    let start = positioned.first()?.0;
    let end = positioned.last()?.0 + 1;
    Some(UnitSpan {
        anchor,
        mask,
        members: positioned.into_iter().map(|(_, member)| member).collect(),
        start,
        end,
    })
}
