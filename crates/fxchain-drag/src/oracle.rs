#![forbid(unsafe_code)]

//! Geometry supplied by the view.
//!
//! The engine never walks a widget tree. It reads row rectangles, the panel
//! bounds and the drop affordance regions through [`LayoutOracle`], and only
//! at well-defined moments (gesture start and explicit refresh).

use fxchain_model::FilterId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// What a drop affordance does when the dragged filter is released on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AffordanceKind {
    /// Join `base`'s group as its direct child.
    GroupJoin { base: FilterId },
    /// Mask the unit containing `target`.
    MaskJoin { target: FilterId },
    /// Insert into `base`'s group at child position `child_index`.
    Groove { base: FilterId, child_index: usize },
}

impl AffordanceKind {
    /// Filter the affordance is attached to.
    #[must_use]
    pub const fn owner(&self) -> FilterId {
        match self {
            Self::GroupJoin { base } | Self::Groove { base, .. } => *base,
            Self::MaskJoin { target } => *target,
        }
    }

    /// Lower is preferred when regions overlap.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::GroupJoin { .. } => 0,
            Self::Groove { .. } => 1,
            Self::MaskJoin { .. } => 2,
        }
    }
}

/// A hover region with a structural meaning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affordance {
    pub kind: AffordanceKind,
    pub rect: Rect,
}

impl Affordance {
    #[must_use]
    pub const fn new(kind: AffordanceKind, rect: Rect) -> Self {
        Self { kind, rect }
    }
}

/// Read-only geometry capability provided by the view.
pub trait LayoutOracle {
    /// Current rectangle of the row showing `id`.
    fn row_rect(&self, id: FilterId) -> Option<Rect>;

    /// Bounds of the whole pipeline panel.
    fn panel_rect(&self) -> Option<Rect>;

    /// Every drop affordance currently laid out.
    fn affordances(&self) -> Vec<Affordance>;
}

impl<O: LayoutOracle + ?Sized> LayoutOracle for &O {
    fn row_rect(&self, id: FilterId) -> Option<Rect> {
        (**self).row_rect(id)
    }

    fn panel_rect(&self) -> Option<Rect> {
        (**self).panel_rect()
    }

    fn affordances(&self) -> Vec<Affordance> {
        (**self).affordances()
    }
}

/// Fixed geometry table, for hosts that lay out rows themselves and for
/// tests.
#[derive(Debug, Clone, Default)]
pub struct StaticLayout {
    rows: FxHashMap<FilterId, Rect>,
    panel: Option<Rect>,
    affordances: Vec<Affordance>,
}

impl StaticLayout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack `ids` top to bottom in rows of `row_height`, starting at y = 0.
    /// The panel covers exactly the rows.
    #[must_use]
    pub fn uniform(ids: &[FilterId], row_height: f32, width: f32) -> Self {
        let mut layout = Self::new();
        for (index, id) in ids.iter().enumerate() {
            layout.set_row(
                *id,
                Rect::new(0.0, index as f32 * row_height, width, row_height),
            );
        }
        layout.panel = Some(Rect::new(0.0, 0.0, width, ids.len() as f32 * row_height));
        layout
    }

    #[must_use]
    pub fn with_panel(mut self, panel: Rect) -> Self {
        self.panel = Some(panel);
        self
    }

    #[must_use]
    pub fn with_affordance(mut self, kind: AffordanceKind, rect: Rect) -> Self {
        self.affordances.push(Affordance::new(kind, rect));
        self
    }

    pub fn set_row(&mut self, id: FilterId, rect: Rect) {
        self.rows.insert(id, rect);
    }

    pub fn remove_row(&mut self, id: FilterId) -> Option<Rect> {
        self.rows.remove(&id)
    }

    pub fn clear_affordances(&mut self) {
        self.affordances.clear();
    }
}

impl LayoutOracle for StaticLayout {
    fn row_rect(&self, id: FilterId) -> Option<Rect> {
        self.rows.get(&id).copied()
    }

    fn panel_rect(&self) -> Option<Rect> {
        self.panel
    }

    fn affordances(&self) -> Vec<Affordance> {
        self.affordances.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> FilterId {
        FilterId::new(raw).expect("non-zero")
    }

    #[test]
    fn uniform_layout_stacks_rows() {
        let layout = StaticLayout::uniform(&[id(1), id(2), id(3)], 40.0, 200.0);
        assert_eq!(layout.row_rect(id(2)), Some(Rect::new(0.0, 40.0, 200.0, 40.0)));
        assert_eq!(layout.panel_rect(), Some(Rect::new(0.0, 0.0, 200.0, 120.0)));
        assert_eq!(layout.row_rect(id(9)), None);
    }

    #[test]
    fn affordance_priority_prefers_group_join() {
        let join = AffordanceKind::GroupJoin { base: id(1) };
        let groove = AffordanceKind::Groove {
            base: id(1),
            child_index: 0,
        };
        let mask = AffordanceKind::MaskJoin { target: id(2) };
        assert!(join.priority() < groove.priority());
        assert!(groove.priority() < mask.priority());
        assert_eq!(mask.owner(), id(2));
    }
}
