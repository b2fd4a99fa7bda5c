#![forbid(unsafe_code)]

//! Candidate index computation.
//!
//! Indices produced here are *final* positions in the list with the dragged
//! block removed, the same convention the move mutators use.

use fxchain_model::{Filter, FilterId, composite_spans};
use serde::{Deserialize, Serialize};

use crate::config::DragConfig;
use crate::geometry::{Point, Rect};

/// Vertical drag direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// Tracks drag direction with a dead zone so jitter does not flip it.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionTracker {
    anchor_y: f32,
    dead_zone: f32,
    direction: Option<Direction>,
}

impl DirectionTracker {
    #[must_use]
    pub fn new(start_y: f32, dead_zone: f32) -> Self {
        Self {
            anchor_y: start_y,
            dead_zone,
            direction: None,
        }
    }

    /// Feed a sample and return the current direction.
    pub fn update(&mut self, y: f32) -> Option<Direction> {
        let delta = y - self.anchor_y;
        if delta.abs() >= self.dead_zone && delta != 0.0 {
            self.direction = Some(if delta > 0.0 {
                Direction::Down
            } else {
                Direction::Up
            });
            self.anchor_y = y;
        }
        self.direction
    }

    #[must_use]
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }
}

/// A row the dragged block can be dropped next to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetRow {
    pub id: FilterId,
    /// Position in the list with the dragged block removed.
    pub slot: usize,
    /// Row rectangle with the current logical offset applied.
    pub rect: Rect,
}

/// Share of a row's height the pointer must cross to land after it.
#[must_use]
pub fn approach_fraction(direction: Option<Direction>, config: &DragConfig) -> f32 {
    match direction {
        Some(Direction::Down) => config.approach_down_fraction,
        Some(Direction::Up) => config.approach_up_fraction,
        None => 0.5,
    }
}

/// Resolve the pointer to an insertion index among `targets`.
///
/// `targets` must be in slot order; `slot_count` is the number of records
/// outside the dragged block.
#[must_use]
pub fn candidate_index(
    pointer: Point,
    panel: Rect,
    targets: &[TargetRow],
    slot_count: usize,
    direction: Option<Direction>,
    config: &DragConfig,
) -> usize {
    if pointer.y < panel.top() + config.top_zone_px {
        return 0;
    }
    let Some(last_bottom) = targets
        .iter()
        .map(|target| target.rect.bottom())
        .reduce(f32::max)
    else {
        return 0;
    };
    if pointer.y >= last_bottom {
        return slot_count;
    }

    let nearest = targets.iter().min_by(|a, b| {
        let da = (pointer.y - a.rect.center_y()).abs();
        let db = (pointer.y - b.rect.center_y()).abs();
        da.total_cmp(&db)
    });
    let Some(nearest) = nearest else {
        return 0;
    };
    let threshold = nearest.rect.top() + nearest.rect.height * approach_fraction(direction, config);
    if pointer.y >= threshold {
        nearest.slot + 1
    } else {
        nearest.slot
    }
    .min(slot_count)
}

/// Clamp a candidate into an inclusive run.
#[must_use]
pub fn clamp_to_run(candidate: usize, low: usize, high: usize) -> usize {
    candidate.clamp(low, high.max(low))
}

/// Move an index strictly inside a composite unit of `rest` to that unit's
/// nearest boundary. Ties go to the start.
#[must_use]
pub fn snap_to_unit_boundary(rest: &[Filter], candidate: usize) -> usize {
    composite_spans(rest)
        .iter()
        .find(|span| span.splits_at(candidate))
        .map_or(candidate, |span| {
            if candidate - span.start <= span.end - candidate {
                span.start
            } else {
                span.end
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> FilterId {
        FilterId::new(raw).expect("non-zero")
    }

    fn rows(count: usize) -> Vec<TargetRow> {
        (0..count)
            .map(|slot| TargetRow {
                id: id(slot as u64 + 1),
                slot,
                rect: Rect::new(0.0, slot as f32 * 40.0, 200.0, 40.0),
            })
            .collect()
    }

    fn panel() -> Rect {
        Rect::new(0.0, 0.0, 200.0, 160.0)
    }

    #[test]
    fn direction_needs_dead_zone_travel() {
        let mut tracker = DirectionTracker::new(100.0, 2.0);
        assert_eq!(tracker.update(101.0), None);
        assert_eq!(tracker.update(103.0), Some(Direction::Down));
        assert_eq!(tracker.update(102.0), Some(Direction::Down));
        assert_eq!(tracker.update(100.0), Some(Direction::Up));
    }

    #[test]
    fn top_zone_and_bottom_resolve_to_ends() {
        let config = DragConfig::default();
        let targets = rows(4);
        let at_top = candidate_index(Point::new(10.0, 39.0), panel(), &targets, 4, None, &config);
        assert_eq!(at_top, 0);
        let below = candidate_index(Point::new(10.0, 170.0), panel(), &targets, 4, None, &config);
        assert_eq!(below, 4);
    }

    #[test]
    fn threshold_depends_on_direction() {
        let config = DragConfig::default();
        let targets = rows(4);
        // Row 2 spans 80..120; down threshold 84, up threshold 116.
        let y = Point::new(10.0, 90.0);
        assert_eq!(
            candidate_index(y, panel(), &targets, 4, Some(Direction::Down), &config),
            3
        );
        assert_eq!(
            candidate_index(y, panel(), &targets, 4, Some(Direction::Up), &config),
            2
        );
        assert_eq!(candidate_index(y, panel(), &targets, 4, None, &config), 2);
        let low = Point::new(10.0, 101.0);
        assert_eq!(candidate_index(low, panel(), &targets, 4, None, &config), 3);
    }

    #[test]
    fn clamp_handles_degenerate_runs() {
        assert_eq!(clamp_to_run(0, 2, 4), 2);
        assert_eq!(clamp_to_run(9, 2, 4), 4);
        assert_eq!(clamp_to_run(3, 5, 1), 5);
    }

    #[test]
    fn snapping_leaves_boundaries_alone() {
        let mut child = Filter::new(id(1), "blur");
        let mut base = Filter::new(id(2), "shape");
        child.group_id = Some(id(2));
        base.grouped_filters = vec![id(1)];
        let rest = vec![Filter::new(id(3), "blur"), child, base];
        assert_eq!(snap_to_unit_boundary(&rest, 1), 1);
        assert_eq!(snap_to_unit_boundary(&rest, 2), 1);
        assert_eq!(snap_to_unit_boundary(&rest, 3), 3);
    }
}
