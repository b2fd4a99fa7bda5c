#![forbid(unsafe_code)]

//! Drag gesture state machine.
//!
//! # State machine
//!
//! ```text
//! Idle ──begin──▶ Dragging ──release──▶ Released
//!                    │
//!                    └──cancel───▶ Cancelled
//! ```
//!
//! A gesture snapshots the pipeline and the row geometry when it starts and
//! works against that snapshot until it ends. Pointer samples produce
//! [`DragEffect`]s for the view; release produces a [`DropResolution`] for
//! the store. Release and cancel race freely: whichever runs first consumes
//! the gesture and the other gets `None`.
//!
//! All timing is driven by the caller through explicit `now` arguments.

use std::collections::BTreeMap;
use std::fmt;

use fxchain_model::{
    Filter, FilterId, FilterIndex, FilterTypeRegistry, PipelineEdit, unit_span,
};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::affordance::{Eligibility, hit_test};
use crate::config::DragConfig;
use crate::debounce::PreviewDebouncer;
use crate::error::DragError;
use crate::geometry::{Point, Rect};
use crate::offsets::{logical_offsets, preview_order};
use crate::oracle::{Affordance, AffordanceKind, LayoutOracle};
use crate::target::{
    DirectionTracker, TargetRow, candidate_index, clamp_to_run, snap_to_unit_boundary,
};

/// Lifecycle phase of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging,
    Released,
    Cancelled,
}

/// Identifies one gesture. Samples carrying a stale token are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GestureToken(u64);

impl GestureToken {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GestureToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gesture#{}", self.0)
    }
}

/// Why a gesture was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    EscapeKey,
    PointerCancel,
    FocusLost,
    Programmatic,
}

impl CancelReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EscapeKey => "escape_key",
            Self::PointerCancel => "pointer_cancel",
            Self::FocusLost => "focus_lost",
            Self::Programmatic => "programmatic",
        }
    }
}

/// Instruction for the view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum DragEffect {
    /// Show `order` as the pipeline order, shifting rows by `offsets`.
    Preview {
        order: Vec<FilterId>,
        offsets: BTreeMap<FilterId, f32>,
    },
    /// Drop any preview and reset every row offset.
    PreviewCleared,
    /// Highlight an affordance, or none.
    Highlight { affordance: Option<Affordance> },
    /// Leftover preview or highlight from an ended gesture must go.
    ArtifactsSwept,
}

/// Outcome of a release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum DropResolution {
    /// Apply `edit` to the canonical list.
    Commit { edit: PipelineEdit },
    /// Released where it started.
    NoChange,
    /// Released outside the panel; the drag is abandoned.
    OutsidePanel,
}

impl DropResolution {
    #[must_use]
    pub fn edit(&self) -> Option<&PipelineEdit> {
        match self {
            Self::Commit { edit } => Some(edit),
            Self::NoChange | Self::OutsidePanel => None,
        }
    }
}

/// Group the dragged child belongs to.
#[derive(Debug, Clone)]
struct OwnGroup {
    /// Children then base, dragged child included.
    unit: Vec<FilterId>,
    bounds: Rect,
    low: usize,
    high: usize,
}

impl OwnGroup {
    /// Union of the group's row rectangles.
    fn measure(unit: &[FilterId], rows: &FxHashMap<FilterId, Rect>) -> Rect {
        unit.iter()
            .filter_map(|id| rows.get(id))
            .fold(Rect::default(), |acc, rect| acc.union(rect))
    }
}

/// Where the pointer currently resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Evaluation {
    outside: bool,
    inside_own_group: bool,
    candidate: usize,
    hover: Option<Affordance>,
}

#[derive(Debug)]
struct Gesture {
    token: GestureToken,
    handle: FilterId,
    members: Vec<FilterId>,
    order: Vec<FilterId>,
    rest: Vec<Filter>,
    rows: FxHashMap<FilterId, Rect>,
    panel: Rect,
    affordances: Vec<Affordance>,
    eligibility: Eligibility,
    own_group: Option<OwnGroup>,
    origin: usize,
    direction: DirectionTracker,
    offsets: BTreeMap<FilterId, f32>,
    previewed: Option<usize>,
    outside: bool,
    hover: Option<Affordance>,
}

impl Gesture {
    fn composite(&self) -> bool {
        self.members.len() > 1
    }

    fn targets(&self) -> Vec<TargetRow> {
        self.rest
            .iter()
            .enumerate()
            .filter_map(|(slot, filter)| {
                let rect = self.rows.get(&filter.id)?;
                let offset = self.offsets.get(&filter.id).copied().unwrap_or(0.0);
                Some(TargetRow {
                    id: filter.id,
                    slot,
                    rect: rect.translate_y(offset),
                })
            })
            .collect()
    }

    fn evaluate(&mut self, pointer: Point, config: &DragConfig) -> Evaluation {
        let direction = self.direction.update(pointer.y);
        if !self.panel.inflate(config.panel_margin_px).contains(pointer) {
            return Evaluation {
                outside: true,
                inside_own_group: false,
                candidate: self.origin,
                hover: None,
            };
        }

        let raw = candidate_index(
            pointer,
            self.panel,
            &self.targets(),
            self.rest.len(),
            direction,
            config,
        );
        let inside_own_group = self
            .own_group
            .as_ref()
            .is_some_and(|group| group.bounds.contains(pointer));
        let candidate = match &self.own_group {
            Some(group) if inside_own_group => clamp_to_run(raw, group.low, group.high),
            _ => snap_to_unit_boundary(&self.rest, raw),
        };
        Evaluation {
            outside: false,
            inside_own_group,
            candidate,
            hover: hit_test(pointer, &self.affordances, &self.eligibility),
        }
    }

    fn has_preview(&self) -> bool {
        self.previewed.is_some() || !self.offsets.is_empty()
    }

    fn clear_preview(&mut self) -> Option<DragEffect> {
        if !self.has_preview() {
            return None;
        }
        self.previewed = None;
        self.offsets.clear();
        Some(DragEffect::PreviewCleared)
    }

    fn resolve(&self, evaluation: Evaluation) -> DropResolution {
        if evaluation.outside {
            return DropResolution::OutsidePanel;
        }
        if let Some(affordance) = evaluation.hover {
            let edit = match affordance.kind {
                AffordanceKind::GroupJoin { base } => PipelineEdit::Group {
                    dragged: self.handle,
                    base,
                },
                AffordanceKind::MaskJoin { target } => PipelineEdit::Mask {
                    masked: target,
                    masking: self.handle,
                },
                AffordanceKind::Groove { base, child_index } => PipelineEdit::AddToGroup {
                    dragged: self.handle,
                    base,
                    child_index,
                },
            };
            return DropResolution::Commit { edit };
        }
        if let Some(group) = &self.own_group {
            let in_range = (group.low..=group.high).contains(&evaluation.candidate);
            if !evaluation.inside_own_group || !in_range {
                return DropResolution::Commit {
                    edit: PipelineEdit::UngroupAndMove {
                        filter: self.handle,
                        to: evaluation.candidate,
                    },
                };
            }
        }
        if evaluation.candidate == self.origin {
            return DropResolution::NoChange;
        }
        let edit = if self.composite() {
            PipelineEdit::MoveBlock {
                filters: self.members.clone(),
                to: evaluation.candidate,
            }
        } else {
            PipelineEdit::MoveFilter {
                filter: self.handle,
                to: evaluation.candidate,
            }
        };
        DropResolution::Commit { edit }
    }
}

/// Turns pointer samples into preview effects and drop resolutions.
#[derive(Debug)]
pub struct DragEngine {
    config: DragConfig,
    phase: DragPhase,
    issued: u64,
    gesture: Option<Gesture>,
    debouncer: PreviewDebouncer,
    artifacts: bool,
    next_sweep: Option<Instant>,
}

impl Default for DragEngine {
    fn default() -> Self {
        Self::new(DragConfig::default())
    }
}

impl DragEngine {
    #[must_use]
    pub fn new(config: DragConfig) -> Self {
        let debouncer = PreviewDebouncer::new(config.preview_debounce());
        Self {
            config,
            phase: DragPhase::Idle,
            issued: 0,
            gesture: None,
            debouncer,
            artifacts: false,
            next_sweep: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &DragConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.gesture.is_some()
    }

    /// Token of the gesture in progress.
    #[must_use]
    pub fn current_token(&self) -> Option<GestureToken> {
        self.gesture.as_ref().map(|gesture| gesture.token)
    }

    /// Filters moving with the current gesture, in list order.
    #[must_use]
    pub fn dragged(&self) -> &[FilterId] {
        self.gesture
            .as_ref()
            .map_or(&[], |gesture| gesture.members.as_slice())
    }

    /// Affordance currently highlighted.
    #[must_use]
    pub fn hover(&self) -> Option<Affordance> {
        self.gesture.as_ref().and_then(|gesture| gesture.hover)
    }

    /// Start dragging `handle`.
    ///
    /// A group child drags alone. Any other filter drags its whole unit,
    /// mask included. Geometry is captured from `oracle` now and reused for
    /// the rest of the gesture.
    pub fn begin(
        &mut self,
        filters: &[Filter],
        handle: FilterId,
        pointer: Point,
        oracle: &dyn LayoutOracle,
        registry: &dyn FilterTypeRegistry,
        now: Instant,
    ) -> Result<GestureToken, DragError> {
        if self.gesture.is_some() {
            return Err(DragError::AlreadyDragging);
        }
        let index = FilterIndex::new(filters);
        let Some(record) = index.get(handle) else {
            return Err(DragError::UnknownFilter(handle));
        };
        let (Some(panel), Some(_)) = (oracle.panel_rect(), oracle.row_rect(handle)) else {
            return Err(DragError::GeometryUnavailable(handle));
        };

        let own_base = index.group_base(record);
        let members = match own_base {
            Some(_) => vec![handle],
            None => unit_span(filters, handle).map_or_else(|| vec![handle], |span| span.members),
        };
        let member_set: FxHashSet<FilterId> = members.iter().copied().collect();
        let rows: FxHashMap<FilterId, Rect> = filters
            .iter()
            .filter_map(|filter| oracle.row_rect(filter.id).map(|rect| (filter.id, rect)))
            .collect();
        let rest: Vec<Filter> = filters
            .iter()
            .filter(|filter| !member_set.contains(&filter.id))
            .cloned()
            .collect();
        let origin = filters
            .iter()
            .take_while(|filter| !member_set.contains(&filter.id))
            .count();

        let own_group = own_base.map(|base| {
            let unit = index.unit_members(base);
            let bounds = OwnGroup::measure(&unit, &rows);
            let slots: Vec<usize> = unit
                .iter()
                .filter(|id| **id != handle)
                .filter_map(|id| rest.iter().position(|filter| filter.id == *id))
                .collect();
            let low = slots.iter().copied().min().unwrap_or(origin);
            let high = rest
                .iter()
                .position(|filter| filter.id == base)
                .unwrap_or(rest.len());
            OwnGroup {
                unit,
                bounds,
                low,
                high,
            }
        });

        let eligibility = Self::eligibility(&index, &members, own_base, registry);

        self.issued += 1;
        let token = GestureToken(self.issued);
        self.debouncer.cancel();
        tracing::debug!(
            target: "fxchain.drag",
            token = %token,
            handle = %handle,
            members = members.len(),
            origin,
            "gesture started"
        );
        self.gesture = Some(Gesture {
            token,
            handle,
            members,
            order: filters.iter().map(|filter| filter.id).collect(),
            rest,
            rows,
            panel,
            affordances: oracle.affordances(),
            eligibility,
            own_group,
            origin,
            direction: DirectionTracker::new(pointer.y, self.config.direction_dead_zone_px),
            offsets: BTreeMap::new(),
            previewed: None,
            outside: false,
            hover: None,
        });
        self.phase = DragPhase::Dragging;
        self.next_sweep = Some(now + self.config.sweep_interval());
        Ok(token)
    }

    fn eligibility(
        index: &FilterIndex<'_>,
        members: &[FilterId],
        own_base: Option<FilterId>,
        registry: &dyn FilterTypeRegistry,
    ) -> Eligibility {
        let mut group_bases = FxHashSet::default();
        let mut mask_targets = FxHashSet::default();
        if members.len() == 1 {
            let handle = members[0];
            for filter in index.filters() {
                if filter.id == handle {
                    continue;
                }
                if filter.group_id.is_none()
                    && !filter.is_masking()
                    && registry.is_group_capable(&filter.filter_type)
                {
                    group_bases.insert(filter.id);
                }
                let anchor = index.base_of(filter.id);
                if anchor != handle
                    && Some(anchor) != own_base
                    && let Some(anchor_filter) = index.get(anchor)
                    && !anchor_filter.is_masking()
                    && registry.is_mask_target(&anchor_filter.filter_type)
                {
                    mask_targets.insert(filter.id);
                }
            }
        }
        Eligibility {
            members: members.to_vec(),
            composite: members.len() > 1,
            own_group: own_base,
            group_bases,
            mask_targets,
        }
    }

    /// Feed a pointer sample.
    ///
    /// Returns what the view must change now. A changed candidate index is
    /// not previewed immediately; it fires from [`Self::poll`] once the
    /// debounce delay has passed without a newer candidate.
    pub fn pointer_move(
        &mut self,
        token: GestureToken,
        pointer: Point,
        now: Instant,
    ) -> Vec<DragEffect> {
        let mut effects = self.poll(now);
        let Some(gesture) = self.gesture.as_mut().filter(|gesture| gesture.token == token) else {
            return effects;
        };
        let evaluation = gesture.evaluate(pointer, &self.config);
        tracing::trace!(
            target: "fxchain.drag",
            x = pointer.x,
            y = pointer.y,
            candidate = evaluation.candidate,
            outside = evaluation.outside,
            "pointer sample"
        );

        if evaluation.outside {
            if !gesture.outside {
                tracing::debug!(target: "fxchain.drag", token = %token, "pointer left panel");
            }
            gesture.outside = true;
            self.debouncer.cancel();
            effects.extend(gesture.clear_preview());
            if gesture.hover.take().is_some() {
                effects.push(DragEffect::Highlight { affordance: None });
            }
            self.refresh_artifacts();
            return effects;
        }
        gesture.outside = false;

        if evaluation.hover != gesture.hover {
            gesture.hover = evaluation.hover;
            effects.push(DragEffect::Highlight {
                affordance: evaluation.hover,
            });
        }
        if evaluation.hover.is_some() {
            self.debouncer.cancel();
            effects.extend(gesture.clear_preview());
            self.refresh_artifacts();
            return effects;
        }

        let shown = gesture.previewed.unwrap_or(gesture.origin);
        let pending = self.debouncer.pending_index();
        if evaluation.candidate == shown {
            if pending.is_some() {
                self.debouncer.cancel();
            }
        } else if pending != Some(evaluation.candidate) {
            self.debouncer.schedule(evaluation.candidate, now);
        }
        self.refresh_artifacts();
        effects
    }

    /// Fire a preview whose debounce delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Vec<DragEffect> {
        let mut effects = Vec::new();
        let Some(gesture) = self.gesture.as_mut() else {
            return effects;
        };
        let Some(index) = self.debouncer.poll(now) else {
            return effects;
        };
        if index == gesture.origin {
            effects.extend(gesture.clear_preview());
        } else {
            let order = preview_order(&gesture.order, &gesture.members, index);
            let offsets = logical_offsets(&gesture.order, &order, &gesture.members, &gesture.rows);
            gesture.previewed = Some(index);
            gesture.offsets = offsets.clone();
            tracing::debug!(
                target: "fxchain.drag",
                token = %gesture.token,
                index,
                "preview fired"
            );
            effects.push(DragEffect::Preview { order, offsets });
        }
        self.refresh_artifacts();
        effects
    }

    /// End the gesture with a drop at `pointer`.
    ///
    /// Returns `None` if `token` is not the active gesture (for example when
    /// a cancel already ended it).
    pub fn release(
        &mut self,
        token: GestureToken,
        pointer: Point,
        now: Instant,
    ) -> Option<DropResolution> {
        if self.current_token() != Some(token) {
            return None;
        }
        let mut gesture = self.gesture.take()?;
        self.debouncer.cancel();
        let evaluation = gesture.evaluate(pointer, &self.config);
        let resolution = gesture.resolve(evaluation);
        self.phase = DragPhase::Released;
        self.artifacts = self.artifacts || gesture.has_preview() || gesture.hover.is_some();
        self.next_sweep = Some(now + self.config.sweep_interval());
        tracing::debug!(
            target: "fxchain.drag",
            token = %token,
            resolution = ?resolution,
            "gesture released"
        );
        Some(resolution)
    }

    /// Abandon the gesture.
    ///
    /// Returns the effects that undo any preview and highlight, or `None` if
    /// `token` is not the active gesture.
    pub fn cancel(
        &mut self,
        token: GestureToken,
        reason: CancelReason,
        now: Instant,
    ) -> Option<Vec<DragEffect>> {
        if self.current_token() != Some(token) {
            return None;
        }
        let mut gesture = self.gesture.take()?;
        self.debouncer.cancel();
        let mut effects = Vec::new();
        effects.extend(gesture.clear_preview());
        if gesture.hover.take().is_some() {
            effects.push(DragEffect::Highlight { affordance: None });
        }
        self.phase = DragPhase::Cancelled;
        self.artifacts = false;
        self.next_sweep = Some(now + self.config.sweep_interval());
        tracing::debug!(
            target: "fxchain.drag",
            token = %token,
            reason = reason.as_str(),
            "gesture cancelled"
        );
        Some(effects)
    }

    /// Periodic cleanup while no gesture is active.
    ///
    /// Reports leftover preview state from a gesture that ended without the
    /// view clearing it. Does nothing during a gesture or before the sweep
    /// interval has elapsed.
    pub fn sweep(&mut self, now: Instant) -> Vec<DragEffect> {
        if self.gesture.is_some() {
            return Vec::new();
        }
        if self.next_sweep.is_some_and(|due| now < due) {
            return Vec::new();
        }
        self.next_sweep = Some(now + self.config.sweep_interval());
        if !std::mem::take(&mut self.artifacts) {
            return Vec::new();
        }
        tracing::debug!(target: "fxchain.drag", "orphaned drag artifacts swept");
        vec![DragEffect::ArtifactsSwept]
    }

    /// Re-read geometry after the view re-laid out mid-gesture.
    ///
    /// Rows the oracle no longer reports keep their captured rectangle.
    pub fn refresh_geometry(&mut self, token: GestureToken, oracle: &dyn LayoutOracle) -> bool {
        let Some(gesture) = self.gesture.as_mut().filter(|gesture| gesture.token == token) else {
            return false;
        };
        for id in &gesture.order {
            if let Some(rect) = oracle.row_rect(*id) {
                gesture.rows.insert(*id, rect);
            }
        }
        if let Some(panel) = oracle.panel_rect() {
            gesture.panel = panel;
        }
        gesture.affordances = oracle.affordances();
        if let Some(group) = gesture.own_group.as_mut() {
            group.bounds = OwnGroup::measure(&group.unit, &gesture.rows);
        }
        tracing::debug!(target: "fxchain.drag", token = %token, "geometry refreshed");
        true
    }

    fn refresh_artifacts(&mut self) {
        if let Some(gesture) = self.gesture.as_ref() {
            self.artifacts = gesture.has_preview() || gesture.hover.is_some();
        }
    }
}
