#![forbid(unsafe_code)]

//! One editable pipeline with its drag engine and notice queue.
//!
//! [`PipelineSession`] is the glue a host embeds: it feeds the drag engine
//! from the store, mirrors preview effects into the store's preview layer,
//! commits drop resolutions, and turns rejected edits into notices. The
//! host still owns the view and applies the returned [`DragEffect`]s to it.

use fxchain_drag::{
    CancelReason, DragEffect, DragEngine, DropResolution, GestureToken, LayoutOracle, Point,
};
use fxchain_model::{
    DisplayOrder, Filter, FilterId, FilterSequence, FilterType, PipelineEdit, SharedRegistry,
};
use web_time::Instant;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::notice::{NoticeAction, NoticeQueue};

/// Everything a host should act on after a [`PipelineSession::tick`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionTick {
    pub drag: Vec<DragEffect>,
    pub notices: Vec<NoticeAction>,
}

impl SessionTick {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drag.is_empty() && self.notices.is_empty()
    }
}

/// Store, drag engine and notices for one pipeline panel.
#[derive(Debug)]
pub struct PipelineSession {
    store: FilterSequence,
    engine: DragEngine,
    notices: NoticeQueue,
    config: SessionConfig,
}

impl PipelineSession {
    #[must_use]
    pub fn new(registry: SharedRegistry, config: SessionConfig) -> Self {
        Self::with_store(FilterSequence::new(registry), config)
    }

    /// Open a session over an existing list.
    pub fn from_filters(
        filters: Vec<Filter>,
        registry: SharedRegistry,
        config: SessionConfig,
    ) -> Result<Self> {
        Ok(Self::with_store(
            FilterSequence::from_filters(filters, registry)?,
            config,
        ))
    }

    fn with_store(store: FilterSequence, config: SessionConfig) -> Self {
        Self {
            store,
            engine: DragEngine::new(config.drag.clone()),
            notices: NoticeQueue::new(config.notices.clone()),
            config,
        }
    }

    #[must_use]
    pub fn sequence(&self) -> &FilterSequence {
        &self.store
    }

    #[must_use]
    pub fn engine(&self) -> &DragEngine {
        &self.engine
    }

    #[must_use]
    pub fn notices(&self) -> &NoticeQueue {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut NoticeQueue {
        &mut self.notices
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Nested display order of what the user currently sees.
    #[must_use]
    pub fn display_order(&self) -> DisplayOrder {
        self.store.display_order()
    }

    /// Append a filter with registry defaults.
    pub fn add(&mut self, filter_type: impl Into<FilterType>, now: Instant) -> Result<FilterId> {
        self.interrupt_drag(now);
        Ok(self.store.add(filter_type)?)
    }

    /// Apply an edit outside of a drag.
    ///
    /// A gesture in progress is cancelled first, since its snapshot would
    /// no longer match the list. A rejected edit becomes a notice. Returns
    /// whether the list changed.
    pub fn edit(&mut self, edit: &PipelineEdit, now: Instant) -> bool {
        self.interrupt_drag(now);
        self.commit(edit, now)
    }

    fn commit(&mut self, edit: &PipelineEdit, now: Instant) -> bool {
        match self.store.edit(edit) {
            Ok(changed) => changed,
            Err(violation) => {
                self.notices.push(&violation, now);
                false
            }
        }
    }

    fn interrupt_drag(&mut self, now: Instant) {
        if let Some(token) = self.engine.current_token()
            && let Some(effects) = self.engine.cancel(token, CancelReason::Programmatic, now)
        {
            self.mirror(&effects);
        }
    }

    /// Start dragging `handle` with geometry from `oracle`.
    pub fn begin_drag(
        &mut self,
        handle: FilterId,
        pointer: Point,
        oracle: &dyn LayoutOracle,
        now: Instant,
    ) -> Result<GestureToken> {
        let token = self.engine.begin(
            self.store.filters(),
            handle,
            pointer,
            oracle,
            self.store.registry().as_ref(),
            now,
        )?;
        Ok(token)
    }

    /// Feed a pointer sample. The returned effects are for the view; any
    /// preview ordering has already been mirrored into the store.
    pub fn pointer_move(
        &mut self,
        token: GestureToken,
        pointer: Point,
        now: Instant,
    ) -> Vec<DragEffect> {
        let effects = self.engine.pointer_move(token, pointer, now);
        self.mirror(&effects);
        effects
    }

    /// Drop the dragged block and commit the resulting edit.
    pub fn release(
        &mut self,
        token: GestureToken,
        pointer: Point,
        now: Instant,
    ) -> Option<DropResolution> {
        let resolution = self.engine.release(token, pointer, now)?;
        self.store.clear_preview();
        if let Some(edit) = resolution.edit() {
            self.commit(edit, now);
        }
        Some(resolution)
    }

    /// Abandon the gesture and restore the committed order.
    pub fn cancel(
        &mut self,
        token: GestureToken,
        reason: CancelReason,
        now: Instant,
    ) -> Option<Vec<DragEffect>> {
        let effects = self.engine.cancel(token, reason, now)?;
        self.mirror(&effects);
        Some(effects)
    }

    /// Re-read geometry after the view re-laid out mid-gesture.
    pub fn refresh_geometry(&mut self, token: GestureToken, oracle: &dyn LayoutOracle) -> bool {
        self.engine.refresh_geometry(token, oracle)
    }

    /// Advance timers: debounced previews, the idle sweep and notice expiry.
    pub fn tick(&mut self, now: Instant) -> SessionTick {
        let mut drag = self.engine.poll(now);
        drag.extend(self.engine.sweep(now));
        self.mirror(&drag);
        SessionTick {
            drag,
            notices: self.notices.tick(now),
        }
    }

    fn mirror(&mut self, effects: &[DragEffect]) {
        for effect in effects {
            match effect {
                DragEffect::Preview { order, .. } => {
                    if let Err(err) = self.store.set_preview(order.clone()) {
                        tracing::warn!(
                            target: "fxchain.session",
                            "preview does not match the pipeline: {err}"
                        );
                    }
                }
                DragEffect::PreviewCleared | DragEffect::ArtifactsSwept => {
                    self.store.clear_preview();
                }
                DragEffect::Highlight { .. } => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxchain_drag::StaticLayout;
    use fxchain_model::{StaticRegistry, TypeFlags};
    use std::sync::Arc;
    use std::time::Duration;

    fn session(count: usize) -> PipelineSession {
        let registry = StaticRegistry::new()
            .with_type("shape", TypeFlags::GROUP_CAPABLE | TypeFlags::MASK_TARGET)
            .with_type("blur", TypeFlags::empty());
        let mut session = PipelineSession::new(Arc::new(registry), SessionConfig::default());
        let start = Instant::now();
        for _ in 0..count {
            session.add("blur", start).expect("id");
        }
        session
    }

    fn layout(session: &PipelineSession) -> StaticLayout {
        let ids: Vec<FilterId> = session.sequence().filters().iter().map(|f| f.id).collect();
        StaticLayout::uniform(&ids, 40.0, 200.0)
    }

    #[test]
    fn edits_cancel_an_active_gesture() {
        let mut session = session(3);
        let start = Instant::now();
        let first = session.sequence().filters()[0].id;
        let layout = layout(&session);
        let token = session
            .begin_drag(first, Point::new(10.0, 20.0), &layout, start)
            .expect("gesture");
        assert!(session.edit(&PipelineEdit::Remove { filter: first }, start));
        assert!(!session.engine().is_dragging());
        assert_eq!(session.release(token, Point::new(10.0, 100.0), start), None);
    }

    #[test]
    fn previews_are_mirrored_into_the_store() {
        let mut session = session(3);
        let start = Instant::now();
        let ids: Vec<FilterId> = session.sequence().filters().iter().map(|f| f.id).collect();
        let layout = layout(&session);
        let token = session
            .begin_drag(ids[0], Point::new(10.0, 20.0), &layout, start)
            .expect("gesture");
        session.pointer_move(token, Point::new(10.0, 110.0), start + Duration::from_millis(5));
        let tick = session.tick(start + Duration::from_millis(60));
        assert_eq!(tick.drag.len(), 1);
        assert_eq!(session.sequence().preview(), Some(&[ids[1], ids[2], ids[0]][..]));

        let effects = session
            .cancel(token, CancelReason::PointerCancel, start + Duration::from_millis(70))
            .expect("active");
        assert_eq!(effects, vec![DragEffect::PreviewCleared]);
        assert_eq!(session.sequence().preview(), None);
    }
}
