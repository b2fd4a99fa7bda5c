#![forbid(unsafe_code)]

//! Filter Sequence Store: the canonical flat list.
//!
//! [`FilterSequence::apply`] is the only writer. Every convenience edit goes
//! through a mutator against the current snapshot and then through `apply`,
//! so readers never observe a half-applied edit. A preview ordering can be
//! layered on top without touching the canonical list.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::error::{PreviewError, StructuralViolation};
use crate::filter::{BlendMode, Filter, FilterType};
use crate::id::{FilterId, IdError};
use crate::invariants::{InvariantReport, invariant_report};
use crate::mutate::{PipelineEdit, apply_edit};
use crate::registry::FilterTypeRegistry;
use crate::resolver::{DisplayOrder, resolve_display_order};

/// Shared registry handle held by the store.
pub type SharedRegistry = Arc<dyn FilterTypeRegistry + Send + Sync>;

/// Owner of the ordered filter list.
pub struct FilterSequence {
    filters: Vec<Filter>,
    preview: Option<Vec<FilterId>>,
    next_id: FilterId,
    revision: u64,
    registry: SharedRegistry,
}

impl fmt::Debug for FilterSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSequence")
            .field("filters", &self.filters.len())
            .field("preview", &self.preview.is_some())
            .field("next_id", &self.next_id)
            .field("revision", &self.revision)
            .finish()
    }
}

impl FilterSequence {
    /// Empty pipeline.
    #[must_use]
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            filters: Vec::new(),
            preview: None,
            next_id: FilterId::MIN,
            revision: 0,
            registry,
        }
    }

    /// Adopt an existing list. New ids start above the largest one present.
    pub fn from_filters(filters: Vec<Filter>, registry: SharedRegistry) -> Result<Self, IdError> {
        let next_id = match filters.iter().map(|filter| filter.id).max() {
            Some(max) => max.checked_next()?,
            None => FilterId::MIN,
        };
        let report = invariant_report(&filters);
        log_report(&report, 0);
        Ok(Self {
            filters,
            preview: None,
            next_id,
            revision: 0,
            registry,
        })
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub fn get(&self, id: FilterId) -> Option<&Filter> {
        self.filters.iter().find(|filter| filter.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: FilterId) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Incremented on every `apply`.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Replace the canonical list.
    ///
    /// Clears any preview. Invariant findings are logged, not rejected: the
    /// mutators are responsible for producing consistent lists.
    pub fn apply(&mut self, filters: Vec<Filter>) {
        self.filters = filters;
        self.preview = None;
        self.revision += 1;
        let report = invariant_report(&self.filters);
        log_report(&report, self.revision);
        tracing::debug!(
            target: "fxchain.store",
            revision = self.revision,
            len = self.filters.len(),
            "pipeline applied"
        );
    }

    /// Run `edit` against the current list and apply the result.
    ///
    /// Returns `Ok(false)` when the edit left the list unchanged (stale ids,
    /// no-op moves). A violation leaves the store untouched.
    pub fn edit(&mut self, edit: &PipelineEdit) -> Result<bool, StructuralViolation> {
        let kind = edit.kind();
        let next = match apply_edit(&self.filters, edit, self.registry.as_ref()) {
            Ok(next) => next,
            Err(violation) => {
                tracing::warn!(
                    target: "fxchain.store",
                    edit = kind.as_str(),
                    code = violation.code(),
                    "edit rejected: {violation}"
                );
                return Err(violation);
            }
        };
        if next == self.filters {
            tracing::debug!(target: "fxchain.store", edit = kind.as_str(), "edit was a no-op");
            return Ok(false);
        }
        self.apply(next);
        tracing::info!(
            target: "fxchain.store",
            edit = kind.as_str(),
            revision = self.revision,
            "edit committed"
        );
        Ok(true)
    }

    /// Reserve a fresh id.
    pub fn allocate_id(&mut self) -> Result<FilterId, IdError> {
        let id = self.next_id;
        self.next_id = id.checked_next()?;
        Ok(id)
    }

    /// Append a new filter of `filter_type` with the registry's defaults.
    pub fn add(&mut self, filter_type: impl Into<FilterType>) -> Result<FilterId, IdError> {
        let filter_type = filter_type.into();
        let id = self.allocate_id()?;
        let mut filter = Filter::new(id, filter_type.clone());
        if let Some(defaults) = self.registry.defaults(&filter_type) {
            filter.params = defaults.params;
            filter.blend_mode = defaults.blend_mode;
            filter.extended = defaults.extended;
        }
        let mut next = self.filters.clone();
        next.push(filter);
        self.apply(next);
        tracing::info!(target: "fxchain.store", filter = %id, filter_type = %filter_type, "filter added");
        Ok(id)
    }

    /// Copy `source` to the front under a fresh id. `None` when `source` is
    /// unknown.
    pub fn duplicate(&mut self, source: FilterId) -> Result<Option<FilterId>, IdError> {
        if !self.contains(source) {
            tracing::debug!(target: "fxchain.store", filter = %source, "duplicate of unknown filter ignored");
            return Ok(None);
        }
        let new_id = self.allocate_id()?;
        let edit = PipelineEdit::Duplicate { source, new_id };
        Ok(self.edit(&edit).ok().filter(|changed| *changed).map(|_| new_id))
    }

    /// Remove `filter`, unwinding its relationships. `false` when unknown.
    pub fn remove(&mut self, filter: FilterId) -> bool {
        self.edit(&PipelineEdit::Remove { filter })
            .unwrap_or(false)
    }

    pub fn set_param(&mut self, filter: FilterId, name: impl Into<String>, value: f64) -> bool {
        let edit = PipelineEdit::SetParam {
            filter,
            name: name.into(),
            value,
        };
        self.edit(&edit).unwrap_or(false)
    }

    pub fn set_enabled(&mut self, filter: FilterId, enabled: bool) -> bool {
        self.edit(&PipelineEdit::SetEnabled { filter, enabled })
            .unwrap_or(false)
    }

    pub fn set_blend_mode(&mut self, filter: FilterId, blend_mode: BlendMode) -> bool {
        self.edit(&PipelineEdit::SetBlendMode { filter, blend_mode })
            .unwrap_or(false)
    }

    /// Show `order` instead of the canonical order until the next `apply` or
    /// [`clear_preview`](Self::clear_preview).
    ///
    /// `order` must be a permutation of the canonical ids.
    pub fn set_preview(&mut self, order: Vec<FilterId>) -> Result<(), PreviewError> {
        if order.len() != self.filters.len() {
            return Err(PreviewError::LengthMismatch {
                expected: self.filters.len(),
                actual: order.len(),
            });
        }
        let mut seen = FxHashSet::default();
        for id in &order {
            if !self.contains(*id) {
                return Err(PreviewError::UnknownFilter(*id));
            }
            if !seen.insert(*id) {
                return Err(PreviewError::DuplicateFilter(*id));
            }
        }
        tracing::trace!(target: "fxchain.store", len = order.len(), "preview set");
        self.preview = Some(order);
        Ok(())
    }

    /// Drop the preview. Returns whether one was set.
    pub fn clear_preview(&mut self) -> bool {
        self.preview.take().is_some()
    }

    #[must_use]
    pub fn preview(&self) -> Option<&[FilterId]> {
        self.preview.as_deref()
    }

    /// Records in preview order when a preview is set, canonical otherwise.
    #[must_use]
    pub fn visible_filters(&self) -> Vec<Filter> {
        match &self.preview {
            Some(order) => order
                .iter()
                .filter_map(|id| self.get(*id).cloned())
                .collect(),
            None => self.filters.clone(),
        }
    }

    /// Nested display order of the visible list.
    #[must_use]
    pub fn display_order(&self) -> DisplayOrder {
        match &self.preview {
            Some(_) => resolve_display_order(&self.visible_filters()),
            None => resolve_display_order(&self.filters),
        }
    }

    /// Enabled filters in canonical order, for the renderer.
    #[must_use]
    pub fn render_list(&self) -> Vec<&Filter> {
        self.filters.iter().filter(|filter| filter.enabled).collect()
    }

    #[must_use]
    pub fn invariant_report(&self) -> InvariantReport {
        invariant_report(&self.filters)
    }
}

fn log_report(report: &InvariantReport, revision: u64) {
    for issue in &report.issues {
        tracing::warn!(
            target: "fxchain.store",
            revision,
            code = ?issue.code,
            filter = ?issue.filter,
            "invariant violated: {}",
            issue.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::WIDTH_PARAM;
    use crate::registry::{ParamRange, StaticRegistry, TypeFlags};
    use crate::resolver::DisplayEntry;
    use std::sync::Mutex;
    use tracing::{Level, Subscriber};
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    fn registry() -> SharedRegistry {
        Arc::new(
            StaticRegistry::new()
                .with_type("shape", TypeFlags::GROUP_CAPABLE | TypeFlags::MASK_TARGET)
                .with_param("shape", WIDTH_PARAM, 320.0, Some(ParamRange::new(1.0, 4096.0)))
                .with_type("blur", TypeFlags::empty())
                .with_param("blur", "radius", 4.0, None),
        )
    }

    #[test]
    fn add_uses_registry_defaults_and_fresh_ids() {
        let mut store = FilterSequence::new(registry());
        let shape = store.add("shape").expect("id");
        let blur = store.add("blur").expect("id");
        assert_ne!(shape, blur);
        assert_eq!(store.get(shape).and_then(|f| f.param(WIDTH_PARAM)), Some(320.0));
        assert_eq!(store.get(blur).and_then(|f| f.param("radius")), Some(4.0));
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn violations_leave_the_store_untouched() {
        let mut store = FilterSequence::new(registry());
        let a = store.add("blur").expect("id");
        let b = store.add("blur").expect("id");
        let revision = store.revision();
        let result = store.edit(&PipelineEdit::Group { dragged: a, base: b });
        assert!(matches!(result, Err(StructuralViolation::NotGroupCapable { .. })));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn no_op_edits_do_not_bump_revision() {
        let mut store = FilterSequence::new(registry());
        let a = store.add("blur").expect("id");
        let revision = store.revision();
        assert_eq!(store.edit(&PipelineEdit::MoveFilter { filter: a, to: 0 }), Ok(false));
        assert!(!store.remove(FilterId::new(999).expect("non-zero")));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn preview_must_be_a_permutation() {
        let mut store = FilterSequence::new(registry());
        let a = store.add("blur").expect("id");
        let b = store.add("shape").expect("id");
        assert_eq!(
            store.set_preview(vec![a]),
            Err(PreviewError::LengthMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            store.set_preview(vec![a, a]),
            Err(PreviewError::DuplicateFilter(a))
        );
        store.set_preview(vec![b, a]).expect("permutation");
        assert_eq!(
            store.display_order().entries()[0],
            DisplayEntry::Filter { id: b }
        );
        assert_eq!(store.filters()[0].id, a);

        store.set_param(a, "radius", 9.0);
        assert!(store.preview().is_none());
    }

    #[test]
    fn render_list_skips_disabled_filters() {
        let mut store = FilterSequence::new(registry());
        let a = store.add("blur").expect("id");
        let b = store.add("shape").expect("id");
        assert!(store.set_enabled(a, false));
        let ids: Vec<FilterId> = store.render_list().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![b]);
    }

    #[test]
    fn duplicate_allocates_and_prepends() {
        let mut store = FilterSequence::new(registry());
        let a = store.add("shape").expect("id");
        assert!(store.set_param(a, WIDTH_PARAM, 9000.0));
        let copy = store.duplicate(a).expect("id").expect("known source");
        assert_eq!(store.filters()[0].id, copy);
        assert_eq!(store.filters()[0].param(WIDTH_PARAM), Some(4096.0));
        assert_eq!(store.duplicate(FilterId::new(77).expect("non-zero")), Ok(None));
    }

    #[derive(Debug, Default)]
    struct StoreEvents {
        warnings: Vec<String>,
        commits: usize,
    }

    struct StoreEventCapture {
        events: Arc<Mutex<StoreEvents>>,
    }

    impl<S: Subscriber> Layer<S> for StoreEventCapture {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let metadata = event.metadata();
            if metadata.target() != "fxchain.store" {
                return;
            }
            struct CodeVisitor(Option<String>);
            impl tracing::field::Visit for CodeVisitor {
                fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                    if field.name() == "code" {
                        self.0 = Some(value.to_owned());
                    }
                }

                fn record_debug(&mut self, _field: &tracing::field::Field, _value: &dyn fmt::Debug) {}
            }
            let mut events = self.events.lock().expect("store events lock");
            if *metadata.level() == Level::WARN {
                let mut visitor = CodeVisitor(None);
                event.record(&mut visitor);
                events.warnings.extend(visitor.0);
            } else if *metadata.level() == Level::INFO {
                events.commits += 1;
            }
        }
    }

    #[test]
    fn rejections_warn_and_commits_inform() {
        let mut store = FilterSequence::new(registry());
        let a = store.add("blur").expect("id");
        let b = store.add("blur").expect("id");

        let events = Arc::new(Mutex::new(StoreEvents::default()));
        let subscriber = tracing_subscriber::registry().with(StoreEventCapture {
            events: Arc::clone(&events),
        });
        let _guard = tracing::subscriber::set_default(subscriber);
        tracing::callsite::rebuild_interest_cache();

        let _ = store.edit(&PipelineEdit::Group { dragged: a, base: b });
        assert_eq!(store.edit(&PipelineEdit::MoveFilter { filter: a, to: 1 }), Ok(true));

        let snapshot = events.lock().expect("store events lock");
        assert_eq!(snapshot.warnings, vec!["not_group_capable".to_owned()]);
        assert_eq!(snapshot.commits, 1);
    }

    #[test]
    fn adopted_lists_allocate_above_existing_ids() {
        let filters = vec![Filter::new(FilterId::new(41).expect("non-zero"), "blur")];
        let mut store = FilterSequence::from_filters(filters, registry()).expect("ids");
        assert_eq!(store.allocate_id().map(FilterId::get), Ok(42));
    }
}
