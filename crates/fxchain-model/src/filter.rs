#![forbid(unsafe_code)]

//! Filter records: one stage of the effect pipeline.
//!
//! A [`Filter`] carries its own parameters plus plain-id relationship fields.
//! Relationship fields never embed other records; every structural edit is a
//! field rewrite on a flat list (see [`crate::mutate`]).

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::FilterId;

/// Parameter name holding a filter's width.
pub const WIDTH_PARAM: &str = "width";
/// Parameter name holding a filter's height.
pub const HEIGHT_PARAM: &str = "height";

/// Returns `true` for the parameters mirrored by dimension links.
#[must_use]
pub fn is_dimension_param(name: &str) -> bool {
    name == WIDTH_PARAM || name == HEIGHT_PARAM
}

/// Opaque filter type key, resolved through a
/// [`FilterTypeRegistry`](crate::registry::FilterTypeRegistry).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterType(Cow<'static, str>);

impl FilterType {
    /// Type key backed by a static string.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Type key from any owned or borrowed string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for FilterType {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// How a filter's output is composited onto the stages below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Add,
}

impl BlendMode {
    /// All blend modes in menu order.
    #[must_use]
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::ColorDodge,
            BlendMode::ColorBurn,
            BlendMode::HardLight,
            BlendMode::SoftLight,
            BlendMode::Difference,
            BlendMode::Exclusion,
            BlendMode::Add,
        ]
    }
}

/// One pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub id: FilterId,
    pub filter_type: FilterType,
    pub enabled: bool,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
    #[serde(default)]
    pub blend_mode: BlendMode,
    /// Type-specific parameter blocks (curves, gradients, color stops...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extended: BTreeMap<String, serde_json::Value>,

    /// Filters whose width/height mirror this filter's.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub linked_dimensions: BTreeSet<FilterId>,
    /// Base filter this record is a child of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<FilterId>,
    /// Ordered child ids; non-empty only on a group base.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grouped_filters: Vec<FilterId>,
    /// Masking filter overlaying this record's unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_id: Option<FilterId>,
    /// Unit base overlaid by this masking filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masked_filter_id: Option<FilterId>,
}

impl Filter {
    /// Create an enabled filter with no parameters and no relationships.
    pub fn new(id: FilterId, filter_type: impl Into<FilterType>) -> Self {
        Self {
            id,
            filter_type: filter_type.into(),
            enabled: true,
            params: BTreeMap::new(),
            blend_mode: BlendMode::default(),
            extended: BTreeMap::new(),
            linked_dimensions: BTreeSet::new(),
            group_id: None,
            grouped_filters: Vec::new(),
            mask_id: None,
            masked_filter_id: None,
        }
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    #[must_use]
    pub fn with_extended(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extended.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }

    /// Whether this record anchors a group.
    #[must_use]
    pub fn is_group_base(&self) -> bool {
        !self.grouped_filters.is_empty()
    }

    /// Whether this record overlays another unit as its mask.
    #[must_use]
    pub fn is_masking(&self) -> bool {
        self.masked_filter_id.is_some()
    }

    /// Whether any relationship field is set.
    #[must_use]
    pub fn has_relationships(&self) -> bool {
        !self.linked_dimensions.is_empty()
            || self.group_id.is_some()
            || !self.grouped_filters.is_empty()
            || self.mask_id.is_some()
            || self.masked_filter_id.is_some()
    }

    pub fn clear_relationships(&mut self) {
        self.linked_dimensions.clear();
        self.group_id = None;
        self.grouped_filters.clear();
        self.mask_id = None;
        self.masked_filter_id = None;
    }

    /// Deep copy under a new id with every relationship dropped.
    #[must_use]
    pub fn duplicate_as(&self, id: FilterId) -> Self {
        let mut copy = self.clone();
        copy.id = id;
        copy.clear_relationships();
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(raw: u64) -> FilterId {
        FilterId::new(raw).expect("non-zero")
    }

    #[test]
    fn duplicate_drops_relationships_and_keeps_params() {
        let mut source = Filter::new(id(1), "vignette")
            .with_param("radius", 0.4)
            .with_extended("stops", json!([0.0, 0.5, 1.0]));
        source.group_id = Some(id(9));
        source.mask_id = Some(id(4));
        source.linked_dimensions.insert(id(3));

        let copy = source.duplicate_as(id(2));
        assert_eq!(copy.id, id(2));
        assert_eq!(copy.param("radius"), Some(0.4));
        assert_eq!(copy.extended["stops"], json!([0.0, 0.5, 1.0]));
        assert!(!copy.has_relationships());
        assert!(source.has_relationships());
    }

    #[test]
    fn empty_relationship_fields_are_not_serialized() {
        let filter = Filter::new(id(5), "blur").with_param("radius", 2.0);
        let text = serde_json::to_string(&filter).expect("serialize");
        assert!(!text.contains("group_id"));
        assert!(!text.contains("grouped_filters"));

        let back: Filter = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, filter);
    }

    #[test]
    fn dimension_params_are_width_and_height() {
        assert!(is_dimension_param(WIDTH_PARAM));
        assert!(is_dimension_param(HEIGHT_PARAM));
        assert!(!is_dimension_param("radius"));
    }

    #[test]
    fn blend_modes_round_trip_snake_case() {
        let text = serde_json::to_string(&BlendMode::ColorDodge).expect("serialize");
        assert_eq!(text, "\"color_dodge\"");
        assert_eq!(BlendMode::all().len(), 13);
    }
}
