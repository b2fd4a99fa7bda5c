#![forbid(unsafe_code)]

//! Filter type capabilities.
//!
//! The structural code never looks at a filter's parameters to decide what it
//! may do; it asks a [`FilterTypeRegistry`] for the type's [`TypeFlags`].
//! Defaults and parameter ranges are used only when creating filters and
//! when clamping parameter writes.

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::filter::{BlendMode, FilterType};

bitflags! {
    /// Structural capabilities of a filter type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u8 {
        /// The type can anchor a group as its base.
        const GROUP_CAPABLE = 1 << 0;
        /// The type can be overlaid by a masking filter.
        const MASK_TARGET = 1 << 1;
    }
}

/// Inclusive bounds for one numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
}

impl ParamRange {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into the range. NaN collapses to `min`.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }
}

/// Values a freshly added filter of one type starts with.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterDefaults {
    pub params: BTreeMap<String, f64>,
    pub blend_mode: BlendMode,
    pub extended: BTreeMap<String, serde_json::Value>,
}

/// Static table of filter types known to the host.
pub trait FilterTypeRegistry {
    /// Structural flags for `filter_type`. Unknown types have no flags.
    fn flags(&self, filter_type: &FilterType) -> TypeFlags;

    /// Defaults for a new filter of `filter_type`.
    fn defaults(&self, _filter_type: &FilterType) -> Option<FilterDefaults> {
        None
    }

    /// Allowed range of one parameter.
    fn param_range(&self, _filter_type: &FilterType, _param: &str) -> Option<ParamRange> {
        None
    }

    fn is_group_capable(&self, filter_type: &FilterType) -> bool {
        self.flags(filter_type).contains(TypeFlags::GROUP_CAPABLE)
    }

    fn is_mask_target(&self, filter_type: &FilterType) -> bool {
        self.flags(filter_type).contains(TypeFlags::MASK_TARGET)
    }
}

#[derive(Debug, Clone, Default)]
struct RegistryEntry {
    flags: TypeFlags,
    defaults: FilterDefaults,
    ranges: BTreeMap<String, ParamRange>,
}

/// In-memory [`FilterTypeRegistry`] populated with a builder.
///
/// ```
/// use fxchain_model::{FilterType, FilterTypeRegistry, ParamRange, StaticRegistry, TypeFlags};
///
/// let registry = StaticRegistry::new()
///     .with_type("shape", TypeFlags::GROUP_CAPABLE | TypeFlags::MASK_TARGET)
///     .with_param("shape", "width", 320.0, Some(ParamRange::new(1.0, 4096.0)));
///
/// assert!(registry.is_group_capable(&FilterType::from_static("shape")));
/// assert!(!registry.is_group_capable(&FilterType::from_static("blur")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    entries: BTreeMap<FilterType, RegistryEntry>,
}

impl StaticRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-flag) a type.
    #[must_use]
    pub fn with_type(mut self, filter_type: impl Into<FilterType>, flags: TypeFlags) -> Self {
        self.entries.entry(filter_type.into()).or_default().flags = flags;
        self
    }

    /// Add a default parameter value, optionally with its allowed range.
    #[must_use]
    pub fn with_param(
        mut self,
        filter_type: impl Into<FilterType>,
        name: impl Into<String>,
        default: f64,
        range: Option<ParamRange>,
    ) -> Self {
        let name = name.into();
        let entry = self.entries.entry(filter_type.into()).or_default();
        if let Some(range) = range {
            entry.defaults.params.insert(name.clone(), range.clamp(default));
            entry.ranges.insert(name, range);
        } else {
            entry.defaults.params.insert(name, default);
        }
        self
    }

    #[must_use]
    pub fn with_blend_mode(mut self, filter_type: impl Into<FilterType>, mode: BlendMode) -> Self {
        self.entries
            .entry(filter_type.into())
            .or_default()
            .defaults
            .blend_mode = mode;
        self
    }

    #[must_use]
    pub fn with_extended(
        mut self,
        filter_type: impl Into<FilterType>,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.entries
            .entry(filter_type.into())
            .or_default()
            .defaults
            .extended
            .insert(key.into(), value);
        self
    }

    /// Registered type keys in sorted order.
    pub fn types(&self) -> impl Iterator<Item = &FilterType> + '_ {
        self.entries.keys()
    }
}

impl FilterTypeRegistry for StaticRegistry {
    fn flags(&self, filter_type: &FilterType) -> TypeFlags {
        self.entries
            .get(filter_type)
            .map(|entry| entry.flags)
            .unwrap_or_default()
    }

    fn defaults(&self, filter_type: &FilterType) -> Option<FilterDefaults> {
        self.entries
            .get(filter_type)
            .map(|entry| entry.defaults.clone())
    }

    fn param_range(&self, filter_type: &FilterType, param: &str) -> Option<ParamRange> {
        self.entries
            .get(filter_type)
            .and_then(|entry| entry.ranges.get(param).copied())
    }
}

impl<R: FilterTypeRegistry + ?Sized> FilterTypeRegistry for &R {
    fn flags(&self, filter_type: &FilterType) -> TypeFlags {
        (**self).flags(filter_type)
    }

    fn defaults(&self, filter_type: &FilterType) -> Option<FilterDefaults> {
        (**self).defaults(filter_type)
    }

    fn param_range(&self, filter_type: &FilterType, param: &str) -> Option<ParamRange> {
        (**self).param_range(filter_type, param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_types_have_no_capabilities() {
        let registry = StaticRegistry::new();
        let blur = FilterType::from_static("blur");
        assert_eq!(registry.flags(&blur), TypeFlags::empty());
        assert!(registry.defaults(&blur).is_none());
        assert!(!registry.is_mask_target(&blur));
    }

    #[test]
    fn defaults_are_clamped_into_range() {
        let registry =
            StaticRegistry::new().with_param("pixelate", "size", 900.0, Some(ParamRange::new(1.0, 64.0)));
        let defaults = registry
            .defaults(&FilterType::from_static("pixelate"))
            .expect("registered");
        assert_eq!(defaults.params["size"], 64.0);
        assert_eq!(
            registry.param_range(&FilterType::from_static("pixelate"), "size"),
            Some(ParamRange::new(1.0, 64.0))
        );
    }

    #[test]
    fn range_clamp_handles_nan() {
        let range = ParamRange::new(-1.0, 1.0);
        assert_eq!(range.clamp(f64::NAN), -1.0);
        assert_eq!(range.clamp(3.0), 1.0);
        assert_eq!(range.clamp(0.25), 0.25);
    }
}
