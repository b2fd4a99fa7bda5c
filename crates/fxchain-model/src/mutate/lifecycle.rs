#![forbid(unsafe_code)]

//! Record lifecycle, dimension links and parameter writes.

use super::{find_mut, stale};
use crate::filter::{BlendMode, Filter, HEIGHT_PARAM, WIDTH_PARAM, is_dimension_param};
use crate::id::FilterId;
use crate::registry::FilterTypeRegistry;

/// Deep-copy `source` under `new_id` and insert the copy at the front.
///
/// The copy keeps parameters, blend mode and extended blocks but none of
/// the relationship fields.
#[must_use]
pub fn duplicate(filters: &[Filter], source: FilterId, new_id: FilterId) -> Vec<Filter> {
    let Some(record) = filters.iter().find(|filter| filter.id == source) else {
        stale("duplicate", source);
        return filters.to_vec();
    };
    if filters.iter().any(|filter| filter.id == new_id) {
        tracing::debug!(
            target: "fxchain.mutate",
            source = %source,
            new_id = %new_id,
            "duplicate id already in use, edit ignored"
        );
        return filters.to_vec();
    }
    let mut list = Vec::with_capacity(filters.len() + 1);
    list.push(record.duplicate_as(new_id));
    list.extend_from_slice(filters);
    list
}

/// Delete `filter` after unwinding every reference to it.
///
/// Children of a removed base become standalone. A removed masking filter
/// releases its unit; a removed unit base releases its mask.
#[must_use]
pub fn remove(filters: &[Filter], filter: FilterId) -> Vec<Filter> {
    let Some(position) = filters.iter().position(|record| record.id == filter) else {
        stale("remove", filter);
        return filters.to_vec();
    };
    let orphaned_masks: Vec<FilterId> = filters
        .iter()
        .filter(|record| record.masked_filter_id == Some(filter))
        .map(|record| record.id)
        .collect();

    let mut list = filters.to_vec();
    list.remove(position);
    for record in &mut list {
        record.linked_dimensions.remove(&filter);
        record.grouped_filters.retain(|child| *child != filter);
        if record.group_id == Some(filter) {
            record.group_id = None;
            record.mask_id = None;
        }
        if record.mask_id == Some(filter) {
            record.mask_id = None;
        }
        if record.masked_filter_id == Some(filter) {
            record.masked_filter_id = None;
        }
        if record
            .mask_id
            .is_some_and(|mask| orphaned_masks.contains(&mask))
        {
            record.mask_id = None;
        }
    }
    list
}

/// Link the width/height of `source` and `target` in both directions and
/// copy the source's current dimensions onto the target.
#[must_use]
pub fn link_dimensions(filters: &[Filter], source: FilterId, target: FilterId) -> Vec<Filter> {
    let Some(source_record) = filters.iter().find(|filter| filter.id == source) else {
        stale("link_dimensions", source);
        return filters.to_vec();
    };
    if source == target || !filters.iter().any(|filter| filter.id == target) {
        stale("link_dimensions", target);
        return filters.to_vec();
    }
    let dimensions: Vec<(&'static str, f64)> = [WIDTH_PARAM, HEIGHT_PARAM]
        .into_iter()
        .filter_map(|name| source_record.param(name).map(|value| (name, value)))
        .collect();

    let mut list = filters.to_vec();
    if let Some(record) = find_mut(&mut list, source) {
        record.linked_dimensions.insert(target);
    }
    if let Some(record) = find_mut(&mut list, target) {
        record.linked_dimensions.insert(source);
        for (name, value) in dimensions {
            record.params.insert(name.to_owned(), value);
        }
    }
    list
}

/// Remove the dimension link between `source` and `target`, both directions.
#[must_use]
pub fn unlink_dimensions(filters: &[Filter], source: FilterId, target: FilterId) -> Vec<Filter> {
    let mut list = filters.to_vec();
    let mut touched = false;
    for record in &mut list {
        if record.id == source {
            touched |= record.linked_dimensions.remove(&target);
        } else if record.id == target {
            touched |= record.linked_dimensions.remove(&source);
        }
    }
    if !touched {
        tracing::debug!(
            target: "fxchain.mutate",
            source = %source,
            target_filter = %target,
            "no dimension link to remove"
        );
    }
    list
}

/// Write one parameter, clamped to the type's range.
///
/// A changed width or height is pushed to every linked filter, one hop.
#[must_use]
pub fn set_param(
    filters: &[Filter],
    filter: FilterId,
    name: &str,
    value: f64,
    registry: &dyn FilterTypeRegistry,
) -> Vec<Filter> {
    let Some(record) = filters.iter().find(|record| record.id == filter) else {
        stale("set_param", filter);
        return filters.to_vec();
    };
    let value = registry
        .param_range(&record.filter_type, name)
        .map_or(value, |range| range.clamp(value));
    if record.param(name) == Some(value) {
        return filters.to_vec();
    }
    let push_to = if is_dimension_param(name) {
        record.linked_dimensions.clone()
    } else {
        Default::default()
    };

    let mut list = filters.to_vec();
    for record in &mut list {
        if record.id == filter {
            record.params.insert(name.to_owned(), value);
        } else if push_to.contains(&record.id) {
            let pushed = registry
                .param_range(&record.filter_type, name)
                .map_or(value, |range| range.clamp(value));
            record.params.insert(name.to_owned(), pushed);
        }
    }
    if !push_to.is_empty() {
        tracing::trace!(
            target: "fxchain.mutate",
            filter = %filter,
            param = name,
            linked = push_to.len(),
            "dimension pushed to linked filters"
        );
    }
    list
}

#[must_use]
pub fn set_enabled(filters: &[Filter], filter: FilterId, enabled: bool) -> Vec<Filter> {
    let mut list = filters.to_vec();
    match find_mut(&mut list, filter) {
        Some(record) => record.enabled = enabled,
        None => stale("set_enabled", filter),
    }
    list
}

#[must_use]
pub fn set_blend_mode(filters: &[Filter], filter: FilterId, blend_mode: BlendMode) -> Vec<Filter> {
    let mut list = filters.to_vec();
    match find_mut(&mut list, filter) {
        Some(record) => record.blend_mode = blend_mode,
        None => stale("set_blend_mode", filter),
    }
    list
}
