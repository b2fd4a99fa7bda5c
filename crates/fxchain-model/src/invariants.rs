#![forbid(unsafe_code)]

//! Structural invariant checks over a flat filter list.
//!
//! The store runs [`invariant_report`] after every write and logs findings;
//! tests and the fuzz target assert the report is clean after arbitrary edit
//! streams.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::id::FilterId;
use crate::units::FilterIndex;

/// Stable code for invariant findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantCode {
    DuplicateId,
    SelfReference,
    DanglingGroupRef,
    MissingBackReference,
    MissingChildLink,
    NestedGroup,
    GroupNotContiguous,
    MaskTargetNotBase,
    DanglingMaskRef,
    DuplicateMask,
    MaskNotContiguous,
    MaskIdNotPropagated,
    StrayMaskId,
    DanglingDimensionLink,
}

/// One invariant finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantIssue {
    pub code: InvariantCode,
    pub filter: Option<FilterId>,
    pub related: Option<FilterId>,
    pub message: String,
}

/// Every finding for one list snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantReport {
    pub issues: Vec<InvariantIssue>,
}

impl InvariantReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    #[must_use]
    pub fn has(&self, code: InvariantCode) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }

    /// Distinct codes present, sorted.
    #[must_use]
    pub fn codes(&self) -> Vec<InvariantCode> {
        let mut codes: Vec<InvariantCode> = self.issues.iter().map(|issue| issue.code).collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }

    fn push(
        &mut self,
        code: InvariantCode,
        filter: Option<FilterId>,
        related: Option<FilterId>,
        message: impl Into<String>,
    ) {
        self.issues.push(InvariantIssue {
            code,
            filter,
            related,
            message: message.into(),
        });
    }
}

/// Check every structural invariant of `filters`.
#[must_use]
pub fn invariant_report(filters: &[Filter]) -> InvariantReport {
    let mut report = InvariantReport::default();
    let index = FilterIndex::new(filters);

    let mut seen = FxHashSet::default();
    for filter in filters {
        if !seen.insert(filter.id) {
            report.push(
                InvariantCode::DuplicateId,
                Some(filter.id),
                None,
                format!("{} appears more than once", filter.id),
            );
        }
    }

    for filter in filters {
        check_self_references(&mut report, filter);
        check_group_links(&mut report, &index, filter);
        check_dimension_links(&mut report, &index, filter);
    }
    check_group_contiguity(&mut report, &index);
    check_masks(&mut report, &index);
    report
}

fn check_self_references(report: &mut InvariantReport, filter: &Filter) {
    let id = filter.id;
    let self_linked = filter.group_id == Some(id)
        || filter.mask_id == Some(id)
        || filter.masked_filter_id == Some(id)
        || filter.grouped_filters.contains(&id)
        || filter.linked_dimensions.contains(&id);
    if self_linked {
        report.push(
            InvariantCode::SelfReference,
            Some(id),
            None,
            format!("{id} references itself"),
        );
    }
}

fn check_group_links(report: &mut InvariantReport, index: &FilterIndex<'_>, filter: &Filter) {
    let id = filter.id;
    if filter.group_id.is_some() && !filter.grouped_filters.is_empty() {
        report.push(
            InvariantCode::NestedGroup,
            Some(id),
            filter.group_id,
            format!("{id} is both a child and a base"),
        );
    }

    if let Some(base_id) = filter.group_id
        && base_id != id
    {
        match index.get(base_id) {
            None => report.push(
                InvariantCode::DanglingGroupRef,
                Some(id),
                Some(base_id),
                format!("{id} names missing base {base_id}"),
            ),
            Some(base) if !base.grouped_filters.contains(&id) => report.push(
                InvariantCode::MissingBackReference,
                Some(id),
                Some(base_id),
                format!("{base_id} does not list child {id}"),
            ),
            Some(_) => {}
        }
    }

    let mut listed = FxHashSet::default();
    for &child_id in &filter.grouped_filters {
        if child_id == id {
            continue;
        }
        if !listed.insert(child_id) {
            report.push(
                InvariantCode::MissingChildLink,
                Some(id),
                Some(child_id),
                format!("{id} lists child {child_id} twice"),
            );
            continue;
        }
        match index.get(child_id) {
            None => report.push(
                InvariantCode::DanglingGroupRef,
                Some(id),
                Some(child_id),
                format!("{id} lists missing child {child_id}"),
            ),
            Some(child) if child.group_id != Some(id) => report.push(
                InvariantCode::MissingChildLink,
                Some(id),
                Some(child_id),
                format!("{child_id} is listed by {id} but does not point back"),
            ),
            Some(_) => {}
        }
    }
}

/// Links are push-only, so a one-way link is fine; only a missing target is
/// reported.
fn check_dimension_links(report: &mut InvariantReport, index: &FilterIndex<'_>, filter: &Filter) {
    for &target in &filter.linked_dimensions {
        if target == filter.id || index.contains(target) {
            continue;
        }
        report.push(
            InvariantCode::DanglingDimensionLink,
            Some(filter.id),
            Some(target),
            format!("dimension link {} -> {target} names a missing filter", filter.id),
        );
    }
}

fn check_group_contiguity(report: &mut InvariantReport, index: &FilterIndex<'_>) {
    for base in index.filters() {
        let children = index.children(base.id);
        if children.is_empty() {
            continue;
        }
        let Some(base_position) = index.position(base.id) else {
            continue;
        };
        let mut positions: Vec<usize> = children
            .iter()
            .filter_map(|child| index.position(*child))
            .collect();
        positions.push(base_position);
        if !is_contiguous_run_ending_at(&mut positions, base_position) {
            report.push(
                InvariantCode::GroupNotContiguous,
                Some(base.id),
                None,
                format!("group {} is not one run ending at its base", base.id),
            );
        }
    }
}

fn check_masks(report: &mut InvariantReport, index: &FilterIndex<'_>) {
    let mut claims: FxHashMap<FilterId, FilterId> = FxHashMap::default();
    for mask in index.filters() {
        let Some(target) = mask.masked_filter_id else {
            continue;
        };
        if target == mask.id {
            continue;
        }
        let Some(target_filter) = index.get(target) else {
            report.push(
                InvariantCode::DanglingMaskRef,
                Some(mask.id),
                Some(target),
                format!("{} masks missing filter {target}", mask.id),
            );
            continue;
        };
        if target_filter.group_id.is_some() {
            report.push(
                InvariantCode::MaskTargetNotBase,
                Some(mask.id),
                Some(target),
                format!("{} masks {target}, which is a group child", mask.id),
            );
            continue;
        }
        if let Some(previous) = claims.insert(target, mask.id) {
            report.push(
                InvariantCode::DuplicateMask,
                Some(mask.id),
                Some(previous),
                format!("{target} is masked by both {previous} and {}", mask.id),
            );
            continue;
        }

        let members = index.unit_members(target);
        for &member in &members {
            let carries = index
                .get(member)
                .is_some_and(|filter| filter.mask_id == Some(mask.id));
            if !carries {
                report.push(
                    InvariantCode::MaskIdNotPropagated,
                    Some(member),
                    Some(mask.id),
                    format!("{member} is inside the unit masked by {} without mask_id", mask.id),
                );
            }
        }

        let Some(mask_position) = index.position(mask.id) else {
            continue;
        };
        let mut positions: Vec<usize> = members
            .iter()
            .filter_map(|member| index.position(*member))
            .collect();
        positions.push(mask_position);
        if !is_contiguous_run_ending_at(&mut positions, mask_position) {
            report.push(
                InvariantCode::MaskNotContiguous,
                Some(mask.id),
                Some(target),
                format!("{} does not sit directly below unit {target}", mask.id),
            );
        }
    }

    for filter in index.filters() {
        let Some(mask_id) = filter.mask_id else {
            continue;
        };
        if mask_id == filter.id {
            continue;
        }
        let Some(mask) = index.get(mask_id) else {
            report.push(
                InvariantCode::DanglingMaskRef,
                Some(filter.id),
                Some(mask_id),
                format!("{} names missing mask {mask_id}", filter.id),
            );
            continue;
        };
        let anchor = filter.group_id.unwrap_or(filter.id);
        if mask.masked_filter_id != Some(anchor) {
            report.push(
                InvariantCode::StrayMaskId,
                Some(filter.id),
                Some(mask_id),
                format!("{} carries mask {mask_id}, which overlays another unit", filter.id),
            );
        }
    }
}

fn is_contiguous_run_ending_at(positions: &mut [usize], last: usize) -> bool {
    positions.sort_unstable();
    let Some(&max) = positions.last() else {
        return true;
    };
    max == last
        && positions
            .windows(2)
            .all(|pair| pair[1] == pair[0] + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> FilterId {
        FilterId::new(raw).expect("non-zero")
    }

    fn group_of_two() -> Vec<Filter> {
        let mut child = Filter::new(id(1), "blur");
        let mut base = Filter::new(id(2), "shape");
        child.group_id = Some(id(2));
        base.grouped_filters = vec![id(1)];
        vec![child, base]
    }

    #[test]
    fn consistent_group_is_clean() {
        assert!(invariant_report(&group_of_two()).is_clean());
    }

    #[test]
    fn missing_back_reference_is_reported() {
        let mut filters = group_of_two();
        filters[1].grouped_filters.clear();
        let report = invariant_report(&filters);
        assert_eq!(report.codes(), vec![InvariantCode::MissingBackReference]);
    }

    #[test]
    fn split_group_is_not_contiguous() {
        let mut filters = group_of_two();
        filters.insert(1, Filter::new(id(3), "noise"));
        let report = invariant_report(&filters);
        assert!(report.has(InvariantCode::GroupNotContiguous));
    }

    #[test]
    fn base_must_close_its_run() {
        let mut filters = group_of_two();
        filters.swap(0, 1);
        assert!(invariant_report(&filters).has(InvariantCode::GroupNotContiguous));
    }

    #[test]
    fn mask_must_sit_below_unit_with_propagated_ids() {
        let mut filters = group_of_two();
        let mut mask = Filter::new(id(3), "gradient");
        mask.masked_filter_id = Some(id(2));
        filters.insert(0, mask);
        let report = invariant_report(&filters);
        assert!(report.has(InvariantCode::MaskNotContiguous));
        assert!(report.has(InvariantCode::MaskIdNotPropagated));

        let mask = filters.remove(0);
        filters.push(mask);
        filters[0].mask_id = Some(id(3));
        filters[1].mask_id = Some(id(3));
        assert!(invariant_report(&filters).is_clean());
    }

    #[test]
    fn one_way_dimension_links_are_clean() {
        let mut a = Filter::new(id(1), "shape");
        a.linked_dimensions.insert(id(2));
        a.linked_dimensions.insert(id(3));
        let filters = vec![a, Filter::new(id(2), "shape"), Filter::new(id(3), "shape")];
        assert!(invariant_report(&filters).is_clean());
    }

    #[test]
    fn dimension_link_to_missing_filter_is_reported() {
        let mut a = Filter::new(id(1), "shape");
        a.linked_dimensions.insert(id(9));
        let report = invariant_report(&[a, Filter::new(id(2), "shape")]);
        assert_eq!(report.codes(), vec![InvariantCode::DanglingDimensionLink]);
    }

    #[test]
    fn duplicate_ids_are_reported() {
        let filters = vec![Filter::new(id(1), "a"), Filter::new(id(1), "b")];
        assert!(invariant_report(&filters).has(InvariantCode::DuplicateId));
    }
}
