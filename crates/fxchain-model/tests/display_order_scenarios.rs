//! End-to-end scenarios through the public model API.

use std::sync::Arc;

use fxchain_model::{
    DisplayEntry, Filter, FilterId, FilterSequence, PipelineEdit, StaticRegistry,
    StructuralViolation, TypeFlags, resolve_display_order,
};
use pretty_assertions::assert_eq;

fn fid(raw: u64) -> FilterId {
    FilterId::new(raw).expect("non-zero")
}

fn registry() -> StaticRegistry {
    StaticRegistry::new()
        .with_type("shape", TypeFlags::GROUP_CAPABLE | TypeFlags::MASK_TARGET)
        .with_type("gradient", TypeFlags::empty())
        .with_type("blur", TypeFlags::empty())
}

#[test]
fn single_child_group_resolves_to_bracketed_block() {
    let (g, x) = (fid(1), fid(2));
    let mut base = Filter::new(g, "shape");
    base.grouped_filters = vec![x];
    let mut child = Filter::new(x, "blur");
    child.group_id = Some(g);

    let order = resolve_display_order(&[base, child]);
    assert_eq!(
        order.entries(),
        &[
            DisplayEntry::GroupStart { base: g },
            DisplayEntry::Filter { id: x },
            DisplayEntry::Filter { id: g },
            DisplayEntry::GroupEnd { base: g },
        ]
    );
}

#[test]
fn masked_group_resolves_mask_outside_group() {
    let (g, x, m) = (fid(1), fid(2), fid(3));
    let mut mask = Filter::new(m, "gradient");
    mask.masked_filter_id = Some(g);
    let mut base = Filter::new(g, "shape");
    base.grouped_filters = vec![x];
    base.mask_id = Some(m);
    let mut child = Filter::new(x, "blur");
    child.group_id = Some(g);
    child.mask_id = Some(m);

    let order = resolve_display_order(&[mask, base, child]);
    assert_eq!(
        order.entries(),
        &[
            DisplayEntry::MaskStart { mask: m, target: g },
            DisplayEntry::GroupStart { base: g },
            DisplayEntry::Filter { id: x },
            DisplayEntry::Filter { id: g },
            DisplayEntry::GroupEnd { base: g },
            DisplayEntry::Filter { id: m },
            DisplayEntry::MaskEnd { mask: m, target: g },
        ]
    );
}

#[test]
fn grouping_into_a_child_is_rejected_without_change() {
    let mut store = FilterSequence::new(Arc::new(registry()));
    let a = store.add("blur").expect("id");
    let b = store.add("shape").expect("id");
    let base = store.add("shape").expect("id");
    assert_eq!(
        store.edit(&PipelineEdit::Group { dragged: b, base }),
        Ok(true)
    );
    let before = store.filters().to_vec();

    let result = store.edit(&PipelineEdit::Group { dragged: a, base: b });
    assert_eq!(
        result,
        Err(StructuralViolation::NestedGroup {
            filter: a,
            target: b
        })
    );
    assert_eq!(store.filters(), before.as_slice());
    assert!(store.invariant_report().is_clean());
}

#[test]
fn store_builds_a_masked_group_from_edits() {
    let mut store = FilterSequence::new(Arc::new(registry()));
    let child = store.add("blur").expect("id");
    let base = store.add("shape").expect("id");
    let mask = store.add("gradient").expect("id");
    store
        .edit(&PipelineEdit::Group {
            dragged: child,
            base,
        })
        .expect("legal group");
    store
        .edit(&PipelineEdit::Mask {
            masked: child,
            masking: mask,
        })
        .expect("legal mask");

    let order = store.display_order();
    assert_eq!(order.filter_ids(), vec![child, base, mask]);
    assert_eq!(order.depth_of(2), Some(2));
    assert!(store.invariant_report().is_clean());

    store
        .edit(&PipelineEdit::DisbandGroup { base })
        .expect("disband never fails");
    assert_eq!(
        store.display_order().entries()[0],
        DisplayEntry::Filter { id: child }
    );
    assert!(store.invariant_report().is_clean());
}
