#![no_main]

use arbitrary::Arbitrary;
use fxchain_model::{
    BlendMode, Filter, FilterId, PipelineEdit, StaticRegistry, TypeFlags, apply_edit,
    invariant_report, resolve_display_order,
};
use libfuzzer_sys::fuzz_target;

const TYPES: [&str; 3] = ["shape", "image", "blur"];

#[derive(Debug, Arbitrary)]
enum Op {
    Group(u8, u8),
    AddToGroup(u8, u8, u8),
    Ungroup(u8),
    UngroupAndMove(u8, u8),
    Disband(u8),
    Mask(u8, u8),
    Unmask(u8),
    Duplicate(u8),
    Remove(u8),
    Link(u8, u8),
    Unlink(u8, u8),
    Move(u8, u8),
    MoveBlock(u8, u8, u8),
    Width(u8, u16),
    Enabled(u8, bool),
    Blend(u8, u8),
}

#[derive(Debug, Arbitrary)]
struct Input {
    types: Vec<u8>,
    ops: Vec<Op>,
}

fn pick(filters: &[Filter], raw: u8) -> FilterId {
    filters
        .get(usize::from(raw) % filters.len().max(1))
        .map_or(FilterId::MIN, |filter| filter.id)
}

fuzz_target!(|input: Input| {
    let registry = StaticRegistry::new()
        .with_type("shape", TypeFlags::GROUP_CAPABLE | TypeFlags::MASK_TARGET)
        .with_type("image", TypeFlags::MASK_TARGET)
        .with_type("blur", TypeFlags::empty());

    let mut filters: Vec<Filter> = input
        .types
        .iter()
        .take(12)
        .enumerate()
        .filter_map(|(slot, raw)| {
            let id = FilterId::new(slot as u64 + 1).ok()?;
            Some(Filter::new(id, TYPES[usize::from(*raw) % TYPES.len()]))
        })
        .collect();
    if filters.is_empty() {
        return;
    }
    let mut next_id = filters.len() as u64 + 1;

    for op in input.ops.iter().take(64) {
        if filters.is_empty() {
            break;
        }
        let edit = match *op {
            Op::Group(a, b) => PipelineEdit::Group {
                dragged: pick(&filters, a),
                base: pick(&filters, b),
            },
            Op::AddToGroup(a, b, slot) => PipelineEdit::AddToGroup {
                dragged: pick(&filters, a),
                base: pick(&filters, b),
                child_index: usize::from(slot % 8),
            },
            Op::Ungroup(a) => PipelineEdit::Ungroup {
                filter: pick(&filters, a),
            },
            Op::UngroupAndMove(a, to) => PipelineEdit::UngroupAndMove {
                filter: pick(&filters, a),
                to: usize::from(to) % (filters.len() + 1),
            },
            Op::Disband(a) => PipelineEdit::DisbandGroup {
                base: pick(&filters, a),
            },
            Op::Mask(a, b) => PipelineEdit::Mask {
                masked: pick(&filters, a),
                masking: pick(&filters, b),
            },
            Op::Unmask(a) => PipelineEdit::Unmask {
                masking: pick(&filters, a),
            },
            Op::Duplicate(a) => {
                let Ok(new_id) = FilterId::new(next_id) else {
                    continue;
                };
                next_id += 1;
                PipelineEdit::Duplicate {
                    source: pick(&filters, a),
                    new_id,
                }
            }
            Op::Remove(a) => PipelineEdit::Remove {
                filter: pick(&filters, a),
            },
            Op::Link(a, b) => PipelineEdit::LinkDimensions {
                source: pick(&filters, a),
                target: pick(&filters, b),
            },
            Op::Unlink(a, b) => PipelineEdit::UnlinkDimensions {
                source: pick(&filters, a),
                target: pick(&filters, b),
            },
            Op::Move(a, to) => PipelineEdit::MoveFilter {
                filter: pick(&filters, a),
                to: usize::from(to) % (filters.len() + 1),
            },
            Op::MoveBlock(a, b, to) => PipelineEdit::MoveBlock {
                filters: vec![pick(&filters, a), pick(&filters, b)],
                to: usize::from(to) % (filters.len() + 1),
            },
            Op::Width(a, value) => PipelineEdit::SetParam {
                filter: pick(&filters, a),
                name: "width".into(),
                value: f64::from(value),
            },
            Op::Enabled(a, enabled) => PipelineEdit::SetEnabled {
                filter: pick(&filters, a),
                enabled,
            },
            Op::Blend(a, mode) => PipelineEdit::SetBlendMode {
                filter: pick(&filters, a),
                blend_mode: BlendMode::all()[usize::from(mode) % BlendMode::all().len()],
            },
        };

        let Ok(next) = apply_edit(&filters, &edit, &registry) else {
            continue;
        };
        let report = invariant_report(&next);
        assert!(report.is_clean(), "{edit:?} broke invariants: {report:?}");

        let mut seen = resolve_display_order(&next).filter_ids();
        seen.sort_unstable();
        let mut expected: Vec<FilterId> = next.iter().map(|filter| filter.id).collect();
        expected.sort_unstable();
        assert_eq!(seen, expected, "display order must visit every filter once");
        filters = next;
    }
});
