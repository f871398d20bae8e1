#![no_main]

use arbitrary::Arbitrary;
use ftui_dock::{
    Axis, CloseDirection, Disposition, DockConfig, DockEngine, DockError, DockFault, DockSnapshot,
    InsertPosition, MoveMode, PageId, PanelId, PanelRect, WorkspaceId,
};
use libfuzzer_sys::fuzz_target;

/// Operations address panels and pages by index into the current id lists.
#[derive(Debug, Arbitrary)]
enum Op {
    Create { leaf: u8 },
    Divide { panel: u8, vertical: bool, before: bool, moved: Option<u8> },
    Close { leaf: u8, page: u8 },
    CloseOthers { leaf: u8, page: u8, side: u8 },
    Move { from: u8, to: u8, page: u8, target: Option<u8>, forced: bool },
    Destroy { division: u8, child: u8, move_to: Option<u8> },
    ToggleLock { page: u8 },
    Resize { division: u8, delta: i8 },
    Measure { width: u16, height: u16 },
}

fn pick<T: Clone>(items: &[T], index: u8) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    items.get(usize::from(index) % items.len()).cloned()
}

fn leaves(snapshot: &DockSnapshot) -> Vec<PanelId> {
    snapshot.leaf_ids().cloned().collect()
}

fn divisions(snapshot: &DockSnapshot) -> Vec<PanelId> {
    snapshot
        .panels
        .values()
        .filter(|node| !node.is_leaf())
        .map(|node| node.id.clone())
        .collect()
}

fn pages_of(snapshot: &DockSnapshot, leaf: &PanelId) -> Vec<PageId> {
    snapshot.pages_of(leaf).unwrap_or(&[]).to_vec()
}

fn measure(snapshot: &mut DockSnapshot, width: f64, height: f64) {
    let mut out = Vec::new();
    let mut stack = vec![(snapshot.root.clone(), PanelRect::new(0.0, 0.0, width, height))];
    while let Some((panel, rect)) = stack.pop() {
        let Some(division) = snapshot.division(&panel) else {
            out.push((panel, rect));
            continue;
        };
        let mut offset = 0.0;
        for (child, share) in division.children.iter().zip(&division.proportions) {
            let child_rect = match division.axis {
                Axis::Horizontal => {
                    PanelRect::new(rect.x + offset, rect.y, rect.width * share / 100.0, rect.height)
                }
                Axis::Vertical => {
                    PanelRect::new(rect.x, rect.y + offset, rect.width, rect.height * share / 100.0)
                }
            };
            offset += child_rect.extent(division.axis);
            stack.push((child.clone(), child_rect));
        }
    }
    snapshot.measured = out.into_iter().collect();
}

fn apply(engine: &mut DockEngine, snapshot: &DockSnapshot, op: Op) -> Option<Result<DockSnapshot, DockError>> {
    let leaves = leaves(snapshot);
    let divisions = divisions(snapshot);
    let result = match op {
        Op::Create { leaf } => {
            let leaf = pick(&leaves, leaf)?;
            engine.create_page(snapshot, &leaf, None, None).map(|(next, _)| next)
        }
        Op::Divide { panel, vertical, before, moved } => {
            let panels: Vec<PanelId> = snapshot.panels.keys().cloned().collect();
            let panel = pick(&panels, panel)?;
            let pages: Vec<PageId> = snapshot.pages.keys().cloned().collect();
            let moved = moved.and_then(|index| pick(&pages, index));
            let axis = if vertical { Axis::Vertical } else { Axis::Horizontal };
            let position = if before { InsertPosition::Before } else { InsertPosition::After };
            engine
                .divide_panel(snapshot, &panel, axis, position, moved.as_ref(), None)
                .map(|(next, _)| next)
        }
        Op::Close { leaf, page } => {
            let leaf = pick(&leaves, leaf)?;
            let page = pick(&pages_of(snapshot, &leaf), page)?;
            engine.close_page(snapshot, &leaf, &page)
        }
        Op::CloseOthers { leaf, page, side } => {
            let leaf = pick(&leaves, leaf)?;
            let keep = pick(&pages_of(snapshot, &leaf), page)?;
            let direction = match side % 3 {
                0 => CloseDirection::Left,
                1 => CloseDirection::Right,
                _ => CloseDirection::Both,
            };
            engine.close_other_pages(snapshot, &leaf, &keep, direction)
        }
        Op::Move { from, to, page, target, forced } => {
            let from = pick(&leaves, from)?;
            let to = pick(&leaves, to)?;
            let page = pick(&pages_of(snapshot, &from), page)?;
            let target = target.and_then(|index| pick(&pages_of(snapshot, &to), index));
            let mode = if forced { MoveMode::Forced } else { MoveMode::Strict };
            engine.move_page(snapshot, &from, &to, &page, target.as_ref(), mode)
        }
        Op::Destroy { division, child, move_to } => {
            let parent = pick(&divisions, division)?;
            let children = snapshot.division(&parent)?.children.clone();
            let child = pick(&children, child)?;
            let disposition = match move_to.and_then(|index| pick(&leaves, index)) {
                Some(target) => Disposition::Move(target),
                None => Disposition::Delete,
            };
            engine.destroy_sub_panel(snapshot, &parent, &child, disposition)
        }
        Op::ToggleLock { page } => {
            let pages: Vec<PageId> = snapshot.pages.keys().cloned().collect();
            let page = pick(&pages, page)?;
            engine.toggle_lock(snapshot, &page)
        }
        Op::Resize { division, delta } => {
            let panel = pick(&divisions, division)?;
            let start = snapshot.division(&panel)?.proportions.clone();
            let range = match engine.resize_bounds(snapshot, &panel, 0) {
                Ok(range) => range,
                Err(err) => return Some(Err(err)),
            };
            engine.resize_division(snapshot, &panel, 0, &start, f64::from(delta), range)
        }
        Op::Measure { width, height } => {
            let mut next = snapshot.clone();
            measure(&mut next, f64::from(width.max(1)), f64::from(height.max(1)));
            Ok(next)
        }
    };
    Some(result)
}

fuzz_target!(|ops: Vec<Op>| {
    let Ok(engine) = DockEngine::new(DockConfig::default().with_seed(0)) else {
        return;
    };
    let mut engine = engine.with_clock(|| 0);
    let Ok(mut snapshot) = engine.initial_snapshot(WorkspaceId::from("fuzz")) else {
        return;
    };
    for op in ops.into_iter().take(256) {
        let before = snapshot.state_hash();
        match apply(&mut engine, &snapshot, op) {
            Some(Ok(next)) => {
                assert!(next.validate().is_ok(), "applied op left an invalid snapshot");
                snapshot = next;
            }
            Some(Err(DockError::Fault(DockFault::Validation(err)))) => {
                panic!("operation produced an invalid snapshot: {err}");
            }
            Some(Err(_)) | None => assert_eq!(snapshot.state_hash(), before),
        }
    }
});
