//! Property/fuzz-style invariants for dock operations.
//!
//! Random operation streams run against the engine. Every applied step must
//! yield a valid snapshot, and every rejected or failed step must leave the
//! caller's snapshot untouched.

use ftui_dock::{
    Axis, CloseDirection, Disposition, DockConfig, DockEngine, DockError, DockSnapshot,
    InsertPosition, MoveMode, PageId, PanelId, PanelRect, WorkspaceId, ordering,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn choose_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        (self.next_u64() % len as u64) as usize
    }

    fn choose_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 0
    }

    fn choose<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.choose_index(items.len())]
    }
}

#[derive(Debug, Clone)]
enum Step {
    Create {
        panel: PanelId,
    },
    Divide {
        panel: PanelId,
        axis: Axis,
        position: InsertPosition,
        moved: Option<PageId>,
    },
    Close {
        panel: PanelId,
        page: PageId,
    },
    CloseOthers {
        panel: PanelId,
        keep: PageId,
        direction: CloseDirection,
    },
    Move {
        from: PanelId,
        to: PanelId,
        page: PageId,
        target: Option<PageId>,
        mode: MoveMode,
    },
    Destroy {
        parent: PanelId,
        child: PanelId,
        move_to: Option<PanelId>,
    },
    ToggleLock {
        page: PageId,
    },
    Resize {
        division: PanelId,
        delta: f64,
    },
    Measure,
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

fn pages_in(snapshot: &DockSnapshot, leaf: &PanelId) -> Vec<PageId> {
    snapshot.pages_of(leaf).unwrap_or(&[]).to_vec()
}

fn random_axis(rng: &mut Lcg) -> Axis {
    if rng.choose_bool() {
        Axis::Horizontal
    } else {
        Axis::Vertical
    }
}

fn random_position(rng: &mut Lcg) -> InsertPosition {
    if rng.choose_bool() {
        InsertPosition::Before
    } else {
        InsertPosition::After
    }
}

fn random_step(snapshot: &DockSnapshot, rng: &mut Lcg) -> Step {
    let leaves = leaves(snapshot);
    let divisions = divisions(snapshot);
    let leaf = rng.choose(&leaves).clone();
    let pages = pages_in(snapshot, &leaf);
    let page = rng.choose(&pages).clone();

    let mut candidates = vec![0usize, 1, 2, 3, 5, 6, 8];
    if leaves.len() > 1 {
        candidates.push(4);
    }
    if !divisions.is_empty() {
        candidates.push(7);
        candidates.push(9);
    }

    match *rng.choose(&candidates) {
        0 => Step::Create { panel: leaf },
        1 => {
            let source = rng.choose(&leaves).clone();
            let moved = rng
                .choose_bool()
                .then(|| rng.choose(&pages_in(snapshot, &source)).clone());
            Step::Divide {
                panel: rng.choose(&snapshot.panels.keys().cloned().collect::<Vec<_>>()).clone(),
                axis: random_axis(rng),
                position: random_position(rng),
                moved,
            }
        }
        2 => Step::Close { panel: leaf, page },
        3 => Step::CloseOthers {
            panel: leaf,
            keep: page,
            direction: *rng.choose(&[
                CloseDirection::Left,
                CloseDirection::Right,
                CloseDirection::Both,
            ]),
        },
        4 | 5 => {
            let to = if rng.choose_bool() {
                rng.choose(&leaves).clone()
            } else {
                leaf.clone()
            };
            let targets = pages_in(snapshot, &to);
            let target = rng.choose_bool().then(|| rng.choose(&targets).clone());
            let mode = if rng.choose_bool() {
                MoveMode::Strict
            } else {
                MoveMode::Forced
            };
            Step::Move {
                from: leaf,
                to,
                page,
                target,
                mode,
            }
        }
        6 => Step::ToggleLock { page },
        7 => {
            let parent = rng.choose(&divisions).clone();
            let kids = snapshot
                .division(&parent)
                .map(|division| division.children.clone())
                .unwrap_or_default();
            let child = rng.choose(&kids).clone();
            let move_to = rng.choose_bool().then(|| rng.choose(&leaves).clone());
            Step::Destroy {
                parent,
                child,
                move_to,
            }
        }
        9 => Step::Resize {
            division: rng.choose(&divisions).clone(),
            delta: (rng.next_u64() % 41) as f64 - 20.0,
        },
        _ => Step::Measure,
    }
}

/// Lay every leaf out inside a 1600x1000 workspace, ignoring minimum sizes.
fn measure(snapshot: &mut DockSnapshot) {
    fn place(snapshot: &DockSnapshot, panel: &PanelId, rect: PanelRect, out: &mut Vec<(PanelId, PanelRect)>) {
        let Some(division) = snapshot.division(panel) else {
            out.push((panel.clone(), rect));
            return;
        };
        let mut offset = 0.0;
        for (child, share) in division.children.iter().zip(&division.proportions) {
            let child_rect = match division.axis {
                Axis::Horizontal => PanelRect::new(rect.x + offset, rect.y, rect.width * share / 100.0, rect.height),
                Axis::Vertical => PanelRect::new(rect.x, rect.y + offset, rect.width, rect.height * share / 100.0),
            };
            offset += child_rect.extent(division.axis);
            place(snapshot, child, child_rect, out);
        }
    }
    let root = snapshot.root.clone();
    let mut out = Vec::new();
    place(snapshot, &root, PanelRect::new(0.0, 0.0, 1600.0, 1000.0), &mut out);
    snapshot.measured = out.into_iter().collect();
}

fn apply(engine: &mut DockEngine, snapshot: &DockSnapshot, step: &Step) -> Result<DockSnapshot, DockError> {
    match step.clone() {
        Step::Create { panel } => engine.create_page(snapshot, &panel, None, None).map(|(s, _)| s),
        Step::Divide {
            panel,
            axis,
            position,
            moved,
        } => engine
            .divide_panel(snapshot, &panel, axis, position, moved.as_ref(), None)
            .map(|(s, _)| s),
        Step::Close { panel, page } => engine.close_page(snapshot, &panel, &page),
        Step::CloseOthers {
            panel,
            keep,
            direction,
        } => engine.close_other_pages(snapshot, &panel, &keep, direction),
        Step::Move {
            from,
            to,
            page,
            target,
            mode,
        } => engine.move_page(snapshot, &from, &to, &page, target.as_ref(), mode),
        Step::Destroy {
            parent,
            child,
            move_to,
        } => {
            let disposition = move_to.map_or(Disposition::Delete, Disposition::Move);
            engine.destroy_sub_panel(snapshot, &parent, &child, disposition)
        }
        Step::ToggleLock { page } => engine.toggle_lock(snapshot, &page),
        Step::Resize { division, delta } => {
            let start = snapshot
                .division(&division)
                .map(|d| d.proportions.clone())
                .unwrap_or_default();
            let range = engine.resize_bounds(snapshot, &division, 0)?;
            engine.resize_division(snapshot, &division, 0, &start, delta, range)
        }
        Step::Measure => {
            let mut next = snapshot.clone();
            measure(&mut next);
            Ok(next)
        }
    }
}

fn assert_snapshot_invariants(snapshot: &DockSnapshot) {
    snapshot
        .validate()
        .expect("snapshot should remain structurally valid");
    let report = snapshot.invariant_report();
    assert!(
        !report.has_errors(),
        "invariant report contains errors: {:?}",
        report.issues
    );
    for leaf in snapshot.leaf_ids() {
        let pages = snapshot.pages_of(leaf).expect("leaf pages");
        assert!(!pages.is_empty());
        assert!(ordering::is_valid(pages, &snapshot.pages));
    }
    for node in snapshot.panels.values() {
        if let Some(division) = node.as_division() {
            assert!(division.children.len() >= 2);
            assert_eq!(division.children.len(), division.proportions.len());
            let sum: f64 = division.proportions.iter().sum();
            assert!((sum - 100.0).abs() < 1e-6, "proportions sum to {sum}");
        }
    }
}

fn run_sequence(seed: u64, steps: usize) -> (DockSnapshot, usize) {
    let mut engine = DockEngine::new(DockConfig::default().with_seed(seed))
        .expect("valid config")
        .with_clock(|| 0);
    let mut snapshot = engine
        .initial_snapshot(WorkspaceId::from("fuzz"))
        .expect("initial snapshot");
    let mut rng = Lcg::new(seed);
    let mut applied = 0;

    for step_index in 0..steps {
        let step = random_step(&snapshot, &mut rng);
        let before = snapshot.state_hash();
        match apply(&mut engine, &snapshot, &step) {
            Ok(next) => {
                assert_snapshot_invariants(&next);
                snapshot = next;
                applied += 1;
            }
            Err(err) => {
                assert_eq!(
                    snapshot.state_hash(),
                    before,
                    "failed step {step_index} ({step:?}) must not touch the input: {err}"
                );
                if let DockError::Fault(fault) = &err {
                    assert!(
                        !matches!(fault, ftui_dock::DockFault::Validation(_)),
                        "step {step_index} ({step:?}) produced an invalid snapshot: {fault}, seed={seed}"
                    );
                }
            }
        }
    }

    (snapshot, applied)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn dock_random_operation_sequences_preserve_invariants(
        seed in any::<u64>(),
        steps in 20usize..150,
    ) {
        let (snapshot, _) = run_sequence(seed, steps);
        assert_snapshot_invariants(&snapshot);
    }

    #[test]
    fn dock_random_operation_sequences_replay_deterministically(
        seed in any::<u64>(),
        steps in 10usize..80,
    ) {
        let (first, first_applied) = run_sequence(seed, steps);
        let (second, second_applied) = run_sequence(seed, steps);
        prop_assert_eq!(first_applied, second_applied);
        prop_assert_eq!(first.state_hash(), second.state_hash());
    }
}

#[test]
fn long_fixed_seed_stream_keeps_making_progress() {
    let (snapshot, applied) = run_sequence(0xD0C4, 600);
    assert_snapshot_invariants(&snapshot);
    assert!(applied > 100, "only {applied} of 600 steps applied");
}
