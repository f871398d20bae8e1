//! Split feasibility from pushed geometry.
//!
//! A split fits when, along the split axis, the worst-case number of leaves on
//! the lineage of the split panel (plus the new one) still leaves room for the
//! minimum panel size and the handles between them.

use crate::model::{Axis, DockSnapshot, PanelId, PanelKind};

/// `panel` followed by its ancestors up to the root.
#[must_use]
pub fn lineage(snapshot: &DockSnapshot, panel: &PanelId) -> Vec<PanelId> {
    let mut out = vec![panel.clone()];
    let mut current = panel;
    while let Some(parent) = snapshot.parent_of(current) {
        if out.len() > snapshot.panels.len() {
            break;
        }
        out.push(parent.clone());
        current = parent;
    }
    out
}

/// Worst-case number of leaves side by side along `axis` under `panel`.
#[must_use]
pub fn max_sub_panel_count(snapshot: &DockSnapshot, panel: &PanelId, axis: Axis) -> usize {
    match snapshot.panel(panel).map(|node| &node.kind) {
        Some(PanelKind::Division(division)) => {
            let counts = division
                .children
                .iter()
                .map(|child| max_sub_panel_count(snapshot, child, axis));
            if division.axis == axis {
                counts.sum()
            } else {
                counts.max().unwrap_or(1)
            }
        }
        _ => 1,
    }
}

/// Like [`max_sub_panel_count`], but perpendicular divisions only count the
/// child on `lineage` when there is one.
#[must_use]
pub fn lineage_max_sub_panel_count(
    snapshot: &DockSnapshot,
    panel: &PanelId,
    lineage: &[PanelId],
    axis: Axis,
) -> usize {
    let Some(division) = snapshot.division(panel) else {
        return 1;
    };
    let mut total = 0;
    let mut widest = 1;
    let mut on_lineage = None;
    for child in &division.children {
        let count = lineage_max_sub_panel_count(snapshot, child, lineage, axis);
        total += count;
        widest = widest.max(count);
        if lineage.contains(child) {
            on_lineage = Some(count);
        }
    }
    if division.axis == axis {
        total
    } else {
        on_lineage.unwrap_or(widest)
    }
}

/// Extent needed to lay out `count` leaves with handles between them.
#[must_use]
pub fn required_extent(count: usize, min_dim: f64, handle_size: f64) -> f64 {
    count as f64 * min_dim + count.saturating_sub(1) as f64 * handle_size
}

/// Whether one more leaf fits next to `panel` along `axis`.
///
/// `root_extent` is the root's rendered size along `axis`; `None` means no
/// geometry has been pushed yet and the split is allowed.
#[must_use]
pub fn can_split(
    snapshot: &DockSnapshot,
    panel: &PanelId,
    axis: Axis,
    min_dim: f64,
    handle_size: f64,
    root_extent: Option<f64>,
) -> bool {
    let Some(root_extent) = root_extent else {
        tracing::debug!(
            target: "ftui.dock",
            panel = %panel,
            %axis,
            "no geometry measured yet, allowing split"
        );
        return true;
    };
    let lineage = lineage(snapshot, panel);
    let count = lineage_max_sub_panel_count(snapshot, &snapshot.root, &lineage, axis) + 1;
    let required = required_extent(count, min_dim, handle_size);
    let fits = required < root_extent;
    tracing::debug!(
        target: "ftui.dock",
        panel = %panel,
        %axis,
        count,
        required,
        root_extent,
        fits,
        "split feasibility"
    );
    fits
}

/// Root extent along `axis`, from the last pushed workspace bounds.
#[must_use]
pub fn root_extent(snapshot: &DockSnapshot, axis: Axis) -> Option<f64> {
    snapshot.workspace_bounds().map(|rect| rect.extent(axis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Division, Page, PageId, PanelNode, WorkspaceId};

    fn id(raw: &str) -> PanelId {
        PanelId::from(raw)
    }

    /// `ROOT` horizontal [A, V]; `V` vertical [B, H]; `H` horizontal [C, D].
    fn nested() -> DockSnapshot {
        let mut snapshot = DockSnapshot::with_root_leaf(
            WorkspaceId::from("ws"),
            id("ROOT"),
            Page::placeholder(PageId::from("pa"), id("A"), 0),
        );
        snapshot.page_lists.clear();
        snapshot.focus.clear();
        snapshot.pages.clear();
        let divisions = [
            ("ROOT", None, Axis::Horizontal, ["A", "V"]),
            ("V", Some("ROOT"), Axis::Vertical, ["B", "H"]),
            ("H", Some("V"), Axis::Horizontal, ["C", "D"]),
        ];
        for (name, parent, axis, children) in divisions {
            snapshot.panels.insert(
                id(name),
                PanelNode::division(
                    id(name),
                    parent.map(id),
                    Division {
                        axis,
                        children: children.iter().map(|raw| id(raw)).collect(),
                        proportions: vec![50.0, 50.0],
                    },
                ),
            );
        }
        for (leaf, parent) in [("A", "ROOT"), ("B", "V"), ("C", "H"), ("D", "H")] {
            let page = PageId::new(format!("p{leaf}"));
            snapshot
                .panels
                .insert(id(leaf), PanelNode::leaf(id(leaf), Some(id(parent))));
            snapshot
                .pages
                .insert(page.clone(), Page::placeholder(page.clone(), id(leaf), 0));
            snapshot.page_lists.insert(id(leaf), vec![page.clone()]);
            snapshot.focus.insert(id(leaf), page);
        }
        snapshot
    }

    #[test]
    fn nested_fixture_is_valid() {
        assert_eq!(nested().validate(), Ok(()));
    }

    #[test]
    fn lineage_walks_to_root() {
        let snapshot = nested();
        assert_eq!(lineage(&snapshot, &id("C")), vec![id("C"), id("H"), id("V"), id("ROOT")]);
        assert_eq!(lineage(&snapshot, &id("ROOT")), vec![id("ROOT")]);
    }

    #[test]
    fn unrestricted_count_takes_worst_case() {
        let snapshot = nested();
        assert_eq!(max_sub_panel_count(&snapshot, &id("ROOT"), Axis::Horizontal), 3);
        assert_eq!(max_sub_panel_count(&snapshot, &id("ROOT"), Axis::Vertical), 2);
        assert_eq!(max_sub_panel_count(&snapshot, &id("V"), Axis::Horizontal), 2);
        assert_eq!(max_sub_panel_count(&snapshot, &id("A"), Axis::Vertical), 1);
    }

    #[test]
    fn lineage_count_ignores_off_lineage_siblings() {
        let snapshot = nested();
        let through_b = lineage(&snapshot, &id("B"));
        assert_eq!(
            lineage_max_sub_panel_count(&snapshot, &id("ROOT"), &through_b, Axis::Horizontal),
            2
        );
        let through_c = lineage(&snapshot, &id("C"));
        assert_eq!(
            lineage_max_sub_panel_count(&snapshot, &id("ROOT"), &through_c, Axis::Horizontal),
            3
        );
    }

    #[test]
    fn split_requires_strictly_less_than_root() {
        let snapshot = nested();
        // Through B: 3 leaves after the split -> 3 * 100 + 2 * 5 = 310.
        assert!(can_split(&snapshot, &id("B"), Axis::Horizontal, 100.0, 5.0, Some(311.0)));
        assert!(!can_split(&snapshot, &id("B"), Axis::Horizontal, 100.0, 5.0, Some(310.0)));
        // Through C: 4 leaves -> 415.
        assert!(!can_split(&snapshot, &id("C"), Axis::Horizontal, 100.0, 5.0, Some(400.0)));
    }

    #[test]
    fn unmeasured_root_allows_split() {
        let snapshot = nested();
        assert!(can_split(&snapshot, &id("C"), Axis::Horizontal, 1e9, 0.0, None));
        assert_eq!(root_extent(&snapshot, Axis::Horizontal), None);
    }

    #[test]
    fn required_extent_counts_handles() {
        assert_eq!(required_extent(1, 256.0, 3.2), 256.0);
        assert!((required_extent(2, 256.0, 3.2) - 515.2).abs() < 1e-9);
    }
}
