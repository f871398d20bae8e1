//! Page ordering policy: locked pages form a contiguous prefix of every leaf.

use std::collections::BTreeMap;

use crate::model::{DockSnapshot, Page, PageId, PanelId};

fn is_locked(table: &BTreeMap<PageId, Page>, id: &PageId) -> bool {
    table.get(id).is_some_and(|page| page.locked)
}

/// Stable partition with locked pages first.
#[must_use]
pub fn reorder(pages: &[PageId], table: &BTreeMap<PageId, Page>) -> Vec<PageId> {
    let (mut locked, unlocked): (Vec<_>, Vec<_>) = pages
        .iter()
        .cloned()
        .partition(|id| is_locked(table, id));
    locked.extend(unlocked);
    locked
}

/// True iff `pages` already satisfies the locked-prefix rule.
#[must_use]
pub fn is_valid(pages: &[PageId], table: &BTreeMap<PageId, Page>) -> bool {
    let first_unlocked = pages
        .iter()
        .position(|id| !is_locked(table, id))
        .unwrap_or(pages.len());
    pages[first_unlocked..]
        .iter()
        .all(|id| !is_locked(table, id))
}

/// Remove `moved`, then insert it right before `target` (looked up after the
/// removal) or append when there is no target.
#[must_use]
pub fn after_move(pages: &[PageId], moved: &PageId, target: Option<&PageId>) -> Vec<PageId> {
    if target == Some(moved) {
        return pages.to_vec();
    }
    let mut out: Vec<PageId> = pages.iter().filter(|id| *id != moved).cloned().collect();
    match target.and_then(|target| out.iter().position(|id| id == target)) {
        Some(index) => out.insert(index, moved.clone()),
        None => out.push(moved.clone()),
    }
    out
}

/// Whether a tab drop target should accept `dragged_page` (currently hosted
/// by `dragged_panel`) dropped onto `target_page`.
#[must_use]
pub fn can_drop(
    snapshot: &DockSnapshot,
    dragged_panel: &PanelId,
    dragged_page: &PageId,
    target_page: &PageId,
) -> bool {
    if dragged_page == target_page {
        return false;
    }
    let (Some(dragged), Some(target)) = (snapshot.page(dragged_page), snapshot.page(target_page))
    else {
        return false;
    };
    if dragged.locked {
        if *dragged_panel != target.panel {
            return false;
        }
        let Some(pages) = snapshot.pages_of(&target.panel) else {
            return false;
        };
        let moved = after_move(pages, dragged_page, Some(target_page));
        return is_valid(&moved, &snapshot.pages);
    }
    !target.locked
}

/// Page with the latest last-focused timestamp; the earliest listed page wins
/// ties.
#[must_use]
pub fn most_recently_focused<'a>(
    pages: &'a [PageId],
    table: &BTreeMap<PageId, Page>,
) -> Option<&'a PageId> {
    let stamp = |id: &PageId| table.get(id).map_or(0, |page| page.last_focused_ms);
    let mut best = pages.first()?;
    for id in &pages[1..] {
        if stamp(id) > stamp(best) {
            best = id;
        }
    }
    Some(best)
}
