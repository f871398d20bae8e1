//! Proportion bookkeeping for division children.
//!
//! Shares are percentages of the division's extent minus the space reserved
//! for resize handles, and always sum to 100.

use crate::model::{Division, DockSnapshot, InsertPosition, PanelId};

/// Recompute shares from rendered child extents.
///
/// Minimum-size clamping during layout can make the rendered split drift from
/// the stored one; this returns what is actually on screen. Falls back to the
/// stored shares when any child is unmeasured or the available space is not
/// positive.
#[must_use]
pub fn measured_proportions(
    division: &Division,
    child_extents: &[Option<f64>],
    total: f64,
    handle_size: f64,
) -> Vec<f64> {
    let count = division.children.len();
    let available = total - count.saturating_sub(1) as f64 * handle_size;
    if child_extents.len() != count || !(available.is_finite() && available > 0.0) {
        return division.proportions.clone();
    }
    let mut shares = Vec::with_capacity(count);
    for extent in child_extents {
        match extent {
            Some(extent) if extent.is_finite() && *extent > 0.0 => {
                shares.push(100.0 * extent / available);
            }
            _ => return division.proportions.clone(),
        }
    }
    normalize(&mut shares);
    shares
}

/// Measured shares of `panel`'s children taken from the snapshot's rectangles.
#[must_use]
pub fn snapshot_proportions(
    snapshot: &DockSnapshot,
    panel: &PanelId,
    handle_size: f64,
) -> Option<Vec<f64>> {
    let division = snapshot.division(panel)?;
    let total = snapshot
        .rendered_rect(panel)
        .map_or(0.0, |rect| rect.extent(division.axis));
    let extents: Vec<Option<f64>> = division
        .children
        .iter()
        .map(|child| {
            snapshot
                .rendered_rect(child)
                .map(|rect| rect.extent(division.axis))
        })
        .collect();
    Some(measured_proportions(division, &extents, total, handle_size))
}

/// Scale so the shares sum to exactly 100, absorbing rounding into the last.
fn normalize(shares: &mut [f64]) {
    let sum: f64 = shares.iter().sum();
    if sum <= 0.0 || shares.is_empty() {
        return;
    }
    for share in shares.iter_mut() {
        *share *= 100.0 / sum;
    }
    let head: f64 = shares[..shares.len() - 1].iter().sum();
    if let Some(last) = shares.last_mut() {
        *last = 100.0 - head;
    }
}

/// Remove one share, granting it to the preceding sibling (or the following
/// one when the first child goes).
#[must_use]
pub fn on_delete(proportions: &[f64], removed_index: usize) -> Vec<f64> {
    let mut out = proportions.to_vec();
    if removed_index >= out.len() {
        return out;
    }
    let freed = out.remove(removed_index);
    let heir = removed_index.saturating_sub(1);
    if let Some(share) = out.get_mut(heir) {
        *share += freed;
    }
    out
}

/// Split the anchor's share in half with a new sibling inserted next to it.
#[must_use]
pub fn on_insert(proportions: &[f64], anchor_index: usize, position: InsertPosition) -> Vec<f64> {
    let mut out = proportions.to_vec();
    let Some(anchor) = out.get_mut(anchor_index) else {
        return out;
    };
    *anchor /= 2.0;
    let half = *anchor;
    let at = match position {
        InsertPosition::Before => anchor_index,
        InsertPosition::After => anchor_index + 1,
    };
    out.insert(at, half);
    out
}

/// Move a clamped delta across the handle between children `handle_index`
/// and `handle_index + 1`.
#[must_use]
pub fn resize(start: &[f64], handle_index: usize, delta: f64, range: (f64, f64)) -> Vec<f64> {
    let mut out = start.to_vec();
    if handle_index + 1 >= out.len() {
        return out;
    }
    let (min_delta, max_delta) = range;
    let applied = delta.max(min_delta).min(max_delta);
    out[handle_index] += applied;
    out[handle_index + 1] -= applied;
    out
}

/// Delta range for a handle drag, as percentages of `available`.
///
/// The lower bound is how far the before-sibling can shrink above its own
/// minimum; the upper bound is the same for the after-sibling.
#[must_use]
pub fn resize_bounds(
    before_extent: f64,
    before_min: f64,
    after_extent: f64,
    after_min: f64,
    available: f64,
) -> (f64, f64) {
    if !(available.is_finite() && available > 0.0) {
        return (0.0, 0.0);
    }
    let slack = |extent: f64, min: f64| {
        if extent <= min {
            0.0
        } else {
            100.0 * (extent - min) / available
        }
    };
    (
        -slack(before_extent, before_min),
        slack(after_extent, after_min),
    )
}
