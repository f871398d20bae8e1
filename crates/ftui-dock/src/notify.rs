//! Post-commit notifications.
//!
//! After a transition is committed the old and new snapshots are compared
//! table by table. Retired leaves are released from measurement, and only the
//! tables that actually changed are published to the snapshot store.

use crate::error::Advisory;
use crate::model::{DockSnapshot, PanelId};

/// Observes rendered leaf rectangles on behalf of the dock.
///
/// Measurements come back through
/// [`Workspace::apply_measurements`](crate::workspace::Workspace::apply_measurements).
pub trait MeasurementService {
    fn observe(&mut self, panel: &PanelId);
    fn unobserve(&mut self, panel: &PanelId);
}

/// Presents policy rejections to the user.
pub trait AdvisoryChannel {
    fn advise(&mut self, advisory: &Advisory);
}

/// Receives committed snapshots.
pub trait SnapshotStore {
    fn publish(&mut self, diff: &SnapshotDiff, snapshot: &DockSnapshot);
}

/// Which top-level snapshot tables differ between two snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub pages: bool,
    pub panels: bool,
    pub page_lists: bool,
    pub focus: bool,
    pub measured: bool,
}

impl SnapshotDiff {
    #[must_use]
    pub fn between(old: &DockSnapshot, new: &DockSnapshot) -> Self {
        Self {
            pages: old.pages != new.pages,
            panels: old.root != new.root || old.panels != new.panels,
            page_lists: old.page_lists != new.page_lists,
            focus: old.focus != new.focus,
            measured: old.measured != new.measured || old.root_bounds != new.root_bounds,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.pages || self.panels || self.page_lists || self.focus || self.measured)
    }
}

/// Leaves of `old` that are gone from `new` or have become divisions.
#[must_use]
pub fn retired_leaves(old: &DockSnapshot, new: &DockSnapshot) -> Vec<PanelId> {
    old.leaf_ids()
        .filter(|id| !new.is_leaf(id))
        .cloned()
        .collect()
}

/// Leaves of `new` that were not leaves in `old`.
#[must_use]
pub fn fresh_leaves(old: &DockSnapshot, new: &DockSnapshot) -> Vec<PanelId> {
    new.leaf_ids()
        .filter(|id| !old.is_leaf(id))
        .cloned()
        .collect()
}

/// Stamp `now_ms` on every page that became focused between `old` and `new`,
/// including the focus of brand-new leaves. Returns the stamped leaves.
pub fn stamp_focus_changes(old: &DockSnapshot, new: &mut DockSnapshot, now_ms: u64) -> Vec<PanelId> {
    let changed: Vec<(PanelId, _)> = new
        .focus
        .iter()
        .filter(|(leaf, page)| old.focused(leaf) != Some(*page))
        .map(|(leaf, page)| (leaf.clone(), page.clone()))
        .collect();
    let mut stamped = Vec::with_capacity(changed.len());
    for (leaf, page) in changed {
        if let Some(record) = new.pages.get_mut(&page) {
            record.last_focused_ms = now_ms;
            stamped.push(leaf);
        }
    }
    stamped
}

/// Fans a commit out to the registered collaborators.
#[derive(Default)]
pub struct Notifier {
    measurement: Option<Box<dyn MeasurementService>>,
    advisories: Option<Box<dyn AdvisoryChannel>>,
    store: Option<Box<dyn SnapshotStore>>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("measurement", &self.measurement.is_some())
            .field("advisories", &self.advisories.is_some())
            .field("store", &self.store.is_some())
            .finish()
    }
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_measurement(mut self, service: impl MeasurementService + 'static) -> Self {
        self.measurement = Some(Box::new(service));
        self
    }

    #[must_use]
    pub fn with_advisories(mut self, channel: impl AdvisoryChannel + 'static) -> Self {
        self.advisories = Some(Box::new(channel));
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: impl SnapshotStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Start observing every leaf of a freshly installed snapshot.
    pub fn attach(&mut self, snapshot: &DockSnapshot) {
        if let Some(service) = self.measurement.as_mut() {
            for leaf in snapshot.leaf_ids() {
                service.observe(leaf);
            }
        }
        if let Some(store) = self.store.as_mut() {
            let everything = SnapshotDiff {
                pages: true,
                panels: true,
                page_lists: true,
                focus: true,
                measured: true,
            };
            store.publish(&everything, snapshot);
        }
    }

    /// Release retired leaves, observe new ones and publish changed tables.
    pub fn commit(&mut self, old: &DockSnapshot, new: &DockSnapshot) -> SnapshotDiff {
        let diff = SnapshotDiff::between(old, new);
        if let Some(service) = self.measurement.as_mut() {
            for leaf in retired_leaves(old, new) {
                service.unobserve(&leaf);
            }
            for leaf in fresh_leaves(old, new) {
                service.observe(&leaf);
            }
        }
        if diff.is_empty() {
            tracing::trace!(target: "ftui.dock", "commit changed nothing, not publishing");
            return diff;
        }
        if let Some(store) = self.store.as_mut() {
            store.publish(&diff, new);
        }
        diff
    }

    pub fn advise(&mut self, advisory: &Advisory) {
        match self.advisories.as_mut() {
            Some(channel) => channel.advise(advisory),
            None => tracing::warn!(
                target: "ftui.dock",
                advisory = %advisory,
                "no advisory channel registered"
            ),
        }
    }
}
