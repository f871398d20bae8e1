//! Host-facing handle owning the current dock snapshot.
//!
//! [`Workspace`] threads its snapshot through [`DockEngine`], commits applied
//! transitions (focus stamping, measurement bookkeeping, publication) and
//! routes rejections to the advisory channel. Faults are returned untouched.

use crate::engine::{CloseDirection, Disposition, DockEngine, MoveMode};
use crate::error::{DockError, DockResult};
use crate::model::{
    Axis, DockSnapshot, InsertPosition, NewPage, Page, PageId, PagePatch, PanelId, PanelKind,
    PanelRect, WorkspaceId,
};
use crate::notify::{self, Notifier};
use crate::ordering;

/// Read-only view of one panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelView<'a> {
    pub id: &'a PanelId,
    pub parent: Option<&'a PanelId>,
    /// Share of the parent division, `None` for the root.
    pub proportion: Option<f64>,
    pub kind: &'a PanelKind,
    /// Empty for divisions.
    pub pages: &'a [PageId],
    pub focused: Option<&'a PageId>,
    pub rect: Option<&'a PanelRect>,
}

#[derive(Debug)]
pub struct Workspace {
    snapshot: DockSnapshot,
    engine: DockEngine,
    notifier: Notifier,
}

impl Workspace {
    /// Fresh workspace with one default page, announced to the collaborators.
    pub fn new(
        workspace_id: WorkspaceId,
        mut engine: DockEngine,
        notifier: Notifier,
    ) -> DockResult<Self> {
        let snapshot = engine.initial_snapshot(workspace_id)?;
        Self::install(snapshot, engine, notifier)
    }

    /// Adopt an existing snapshot, e.g. one mirrored from another host.
    pub fn from_snapshot(
        snapshot: DockSnapshot,
        engine: DockEngine,
        notifier: Notifier,
    ) -> DockResult<Self> {
        snapshot.validate()?;
        Self::install(snapshot, engine, notifier)
    }

    /// Default configuration, no collaborators.
    pub fn headless(workspace_id: WorkspaceId) -> DockResult<Self> {
        Self::new(workspace_id, DockEngine::default(), Notifier::new())
    }

    fn install(
        mut snapshot: DockSnapshot,
        engine: DockEngine,
        mut notifier: Notifier,
    ) -> DockResult<Self> {
        let now = engine.now();
        let focused: Vec<PageId> = snapshot.focus.values().cloned().collect();
        for page in focused {
            if let Some(record) = snapshot.pages.get_mut(&page) {
                record.last_focused_ms = record.last_focused_ms.max(now);
            }
        }
        notifier.attach(&snapshot);
        Ok(Self {
            snapshot,
            engine,
            notifier,
        })
    }

    #[must_use]
    pub const fn snapshot(&self) -> &DockSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub const fn engine(&self) -> &DockEngine {
        &self.engine
    }

    #[must_use]
    pub fn root(&self) -> &PanelId {
        &self.snapshot.root
    }

    fn commit<T>(&mut self, result: DockResult<(DockSnapshot, T)>) -> DockResult<T> {
        match result {
            Ok((mut next, value)) => {
                let stamped =
                    notify::stamp_focus_changes(&self.snapshot, &mut next, self.engine.now());
                tracing::trace!(
                    target: "ftui.dock",
                    stamped = stamped.len(),
                    "focus timestamps updated"
                );
                self.notifier.commit(&self.snapshot, &next);
                self.snapshot = next;
                Ok(value)
            }
            Err(DockError::Rejected(advisory)) => {
                self.notifier.advise(&advisory);
                Err(DockError::Rejected(advisory))
            }
            Err(fault) => Err(fault),
        }
    }

    pub fn create_page(
        &mut self,
        panel: &PanelId,
        spec: Option<NewPage>,
        before: Option<&PageId>,
    ) -> DockResult<PageId> {
        let result = self.engine.create_page(&self.snapshot, panel, spec, before);
        self.commit(result)
    }

    pub fn divide_panel(
        &mut self,
        initiator: &PanelId,
        axis: Axis,
        position: InsertPosition,
        moved: Option<&PageId>,
        spec: Option<NewPage>,
    ) -> DockResult<PageId> {
        let result = self
            .engine
            .divide_panel(&self.snapshot, initiator, axis, position, moved, spec);
        self.commit(result)
    }

    pub fn add_sub_panel(
        &mut self,
        division: &PanelId,
        before_child: Option<&PanelId>,
        spec: Option<NewPage>,
    ) -> DockResult<PageId> {
        let result = self
            .engine
            .add_sub_panel(&self.snapshot, division, before_child, spec);
        self.commit(result)
    }

    pub fn close_page(&mut self, panel: &PanelId, page: &PageId) -> DockResult<()> {
        let result = self.engine.close_page(&self.snapshot, panel, page);
        self.commit(result.map(|next| (next, ())))
    }

    pub fn close_other_pages(
        &mut self,
        panel: &PanelId,
        keep: &PageId,
        direction: CloseDirection,
    ) -> DockResult<()> {
        let result = self
            .engine
            .close_other_pages(&self.snapshot, panel, keep, direction);
        self.commit(result.map(|next| (next, ())))
    }

    pub fn focus_page(&mut self, panel: &PanelId, page: &PageId) -> DockResult<()> {
        let result = self.engine.focus_page(&self.snapshot, panel, page);
        self.commit(result.map(|next| (next, ())))
    }

    pub fn move_page(
        &mut self,
        from: &PanelId,
        to: &PanelId,
        page: &PageId,
        target: Option<&PageId>,
        mode: MoveMode,
    ) -> DockResult<()> {
        let result = self
            .engine
            .move_page(&self.snapshot, from, to, page, target, mode);
        self.commit(result.map(|next| (next, ())))
    }

    /// Destroy `child`, deleting its pages or moving them onto `move_to`.
    ///
    /// Leaving the records behind is only meaningful inside a compound engine
    /// operation, so it is not offered here.
    pub fn destroy_sub_panel(
        &mut self,
        parent: &PanelId,
        child: &PanelId,
        move_to: Option<PanelId>,
    ) -> DockResult<()> {
        let disposition = move_to.map_or(Disposition::Delete, Disposition::Move);
        let result = self
            .engine
            .destroy_sub_panel(&self.snapshot, parent, child, disposition);
        self.commit(result.map(|next| (next, ())))
    }

    pub fn resize_division(
        &mut self,
        panel: &PanelId,
        handle_index: usize,
        start: &[f64],
        delta: f64,
        range: (f64, f64),
    ) -> DockResult<()> {
        let result =
            self.engine
                .resize_division(&self.snapshot, panel, handle_index, start, delta, range);
        self.commit(result.map(|next| (next, ())))
    }

    pub fn set_division_proportions(
        &mut self,
        panel: &PanelId,
        proportions: Vec<f64>,
    ) -> DockResult<()> {
        let result = self
            .engine
            .set_division_proportions(&self.snapshot, panel, proportions);
        self.commit(result.map(|next| (next, ())))
    }

    pub fn toggle_lock(&mut self, page: &PageId) -> DockResult<()> {
        let result = self.engine.toggle_lock(&self.snapshot, page);
        self.commit(result.map(|next| (next, ())))
    }

    pub fn lock_page(&mut self, page: &PageId) -> DockResult<()> {
        let result = self.engine.set_page_lock(&self.snapshot, page, true);
        self.commit(result.map(|next| (next, ())))
    }

    pub fn unlock_page(&mut self, page: &PageId) -> DockResult<()> {
        let result = self.engine.set_page_lock(&self.snapshot, page, false);
        self.commit(result.map(|next| (next, ())))
    }

    pub fn update_page_data(&mut self, page: &PageId, patch: PagePatch) -> DockResult<()> {
        let result = self.engine.update_page_data(&self.snapshot, page, patch);
        self.commit(result.map(|next| (next, ())))
    }

    /// Record freshly rendered leaf rectangles.
    ///
    /// Rectangles for unknown panels or divisions are dropped. Returns how many
    /// were stored.
    pub fn apply_measurements(
        &mut self,
        measurements: impl IntoIterator<Item = (PanelId, PanelRect)>,
    ) -> usize {
        let mut next = self.snapshot.clone();
        let mut stored = 0;
        for (panel, rect) in measurements {
            if !next.is_leaf(&panel) {
                tracing::debug!(
                    target: "ftui.dock",
                    panel = %panel,
                    "dropping measurement for unknown or non-leaf panel"
                );
                continue;
            }
            next.measured.insert(panel, rect);
            stored += 1;
        }
        if stored > 0 {
            if let Some(bounds) = next.measured_bounds() {
                next.root_bounds = Some(bounds);
            }
            self.notifier.commit(&self.snapshot, &next);
            self.snapshot = next;
        }
        stored
    }

    pub fn resize_bounds(&self, division: &PanelId, handle_index: usize) -> DockResult<(f64, f64)> {
        self.engine
            .resize_bounds(&self.snapshot, division, handle_index)
    }

    /// Whether a tab drop target should accept the dragged page.
    #[must_use]
    pub fn can_drop(&self, dragged_panel: &PanelId, dragged_page: &PageId, target_page: &PageId) -> bool {
        ordering::can_drop(&self.snapshot, dragged_panel, dragged_page, target_page)
    }

    #[must_use]
    pub fn page(&self, page: &PageId) -> Option<&Page> {
        self.snapshot.page(page)
    }

    #[must_use]
    pub fn panel(&self, panel: &PanelId) -> Option<PanelView<'_>> {
        let node = self.snapshot.panel(panel)?;
        let proportion = node.parent.as_ref().and_then(|parent| {
            let division = self.snapshot.division(parent)?;
            let index = division.index_of(panel)?;
            division.proportions.get(index).copied()
        });
        Some(PanelView {
            id: &node.id,
            parent: node.parent.as_ref(),
            proportion,
            kind: &node.kind,
            pages: self.snapshot.pages_of(panel).unwrap_or(&[]),
            focused: self.snapshot.focused(panel),
            rect: self.snapshot.measured.get(panel),
        })
    }

    /// Every leaf, in canonical id order.
    pub fn leaves(&self) -> impl Iterator<Item = PanelView<'_>> {
        self.snapshot.leaf_ids().filter_map(|id| self.panel(id))
    }
}
