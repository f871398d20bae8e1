//! Atomic dock operations.
//!
//! Every public operation takes the current [`DockSnapshot`] by reference,
//! works on a private clone and returns either the next snapshot or a
//! [`DockError`]. The input is never touched, so a rejection or fault simply
//! leaves the caller's snapshot current. Applied results are validated against
//! the full invariant set before they are handed back.
//!
//! Compound operations (a cross-panel move that collapses its source, a split
//! seeded by the sole page of another panel) build their intermediate state in
//! the same working clone, so nothing of a failed attempt is observable.

use std::iter;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::config::{ConfigError, DockConfig};
use crate::error::{Advisory, AdvisoryKind, DockError, DockFault, DockResult};
use crate::feasibility;
use crate::ids::IdGenerator;
use crate::model::{
    Axis, Division, DockSnapshot, InsertPosition, NewPage, Page, PageId, PagePatch, PanelId,
    PanelKind, PanelNode, WorkspaceId, PROPORTION_EPSILON,
};
use crate::ordering;
use crate::proportion;

/// Millisecond wall clock used for page timestamps.
pub type Clock = fn() -> u64;

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn system_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
        })
}

/// How a page move treats the lock-ordering rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveMode {
    /// Reject moves that break lock ordering or take a locked page elsewhere.
    Strict,
    /// Apply the move, then re-sort so lock ordering holds. The moved page may
    /// not end up at the requested index.
    Forced,
}

/// Which unlocked neighbours `close_other_pages` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseDirection {
    Left,
    Right,
    Both,
}

/// What happens to the pages of a destroyed subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Drop the page records.
    Delete,
    /// Append the pages to this leaf, then re-sort.
    Move(PanelId),
    /// Keep the records for a follow-up step that rehomes them. On its own the
    /// result has orphan pages and fails validation.
    Ignore,
}

/// Stateless-per-call operation engine.
///
/// Holds only configuration, the id generator and the clock; operations take
/// `&mut self` to advance the generator.
#[derive(Debug, Clone)]
pub struct DockEngine {
    config: DockConfig,
    ids: IdGenerator,
    clock: Clock,
}

impl Default for DockEngine {
    fn default() -> Self {
        Self::build(DockConfig::default())
    }
}

impl DockEngine {
    /// Engine over a validated configuration.
    pub fn new(config: DockConfig) -> Result<Self, ConfigError> {
        match config.validated() {
            Ok(config) => Ok(Self::build(config)),
            Err(err) => {
                tracing::warn!(target: "ftui.dock", error = %err, "rejecting dock config");
                Err(err)
            }
        }
    }

    fn build(config: DockConfig) -> Self {
        let ids = IdGenerator::new(&config);
        Self {
            config,
            ids,
            clock: system_clock,
        }
    }

    /// Replace the wall clock, e.g. with a fixed one in tests.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &DockConfig {
        &self.config
    }

    #[must_use]
    pub fn now(&self) -> u64 {
        (self.clock)()
    }

    /// Root leaf holding one focused default page.
    pub fn initial_snapshot(&mut self, workspace_id: WorkspaceId) -> DockResult<DockSnapshot> {
        let now = self.now();
        let snapshot = DockSnapshot::new(workspace_id, &mut self.ids, now)?;
        tracing::debug!(
            target: "ftui.dock",
            root = %snapshot.root,
            state_hash = snapshot.state_hash(),
            "dock workspace initialized"
        );
        Ok(snapshot)
    }

    fn run<T>(
        &mut self,
        op: &'static str,
        snapshot: &DockSnapshot,
        apply: impl FnOnce(&mut Self, &mut DockSnapshot) -> DockResult<T>,
    ) -> DockResult<(DockSnapshot, T)> {
        let _span = tracing::debug_span!(target: "ftui.dock", "dock.op", op).entered();
        let before_hash = snapshot.state_hash();
        let mut working = snapshot.clone();
        let result = apply(self, &mut working).and_then(|value| {
            working.validate()?;
            Ok(value)
        });
        match result {
            Ok(value) => {
                tracing::debug!(
                    target: "ftui.dock",
                    op,
                    before_hash,
                    after_hash = working.state_hash(),
                    "dock operation applied"
                );
                Ok((working, value))
            }
            Err(DockError::Rejected(advisory)) => {
                tracing::info!(
                    target: "ftui.dock",
                    op,
                    kind = %advisory.kind,
                    "dock operation rejected"
                );
                Err(DockError::Rejected(advisory))
            }
            Err(DockError::Fault(fault)) => {
                tracing::error!(
                    target: "ftui.dock",
                    op,
                    fault = %fault,
                    "dock operation failed"
                );
                Err(DockError::Fault(fault))
            }
        }
    }

    /// Add a page to `panel`, before `before` or at the end, and focus it.
    ///
    /// Without a spec the canonical default page is synthesized. The list is
    /// re-sorted afterwards, so a page inserted among locked pages lands after
    /// them.
    pub fn create_page(
        &mut self,
        snapshot: &DockSnapshot,
        panel: &PanelId,
        spec: Option<NewPage>,
        before: Option<&PageId>,
    ) -> DockResult<(DockSnapshot, PageId)> {
        self.run("create_page", snapshot, |engine, s| {
            engine.create_page_in(s, panel, spec, before)
        })
    }

    /// Split `initiator` along `axis`, placing a new leaf before or after it.
    ///
    /// The new leaf hosts `moved` (taken from wherever it lives), a page built
    /// from `spec`, or a default page. Returns the id of the page hosted by
    /// the new leaf.
    ///
    /// Rejections: a locked `moved` page
    /// ([`AdvisoryKind::CannotCreatePanelFromLockedPage`]) and a split that
    /// does not fit the measured workspace
    /// ([`AdvisoryKind::SplitSpaceExhausted`]).
    pub fn divide_panel(
        &mut self,
        snapshot: &DockSnapshot,
        initiator: &PanelId,
        axis: Axis,
        position: InsertPosition,
        moved: Option<&PageId>,
        spec: Option<NewPage>,
    ) -> DockResult<(DockSnapshot, PageId)> {
        self.run("divide_panel", snapshot, |engine, s| {
            engine.divide_in(s, initiator, axis, position, moved, spec)
        })
    }

    /// Add a leaf to an existing division along its own axis, before
    /// `before_child` or after the last child.
    pub fn add_sub_panel(
        &mut self,
        snapshot: &DockSnapshot,
        division: &PanelId,
        before_child: Option<&PanelId>,
        spec: Option<NewPage>,
    ) -> DockResult<(DockSnapshot, PageId)> {
        self.run("add_sub_panel", snapshot, |engine, s| {
            let parent = division_of(s, division)?;
            let (anchor, position) = match before_child {
                Some(child) => {
                    if parent.index_of(child).is_none() {
                        return Err(DockFault::ChildNotUnderParent {
                            parent: division.clone(),
                            child: child.clone(),
                        }
                        .into());
                    }
                    (child.clone(), InsertPosition::Before)
                }
                None => (
                    parent.children.last().cloned().ok_or_else(|| {
                        DockFault::DegenerateDivision {
                            panel: division.clone(),
                            children: 0,
                        }
                    })?,
                    InsertPosition::After,
                ),
            };
            let axis = parent.axis;
            engine.divide_in(s, &anchor, axis, position, None, spec)
        })
    }

    /// Close one page.
    ///
    /// The last page of a nested leaf takes the leaf with it. The last page of
    /// the root leaf is replaced by a default page, unless it already is one.
    pub fn close_page(
        &mut self,
        snapshot: &DockSnapshot,
        panel: &PanelId,
        page: &PageId,
    ) -> DockResult<DockSnapshot> {
        self.run("close_page", snapshot, |engine, s| {
            engine.close_page_in(s, panel, page)
        })
        .map(|(next, ())| next)
    }

    /// Close unlocked pages on one or both sides of `keep` and focus it.
    pub fn close_other_pages(
        &mut self,
        snapshot: &DockSnapshot,
        panel: &PanelId,
        keep: &PageId,
        direction: CloseDirection,
    ) -> DockResult<DockSnapshot> {
        self.run("close_other_pages", snapshot, |_, s| {
            close_other_pages_in(s, panel, keep, direction)
        })
        .map(|(next, ())| next)
    }

    pub fn focus_page(
        &mut self,
        snapshot: &DockSnapshot,
        panel: &PanelId,
        page: &PageId,
    ) -> DockResult<DockSnapshot> {
        self.run("focus_page", snapshot, |_, s| {
            ensure_hosted(s, panel, page)?;
            if s.focused(panel) != Some(page) {
                s.focus.insert(panel.clone(), page.clone());
            }
            Ok(())
        })
        .map(|(next, ())| next)
    }

    /// Move `page` from `from` to `to`, right before `target` or at the end.
    ///
    /// A cross-panel move that empties `from` destroys it first, with the
    /// pages rehomed onto `to` (or whatever absorbed `to`), and then finishes
    /// as an in-panel move there.
    pub fn move_page(
        &mut self,
        snapshot: &DockSnapshot,
        from: &PanelId,
        to: &PanelId,
        page: &PageId,
        target: Option<&PageId>,
        mode: MoveMode,
    ) -> DockResult<DockSnapshot> {
        self.run("move_page", snapshot, |engine, s| {
            engine.move_page_in(s, from, to, page, target, mode)
        })
        .map(|(next, ())| next)
    }

    /// Remove `child` (and everything under it) from `parent`.
    ///
    /// With more than two children the child is spliced out and its share
    /// goes to a neighbour. With exactly two, `parent` takes over the
    /// surviving sibling's identity.
    pub fn destroy_sub_panel(
        &mut self,
        snapshot: &DockSnapshot,
        parent: &PanelId,
        child: &PanelId,
        disposition: Disposition,
    ) -> DockResult<DockSnapshot> {
        self.run("destroy_sub_panel", snapshot, |engine, s| {
            engine
                .destroy_in(s, parent, child, &disposition)
                .map_err(DockError::from)
        })
        .map(|(next, ())| next)
    }

    /// Apply a handle drag to `start` (the shares when the drag began).
    ///
    /// A drag that would collapse a child to a non-positive share is a fault.
    pub fn resize_division(
        &mut self,
        snapshot: &DockSnapshot,
        panel: &PanelId,
        handle_index: usize,
        start: &[f64],
        delta: f64,
        range: (f64, f64),
    ) -> DockResult<DockSnapshot> {
        self.run("resize_division", snapshot, |_, s| {
            let children = division_of(s, panel)?.children.len();
            check_handle(panel, handle_index, children)?;
            if start.len() != children {
                return Err(DockFault::ProportionLengthMismatch {
                    panel: panel.clone(),
                    expected: children,
                    actual: start.len(),
                }
                .into());
            }
            let resized = proportion::resize(start, handle_index, delta, range);
            if resized
                .iter()
                .any(|share| !(share.is_finite() && *share > 0.0))
            {
                // Bounds taken from stale geometry can overshoot a share.
                return Err(DockFault::InvalidProportions {
                    panel: panel.clone(),
                    sum: resized.iter().sum(),
                }
                .into());
            }
            division_mut(s, panel)?.proportions = resized;
            Ok(())
        })
        .map(|(next, ())| next)
    }

    /// Replace a division's shares wholesale.
    pub fn set_division_proportions(
        &mut self,
        snapshot: &DockSnapshot,
        panel: &PanelId,
        proportions: Vec<f64>,
    ) -> DockResult<DockSnapshot> {
        self.run("set_division_proportions", snapshot, |_, s| {
            let children = division_of(s, panel)?.children.len();
            if proportions.len() != children {
                return Err(DockFault::ProportionLengthMismatch {
                    panel: panel.clone(),
                    expected: children,
                    actual: proportions.len(),
                }
                .into());
            }
            let sum: f64 = proportions.iter().sum();
            let positive = proportions
                .iter()
                .all(|share| share.is_finite() && *share > 0.0);
            if !positive || (sum - 100.0).abs() > PROPORTION_EPSILON {
                return Err(DockFault::InvalidProportions {
                    panel: panel.clone(),
                    sum,
                }
                .into());
            }
            division_mut(s, panel)?.proportions = proportions;
            Ok(())
        })
        .map(|(next, ())| next)
    }

    /// Flip the lock flag, re-sort the owning leaf and focus the page.
    pub fn toggle_lock(&mut self, snapshot: &DockSnapshot, page: &PageId) -> DockResult<DockSnapshot> {
        self.run("toggle_lock", snapshot, |_, s| toggle_lock_in(s, page))
            .map(|(next, ())| next)
    }

    /// Set the lock flag. Asking for the current state is a warned no-op.
    pub fn set_page_lock(
        &mut self,
        snapshot: &DockSnapshot,
        page: &PageId,
        locked: bool,
    ) -> DockResult<DockSnapshot> {
        self.run("set_page_lock", snapshot, |_, s| {
            if page_of(s, page)?.locked == locked {
                tracing::warn!(
                    target: "ftui.dock",
                    page = %page,
                    locked,
                    "page already in requested lock state"
                );
                return Ok(());
            }
            toggle_lock_in(s, page)
        })
        .map(|(next, ())| next)
    }

    /// Shallow merge of the mutable page fields. Menu keys must be unique.
    pub fn update_page_data(
        &mut self,
        snapshot: &DockSnapshot,
        page: &PageId,
        patch: PagePatch,
    ) -> DockResult<DockSnapshot> {
        self.run("update_page_data", snapshot, |_, s| {
            if let Some(menu) = &patch.menu {
                let mut seen = FxHashSet::default();
                for entry in menu {
                    if !seen.insert(entry.key.as_str()) {
                        return Err(DockFault::DuplicateMenuKey {
                            page: page.clone(),
                            key: entry.key.clone(),
                        }
                        .into());
                    }
                }
            }
            patch.apply(page_mut(s, page)?);
            Ok(())
        })
        .map(|(next, ())| next)
    }

    /// Allowed delta range (in percent) for dragging handle `handle_index` of
    /// `division`, from the current measurements.
    ///
    /// Each flanking child may shrink down to the minimum size of its own
    /// worst-case leaf count. Unmeasured children yield `(0.0, 0.0)`.
    pub fn resize_bounds(
        &self,
        snapshot: &DockSnapshot,
        division: &PanelId,
        handle_index: usize,
    ) -> DockResult<(f64, f64)> {
        let node = division_of(snapshot, division)?;
        check_handle(division, handle_index, node.children.len())?;
        let axis = node.axis;
        let before = &node.children[handle_index];
        let after = &node.children[handle_index + 1];
        let extent = |panel: &PanelId| snapshot.rendered_rect(panel).map(|rect| rect.extent(axis));
        let (Some(total), Some(before_extent), Some(after_extent)) =
            (extent(division), extent(before), extent(after))
        else {
            tracing::debug!(
                target: "ftui.dock",
                division = %division,
                handle_index,
                "resize bounds requested before measurement"
            );
            return Ok((0.0, 0.0));
        };
        let handle = self.config.handle_size;
        let min = self.config.min_extent(axis);
        let min_for = |panel: &PanelId| {
            feasibility::required_extent(
                feasibility::max_sub_panel_count(snapshot, panel, axis),
                min,
                handle,
            )
        };
        let available = total - (node.children.len() - 1) as f64 * handle;
        Ok(proportion::resize_bounds(
            before_extent,
            min_for(before),
            after_extent,
            min_for(after),
            available,
        ))
    }

    fn fresh_page(
        &mut self,
        s: &DockSnapshot,
        panel: &PanelId,
        spec: Option<NewPage>,
    ) -> Result<Page, DockFault> {
        let id = self.ids.page_id(s)?;
        let now = self.now();
        Ok(match spec {
            Some(spec) => Page::from_spec(id, panel.clone(), spec, now),
            None => Page::placeholder(id, panel.clone(), now),
        })
    }

    fn create_page_in(
        &mut self,
        s: &mut DockSnapshot,
        panel: &PanelId,
        spec: Option<NewPage>,
        before: Option<&PageId>,
    ) -> DockResult<PageId> {
        let mut list = leaf_pages(s, panel)?.to_vec();
        let insert_at = match before {
            Some(before) => Some(list.iter().position(|id| id == before).ok_or_else(|| {
                DockFault::PageNotInPanel {
                    panel: panel.clone(),
                    page: before.clone(),
                }
            })?),
            None => None,
        };
        let page = self.fresh_page(s, panel, spec)?;
        let id = page.id.clone();
        s.pages.insert(id.clone(), page);
        match insert_at {
            Some(index) => list.insert(index, id.clone()),
            None => list.push(id.clone()),
        }
        let list = ordering::reorder(&list, &s.pages);
        s.page_lists.insert(panel.clone(), list);
        s.focus.insert(panel.clone(), id.clone());
        Ok(id)
    }

    fn check_split(
        &self,
        s: &DockSnapshot,
        panel: &PanelId,
        axis: Axis,
        root_extent: Option<f64>,
    ) -> DockResult<()> {
        let fits = feasibility::can_split(
            s,
            panel,
            axis,
            self.config.min_extent(axis),
            self.config.handle_size,
            root_extent,
        );
        if fits {
            Ok(())
        } else {
            Err(Advisory::axis(AdvisoryKind::SplitSpaceExhausted, panel.clone(), axis).into())
        }
    }

    fn divide_in(
        &mut self,
        s: &mut DockSnapshot,
        initiator: &PanelId,
        axis: Axis,
        position: InsertPosition,
        moved: Option<&PageId>,
        spec: Option<NewPage>,
    ) -> DockResult<PageId> {
        if s.panel(initiator).is_none() {
            return Err(DockFault::MissingPanel {
                panel: initiator.clone(),
            }
            .into());
        }
        // Geometry is read once, before any simulated collapse.
        let root_extent = feasibility::root_extent(s, axis);
        let mut effective = initiator.clone();
        let mut detach_from = None;

        if let Some(moved) = moved {
            let page = page_of(s, moved)?;
            if page.locked {
                return Err(Advisory::page(
                    AdvisoryKind::CannotCreatePanelFromLockedPage,
                    moved.clone(),
                    page.name.clone(),
                )
                .into());
            }
            let source = page.panel.clone();
            if leaf_pages(s, &source)?.len() == 1 {
                if source == s.root || source == *initiator {
                    tracing::debug!(
                        target: "ftui.dock",
                        source = %source,
                        "split seeded by the sole page of its own panel changes nothing"
                    );
                    return Ok(moved.clone());
                }
                let parent = s
                    .parent_of(&source)
                    .cloned()
                    .ok_or_else(|| DockFault::NoParent {
                        panel: source.clone(),
                    })?;
                let mut collapsed = s.clone();
                self.destroy_in(&mut collapsed, &parent, &source, &Disposition::Ignore)?;
                if !collapsed.panels.contains_key(initiator) {
                    effective = parent.clone();
                }
                self.check_split(&collapsed, &effective, axis, root_extent)?;

                let pair = s
                    .division(&parent)
                    .is_some_and(|d| d.children.len() == 2 && d.children.contains(initiator));
                if pair {
                    // Re-orient the pair in place; the source leaf keeps the page.
                    let division = division_mut(s, &parent)?;
                    division.axis = axis;
                    division.proportions = vec![50.0, 50.0];
                    division.children = match position {
                        InsertPosition::After => vec![initiator.clone(), source],
                        InsertPosition::Before => vec![source, initiator.clone()],
                    };
                    return Ok(moved.clone());
                }
                *s = collapsed;
            } else {
                self.check_split(s, &effective, axis, root_extent)?;
                detach_from = Some(source);
            }
        } else {
            self.check_split(s, &effective, axis, root_extent)?;
        }

        let new_page = match moved {
            Some(moved) => moved.clone(),
            None => {
                let page = self.fresh_page(s, &effective, spec)?;
                let id = page.id.clone();
                s.pages.insert(id.clone(), page);
                id
            }
        };

        if let Some(source) = detach_from {
            let mut list = leaf_pages(s, &source)?.to_vec();
            if let Some(index) = list.iter().position(|id| *id == new_page) {
                let neighbour = if index + 1 == list.len() {
                    index - 1
                } else {
                    index + 1
                };
                s.focus.insert(source.clone(), list[neighbour].clone());
                list.remove(index);
                s.page_lists.insert(source, list);
            }
        }

        let parent = s.parent_of(&effective).cloned();
        let sibling_axis = parent.as_ref().and_then(|p| s.division(p)).map(|d| d.axis);
        let leaf = match (parent, sibling_axis) {
            (Some(parent), Some(parent_axis)) if parent_axis == axis => {
                self.insert_sibling(s, &parent, &effective, position)?
            }
            _ => self.wrap(s, &effective, axis, position)?,
        };
        host_single_page(s, &leaf, &new_page)?;
        Ok(new_page)
    }

    /// New leaf next to `anchor` inside `parent`, which already runs along
    /// the split axis.
    fn insert_sibling(
        &mut self,
        s: &mut DockSnapshot,
        parent: &PanelId,
        anchor: &PanelId,
        position: InsertPosition,
    ) -> Result<PanelId, DockFault> {
        let shares = proportion::snapshot_proportions(s, parent, self.config.handle_size)
            .ok_or_else(|| DockFault::NotDivision {
                panel: parent.clone(),
            })?;
        let leaf = self.ids.panel_id(s)?;
        let division = division_mut(s, parent)?;
        let anchor_index = division
            .index_of(anchor)
            .ok_or_else(|| DockFault::ChildNotUnderParent {
                parent: parent.clone(),
                child: anchor.clone(),
            })?;
        let at = match position {
            InsertPosition::Before => anchor_index,
            InsertPosition::After => anchor_index + 1,
        };
        division.children.insert(at, leaf.clone());
        division.proportions = proportion::on_insert(&shares, anchor_index, position);
        s.panels.insert(
            leaf.clone(),
            PanelNode::leaf(leaf.clone(), Some(parent.clone())),
        );
        Ok(leaf)
    }

    /// Turn `target` into a 50/50 division along `axis`: one child inherits
    /// everything `target` held, the other is a new empty leaf.
    fn wrap(
        &mut self,
        s: &mut DockSnapshot,
        target: &PanelId,
        axis: Axis,
        position: InsertPosition,
    ) -> Result<PanelId, DockFault> {
        let former = s
            .panels
            .get(target)
            .map(|node| node.kind.clone())
            .ok_or_else(|| DockFault::MissingPanel {
                panel: target.clone(),
            })?;
        let heir = self.ids.panel_id(s)?;
        s.panels.insert(
            heir.clone(),
            PanelNode {
                id: heir.clone(),
                parent: Some(target.clone()),
                kind: former.clone(),
            },
        );
        let leaf = self.ids.panel_id(s)?;
        s.panels.insert(
            leaf.clone(),
            PanelNode::leaf(leaf.clone(), Some(target.clone())),
        );

        match &former {
            PanelKind::Leaf => {
                let pages = s.page_lists.remove(target).unwrap_or_default();
                for page in &pages {
                    page_mut(s, page)?.panel = heir.clone();
                }
                s.page_lists.insert(heir.clone(), pages);
                if let Some(focused) = s.focus.remove(target) {
                    s.focus.insert(heir.clone(), focused);
                }
            }
            PanelKind::Division(division) => {
                for child in &division.children {
                    if let Some(node) = s.panels.get_mut(child) {
                        node.parent = Some(heir.clone());
                    }
                }
            }
        }
        s.forget_measurement(target);

        let children = match position {
            InsertPosition::After => vec![heir, leaf.clone()],
            InsertPosition::Before => vec![leaf.clone(), heir],
        };
        if let Some(node) = s.panels.get_mut(target) {
            node.kind = PanelKind::Division(Division {
                axis,
                children,
                proportions: vec![50.0, 50.0],
            });
        }
        Ok(leaf)
    }

    fn close_page_in(
        &mut self,
        s: &mut DockSnapshot,
        panel: &PanelId,
        page: &PageId,
    ) -> DockResult<()> {
        ensure_hosted(s, panel, page)?;
        let record = page_of(s, page)?;
        if record.locked {
            return Err(Advisory::page(
                AdvisoryKind::CannotCloseLockedPage,
                page.clone(),
                record.name.clone(),
            )
            .into());
        }
        let is_placeholder = record.is_placeholder();
        let name = record.name.clone();

        let mut list = leaf_pages(s, panel)?.to_vec();
        if list.len() > 1 {
            list.retain(|id| id != page);
            s.pages.remove(page);
            if s.focused(panel) == Some(page) {
                if let Some(next) = ordering::most_recently_focused(&list, &s.pages) {
                    s.focus.insert(panel.clone(), next.clone());
                }
            }
            s.page_lists.insert(panel.clone(), list);
            return Ok(());
        }

        if let Some(parent) = s.parent_of(panel).cloned() {
            return self
                .destroy_in(s, &parent, panel, &Disposition::Delete)
                .map_err(DockError::from);
        }

        if is_placeholder {
            return Err(Advisory::page(AdvisoryKind::CannotCloseDefaultPage, page.clone(), name).into());
        }
        let fresh = self.fresh_page(s, panel, None)?;
        let id = fresh.id.clone();
        s.pages.insert(id.clone(), fresh);
        s.pages.remove(page);
        s.page_lists.insert(panel.clone(), vec![id.clone()]);
        s.focus.insert(panel.clone(), id);
        Ok(())
    }

    fn move_page_in(
        &mut self,
        s: &mut DockSnapshot,
        from: &PanelId,
        to: &PanelId,
        page: &PageId,
        target: Option<&PageId>,
        mode: MoveMode,
    ) -> DockResult<()> {
        ensure_hosted(s, from, page)?;
        leaf_pages(s, to)?;
        if let Some(target) = target {
            ensure_hosted(s, to, target)?;
        }
        if from == to {
            return reposition(s, from, page, target, mode);
        }

        let record = page_of(s, page)?;
        let name = record.name.clone();
        if mode == MoveMode::Strict && record.locked {
            return Err(Advisory::page(AdvisoryKind::LockedPageCannotLeavePanel, page.clone(), name).into());
        }

        let mut source = leaf_pages(s, from)?.to_vec();
        if source.len() == 1 {
            let parent = s
                .parent_of(from)
                .cloned()
                .ok_or_else(|| DockFault::NoParent { panel: from.clone() })?;
            self.destroy_in(s, &parent, from, &Disposition::Move(to.clone()))?;
            // `to` may have been absorbed into the parent.
            let owner = page_of(s, page)?.panel.clone();
            return reposition(s, &owner, page, target, mode);
        }

        source.retain(|id| id != page);
        if s.focused(from) == Some(page) {
            if let Some(next) = ordering::most_recently_focused(&source, &s.pages) {
                s.focus.insert(from.clone(), next.clone());
            }
        }
        s.page_lists.insert(from.clone(), source);

        page_mut(s, page)?.panel = to.clone();
        let mut dest = leaf_pages(s, to)?.to_vec();
        match target.and_then(|target| dest.iter().position(|id| id == target)) {
            Some(index) => dest.insert(index, page.clone()),
            None => dest.push(page.clone()),
        }
        if mode == MoveMode::Strict && !ordering::is_valid(&dest, &s.pages) {
            return Err(Advisory::page(AdvisoryKind::MoveViolatesLockOrder, page.clone(), name).into());
        }
        let dest = ordering::reorder(&dest, &s.pages);
        s.page_lists.insert(to.clone(), dest);
        s.focus.insert(to.clone(), page.clone());
        Ok(())
    }

    fn destroy_in(
        &self,
        s: &mut DockSnapshot,
        parent: &PanelId,
        child: &PanelId,
        disposition: &Disposition,
    ) -> Result<(), DockFault> {
        let division = division_of(s, parent)?.clone();
        let index = division
            .index_of(child)
            .ok_or_else(|| DockFault::ChildNotUnderParent {
                parent: parent.clone(),
                child: child.clone(),
            })?;
        if division.children.len() < 2 {
            return Err(DockFault::DegenerateDivision {
                panel: parent.clone(),
                children: division.children.len(),
            });
        }
        let doomed: FxHashSet<PanelId> = iter::once(child.clone())
            .chain(s.panels_under(child))
            .collect();
        if let Disposition::Move(target) = disposition {
            if doomed.contains(target) || !s.is_leaf(target) {
                return Err(DockFault::InvalidMoveTarget {
                    target: target.clone(),
                });
            }
        }

        // Shares are measured before the child's rectangles are dropped.
        let shares = proportion::snapshot_proportions(s, parent, self.config.handle_size)
            .unwrap_or_else(|| division.proportions.clone());
        let pages = s.pages_under(child);
        s.pin_workspace_bounds();
        for panel in &doomed {
            s.panels.remove(panel);
            s.page_lists.remove(panel);
            s.focus.remove(panel);
            s.measured.remove(panel);
        }

        match disposition {
            Disposition::Delete => {
                for page in &pages {
                    s.pages.remove(page);
                }
            }
            Disposition::Move(target) => {
                for page in &pages {
                    page_mut(s, page)?.panel = target.clone();
                }
                let mut list = leaf_pages(s, target)?.to_vec();
                list.extend(pages.iter().cloned());
                let list = ordering::reorder(&list, &s.pages);
                s.page_lists.insert(target.clone(), list);
            }
            Disposition::Ignore => {}
        }

        if division.children.len() > 2 {
            let node = division_mut(s, parent)?;
            node.children.remove(index);
            node.proportions = proportion::on_delete(&shares, index);
            return Ok(());
        }

        // Two children: the parent becomes the surviving sibling.
        let sibling = division.children[1 - index].clone();
        let survivor = s
            .panels
            .remove(&sibling)
            .ok_or_else(|| DockFault::MissingPanel {
                panel: sibling.clone(),
            })?;
        s.forget_measurement(&sibling);
        match &survivor.kind {
            PanelKind::Leaf => {
                let pages = s.page_lists.remove(&sibling).unwrap_or_default();
                for page in &pages {
                    page_mut(s, page)?.panel = parent.clone();
                }
                s.page_lists.insert(parent.clone(), pages);
                if let Some(focused) = s.focus.remove(&sibling) {
                    s.focus.insert(parent.clone(), focused);
                }
            }
            PanelKind::Division(inner) => {
                for grandchild in &inner.children {
                    if let Some(node) = s.panels.get_mut(grandchild) {
                        node.parent = Some(parent.clone());
                    }
                }
            }
        }
        if let Some(node) = s.panels.get_mut(parent) {
            node.kind = survivor.kind;
        }
        tracing::trace!(
            target: "ftui.dock",
            parent = %parent,
            sibling = %sibling,
            "division collapsed into surviving sibling"
        );
        Ok(())
    }
}

fn close_other_pages_in(
    s: &mut DockSnapshot,
    panel: &PanelId,
    keep: &PageId,
    direction: CloseDirection,
) -> DockResult<()> {
    ensure_hosted(s, panel, keep)?;
    let list = leaf_pages(s, panel)?.to_vec();
    if list.len() == 1 {
        return Ok(());
    }
    let mut kept = Vec::with_capacity(list.len());
    let mut past_keep = false;
    for id in list {
        if id == *keep {
            kept.push(id);
            past_keep = true;
            continue;
        }
        let locked = s.page(&id).is_some_and(|page| page.locked);
        let doomed = !locked
            && match direction {
                CloseDirection::Both => true,
                CloseDirection::Left => !past_keep,
                CloseDirection::Right => past_keep,
            };
        if doomed {
            s.pages.remove(&id);
        } else {
            kept.push(id);
        }
    }
    s.page_lists.insert(panel.clone(), kept);
    s.focus.insert(panel.clone(), keep.clone());
    Ok(())
}

fn toggle_lock_in(s: &mut DockSnapshot, page: &PageId) -> DockResult<()> {
    let record = page_mut(s, page)?;
    record.locked = !record.locked;
    let owner = record.panel.clone();
    let list = ordering::reorder(leaf_pages(s, &owner)?, &s.pages);
    s.page_lists.insert(owner.clone(), list);
    s.focus.insert(owner, page.clone());
    Ok(())
}

/// In-panel move: `after_move`, then the lock-order check or correction.
fn reposition(
    s: &mut DockSnapshot,
    panel: &PanelId,
    page: &PageId,
    target: Option<&PageId>,
    mode: MoveMode,
) -> DockResult<()> {
    let moved = ordering::after_move(leaf_pages(s, panel)?, page, target);
    if mode == MoveMode::Strict && !ordering::is_valid(&moved, &s.pages) {
        let name = page_of(s, page)?.name.clone();
        return Err(Advisory::page(AdvisoryKind::MoveViolatesLockOrder, page.clone(), name).into());
    }
    let ordered = ordering::reorder(&moved, &s.pages);
    s.page_lists.insert(panel.clone(), ordered);
    s.focus.insert(panel.clone(), page.clone());
    Ok(())
}

fn host_single_page(s: &mut DockSnapshot, leaf: &PanelId, page: &PageId) -> Result<(), DockFault> {
    page_mut(s, page)?.panel = leaf.clone();
    s.page_lists.insert(leaf.clone(), vec![page.clone()]);
    s.focus.insert(leaf.clone(), page.clone());
    Ok(())
}

fn check_handle(panel: &PanelId, handle_index: usize, children: usize) -> Result<(), DockFault> {
    if handle_index + 1 >= children {
        return Err(DockFault::InvalidHandle {
            panel: panel.clone(),
            handle_index,
            children,
        });
    }
    Ok(())
}

fn leaf_pages<'a>(s: &'a DockSnapshot, panel: &PanelId) -> Result<&'a [PageId], DockFault> {
    let node = s.panel(panel).ok_or_else(|| DockFault::MissingPanel {
        panel: panel.clone(),
    })?;
    if !node.is_leaf() {
        return Err(DockFault::NotLeaf {
            panel: panel.clone(),
        });
    }
    s.pages_of(panel).ok_or_else(|| DockFault::NotLeaf {
        panel: panel.clone(),
    })
}

fn ensure_hosted(s: &DockSnapshot, panel: &PanelId, page: &PageId) -> Result<(), DockFault> {
    page_of(s, page)?;
    if leaf_pages(s, panel)?.contains(page) {
        Ok(())
    } else {
        Err(DockFault::PageNotInPanel {
            panel: panel.clone(),
            page: page.clone(),
        })
    }
}

fn division_of<'a>(s: &'a DockSnapshot, panel: &PanelId) -> Result<&'a Division, DockFault> {
    let node = s.panel(panel).ok_or_else(|| DockFault::MissingPanel {
        panel: panel.clone(),
    })?;
    node.as_division().ok_or_else(|| DockFault::NotDivision {
        panel: panel.clone(),
    })
}

fn division_mut<'a>(s: &'a mut DockSnapshot, panel: &PanelId) -> Result<&'a mut Division, DockFault> {
    match s.panels.get_mut(panel).map(|node| &mut node.kind) {
        Some(PanelKind::Division(division)) => Ok(division),
        Some(PanelKind::Leaf) => Err(DockFault::NotDivision {
            panel: panel.clone(),
        }),
        None => Err(DockFault::MissingPanel {
            panel: panel.clone(),
        }),
    }
}

fn page_of<'a>(s: &'a DockSnapshot, page: &PageId) -> Result<&'a Page, DockFault> {
    s.page(page).ok_or_else(|| DockFault::MissingPage { page: page.clone() })
}

fn page_mut<'a>(s: &'a mut DockSnapshot, page: &PageId) -> Result<&'a mut Page, DockFault> {
    s.pages
        .get_mut(page)
        .ok_or_else(|| DockFault::MissingPage { page: page.clone() })
}
