//! Docking panel tree: snapshot schema, diagnostics, and structural queries.
//!
//! A [`DockSnapshot`] is one complete, immutable state of the workspace:
//!
//! - A panel table where every node is either a [`Division`] (ordered children
//!   sharing space along an [`Axis`]) or a leaf hosting pages.
//! - A page table plus per-leaf page-list and focus tables.
//! - Last-measured rectangles per leaf, owned by the measurement collaborator.
//!
//! Parent links are stored explicitly on every [`PanelNode`] and kept in sync
//! by every structural operation, so ancestor walks never scan the table.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DockFault, DockModelError};
use crate::ids::IdGenerator;
use crate::ordering;

/// Tolerance used when checking that division proportions sum to 100.
pub const PROPORTION_EPSILON: f64 = 1e-6;

/// Component key of the canonical default placeholder page.
pub const DEFAULT_PAGE_COMPONENT: &str = "default";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

string_id!(
    /// Identifier of the workspace; prefixes every generated id.
    WorkspaceId
);
string_id!(
    /// Opaque identifier of a panel node.
    PanelId
);
string_id!(
    /// Opaque identifier of a page (tab).
    PageId
);

/// Line along which a division arranges its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Children laid out left to right; competes for width.
    Horizontal,
    /// Children laid out top to bottom; competes for height.
    Vertical,
}

impl Axis {
    /// The other axis.
    #[must_use]
    pub const fn perpendicular(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Horizontal => f.write_str("horizontal"),
            Self::Vertical => f.write_str("vertical"),
        }
    }
}

/// Where a new sibling lands relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPosition {
    Before,
    After,
}

/// Rendered rectangle relative to the workspace origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PanelRect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Size along `axis`.
    #[must_use]
    pub const fn extent(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    /// Smallest rectangle covering both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Self::new(left, top, right - left, bottom - top)
    }
}

/// Division payload: ordered children with parallel percentage shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Division {
    pub axis: Axis,
    pub children: Vec<PanelId>,
    pub proportions: Vec<f64>,
}

impl Division {
    /// Position of `child` among the children.
    #[must_use]
    pub fn index_of(&self, child: &PanelId) -> Option<usize> {
        self.children.iter().position(|candidate| candidate == child)
    }
}

/// Node payload variant. Leaf contents live in the snapshot's per-leaf tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelKind {
    Division(Division),
    Leaf,
}

/// One node of the panel tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelNode {
    pub id: PanelId,
    #[serde(default)]
    pub parent: Option<PanelId>,
    #[serde(flatten)]
    pub kind: PanelKind,
}

impl PanelNode {
    #[must_use]
    pub fn leaf(id: PanelId, parent: Option<PanelId>) -> Self {
        Self {
            id,
            parent,
            kind: PanelKind::Leaf,
        }
    }

    #[must_use]
    pub fn division(id: PanelId, parent: Option<PanelId>, division: Division) -> Self {
        Self {
            id,
            parent,
            kind: PanelKind::Division(division),
        }
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.kind, PanelKind::Leaf)
    }

    #[must_use]
    pub const fn as_division(&self) -> Option<&Division> {
        match &self.kind {
            PanelKind::Division(division) => Some(division),
            PanelKind::Leaf => None,
        }
    }
}

/// How a page's content is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageRender {
    /// The workspace renders the registered component itself.
    SelfManaged { component: String },
    /// The host renders into the measured page container.
    ExternallyManaged,
}

impl PageRender {
    /// Render descriptor of the canonical default placeholder.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::SelfManaged {
            component: DEFAULT_PAGE_COMPONENT.to_owned(),
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::SelfManaged { component } if component == DEFAULT_PAGE_COMPONENT)
    }
}

/// Custom tab context-menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub key: String,
    pub label: String,
}

/// A single content tab owned by exactly one leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub panel: PanelId,
    pub persist: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub confirm_close: bool,
    pub created_at_ms: u64,
    pub last_focused_ms: u64,
    pub render: PageRender,
    #[serde(default)]
    pub menu: Vec<MenuEntry>,
}

impl Page {
    /// Default placeholder page named after its id.
    #[must_use]
    pub fn placeholder(id: PageId, panel: PanelId, now_ms: u64) -> Self {
        Self {
            name: format!("New Page ({id})"),
            id,
            icon: None,
            panel,
            persist: false,
            locked: false,
            confirm_close: false,
            created_at_ms: now_ms,
            last_focused_ms: now_ms,
            render: PageRender::placeholder(),
            menu: Vec::new(),
        }
    }

    /// Materialize a caller-supplied spec.
    #[must_use]
    pub fn from_spec(id: PageId, panel: PanelId, spec: NewPage, now_ms: u64) -> Self {
        Self {
            id,
            name: spec.name,
            icon: spec.icon,
            panel,
            persist: spec.persist,
            locked: false,
            confirm_close: spec.confirm_close,
            created_at_ms: now_ms,
            last_focused_ms: now_ms,
            render: spec.render,
            menu: spec.menu,
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.render.is_placeholder()
    }
}

/// Caller-supplied content for a new page. Ids and timestamps are assigned by
/// the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPage {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub persist: bool,
    #[serde(default)]
    pub confirm_close: bool,
    pub render: PageRender,
    #[serde(default)]
    pub menu: Vec<MenuEntry>,
}

impl NewPage {
    /// Externally rendered page with the given name.
    #[must_use]
    pub fn external(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: None,
            persist: false,
            confirm_close: false,
            render: PageRender::ExternallyManaged,
            menu: Vec::new(),
        }
    }
}

/// Shallow patch over the mutable page fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePatch {
    pub name: Option<String>,
    pub icon: Option<Option<String>>,
    pub persist: Option<bool>,
    pub confirm_close: Option<bool>,
    pub render: Option<PageRender>,
    pub menu: Option<Vec<MenuEntry>>,
}

impl PagePatch {
    pub(crate) fn apply(self, page: &mut Page) {
        if let Some(name) = self.name {
            page.name = name;
        }
        if let Some(icon) = self.icon {
            page.icon = icon;
        }
        if let Some(persist) = self.persist {
            page.persist = persist;
        }
        if let Some(confirm_close) = self.confirm_close {
            page.confirm_close = confirm_close;
        }
        if let Some(render) = self.render {
            page.render = render;
        }
        if let Some(menu) = self.menu {
            page.menu = menu;
        }
    }
}

/// Complete workspace state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockSnapshot {
    pub workspace_id: WorkspaceId,
    pub root: PanelId,
    pub pages: BTreeMap<PageId, Page>,
    pub panels: BTreeMap<PanelId, PanelNode>,
    pub page_lists: BTreeMap<PanelId, Vec<PageId>>,
    pub focus: BTreeMap<PanelId, PageId>,
    #[serde(default)]
    pub measured: BTreeMap<PanelId, PanelRect>,
    /// Workspace extent as of the last measurement push. Retiring a panel
    /// drops its rectangle but leaves this alone.
    #[serde(default)]
    pub root_bounds: Option<PanelRect>,
}

impl DockSnapshot {
    /// Fresh workspace: a root leaf holding one focused default placeholder.
    pub fn new(
        workspace_id: WorkspaceId,
        ids: &mut IdGenerator,
        now_ms: u64,
    ) -> Result<Self, DockFault> {
        let mut snapshot = Self {
            workspace_id,
            root: PanelId::new(""),
            pages: BTreeMap::new(),
            panels: BTreeMap::new(),
            page_lists: BTreeMap::new(),
            focus: BTreeMap::new(),
            measured: BTreeMap::new(),
            root_bounds: None,
        };
        let root = ids.panel_id(&snapshot)?;
        snapshot.root = root.clone();
        snapshot
            .panels
            .insert(root.clone(), PanelNode::leaf(root.clone(), None));
        let page = ids.page_id(&snapshot)?;
        Ok(Self::with_root_leaf(
            snapshot.workspace_id,
            root.clone(),
            Page::placeholder(page, root, now_ms),
        ))
    }

    /// Single root leaf hosting one focused page.
    #[must_use]
    pub fn with_root_leaf(workspace_id: WorkspaceId, root: PanelId, mut page: Page) -> Self {
        page.panel = root.clone();
        let page_id = page.id.clone();
        let mut panels = BTreeMap::new();
        panels.insert(root.clone(), PanelNode::leaf(root.clone(), None));
        Self {
            workspace_id,
            pages: BTreeMap::from([(page_id.clone(), page)]),
            panels,
            page_lists: BTreeMap::from([(root.clone(), vec![page_id.clone()])]),
            focus: BTreeMap::from([(root.clone(), page_id)]),
            measured: BTreeMap::new(),
            root_bounds: None,
            root,
        }
    }

    #[must_use]
    pub fn panel(&self, id: &PanelId) -> Option<&PanelNode> {
        self.panels.get(id)
    }

    #[must_use]
    pub fn page(&self, id: &PageId) -> Option<&Page> {
        self.pages.get(id)
    }

    #[must_use]
    pub fn division(&self, id: &PanelId) -> Option<&Division> {
        self.panels.get(id).and_then(PanelNode::as_division)
    }

    #[must_use]
    pub fn is_leaf(&self, id: &PanelId) -> bool {
        self.panels.get(id).is_some_and(PanelNode::is_leaf)
    }

    /// Ordered pages of a leaf.
    #[must_use]
    pub fn pages_of(&self, leaf: &PanelId) -> Option<&[PageId]> {
        self.page_lists.get(leaf).map(Vec::as_slice)
    }

    #[must_use]
    pub fn focused(&self, leaf: &PanelId) -> Option<&PageId> {
        self.focus.get(leaf)
    }

    #[must_use]
    pub fn parent_of(&self, id: &PanelId) -> Option<&PanelId> {
        self.panels.get(id).and_then(|node| node.parent.as_ref())
    }

    /// Leaf ids in canonical order.
    pub fn leaf_ids(&self) -> impl Iterator<Item = &PanelId> {
        self.panels
            .values()
            .filter(|node| node.is_leaf())
            .map(|node| &node.id)
    }

    /// Every page hosted under `panel`, in depth-first child order.
    #[must_use]
    pub fn pages_under(&self, panel: &PanelId) -> Vec<PageId> {
        let mut out = Vec::new();
        let mut stack = vec![panel];
        while let Some(id) = stack.pop() {
            match self.panels.get(id).map(|node| &node.kind) {
                Some(PanelKind::Division(division)) => {
                    stack.extend(division.children.iter().rev());
                }
                Some(PanelKind::Leaf) => {
                    if let Some(pages) = self.page_lists.get(id) {
                        out.extend(pages.iter().cloned());
                    }
                }
                None => {}
            }
        }
        out
    }

    /// Every panel strictly below `panel`.
    #[must_use]
    pub fn panels_under(&self, panel: &PanelId) -> Vec<PanelId> {
        let mut out = Vec::new();
        let mut stack = vec![panel];
        while let Some(id) = stack.pop() {
            if let Some(division) = self.division(id) {
                for child in division.children.iter().rev() {
                    out.push(child.clone());
                    stack.push(child);
                }
            }
        }
        out
    }

    /// Bounding box of every leaf under `panel`, requiring all of them to be
    /// measured.
    #[must_use]
    pub fn rendered_rect(&self, panel: &PanelId) -> Option<PanelRect> {
        let mut bounds: Option<PanelRect> = None;
        let mut stack = vec![panel];
        while let Some(id) = stack.pop() {
            match self.panels.get(id).map(|node| &node.kind) {
                Some(PanelKind::Division(division)) => stack.extend(division.children.iter()),
                Some(PanelKind::Leaf) => {
                    let rect = self.measured.get(id)?;
                    bounds = Some(bounds.map_or(*rect, |acc| acc.union(rect)));
                }
                None => return None,
            }
        }
        bounds
    }

    /// Bounding box of whatever leaves are currently measured.
    #[must_use]
    pub fn measured_bounds(&self) -> Option<PanelRect> {
        self.measured
            .iter()
            .filter(|(id, _)| self.is_leaf(id))
            .map(|(_, rect)| *rect)
            .reduce(|acc, rect| acc.union(&rect))
    }

    /// Extent of the whole workspace: the pinned root bounds, or the measured
    /// leaves when nothing has been pinned yet.
    #[must_use]
    pub fn workspace_bounds(&self) -> Option<PanelRect> {
        self.root_bounds.or_else(|| self.measured_bounds())
    }

    /// Pin the current workspace extent before rectangles are dropped.
    pub fn pin_workspace_bounds(&mut self) {
        if self.root_bounds.is_none() {
            self.root_bounds = self.measured_bounds();
        }
    }

    /// Drop a retired panel's rectangle without shrinking the workspace.
    pub fn forget_measurement(&mut self, panel: &PanelId) {
        if self.measured.contains_key(panel) {
            self.pin_workspace_bounds();
            self.measured.remove(panel);
        }
    }

    /// Deterministic structural hash of the full snapshot.
    ///
    /// Used in operation logs and to detect unchanged results.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0001_0000_01b3;

        fn mix(hash: &mut u64, byte: u8) {
            *hash ^= u64::from(byte);
            *hash = hash.wrapping_mul(PRIME);
        }

        fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
            for byte in bytes {
                mix(hash, *byte);
            }
        }

        fn mix_u64(hash: &mut u64, value: u64) {
            mix_bytes(hash, &value.to_le_bytes());
        }

        fn mix_f64(hash: &mut u64, value: f64) {
            mix_u64(hash, value.to_bits());
        }

        fn mix_bool(hash: &mut u64, value: bool) {
            mix(hash, u8::from(value));
        }

        fn mix_str(hash: &mut u64, value: &str) {
            mix_u64(hash, value.len() as u64);
            mix_bytes(hash, value.as_bytes());
        }

        fn mix_opt_str(hash: &mut u64, value: Option<&str>) {
            match value {
                Some(value) => {
                    mix(hash, 1);
                    mix_str(hash, value);
                }
                None => mix(hash, 0),
            }
        }

        let mut hash = OFFSET_BASIS;
        mix_str(&mut hash, self.workspace_id.as_str());
        mix_str(&mut hash, self.root.as_str());

        mix_u64(&mut hash, self.panels.len() as u64);
        for node in self.panels.values() {
            mix_str(&mut hash, node.id.as_str());
            mix_opt_str(&mut hash, node.parent.as_ref().map(PanelId::as_str));
            match &node.kind {
                PanelKind::Leaf => mix(&mut hash, 1),
                PanelKind::Division(division) => {
                    mix(&mut hash, 2);
                    mix(
                        &mut hash,
                        match division.axis {
                            Axis::Horizontal => 1,
                            Axis::Vertical => 2,
                        },
                    );
                    mix_u64(&mut hash, division.children.len() as u64);
                    for child in &division.children {
                        mix_str(&mut hash, child.as_str());
                    }
                    mix_u64(&mut hash, division.proportions.len() as u64);
                    for share in &division.proportions {
                        mix_f64(&mut hash, *share);
                    }
                }
            }
        }

        mix_u64(&mut hash, self.pages.len() as u64);
        for page in self.pages.values() {
            mix_str(&mut hash, page.id.as_str());
            mix_str(&mut hash, &page.name);
            mix_opt_str(&mut hash, page.icon.as_deref());
            mix_str(&mut hash, page.panel.as_str());
            mix_bool(&mut hash, page.persist);
            mix_bool(&mut hash, page.locked);
            mix_bool(&mut hash, page.confirm_close);
            mix_u64(&mut hash, page.created_at_ms);
            mix_u64(&mut hash, page.last_focused_ms);
            match &page.render {
                PageRender::SelfManaged { component } => {
                    mix(&mut hash, 1);
                    mix_str(&mut hash, component);
                }
                PageRender::ExternallyManaged => mix(&mut hash, 2),
            }
            mix_u64(&mut hash, page.menu.len() as u64);
            for entry in &page.menu {
                mix_str(&mut hash, &entry.key);
                mix_str(&mut hash, &entry.label);
            }
        }

        mix_u64(&mut hash, self.page_lists.len() as u64);
        for (panel, pages) in &self.page_lists {
            mix_str(&mut hash, panel.as_str());
            mix_u64(&mut hash, pages.len() as u64);
            for page in pages {
                mix_str(&mut hash, page.as_str());
            }
        }

        mix_u64(&mut hash, self.focus.len() as u64);
        for (panel, page) in &self.focus {
            mix_str(&mut hash, panel.as_str());
            mix_str(&mut hash, page.as_str());
        }

        mix_u64(&mut hash, self.measured.len() as u64);
        for (panel, rect) in &self.measured {
            mix_str(&mut hash, panel.as_str());
            mix_f64(&mut hash, rect.x);
            mix_f64(&mut hash, rect.y);
            mix_f64(&mut hash, rect.width);
            mix_f64(&mut hash, rect.height);
        }

        match &self.root_bounds {
            Some(rect) => {
                mix_u64(&mut hash, 1);
                mix_f64(&mut hash, rect.x);
                mix_f64(&mut hash, rect.y);
                mix_f64(&mut hash, rect.width);
                mix_f64(&mut hash, rect.height);
            }
            None => mix_u64(&mut hash, 0),
        }

        hash
    }

    /// Inspect every invariant and collect structured findings.
    #[must_use]
    pub fn invariant_report(&self) -> InvariantReport {
        build_invariant_report(self)
    }

    /// First error-severity invariant violation, if any.
    pub fn validate(&self) -> Result<(), DockModelError> {
        match self
            .invariant_report()
            .issues
            .into_iter()
            .find(|issue| issue.severity == InvariantSeverity::Error)
        {
            Some(issue) => Err(issue.error),
            None => Ok(()),
        }
    }
}

/// Severity for one invariant finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantSeverity {
    Error,
    Warning,
}

/// One invariant finding.
#[derive(Debug, Clone, PartialEq)]
pub struct InvariantIssue {
    pub severity: InvariantSeverity,
    pub error: DockModelError,
}

/// Structured invariant diagnostics for a snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvariantReport {
    pub issues: Vec<InvariantIssue>,
}

impl InvariantReport {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == InvariantSeverity::Error)
    }

    fn error(&mut self, error: DockModelError) {
        self.issues.push(InvariantIssue {
            severity: InvariantSeverity::Error,
            error,
        });
    }

    fn warning(&mut self, error: DockModelError) {
        self.issues.push(InvariantIssue {
            severity: InvariantSeverity::Warning,
            error,
        });
    }
}

fn build_invariant_report(snapshot: &DockSnapshot) -> InvariantReport {
    let mut report = InvariantReport::default();

    let Some(root) = snapshot.panels.get(&snapshot.root) else {
        report.error(DockModelError::MissingRoot {
            root: snapshot.root.clone(),
        });
        return report;
    };
    if let Some(parent) = &root.parent {
        report.error(DockModelError::RootHasParent {
            root: snapshot.root.clone(),
            parent: parent.clone(),
        });
    }

    // Derive parents from children lists and compare with stored links.
    let mut derived_parent: BTreeMap<&PanelId, &PanelId> = BTreeMap::new();
    for node in snapshot.panels.values() {
        let Some(division) = node.as_division() else {
            continue;
        };
        check_division(&node.id, division, &mut report);
        for child in &division.children {
            if !snapshot.panels.contains_key(child) {
                report.error(DockModelError::MissingChild {
                    parent: node.id.clone(),
                    child: child.clone(),
                });
                continue;
            }
            if let Some(first) = derived_parent.insert(child, &node.id) {
                report.error(DockModelError::MultipleParents {
                    child: child.clone(),
                    first: first.clone(),
                    second: node.id.clone(),
                });
            }
        }
    }
    for node in snapshot.panels.values() {
        let expected = derived_parent.get(&node.id).map(|parent| (*parent).clone());
        if node.id != snapshot.root && expected != node.parent {
            report.error(DockModelError::ParentMismatch {
                panel: node.id.clone(),
                expected,
                actual: node.parent.clone(),
            });
        }
    }

    // Reachability and cycles.
    let mut visited: BTreeSet<&PanelId> = BTreeSet::new();
    let mut stack = vec![&snapshot.root];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            report.error(DockModelError::CycleDetected { panel: id.clone() });
            continue;
        }
        if let Some(division) = snapshot.division(id) {
            stack.extend(
                division
                    .children
                    .iter()
                    .filter(|child| snapshot.panels.contains_key(*child)),
            );
        }
    }
    for id in snapshot.panels.keys() {
        if !visited.contains(id) {
            report.error(DockModelError::UnreachablePanel { panel: id.clone() });
        }
    }

    // Leaf bookkeeping.
    let mut listed: BTreeMap<&PageId, &PanelId> = BTreeMap::new();
    for node in snapshot.panels.values() {
        if !node.is_leaf() {
            if snapshot.page_lists.contains_key(&node.id) || snapshot.focus.contains_key(&node.id)
            {
                report.error(DockModelError::StaleLeafBookkeeping {
                    panel: node.id.clone(),
                });
            }
            if snapshot.measured.contains_key(&node.id) {
                report.warning(DockModelError::StaleMeasurement {
                    panel: node.id.clone(),
                });
            }
            continue;
        }
        let Some(pages) = snapshot.page_lists.get(&node.id) else {
            report.error(DockModelError::MissingPageList {
                panel: node.id.clone(),
            });
            continue;
        };
        if pages.is_empty() {
            report.error(DockModelError::EmptyLeaf {
                panel: node.id.clone(),
            });
        }
        let focused = snapshot.focus.get(&node.id);
        if !focused.is_some_and(|page| pages.contains(page)) {
            report.error(DockModelError::FocusNotMember {
                panel: node.id.clone(),
                page: focused.cloned(),
            });
        }
        for page_id in pages {
            let Some(page) = snapshot.pages.get(page_id) else {
                report.error(DockModelError::MissingPage {
                    panel: node.id.clone(),
                    page: page_id.clone(),
                });
                continue;
            };
            if page.panel != node.id {
                report.error(DockModelError::PageOwnerMismatch {
                    page: page_id.clone(),
                    expected: node.id.clone(),
                    actual: page.panel.clone(),
                });
            }
            if listed.insert(page_id, &node.id).is_some() {
                report.error(DockModelError::PageListedTwice {
                    page: page_id.clone(),
                });
            }
        }
        if pages.iter().all(|page| snapshot.pages.contains_key(page))
            && !ordering::is_valid(pages, &snapshot.pages)
        {
            report.error(DockModelError::LockOrderViolated {
                panel: node.id.clone(),
            });
        }
    }
    for id in snapshot.page_lists.keys().chain(snapshot.focus.keys()) {
        if !snapshot.panels.contains_key(id) {
            report.error(DockModelError::StaleLeafBookkeeping { panel: id.clone() });
        }
    }
    for id in snapshot.measured.keys() {
        if !snapshot.panels.contains_key(id) {
            report.warning(DockModelError::StaleMeasurement { panel: id.clone() });
        }
    }
    for id in snapshot.pages.keys() {
        if !listed.contains_key(id) {
            report.error(DockModelError::OrphanPage { page: id.clone() });
        }
        if snapshot.panels.contains_key(&PanelId::new(id.as_str())) {
            report.error(DockModelError::IdCollision {
                id: id.as_str().to_owned(),
            });
        }
    }

    report
}

fn check_division(id: &PanelId, division: &Division, report: &mut InvariantReport) {
    if division.children.len() < 2 {
        report.error(DockModelError::TooFewChildren {
            panel: id.clone(),
            count: division.children.len(),
        });
    }
    if division.children.len() != division.proportions.len() {
        report.error(DockModelError::ProportionLengthMismatch {
            panel: id.clone(),
            children: division.children.len(),
            proportions: division.proportions.len(),
        });
        return;
    }
    for (index, share) in division.proportions.iter().enumerate() {
        if !(share.is_finite() && *share > 0.0) {
            report.error(DockModelError::NonPositiveProportion {
                panel: id.clone(),
                index,
                value: *share,
            });
        }
    }
    let sum: f64 = division.proportions.iter().sum();
    if (sum - 100.0).abs() > PROPORTION_EPSILON {
        report.error(DockModelError::ProportionSum {
            panel: id.clone(),
            sum,
        });
    }
}
