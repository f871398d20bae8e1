//! Error taxonomy for the dock engine.
//!
//! Two kinds of failure are kept apart:
//!
//! - [`DockFault`]: the caller broke a contract (unknown id, leaf used as a
//!   division, bad proportions). Never auto-corrected.
//! - [`Advisory`]: a policy rejection the user can trigger (closing a locked
//!   page, splitting a panel that has no room left). The input snapshot is
//!   kept and exactly one advisory is raised.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Axis, PageId, PanelId};

/// Result alias for engine operations.
pub type DockResult<T> = Result<T, DockError>;

/// Structural invariant violation found while validating a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum DockModelError {
    MissingRoot {
        root: PanelId,
    },
    RootHasParent {
        root: PanelId,
        parent: PanelId,
    },
    MissingChild {
        parent: PanelId,
        child: PanelId,
    },
    MultipleParents {
        child: PanelId,
        first: PanelId,
        second: PanelId,
    },
    ParentMismatch {
        panel: PanelId,
        expected: Option<PanelId>,
        actual: Option<PanelId>,
    },
    CycleDetected {
        panel: PanelId,
    },
    UnreachablePanel {
        panel: PanelId,
    },
    TooFewChildren {
        panel: PanelId,
        count: usize,
    },
    ProportionLengthMismatch {
        panel: PanelId,
        children: usize,
        proportions: usize,
    },
    NonPositiveProportion {
        panel: PanelId,
        index: usize,
        value: f64,
    },
    ProportionSum {
        panel: PanelId,
        sum: f64,
    },
    MissingPageList {
        panel: PanelId,
    },
    EmptyLeaf {
        panel: PanelId,
    },
    FocusNotMember {
        panel: PanelId,
        page: Option<PageId>,
    },
    MissingPage {
        panel: PanelId,
        page: PageId,
    },
    PageOwnerMismatch {
        page: PageId,
        expected: PanelId,
        actual: PanelId,
    },
    PageListedTwice {
        page: PageId,
    },
    OrphanPage {
        page: PageId,
    },
    LockOrderViolated {
        panel: PanelId,
    },
    IdCollision {
        id: String,
    },
    StaleLeafBookkeeping {
        panel: PanelId,
    },
    StaleMeasurement {
        panel: PanelId,
    },
}

impl DockModelError {
    /// Stable machine-readable code for reports and logs.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingRoot { .. } => "missing_root",
            Self::RootHasParent { .. } => "root_has_parent",
            Self::MissingChild { .. } => "missing_child",
            Self::MultipleParents { .. } => "multiple_parents",
            Self::ParentMismatch { .. } => "parent_mismatch",
            Self::CycleDetected { .. } => "cycle_detected",
            Self::UnreachablePanel { .. } => "unreachable_panel",
            Self::TooFewChildren { .. } => "too_few_children",
            Self::ProportionLengthMismatch { .. } => "proportion_length_mismatch",
            Self::NonPositiveProportion { .. } => "non_positive_proportion",
            Self::ProportionSum { .. } => "proportion_sum",
            Self::MissingPageList { .. } => "missing_page_list",
            Self::EmptyLeaf { .. } => "empty_leaf",
            Self::FocusNotMember { .. } => "focus_not_member",
            Self::MissingPage { .. } => "missing_page",
            Self::PageOwnerMismatch { .. } => "page_owner_mismatch",
            Self::PageListedTwice { .. } => "page_listed_twice",
            Self::OrphanPage { .. } => "orphan_page",
            Self::LockOrderViolated { .. } => "lock_order_violated",
            Self::IdCollision { .. } => "id_collision",
            Self::StaleLeafBookkeeping { .. } => "stale_leaf_bookkeeping",
            Self::StaleMeasurement { .. } => "stale_measurement",
        }
    }
}

impl fmt::Display for DockModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRoot { root } => write!(f, "root panel {root} not found"),
            Self::RootHasParent { root, parent } => {
                write!(f, "root panel {root} must not have parent {parent}")
            }
            Self::MissingChild { parent, child } => {
                write!(f, "division {parent} references missing child {child}")
            }
            Self::MultipleParents {
                child,
                first,
                second,
            } => write!(f, "panel {child} has multiple parents: {first} and {second}"),
            Self::ParentMismatch {
                panel,
                expected,
                actual,
            } => write!(
                f,
                "panel {panel} parent mismatch: expected {expected:?}, got {actual:?}"
            ),
            Self::CycleDetected { panel } => write!(f, "cycle detected at panel {panel}"),
            Self::UnreachablePanel { panel } => {
                write!(f, "panel {panel} is unreachable from root")
            }
            Self::TooFewChildren { panel, count } => {
                write!(f, "division {panel} has {count} children, needs at least 2")
            }
            Self::ProportionLengthMismatch {
                panel,
                children,
                proportions,
            } => write!(
                f,
                "division {panel} has {children} children but {proportions} proportions"
            ),
            Self::NonPositiveProportion {
                panel,
                index,
                value,
            } => write!(f, "division {panel} proportion {index} is not positive: {value}"),
            Self::ProportionSum { panel, sum } => {
                write!(f, "division {panel} proportions sum to {sum}, expected 100")
            }
            Self::MissingPageList { panel } => write!(f, "leaf {panel} has no page list"),
            Self::EmptyLeaf { panel } => write!(f, "leaf {panel} has no pages"),
            Self::FocusNotMember { panel, page } => {
                write!(f, "leaf {panel} focus {page:?} is not one of its pages")
            }
            Self::MissingPage { panel, page } => {
                write!(f, "leaf {panel} lists missing page {page}")
            }
            Self::PageOwnerMismatch {
                page,
                expected,
                actual,
            } => write!(
                f,
                "page {page} is listed in {expected} but claims owner {actual}"
            ),
            Self::PageListedTwice { page } => write!(f, "page {page} is listed more than once"),
            Self::OrphanPage { page } => write!(f, "page {page} is not listed in any leaf"),
            Self::LockOrderViolated { panel } => {
                write!(f, "leaf {panel} has an unlocked page before a locked one")
            }
            Self::IdCollision { id } => write!(f, "id {id} is used by both a panel and a page"),
            Self::StaleLeafBookkeeping { panel } => {
                write!(f, "leaf tables hold an entry for non-leaf {panel}")
            }
            Self::StaleMeasurement { panel } => {
                write!(f, "measurement recorded for non-leaf {panel}")
            }
        }
    }
}

impl std::error::Error for DockModelError {}

/// Which id namespace a generated id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdKind {
    Panel,
    Page,
}

impl IdKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Panel => "panel",
            Self::Page => "page",
        }
    }
}

/// Contract violation by the caller, or an internal consistency failure.
#[derive(Debug, Clone, PartialEq)]
pub enum DockFault {
    MissingPanel {
        panel: PanelId,
    },
    MissingPage {
        page: PageId,
    },
    NotLeaf {
        panel: PanelId,
    },
    NotDivision {
        panel: PanelId,
    },
    ChildNotUnderParent {
        parent: PanelId,
        child: PanelId,
    },
    PageNotInPanel {
        panel: PanelId,
        page: PageId,
    },
    ProportionLengthMismatch {
        panel: PanelId,
        expected: usize,
        actual: usize,
    },
    InvalidProportions {
        panel: PanelId,
        sum: f64,
    },
    DegenerateDivision {
        panel: PanelId,
        children: usize,
    },
    InvalidMoveTarget {
        target: PanelId,
    },
    NoParent {
        panel: PanelId,
    },
    InvalidHandle {
        panel: PanelId,
        handle_index: usize,
        children: usize,
    },
    DuplicateMenuKey {
        page: PageId,
        key: String,
    },
    IdExhausted {
        kind: IdKind,
        attempts: u32,
    },
    Validation(DockModelError),
}

impl fmt::Display for DockFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPanel { panel } => write!(f, "panel {panel} not found"),
            Self::MissingPage { page } => write!(f, "page {page} not found"),
            Self::NotLeaf { panel } => write!(f, "panel {panel} is not a leaf"),
            Self::NotDivision { panel } => write!(f, "panel {panel} is not a division"),
            Self::ChildNotUnderParent { parent, child } => {
                write!(f, "division {parent} does not reference child {child}")
            }
            Self::PageNotInPanel { panel, page } => {
                write!(f, "page {page} is not hosted by leaf {panel}")
            }
            Self::ProportionLengthMismatch {
                panel,
                expected,
                actual,
            } => write!(
                f,
                "division {panel} expects {expected} proportions, got {actual}"
            ),
            Self::InvalidProportions { panel, sum } => write!(
                f,
                "division {panel} proportions must be positive and sum to 100, got {sum}"
            ),
            Self::DegenerateDivision { panel, children } => {
                write!(f, "division {panel} has only {children} children")
            }
            Self::InvalidMoveTarget { target } => write!(
                f,
                "move target {target} must be a leaf outside the destroyed subtree"
            ),
            Self::NoParent { panel } => write!(f, "panel {panel} has no parent division"),
            Self::InvalidHandle {
                panel,
                handle_index,
                children,
            } => write!(
                f,
                "division {panel} has no handle {handle_index} ({children} children)"
            ),
            Self::DuplicateMenuKey { page, key } => {
                write!(f, "page {page} menu repeats key {key:?}")
            }
            Self::IdExhausted { kind, attempts } => write!(
                f,
                "no unique {} id after {attempts} attempts",
                kind.as_str()
            ),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DockFault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Self::Validation(err) = self {
            return Some(err);
        }
        None
    }
}

impl From<DockModelError> for DockFault {
    fn from(err: DockModelError) -> Self {
        Self::Validation(err)
    }
}

/// Kinds of user-facing policy rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdvisoryKind {
    SplitSpaceExhausted,
    CannotCloseDefaultPage,
    CannotCloseLockedPage,
    LockedPageCannotLeavePanel,
    MoveViolatesLockOrder,
    CannotCreatePanelFromLockedPage,
}

impl AdvisoryKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SplitSpaceExhausted => "split-space-exhausted",
            Self::CannotCloseDefaultPage => "cannot-close-default-page",
            Self::CannotCloseLockedPage => "cannot-close-locked-page",
            Self::LockedPageCannotLeavePanel => "locked-page-cannot-leave-panel",
            Self::MoveViolatesLockOrder => "move-violates-lock-order",
            Self::CannotCreatePanelFromLockedPage => "cannot-create-panel-from-locked-page",
        }
    }
}

impl fmt::Display for AdvisoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context attached to an advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdvisoryPayload {
    Page { page: PageId, name: String },
    Axis { panel: PanelId, axis: Axis },
}

/// A policy rejection raised to the advisory channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub payload: AdvisoryPayload,
}

impl Advisory {
    #[must_use]
    pub fn page(kind: AdvisoryKind, page: PageId, name: impl Into<String>) -> Self {
        Self {
            kind,
            payload: AdvisoryPayload::Page {
                page,
                name: name.into(),
            },
        }
    }

    #[must_use]
    pub fn axis(kind: AdvisoryKind, panel: PanelId, axis: Axis) -> Self {
        Self {
            kind,
            payload: AdvisoryPayload::Axis { panel, axis },
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            AdvisoryPayload::Page { page, name } => {
                write!(f, "{}: page {page} ({name})", self.kind)
            }
            AdvisoryPayload::Axis { panel, axis } => {
                write!(f, "{}: {axis} split of {panel}", self.kind)
            }
        }
    }
}

/// Failure of a dock operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DockError {
    /// Policy said no; the input snapshot stays current.
    Rejected(Advisory),
    /// The caller broke a contract.
    Fault(DockFault),
}

impl DockError {
    #[must_use]
    pub const fn advisory(&self) -> Option<&Advisory> {
        match self {
            Self::Rejected(advisory) => Some(advisory),
            Self::Fault(_) => None,
        }
    }

    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }
}

impl fmt::Display for DockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(advisory) => write!(f, "rejected: {advisory}"),
            Self::Fault(fault) => write!(f, "fault: {fault}"),
        }
    }
}

impl std::error::Error for DockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rejected(_) => None,
            Self::Fault(fault) => Some(fault),
        }
    }
}

impl From<DockFault> for DockError {
    fn from(fault: DockFault) -> Self {
        Self::Fault(fault)
    }
}

impl From<DockModelError> for DockError {
    fn from(err: DockModelError) -> Self {
        Self::Fault(DockFault::Validation(err))
    }
}

impl From<Advisory> for DockError {
    fn from(advisory: Advisory) -> Self {
        Self::Rejected(advisory)
    }
}
