#![forbid(unsafe_code)]

//! Panel/tab docking tree.
//!
//! A dock is a tree of panels: divisions split their extent between children
//! along one axis, leaves host an ordered list of pages (tabs) with one of them
//! focused. [`DockEngine`] turns one immutable [`DockSnapshot`] into the next
//! (split, close, move, collapse, resize, lock) and every result satisfies the
//! tree, proportion and locked-prefix invariants or is not produced at all.
//!
//! [`Workspace`] is the host-facing handle: it owns the current snapshot,
//! commits transitions and talks to the measurement, advisory and snapshot
//! collaborators declared in [`notify`].

pub mod config;
pub mod engine;
pub mod error;
pub mod feasibility;
pub mod ids;
pub mod model;
pub mod notify;
pub mod ordering;
pub mod proportion;
pub mod workspace;

pub use config::{ConfigError, DockConfig};
pub use engine::{CloseDirection, Disposition, DockEngine, MoveMode, system_clock};
pub use error::{
    Advisory, AdvisoryKind, AdvisoryPayload, DockError, DockFault, DockModelError, DockResult,
    IdKind,
};
pub use ids::IdGenerator;
pub use model::{
    Axis, Division, DockSnapshot, InsertPosition, InvariantIssue, InvariantReport,
    InvariantSeverity, MenuEntry, NewPage, Page, PageId, PagePatch, PageRender, PanelId,
    PanelKind, PanelNode, PanelRect, WorkspaceId,
};
pub use notify::{AdvisoryChannel, MeasurementService, Notifier, SnapshotDiff, SnapshotStore};
pub use workspace::{PanelView, Workspace};
