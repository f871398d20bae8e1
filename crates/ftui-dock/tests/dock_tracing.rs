#![forbid(unsafe_code)]

//! Tracing output of dock operations.
//!
//! Every engine operation runs inside a `dock.op` span; applied, rejected and
//! failed operations log at debug, info and error level respectively.
//!
//! Run:
//!   cargo test -p ftui-dock --test dock_tracing

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ftui_dock::{Axis, DockConfig, DockEngine, InsertPosition, PageId, PanelId, WorkspaceId};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    message: String,
    fields: HashMap<String, String>,
    span: Option<String>,
    span_target: Option<String>,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for EventCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.get("message").cloned().unwrap_or_default();
        let current = ctx.current_span().id().and_then(|id| ctx.span(id));
        let span = current.as_ref().map(|span| span.name().to_string());
        let span_target = current.as_ref().map(|span| span.metadata().target().to_string());
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message,
            fields,
            span,
            span_target,
        });
    }
}

fn capture<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(EventCapture {
            events: events.clone(),
        });
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

fn engine() -> DockEngine {
    DockEngine::new(DockConfig::default().with_seed(99))
        .expect("valid config")
        .with_clock(|| 0)
}

fn dock_events(events: &[CapturedEvent]) -> Vec<&CapturedEvent> {
    events
        .iter()
        .filter(|event| event.target == "ftui.dock")
        .collect()
}

#[test]
fn applied_operation_logs_hashes_inside_span() {
    let mut engine = engine();
    let snapshot = engine
        .initial_snapshot(WorkspaceId::from("ws"))
        .expect("snapshot");
    let root = snapshot.root.clone();
    let events = capture(|| {
        engine
            .divide_panel(&snapshot, &root, Axis::Horizontal, InsertPosition::After, None, None)
            .expect("divide");
    });
    let applied = dock_events(&events)
        .into_iter()
        .find(|event| event.message == "dock operation applied")
        .expect("applied event");
    assert_eq!(applied.level, tracing::Level::DEBUG);
    assert_eq!(applied.span.as_deref(), Some("dock.op"));
    assert_eq!(applied.span_target.as_deref(), Some("ftui.dock"));
    assert_eq!(applied.fields.get("op").map(String::as_str), Some("divide_panel"));
    assert!(applied.fields.contains_key("before_hash"));
    assert!(applied.fields.contains_key("after_hash"));
    assert_ne!(applied.fields["before_hash"], applied.fields["after_hash"]);
}

#[test]
fn rejection_logs_at_info_with_kind() {
    let mut engine = engine();
    let snapshot = engine
        .initial_snapshot(WorkspaceId::from("ws"))
        .expect("snapshot");
    let root = snapshot.root.clone();
    let page = snapshot.pages_of(&root).expect("pages")[0].clone();
    let events = capture(|| {
        let _ = engine.close_page(&snapshot, &root, &page);
    });
    let rejected = dock_events(&events)
        .into_iter()
        .find(|event| event.message == "dock operation rejected")
        .expect("rejected event");
    assert_eq!(rejected.level, tracing::Level::INFO);
    assert_eq!(
        rejected.fields.get("kind").map(String::as_str),
        Some("cannot-close-default-page")
    );
}

#[test]
fn fault_logs_at_error() {
    let mut engine = engine();
    let snapshot = engine
        .initial_snapshot(WorkspaceId::from("ws"))
        .expect("snapshot");
    let events = capture(|| {
        let _ = engine.focus_page(&snapshot, &PanelId::from("ghost"), &PageId::from("ghost"));
    });
    let failed = dock_events(&events)
        .into_iter()
        .find(|event| event.level == tracing::Level::ERROR)
        .expect("error event");
    assert_eq!(failed.message, "dock operation failed");
    assert!(failed.fields["fault"].contains("ghost"));
}

#[test]
fn redundant_lock_warns() {
    let mut engine = engine();
    let snapshot = engine
        .initial_snapshot(WorkspaceId::from("ws"))
        .expect("snapshot");
    let page = snapshot.pages_of(&snapshot.root).expect("pages")[0].clone();
    let events = capture(|| {
        engine
            .set_page_lock(&snapshot, &page, false)
            .expect("no-op");
    });
    assert!(
        dock_events(&events)
            .iter()
            .any(|event| event.level == tracing::Level::WARN
                && event.message == "page already in requested lock state")
    );
}
