#![no_main]

use ftui_dock::DockSnapshot;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(snapshot) = serde_json::from_slice::<DockSnapshot>(data) else {
        return;
    };

    // Diagnostics must never panic on arbitrary (possibly cyclic) trees.
    let report = snapshot.invariant_report();
    let validated = snapshot.validate();
    assert_eq!(report.has_errors(), validated.is_err());

    let _ = snapshot.state_hash();
    let _ = snapshot.measured_bounds();
    if validated.is_ok() {
        let root = snapshot.root.clone();
        let _ = snapshot.rendered_rect(&root);
        let _ = snapshot.pages_under(&root);
    }
});
