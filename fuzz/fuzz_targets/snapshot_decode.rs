#![no_main]

use chanmap_types::{ServerState, Snapshot};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(snapshot) = serde_json::from_slice::<Snapshot>(data) {
        let json = serde_json::to_string(&snapshot).expect("serialize");
        let parsed: Snapshot = serde_json::from_str(&json).expect("reparse");
        assert_eq!(snapshot, parsed);

        let server = ServerState::from_snapshot(snapshot);
        assert!(server.has_track("latest"));
        let _ = server.resolved();
    }
});
