#![no_main]

use chanmap::ReleaseConsole;
use chanmap_commit::CommitRequest;
use chanmap_pending::Edit;
use chanmap_types::{EngineOptions, Snapshot};
use libfuzzer_sys::fuzz_target;

const SNAPSHOT: &str = r#"{
    "revisions": [
        {"revision": 1, "version": "1.0", "architectures": ["amd64", "arm64"], "createdAt": "2024-01-01T00:00:00Z"},
        {"revision": 2, "version": "1.1", "architectures": ["amd64"], "confinement": "devmode", "createdAt": "2024-01-02T00:00:00Z"},
        {"revision": 3, "version": "1.2", "architectures": ["arm64"], "createdAt": "2024-01-03T00:00:00Z"}
    ],
    "channelMap": {
        "latest/stable": {"amd64": {"revision": 1, "progressive": {"percentage": 40}}},
        "latest/edge": {"amd64": {"revision": 2}, "arm64": {"revision": 3}}
    },
    "releases": [
        {"revision": 1, "channel": "latest/stable", "architecture": "amd64", "when": "2024-01-04T00:00:00Z"}
    ],
    "tracks": ["latest", "2.0"]
}"#;

fuzz_target!(|data: &[u8]| {
    let Ok(edits) = serde_json::from_slice::<Vec<Edit>>(data) else {
        return;
    };
    let snapshot: Snapshot = serde_json::from_str(SNAPSHOT).expect("fixture");
    let mut console = ReleaseConsole::from_snapshot(snapshot, EngineOptions::default());

    for edit in edits {
        let before = console.store().edits().clone();
        if console.apply(edit).is_err() {
            assert_eq!(console.store().edits(), &before);
        }

        // No channel is both closing and receiving a release
        let pending = console.store().edits();
        for release in pending.releases() {
            assert!(!pending.closes().contains(&release.channel));
        }

        let request = CommitRequest::build(console.server(), pending);
        assert_eq!(request.release_count(), pending.release_count());
    }
});
