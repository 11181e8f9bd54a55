use std::path::Path;

use anyhow::{Context, Result};
use chanmap_types::Snapshot;

/// Parse the inbound snapshot payload.
pub fn parse_snapshot(json: &str) -> Result<Snapshot> {
    serde_json::from_str(json).context("failed to parse snapshot JSON")
}

/// Load a snapshot saved to disk.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot file: {}", path.display()))?;
    parse_snapshot(&content).with_context(|| format!("invalid snapshot in {}", path.display()))
}
