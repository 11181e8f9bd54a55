//! Console event log for chanmap.
//!
//! An append-only record of applied and rejected edits and of commit
//! attempts, written as JSONL.
//!
//! # Example
//!
//! ```
//! use chanmap_events::EventLog;
//! use chanmap_types::{ConsoleEvent, EventType};
//!
//! let mut log = EventLog::new();
//! log.record(ConsoleEvent::now(EventType::EditsReverted, None));
//! assert_eq!(log.len(), 1);
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chanmap_types::{ConsoleEvent, EventType};

/// Default events file name
pub const EVENTS_FILE: &str = "events.jsonl";

/// Events file path inside a state directory
pub fn events_path(state_dir: &Path) -> PathBuf {
    state_dir.join(EVENTS_FILE)
}

/// Append-only event log of console activity.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<ConsoleEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Record an event
    pub fn record(&mut self, event: ConsoleEvent) {
        self.events.push(event);
    }

    /// Append the recorded events to `path`, one JSON object per line.
    /// Nothing is touched when the log is empty.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        if self.events.is_empty() {
            return Ok(());
        }
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create state dir {}", dir.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open events file {}", path.display()))?;
        let mut out = BufWriter::new(file);
        for event in &self.events {
            serde_json::to_writer(&mut out, event).context("failed to encode console event")?;
            out.write_all(b"\n").context("failed to write events file")?;
        }
        out.flush().context("failed to flush events file")
    }

    /// Load an events file. A missing file is an empty log; blank lines
    /// are skipped.
    pub fn read_from_file(path: &Path) -> Result<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to open events file {}", path.display()));
            }
        };

        let mut log = Self::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("failed to read {}", path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            let event = serde_json::from_str(&line)
                .with_context(|| format!("{}:{}: invalid console event", path.display(), index + 1))?;
            log.record(event);
        }
        Ok(log)
    }

    /// Events about one channel, by its full name.
    pub fn events_for_channel(&self, channel: &str) -> Vec<&ConsoleEvent> {
        self.events
            .iter()
            .filter(|e| e.channel.as_deref() == Some(channel))
            .collect()
    }

    /// The most recent commit outcome, if any commit finished.
    pub fn last_commit_outcome(&self) -> Option<&ConsoleEvent> {
        self.events.iter().rev().find(|e| {
            matches!(
                e.event_type,
                EventType::CommitSucceeded { .. } | EventType::CommitFailed { .. }
            )
        })
    }

    /// Get all events
    pub fn all_events(&self) -> &[ConsoleEvent] {
        &self.events
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
