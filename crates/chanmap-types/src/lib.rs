//! Core domain types for chanmap.
//!
//! This crate provides the fundamental types shared by the release console:
//! revisions, channels, the server-confirmed channel map, the inbound
//! snapshot and the event types recorded by the console.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

mod catalog;
mod channel;
mod server;

pub use catalog::RevisionCatalog;
pub use channel::{Branch, Channel, ChannelParseError, LATEST_TRACK, Risk, track_order};
pub use server::ServerState;

/// CPU architecture tag, e.g. `amd64` or `arm64`.
pub type Architecture = String;

/// Revision number assigned by the store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RevisionId(pub u64);

impl std::fmt::Display for RevisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RevisionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Snap confinement level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confinement {
    #[default]
    Strict,
    Classic,
    Devmode,
}

/// Snap grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    #[default]
    Stable,
    Devel,
}

/// Live progressive rollout state of a released cell, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressiveStatus {
    /// Target share of installs (1..=100)
    pub percentage: u8,
    /// Share already delivered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_percentage: Option<u8>,
    #[serde(default)]
    pub paused: bool,
}

impl ProgressiveStatus {
    /// A rollout is active until it reaches 100%.
    pub fn is_active(&self) -> bool {
        self.percentage < 100
    }
}

/// The most recent release of a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDescriptor {
    pub channel: Channel,
    pub when: DateTime<Utc>,
    #[serde(default)]
    pub is_progressive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progressive: Option<ProgressiveStatus>,
}

/// An uploaded revision. Read-only once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub revision: RevisionId,
    pub version: String,
    pub architectures: BTreeSet<Architecture>,
    #[serde(default)]
    pub confinement: Confinement,
    #[serde(default)]
    pub grade: Grade,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<ReleaseDescriptor>,
    /// Channels this revision is currently live on
    #[serde(default)]
    pub channels: BTreeSet<Channel>,
}

impl Revision {
    /// Devmode confinement or devel grade keeps a revision out of
    /// `stable` and `candidate`.
    pub fn is_restricted(&self) -> bool {
        self.confinement == Confinement::Devmode || self.grade == Grade::Devel
    }

    /// Whether the revision was built for `architecture`.
    pub fn builds_for(&self, architecture: &str) -> bool {
        self.architectures.contains(architecture)
    }

    /// Never released to any channel.
    pub fn is_unreleased(&self) -> bool {
        self.channels.is_empty()
    }
}

/// A released cell in the channel map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionRef {
    pub revision: RevisionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progressive: Option<ProgressiveStatus>,
}

impl RevisionRef {
    /// A cell holding `revision` with no rollout.
    pub fn new(revision: RevisionId) -> Self {
        Self {
            revision,
            progressive: None,
        }
    }

    /// The live progressive rollout, when one is still below 100%.
    pub fn active_progressive(&self) -> Option<ProgressiveStatus> {
        self.progressive.filter(ProgressiveStatus::is_active)
    }
}

/// Revision per architecture for one channel.
pub type Assignments = BTreeMap<Architecture, RevisionId>;

/// The server-confirmed channel map: channel → architecture → released cell.
pub type ChannelMap = BTreeMap<Channel, BTreeMap<Architecture, RevisionRef>>;

/// Channel → architecture → revision, without rollout data. This is the
/// shape of every resolved (live or pending) view.
pub type ResolvedChannels = BTreeMap<Channel, Assignments>;

/// One entry of the release history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    pub revision: RevisionId,
    pub channel: Channel,
    pub architecture: Architecture,
    pub when: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progressive: Option<ProgressiveStatus>,
}

/// Display options carried in the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_track: Option<String>,
}

/// Server-supplied state, consumed once on load and again after every
/// successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub revisions: Vec<Revision>,
    pub channel_map: ChannelMap,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub releases: Vec<ReleaseRecord>,
    #[serde(default)]
    pub options: SnapshotOptions,
}

/// Runtime knobs consumed by the rule engine and the views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Lowest percentage a fresh progressive release may be set to
    pub min_progressive_percentage: u8,
    /// How long a branch stays visible after its last release
    pub branch_lifetime: TimeDelta,
    /// Trailing window for the `recent` available-revisions filter
    pub recent_window: TimeDelta,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            min_progressive_percentage: 1,
            branch_lifetime: TimeDelta::days(30),
            recent_window: TimeDelta::days(7),
        }
    }
}

/// Event types for the console event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventType {
    /// An edit passed validation and changed the pending state
    EditApplied { edit: String },
    /// An edit was refused by the rule engine
    EditRejected { edit: String, reason: String },
    /// All pending edits were discarded
    EditsReverted,
    /// A commit request was dispatched
    CommitStarted {
        releases: usize,
        closes: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_track: Option<String>,
    },
    /// The server accepted the commit
    CommitSucceeded { releases: usize, closes: usize },
    /// The commit failed; pending edits were kept
    CommitFailed { message: String },
    /// The server state was replaced
    SnapshotReplaced { dropped: usize },
}

/// An entry of the console event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event_type: EventType,
    /// Channel the event relates to, when it relates to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl ConsoleEvent {
    /// An event stamped with the current time.
    pub fn now(event_type: EventType, channel: Option<&Channel>) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            channel: channel.map(ToString::to_string),
        }
    }
}
