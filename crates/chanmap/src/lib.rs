//! # chanmap
//!
//! The release/channel management engine behind a snap's "Releases" page.
//!
//! chanmap tracks the server-confirmed channel map (which revision is live
//! on which track, risk, branch and architecture), a user's uncommitted
//! edits on top of it, and the rules deciding which edits are legal before
//! they go to the backend as one atomic commit.
//!
//! ## Pipeline
//!
//! 1. A [`types::Snapshot`] is loaded into a [`ReleaseConsole`].
//! 2. Edits ([`pending::Edit`]) are validated by the [`rules`] and queued
//!    in the pending store; a rejection leaves the store untouched.
//! 3. The [`views`] project the pending state: the pending channel map,
//!    the confirmation buckets, available revisions and rollout controls.
//! 4. [`ReleaseConsole::begin_commit`] freezes the edits into one
//!    [`commit::CommitRequest`]; the answer is folded back in with
//!    [`ReleaseConsole::complete_commit`].
//!
//! ## Example
//!
//! ```
//! use chanmap::{ReleaseConsole, types::{Channel, EngineOptions, RevisionId}};
//!
//! let snapshot = chanmap::parse_snapshot(r#"{
//!     "revisions": [{"revision": 3, "version": "1.0", "architectures": ["amd64"],
//!                    "createdAt": "2024-01-01T00:00:00Z"}],
//!     "channelMap": {"latest/edge": {"amd64": {"revision": 3}}}
//! }"#).unwrap();
//!
//! let mut console = ReleaseConsole::from_snapshot(snapshot, EngineOptions::default());
//! let edge: Channel = "edge".parse().unwrap();
//! let beta: Channel = "beta".parse().unwrap();
//!
//! console.promote(edge, beta.clone()).unwrap();
//! let changes = console.separated_pending_changes();
//! assert_eq!(changes.new_releases.len(), 1);
//! assert_eq!(changes.new_releases[0].revision, RevisionId(3));
//! assert_eq!(changes.new_releases[0].channel, beta);
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Channels, risks, revisions, the snapshot and server state
//! - [`rules`] - Promotion, close, drop, progressive and default-track rules
//! - [`pending`] - The pending edit store and the edit vocabulary
//! - [`views`] - Derived read-only projections
//! - [`commit`] - Commit request, state machine and HTTP transport
//! - [`events`] - Append-only JSONL console event log
//! - [`config`] - `.chanmap.toml` loading and merging

mod console;
mod handle;
mod setup;
mod snapshot;

pub use console::ReleaseConsole;
pub use handle::ConsoleHandle;
pub use setup::{default_available_filter, http_transport};
pub use snapshot::{load_snapshot, parse_snapshot};

/// Re-exported from chanmap-types microcrate.
pub use chanmap_types as types;

/// Re-exported from chanmap-rules microcrate.
pub use chanmap_rules as rules;

/// Re-exported from chanmap-pending microcrate.
pub use chanmap_pending as pending;

/// Re-exported from chanmap-views microcrate.
pub use chanmap_views as views;

/// Re-exported from chanmap-commit microcrate.
pub use chanmap_commit as commit;

/// Re-exported from chanmap-events microcrate.
pub use chanmap_events as events;

/// Re-exported from chanmap-config microcrate.
pub use chanmap_config as config;
