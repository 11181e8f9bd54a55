//! Release legality rules for chanmap.
//!
//! Pure functions over a [`ChannelView`] (the server channel map merged
//! with the pending overlays). Nothing here mutates state; the pending
//! store calls these before every mutation and refuses the edit when
//! they return a [`Rejection`].
//!
//! # Example
//!
//! ```
//! use chanmap_rules::{ChannelView, legal_promotion_targets};
//! use chanmap_types::{Assignments, Channel, Risk, ServerState};
//! use std::collections::BTreeSet;
//!
//! let server = ServerState::default();
//! let selection = Assignments::new();
//! let closes = BTreeSet::new();
//! let view = ChannelView::new(&server, server.resolved(), &selection, &closes);
//!
//! let targets = legal_promotion_targets(&view, &Channel::new("latest", Risk::Edge));
//! assert_eq!(targets.len(), 3);
//! assert!(targets.iter().all(|t| t.is_disabled()));
//! ```

use std::collections::BTreeSet;

use chanmap_types::{Assignments, Channel, LATEST_TRACK, ResolvedChannels, Revision, ServerState};

mod closing;
mod error;
mod progressive;
mod promotion;
mod tracks;

pub use closing::{can_close, check_close};
pub use error::{DisabledReason, Rejection};
pub use progressive::{PercentageRange, ProgressiveKind, check_percentage, progressive_direction};
pub use promotion::{
    PromotionTarget, can_drop_revision, check_drop_revision, check_promotion,
    legal_promotion_targets,
};
pub use tracks::check_default_track;

/// Read-only view the rules evaluate against.
///
/// `resolved` is the pending channel map: live assignments overlaid with
/// pending releases, pending-closed channels removed. The `available`
/// pseudo-channel of any track resolves to the current selection.
#[derive(Debug, Clone)]
pub struct ChannelView<'a> {
    server: &'a ServerState,
    resolved: ResolvedChannels,
    selection: &'a Assignments,
    pending_closes: &'a BTreeSet<Channel>,
    pending_default_track: Option<&'a str>,
    expired: BTreeSet<Channel>,
}

impl<'a> ChannelView<'a> {
    /// A view with no default-track change pending and no expired
    /// branches.
    pub fn new(
        server: &'a ServerState,
        resolved: ResolvedChannels,
        selection: &'a Assignments,
        pending_closes: &'a BTreeSet<Channel>,
    ) -> Self {
        Self {
            server,
            resolved,
            selection,
            pending_closes,
            pending_default_track: None,
            expired: BTreeSet::new(),
        }
    }

    /// Evaluate with a default-track change pending.
    pub fn with_pending_default_track(mut self, track: Option<&'a str>) -> Self {
        self.pending_default_track = track;
        self
    }

    /// Treat `expired` branches as gone: they can neither be promoted from
    /// nor released into.
    pub fn with_expired_branches(mut self, expired: BTreeSet<Channel>) -> Self {
        self.expired = expired;
        self
    }

    pub fn server(&self) -> &'a ServerState {
        self.server
    }

    /// The pending channel map.
    pub fn resolved(&self) -> &ResolvedChannels {
        &self.resolved
    }

    /// Revision per architecture currently resolved in `channel`.
    pub fn assignments(&self, channel: &Channel) -> Assignments {
        if channel.is_available() {
            return self.selection.clone();
        }
        self.resolved.get(channel).cloned().unwrap_or_default()
    }

    pub fn is_pending_close(&self, channel: &Channel) -> bool {
        self.pending_closes.contains(channel)
    }

    pub fn pending_default_track(&self) -> Option<&'a str> {
        self.pending_default_track
    }

    /// Whether a pending default-track change away from `latest` requires
    /// the `latest` track to stay empty.
    pub fn latest_must_stay_empty(&self) -> bool {
        self.pending_default_track
            .is_some_and(|track| track != LATEST_TRACK)
    }

    /// Whether `channel` is a branch past its lifetime.
    pub fn is_expired(&self, channel: &Channel) -> bool {
        self.expired.contains(channel)
    }

    /// Catalog entries for the revisions resolved in `channel`. Unknown
    /// revision ids are skipped.
    pub fn revisions_in(&self, channel: &Channel) -> Vec<&'a Revision> {
        let server = self.server;
        self.assignments(channel)
            .values()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| server.revision(*id))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::{BTreeMap, BTreeSet};

    use chanmap_types::{
        Channel, ChannelMap, Confinement, Grade, ProgressiveStatus, Revision, RevisionId,
        RevisionRef, ServerState, Snapshot,
    };
    use chrono::{DateTime, Utc};

    pub fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    pub fn revision(id: u64, arches: &[&str], confinement: Confinement, grade: Grade) -> Revision {
        Revision {
            revision: RevisionId(id),
            version: format!("1.{id}"),
            architectures: arches.iter().map(|a| a.to_string()).collect(),
            confinement,
            grade,
            created_at: ts("2024-01-01T00:00:00Z"),
            build_request_id: None,
            release: None,
            channels: BTreeSet::new(),
        }
    }

    pub fn strict(id: u64, arches: &[&str]) -> Revision {
        revision(id, arches, Confinement::Strict, Grade::Stable)
    }

    pub fn ch(s: &str) -> Channel {
        Channel::parse(s).unwrap()
    }

    /// Build a server state from `(channel, arch, revision, progressive %)`.
    pub fn server(
        revisions: Vec<Revision>,
        cells: &[(&str, &str, u64, Option<u8>)],
    ) -> ServerState {
        let mut channel_map = ChannelMap::new();
        for (channel, arch, rev, pct) in cells {
            channel_map.entry(ch(channel)).or_insert_with(BTreeMap::new).insert(
                arch.to_string(),
                RevisionRef {
                    revision: RevisionId(*rev),
                    progressive: pct.map(|percentage| ProgressiveStatus {
                        percentage,
                        current_percentage: None,
                        paused: false,
                    }),
                },
            );
        }
        ServerState::from_snapshot(Snapshot {
            revisions,
            channel_map,
            ..Snapshot::default()
        })
    }
}
