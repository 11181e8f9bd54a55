use std::collections::{BTreeMap, BTreeSet};

use chanmap_types::{Architecture, Channel, ResolvedChannels, RevisionId, ServerState};
use serde::{Deserialize, Serialize};

/// Pending rollout settings of a queued release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingProgressive {
    /// Target share of installs, 100 meaning a full release
    pub percentage: u8,
    #[serde(default)]
    pub paused: bool,
}

impl PendingProgressive {
    /// A full (100%), unpaused release.
    pub fn full() -> Self {
        Self {
            percentage: 100,
            paused: false,
        }
    }

    /// Below 100% the release is sent as a progressive rollout.
    pub fn is_partial(&self) -> bool {
        self.percentage < 100
    }
}

/// A queued, uncommitted release of one revision into one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRelease {
    pub revision: RevisionId,
    pub channel: Channel,
    pub architecture: Architecture,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progressive: Option<PendingProgressive>,
    /// Set when cancelling a rollout: the live revision being reverted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<RevisionId>,
}

impl PendingRelease {
    /// A plain release of `revision` into one cell.
    pub fn new(channel: Channel, architecture: Architecture, revision: RevisionId) -> Self {
        Self {
            revision,
            channel,
            architecture,
            progressive: None,
            replaces: None,
        }
    }

    /// Whether this entry adjusts a rollout that is already live in its
    /// cell (same revision, live progressive, not a cancellation).
    pub fn is_progressive_update(&self, server: &ServerState) -> bool {
        self.replaces.is_none()
            && self.progressive.is_some()
            && server
                .cell(&self.channel, &self.architecture)
                .is_some_and(|c| c.revision == self.revision && c.active_progressive().is_some())
    }
}

/// Key of a pending release: the target cell.
pub type CellKey = (Channel, Architecture);

/// The client-only overlay on top of the server channel map.
///
/// Invariants: at most one pending release per cell, and no channel is
/// both a release target and pending close.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingEdits {
    pub(crate) releases: BTreeMap<CellKey, PendingRelease>,
    pub(crate) closes: BTreeSet<Channel>,
    pub(crate) default_track: Option<String>,
}

impl PendingEdits {
    /// An empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// No releases, closes or default-track change pending.
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty() && self.closes.is_empty() && self.default_track.is_none()
    }

    /// Pending releases in canonical channel order, then architecture.
    pub fn releases(&self) -> impl Iterator<Item = &PendingRelease> {
        self.releases.values()
    }

    /// Pending release of one cell.
    pub fn release(&self, channel: &Channel, architecture: &str) -> Option<&PendingRelease> {
        self.releases
            .get(&(channel.clone(), architecture.to_string()))
    }

    /// Pending releases targeting `channel`.
    pub fn releases_in<'a>(
        &'a self,
        channel: &'a Channel,
    ) -> impl Iterator<Item = &'a PendingRelease> + 'a {
        self.releases
            .values()
            .filter(move |r| &r.channel == channel)
    }

    /// Channels queued for closing.
    pub fn closes(&self) -> &BTreeSet<Channel> {
        &self.closes
    }

    /// The pending default track, if a change is queued.
    pub fn default_track(&self) -> Option<&str> {
        self.default_track.as_deref()
    }

    pub fn release_count(&self) -> usize {
        self.releases.len()
    }

    /// Server assignments overlaid with every pending release; channels
    /// pending close are removed.
    pub fn overlay(&self, server: &ServerState) -> ResolvedChannels {
        let mut resolved = server.resolved();
        for channel in &self.closes {
            resolved.remove(channel);
        }
        for release in self.releases.values() {
            resolved
                .entry(release.channel.clone())
                .or_default()
                .insert(release.architecture.clone(), release.revision);
        }
        resolved
    }

    pub(crate) fn insert(&mut self, release: PendingRelease) {
        self.closes.remove(&release.channel);
        self.releases.insert(
            (release.channel.clone(), release.architecture.clone()),
            release,
        );
    }

    pub(crate) fn remove(&mut self, channel: &Channel, architecture: &str) -> Option<PendingRelease> {
        self.releases
            .remove(&(channel.clone(), architecture.to_string()))
    }

    pub(crate) fn remove_channel(&mut self, channel: &Channel) -> usize {
        let before = self.releases.len();
        self.releases.retain(|(ch, _), _| ch != channel);
        before - self.releases.len()
    }

    pub(crate) fn clear(&mut self) {
        self.releases.clear();
        self.closes.clear();
        self.default_track = None;
    }

    /// Remove what `committed` carried, keeping edits made since.
    ///
    /// An entry survives when it differs from the committed one for the
    /// same cell, so a percentage changed during the commit is kept.
    pub(crate) fn settle(&mut self, committed: &PendingEdits) {
        self.releases
            .retain(|key, release| committed.releases.get(key) != Some(release));
        self.closes.retain(|ch| !committed.closes.contains(ch));
        if self.default_track.is_some() && self.default_track == committed.default_track {
            self.default_track = None;
        }
    }

    /// Drop entries the server state makes meaningless. Returns how many
    /// entries were dropped.
    pub(crate) fn reconcile(&mut self, server: &ServerState) -> usize {
        let before = self.releases.len() + self.closes.len() + usize::from(self.default_track.is_some());

        self.releases.retain(|(channel, arch), release| {
            let Some(revision) = server.revision(release.revision) else {
                return false;
            };
            if channel.is_available() || !revision.builds_for(arch) {
                return false;
            }
            match server.cell(channel, arch) {
                Some(live) if live.revision == release.revision => {
                    if release.replaces.is_some() {
                        return false;
                    }
                    release.progressive.is_some() && live.active_progressive().is_some()
                }
                _ => true,
            }
        });

        self.closes.retain(|channel| {
            server
                .channel_map
                .get(channel)
                .is_some_and(|cells| !cells.is_empty())
        });

        if let Some(track) = &self.default_track {
            let current = server.default_track.as_deref();
            if !server.has_track(track) || current == Some(track.as_str()) {
                self.default_track = None;
            }
        }

        before - (self.releases.len() + self.closes.len() + usize::from(self.default_track.is_some()))
    }
}
