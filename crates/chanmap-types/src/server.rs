use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    Assignments, Branch, Channel, ChannelMap, LATEST_TRACK, ProgressiveStatus, ResolvedChannels,
    Revision, RevisionCatalog, RevisionRef, Snapshot, track_order,
};

/// Server-confirmed ground truth: the revision catalog, the channel map,
/// the track list and the default track.
///
/// Replaced wholesale on every fetch or successful commit; never mutated
/// by pending edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerState {
    pub catalog: RevisionCatalog,
    pub channel_map: ChannelMap,
    /// Known tracks, `latest` first
    pub tracks: Vec<String>,
    pub default_track: Option<String>,
}

impl ServerState {
    /// Build the ground truth from a fetched snapshot.
    ///
    /// The track list always contains `latest` and every track named in
    /// the channel map, sorted `latest` first.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut tracks: BTreeSet<String> = snapshot.tracks.into_iter().collect();
        tracks.insert(LATEST_TRACK.to_string());
        for channel in snapshot.channel_map.keys() {
            tracks.insert(channel.track().to_string());
        }
        let mut tracks: Vec<String> = tracks.into_iter().collect();
        tracks.sort_by(|a, b| track_order(a, b));

        Self {
            catalog: RevisionCatalog::new(snapshot.revisions, snapshot.releases),
            channel_map: snapshot.channel_map,
            tracks,
            default_track: snapshot.options.default_track,
        }
    }

    /// Catalog entry for `id`.
    pub fn revision(&self, id: crate::RevisionId) -> Option<&Revision> {
        self.catalog.get(id)
    }

    /// Live cell of `channel` on `architecture`.
    pub fn cell(&self, channel: &Channel, architecture: &str) -> Option<&RevisionRef> {
        self.channel_map.get(channel).and_then(|m| m.get(architecture))
    }

    /// Live progressive rollout of a cell, if one is below 100%.
    pub fn live_progressive(&self, channel: &Channel, architecture: &str) -> Option<ProgressiveStatus> {
        self.cell(channel, architecture)
            .and_then(RevisionRef::active_progressive)
    }

    /// Whether any architecture of `channel` has an active rollout.
    pub fn has_live_progressive(&self, channel: &Channel) -> bool {
        self.channel_map
            .get(channel)
            .is_some_and(|m| m.values().any(|c| c.active_progressive().is_some()))
    }

    /// Live revision per architecture for `channel`.
    pub fn live_assignments(&self, channel: &Channel) -> Assignments {
        self.channel_map
            .get(channel)
            .map(|m| m.iter().map(|(arch, c)| (arch.clone(), c.revision)).collect())
            .unwrap_or_default()
    }

    /// The channel map without rollout data.
    pub fn resolved(&self) -> ResolvedChannels {
        self.channel_map
            .iter()
            .map(|(ch, m)| {
                (
                    ch.clone(),
                    m.iter().map(|(arch, c)| (arch.clone(), c.revision)).collect(),
                )
            })
            .filter(|(_, m): &(Channel, Assignments)| !m.is_empty())
            .collect()
    }

    pub fn has_track(&self, track: &str) -> bool {
        self.tracks.iter().any(|t| t == track)
    }

    /// When branch `channel` was opened: its most recent release, falling
    /// back to the release descriptors of the revisions it carries.
    fn branch_opened_at(&self, channel: &Channel) -> Option<DateTime<Utc>> {
        self.catalog.last_release_into(channel).or_else(|| {
            self.channel_map
                .get(channel)
                .into_iter()
                .flat_map(|cells| cells.values())
                .filter_map(|cell| self.revision(cell.revision))
                .filter_map(|r| r.release.as_ref())
                .filter(|release| &release.channel == channel)
                .map(|release| release.when)
                .max()
        })
    }

    /// The branch record for `channel`, when it is a branch with a known age.
    pub fn branch(&self, channel: &Channel, lifetime: TimeDelta) -> Option<Branch> {
        if !channel.is_branch() {
            return None;
        }
        self.branch_opened_at(channel)
            .map(|created_at| Branch::new(channel.clone(), created_at, lifetime))
    }

    /// Branches in the channel map that have expired at `now`. Branches of
    /// unknown age never expire.
    pub fn expired_branches(&self, now: DateTime<Utc>, lifetime: TimeDelta) -> BTreeSet<Channel> {
        self.channel_map
            .keys()
            .filter(|channel| {
                self.branch(channel, lifetime)
                    .is_some_and(|branch| !branch.is_live(now))
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ReleaseRecord, Risk, RevisionId, SnapshotOptions};
    use std::collections::BTreeMap;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn tracks_are_sorted_latest_first_and_include_map_tracks() {
        let mut channel_map = ChannelMap::new();
        channel_map.insert(
            Channel::new("2.0", Risk::Edge),
            BTreeMap::from([("amd64".to_string(), RevisionRef::new(RevisionId(1)))]),
        );
        let state = ServerState::from_snapshot(Snapshot {
            revisions: vec![],
            channel_map,
            tracks: vec!["1.0".to_string()],
            releases: vec![],
            options: SnapshotOptions {
                default_track: Some("1.0".to_string()),
            },
        });
        assert_eq!(state.tracks, vec!["latest", "1.0", "2.0"]);
        assert_eq!(state.default_track.as_deref(), Some("1.0"));
        assert!(state.has_track("2.0"));
    }

    #[test]
    fn resolved_drops_empty_channels() {
        let mut channel_map = ChannelMap::new();
        channel_map.insert(Channel::new("latest", Risk::Beta), BTreeMap::new());
        channel_map.insert(
            Channel::new("latest", Risk::Edge),
            BTreeMap::from([("arm64".to_string(), RevisionRef::new(RevisionId(9)))]),
        );
        let state = ServerState {
            channel_map,
            ..ServerState::default()
        };
        let resolved = state.resolved();
        assert_eq!(resolved.len(), 1);
        assert_eq!(
            resolved[&Channel::new("latest", Risk::Edge)]["arm64"],
            RevisionId(9)
        );
    }

    #[test]
    fn branch_age_comes_from_its_last_release() {
        let hotfix = Channel::branch_of("latest", Risk::Stable, "hotfix");
        let unknown = Channel::branch_of("latest", Risk::Edge, "wip");
        let mut channel_map = ChannelMap::new();
        for channel in [&hotfix, &unknown] {
            channel_map.insert(
                channel.clone(),
                BTreeMap::from([("amd64".to_string(), RevisionRef::new(RevisionId(4)))]),
            );
        }
        let state = ServerState::from_snapshot(Snapshot {
            channel_map,
            releases: vec![ReleaseRecord {
                revision: RevisionId(4),
                channel: hotfix.clone(),
                architecture: "amd64".to_string(),
                when: at("2024-05-01T00:00:00Z"),
                progressive: None,
            }],
            ..Snapshot::default()
        });
        let lifetime = TimeDelta::days(30);

        let branch = state.branch(&hotfix, lifetime).unwrap();
        assert_eq!(branch.expires_at, at("2024-05-31T00:00:00Z"));
        assert!(state.branch(&unknown, lifetime).is_none());
        assert!(state.branch(&Channel::new("latest", Risk::Stable), lifetime).is_none());

        assert!(state.expired_branches(at("2024-05-30T00:00:00Z"), lifetime).is_empty());
        assert_eq!(
            state.expired_branches(at("2024-05-31T00:00:00Z"), lifetime),
            BTreeSet::from([hotfix])
        );
    }
}
