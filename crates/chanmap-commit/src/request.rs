use chanmap_pending::{PendingEdits, PendingRelease};
use chanmap_types::{Architecture, Channel, RevisionId, ServerState};
use chanmap_views::separated_pending_changes;
use serde::{Deserialize, Serialize};

/// Rollout settings sent with a release below 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressivePayload {
    pub percentage: u8,
    pub paused: bool,
}

/// One release instruction: a revision into a channel on a set of
/// architectures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInstruction {
    pub revision: RevisionId,
    pub channel: Channel,
    pub architectures: Vec<Architecture>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progressive: Option<ProgressivePayload>,
    /// Live revision being reverted, for rollout cancellations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<RevisionId>,
}

impl ReleaseInstruction {
    fn from_pending(release: &PendingRelease) -> Self {
        Self {
            revision: release.revision,
            channel: release.channel.clone(),
            architectures: vec![release.architecture.clone()],
            progressive: release
                .progressive
                .filter(|p| p.is_partial())
                .map(|p| ProgressivePayload {
                    percentage: p.percentage,
                    paused: p.paused,
                }),
            replaces: release.replaces,
        }
    }

    fn same_instruction(&self, other: &Self) -> bool {
        self.revision == other.revision
            && self.channel == other.channel
            && self.progressive == other.progressive
            && self.replaces == other.replaces
    }
}

/// The single payload a commit sends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub releases: Vec<ReleaseInstruction>,
    pub closes: Vec<Channel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_track: Option<String>,
}

impl CommitRequest {
    /// Build the payload for `edits` against `server`.
    ///
    /// Releases are ordered new releases first, then rollout updates, then
    /// cancellations. Architectures sharing revision, channel and rollout
    /// settings collapse into one instruction.
    pub fn build(server: &ServerState, edits: &PendingEdits) -> Self {
        let changes = separated_pending_changes(server, edits);

        let mut releases: Vec<ReleaseInstruction> = Vec::new();
        for release in changes.releases() {
            let instruction = ReleaseInstruction::from_pending(release);
            match releases.iter_mut().find(|r| r.same_instruction(&instruction)) {
                Some(existing) => existing.architectures.push(release.architecture.clone()),
                None => releases.push(instruction),
            }
        }

        Self {
            releases,
            closes: changes.closes.into_iter().cloned().collect(),
            default_track: changes.default_track.map(str::to_string),
        }
    }

    /// Nothing to release, close or switch.
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty() && self.closes.is_empty() && self.default_track.is_none()
    }

    /// Release instructions counted per architecture.
    pub fn release_count(&self) -> usize {
        self.releases.iter().map(|r| r.architectures.len()).sum()
    }
}
