use std::fmt;

use chanmap_types::{Architecture, Channel, RevisionId};
use serde::{Deserialize, Serialize};

/// Every edit the interaction surface can request.
///
/// Processed by one exhaustive match in [`crate::PendingStore::apply`].
/// Progressive edits are keyed by channel: all architectures of a channel
/// roll out together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Edit {
    /// Queue whatever `source` resolves to (live or pending) into `target`
    Promote { source: Channel, target: Channel },
    /// Queue one revision into `target` on every architecture it builds for
    PromoteRevision { revision: RevisionId, target: Channel },
    /// Drag-and-drop of a revision from `source` onto `target`
    DropRevision {
        revision: RevisionId,
        source: Channel,
        target: Channel,
        architectures: Vec<Architecture>,
    },
    CloseChannel { channel: Channel },
    UndoClose { channel: Channel },
    UndoRelease {
        channel: Channel,
        architecture: Architecture,
    },
    SetProgressivePercentage { channel: Channel, percentage: u8 },
    PauseProgressive { channel: Channel },
    ResumeProgressive { channel: Channel },
    /// Revert a live rollout, to `revert_to` or to each cell's previous revision
    CancelProgressive {
        channel: Channel,
        revert_to: Option<RevisionId>,
    },
    SetDefaultTrack { track: String },
    ClearDefaultTrack,
    SelectRevision { revision: RevisionId },
    ClearSelection,
    /// Discard every pending release, close and default-track change
    CancelAll,
}

impl Edit {
    /// The channel the edit is about, if any.
    pub fn channel(&self) -> Option<&Channel> {
        match self {
            Edit::Promote { target, .. }
            | Edit::PromoteRevision { target, .. }
            | Edit::DropRevision { target, .. } => Some(target),
            Edit::CloseChannel { channel }
            | Edit::UndoClose { channel }
            | Edit::UndoRelease { channel, .. }
            | Edit::SetProgressivePercentage { channel, .. }
            | Edit::PauseProgressive { channel }
            | Edit::ResumeProgressive { channel }
            | Edit::CancelProgressive { channel, .. } => Some(channel),
            Edit::SetDefaultTrack { .. }
            | Edit::ClearDefaultTrack
            | Edit::SelectRevision { .. }
            | Edit::ClearSelection
            | Edit::CancelAll => None,
        }
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edit::Promote { source, target } => write!(f, "promote {source} -> {target}"),
            Edit::PromoteRevision { revision, target } => {
                write!(f, "promote revision {revision} -> {target}")
            }
            Edit::DropRevision {
                revision,
                source,
                target,
                architectures,
            } => write!(
                f,
                "drop revision {revision} from {source} onto {target} [{}]",
                architectures.join(", ")
            ),
            Edit::CloseChannel { channel } => write!(f, "close {channel}"),
            Edit::UndoClose { channel } => write!(f, "undo close {channel}"),
            Edit::UndoRelease {
                channel,
                architecture,
            } => write!(f, "undo release {channel} ({architecture})"),
            Edit::SetProgressivePercentage {
                channel,
                percentage,
            } => write!(f, "set {channel} rollout to {percentage}%"),
            Edit::PauseProgressive { channel } => write!(f, "pause rollout in {channel}"),
            Edit::ResumeProgressive { channel } => write!(f, "resume rollout in {channel}"),
            Edit::CancelProgressive { channel, revert_to } => match revert_to {
                Some(rev) => write!(f, "cancel rollout in {channel}, revert to {rev}"),
                None => write!(f, "cancel rollout in {channel}"),
            },
            Edit::SetDefaultTrack { track } => write!(f, "set default track {track}"),
            Edit::ClearDefaultTrack => f.write_str("clear default track change"),
            Edit::SelectRevision { revision } => write!(f, "select revision {revision}"),
            Edit::ClearSelection => f.write_str("clear selection"),
            Edit::CancelAll => f.write_str("cancel all pending edits"),
        }
    }
}
