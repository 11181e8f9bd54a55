use std::fmt;

use chanmap_types::{Architecture, Channel, RevisionId};
use thiserror::Error;

/// Why a requested edit was refused.
///
/// Rejections are not failures: the store stays unchanged and the message
/// is shown to the user as the reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("revision {0} is not known")]
    UnknownRevision(RevisionId),

    #[error("{from} cannot be promoted to {to}")]
    IllegalTarget { from: Channel, to: Channel },

    #[error("revision {revision} is devmode or devel grade and cannot be released to {target}")]
    RestrictedRevision { revision: RevisionId, target: Channel },

    #[error("{target} already has the same revisions")]
    NoChange { target: Channel },

    #[error("nothing is assigned to {0}")]
    NothingToPromote(Channel),

    #[error("revision {revision} is not built for {architecture}")]
    ArchitectureMismatch {
        revision: RevisionId,
        architecture: Architecture,
    },

    #[error("no architectures given")]
    NoArchitectures,

    #[error("cannot release {0} onto itself")]
    SameChannel(Channel),

    #[error("{0} is not a real channel")]
    PseudoChannel(Channel),

    #[error("nothing is released or pending in {0}")]
    NothingToClose(Channel),

    #[error("{0} is already pending close")]
    AlreadyClosing(Channel),

    #[error("{0} is not pending close")]
    NotClosing(Channel),

    #[error("{0} is pending close; undo the close first")]
    PendingClose(Channel),

    #[error("branch {0} has expired")]
    ExpiredBranch(Channel),

    #[error("no pending release for {architecture} in {channel}")]
    NoPendingRelease {
        channel: Channel,
        architecture: Architecture,
    },

    #[error("percentage {value} is outside {min}..={max}")]
    PercentageOutOfRange { value: u8, min: u8, max: u8 },

    #[error("no progressive release in {0}")]
    NoProgressiveRelease(Channel),

    #[error("progressive release in {0} is already paused")]
    AlreadyPaused(Channel),

    #[error("progressive release in {0} is not paused")]
    NotPaused(Channel),

    #[error("no previous revision to revert {architecture} in {channel} to")]
    NoPreviousRevision {
        channel: Channel,
        architecture: Architecture,
    },

    #[error("track {0} does not exist")]
    UnknownTrack(String),

    #[error("{0} is already the default track")]
    AlreadyDefaultTrack(String),

    #[error("the latest track still has live revisions; close its channels first")]
    LatestTrackNotEmpty,

    #[error("{0} must stay empty while the default track change is pending")]
    LatestTrackReserved(Channel),

    #[error("no default track change is pending")]
    NoDefaultTrackChange,
}

/// Why a promotion target is shown but cannot be chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisabledReason {
    /// The source carries a devmode or devel grade revision and the
    /// target is `stable` or `candidate`
    RestrictedRevision(RevisionId),
    /// The target already has exactly the source's revisions
    NoChange,
    /// Nothing is assigned to the source
    NothingToPromote,
    /// The target is in `latest` while a default-track change away from
    /// it is pending
    LatestTrackReserved,
}

impl DisabledReason {
    pub(crate) fn into_rejection(self, source: &Channel, target: &Channel) -> Rejection {
        match self {
            DisabledReason::RestrictedRevision(revision) => Rejection::RestrictedRevision {
                revision,
                target: target.clone(),
            },
            DisabledReason::NoChange => Rejection::NoChange {
                target: target.clone(),
            },
            DisabledReason::NothingToPromote => Rejection::NothingToPromote(source.clone()),
            DisabledReason::LatestTrackReserved => Rejection::LatestTrackReserved(target.clone()),
        }
    }
}

impl fmt::Display for DisabledReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisabledReason::RestrictedRevision(revision) => write!(
                f,
                "revision {revision} is devmode or devel grade, which cannot be released to stable or candidate"
            ),
            DisabledReason::NoChange => f.write_str("the same revisions are already there"),
            DisabledReason::NothingToPromote => f.write_str("nothing to promote"),
            DisabledReason::LatestTrackReserved => {
                f.write_str("the latest track must stay empty while the default track change is pending")
            }
        }
    }
}
