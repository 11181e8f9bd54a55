use chanmap_pending::{PendingEdits, PendingProgressive};
use chanmap_types::{Channel, ProgressiveStatus, RevisionId, ServerState};

/// Rollout state of one cell: what is live, what a cancellation would
/// revert to, and the pending override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressiveState {
    pub current: Option<ProgressiveStatus>,
    pub previous_revision: Option<RevisionId>,
    pub pending: Option<PendingProgressive>,
    /// A cancellation of the live rollout is queued
    pub cancelling: bool,
    /// A pending release of another revision replaces the live rollout
    pub superseded: bool,
    /// The channel is pending close
    pub closing: bool,
}

impl ProgressiveState {
    /// Paused state after the pending override is applied.
    pub fn effective_paused(&self) -> bool {
        match (self.pending, self.current) {
            (Some(pending), _) => pending.paused,
            (None, Some(current)) => current.paused,
            (None, None) => false,
        }
    }

    /// Whether a rollout below 100% is live or queued and not being
    /// cancelled, replaced or closed.
    pub fn has_rollout(&self) -> bool {
        if self.cancelling || self.closing {
            return false;
        }
        self.pending.is_some_and(|p| p.is_partial()) || (self.current.is_some() && !self.superseded)
    }
}

/// Resolve the rollout state of `channel`/`architecture`.
pub fn progressive_state_for(
    server: &ServerState,
    edits: &PendingEdits,
    channel: &Channel,
    architecture: &str,
) -> ProgressiveState {
    let live = server.cell(channel, architecture);
    let current = live.and_then(|cell| cell.active_progressive());
    let previous_revision = live.and_then(|cell| {
        server
            .catalog
            .previous_revision(channel, architecture, cell.revision)
    });
    let pending_release = edits.release(channel, architecture);
    let live_revision = live.map(|cell| cell.revision);

    ProgressiveState {
        current,
        previous_revision,
        pending: pending_release.and_then(|r| r.progressive),
        cancelling: current.is_some() && pending_release.is_some_and(|r| r.replaces.is_some()),
        superseded: current.is_some()
            && pending_release
                .is_some_and(|r| r.replaces.is_none() && Some(r.revision) != live_revision),
        closing: edits.closes().contains(channel),
    }
}

/// Which rollout controls are valid to offer for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressiveControls {
    pub can_adjust: bool,
    pub can_pause: bool,
    pub can_resume: bool,
    pub can_cancel: bool,
    /// No previous revision is known: a cancel must name the revision to
    /// revert to
    pub needs_revert_target: bool,
}

/// Controls for a cell. A live rollout can be cancelled even without
/// release history, as long as the caller picks the revert target.
pub fn progressive_controls(state: &ProgressiveState) -> ProgressiveControls {
    let rollout = state.has_rollout();
    let paused = state.effective_paused();
    let can_cancel = state.current.is_some() && !state.cancelling && !state.closing;
    ProgressiveControls {
        can_adjust: rollout,
        can_pause: rollout && !paused,
        can_resume: rollout && paused,
        can_cancel,
        needs_revert_target: can_cancel && state.previous_revision.is_none(),
    }
}
