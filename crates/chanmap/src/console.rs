use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use chanmap_commit::{CommitError, CommitPhase, CommitTicket, CommitTracker, CommitTransport};
use chanmap_config::Config;
use chanmap_events::{EventLog, events_path};
use chanmap_pending::{Edit, PendingStore};
use chanmap_rules::{ChannelView, PromotionTarget, Rejection};
use chanmap_types::{
    Architecture, Branch, Channel, ConsoleEvent, EngineOptions, EventType, ReleaseRecord,
    ResolvedChannels, Revision, RevisionId, ServerState, Snapshot,
};
use chanmap_views::{
    AvailableFilter, HistoryFilter, ProgressiveControls, ProgressiveState, SeparatedChanges,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// The release console: server state, pending edits and commit tracking
/// behind one API.
///
/// Every mutation is validated by the rule engine, recorded in the event
/// log and immediately visible to the selectors.
#[derive(Debug, Clone)]
pub struct ReleaseConsole {
    server: ServerState,
    store: PendingStore,
    tracker: CommitTracker,
    events: EventLog,
}

impl ReleaseConsole {
    /// A clean console over `snapshot`.
    pub fn from_snapshot(snapshot: Snapshot, options: EngineOptions) -> Self {
        Self {
            server: ServerState::from_snapshot(snapshot),
            store: PendingStore::new(options),
            tracker: CommitTracker::new(),
            events: EventLog::new(),
        }
    }

    /// Build a console with options taken from `config`.
    pub fn with_config(snapshot: Snapshot, config: &Config) -> Result<Self> {
        Ok(Self::from_snapshot(snapshot, config.engine_options()?))
    }

    /// Server-confirmed state.
    pub fn server(&self) -> &ServerState {
        &self.server
    }

    pub fn store(&self) -> &PendingStore {
        &self.store
    }

    pub fn options(&self) -> &EngineOptions {
        self.store.options()
    }

    /// Events recorded since the last flush.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn phase(&self) -> CommitPhase {
        self.tracker.phase(&self.store)
    }

    fn record(&mut self, event_type: EventType, channel: Option<&Channel>) {
        self.events.record(ConsoleEvent::now(event_type, channel));
    }

    /// Append the recorded events to `events.jsonl` in `state_dir` and
    /// forget them.
    pub fn flush_events(&mut self, state_dir: &Path) -> Result<()> {
        self.events.write_to_file(&events_path(state_dir))?;
        self.events.clear();
        Ok(())
    }

    /// Validate and apply one edit.
    pub fn apply(&mut self, edit: Edit) -> Result<(), Rejection> {
        let description = edit.to_string();
        let channel = edit.channel().cloned();
        let reverts = matches!(edit, Edit::CancelAll);

        match self.store.apply(&self.server, edit) {
            Ok(()) => {
                debug!(edit = %description, "edit applied");
                let event_type = if reverts {
                    EventType::EditsReverted
                } else {
                    EventType::EditApplied { edit: description }
                };
                self.record(event_type, channel.as_ref());
                Ok(())
            }
            Err(rejection) => {
                info!(edit = %description, reason = %rejection, "edit rejected");
                self.record(
                    EventType::EditRejected {
                        edit: description,
                        reason: rejection.to_string(),
                    },
                    channel.as_ref(),
                );
                Err(rejection)
            }
        }
    }

    /// Promote everything resolved in `source` to `target`.
    pub fn promote(&mut self, source: Channel, target: Channel) -> Result<(), Rejection> {
        self.apply(Edit::Promote { source, target })
    }

    /// Release `revision` into `target` on every architecture it builds for.
    pub fn promote_revision(&mut self, revision: RevisionId, target: Channel) -> Result<(), Rejection> {
        self.apply(Edit::PromoteRevision { revision, target })
    }

    /// Release `revision`, dragged from `source`, into `target` on the
    /// given architectures.
    pub fn drop_revision(
        &mut self,
        revision: RevisionId,
        source: Channel,
        target: Channel,
        architectures: Vec<Architecture>,
    ) -> Result<(), Rejection> {
        self.apply(Edit::DropRevision {
            revision,
            source,
            target,
            architectures,
        })
    }

    /// Queue `channel` for closing, discarding its pending releases.
    pub fn close_channel(&mut self, channel: Channel) -> Result<(), Rejection> {
        self.apply(Edit::CloseChannel { channel })
    }

    pub fn undo_close(&mut self, channel: Channel) -> Result<(), Rejection> {
        self.apply(Edit::UndoClose { channel })
    }

    /// Drop the pending release of one cell.
    pub fn undo_pending_release(&mut self, channel: Channel, architecture: Architecture) -> Result<(), Rejection> {
        self.apply(Edit::UndoRelease {
            channel,
            architecture,
        })
    }

    /// Set the rollout percentage of every progressive cell in `channel`.
    pub fn set_progressive_percentage(&mut self, channel: Channel, percentage: u8) -> Result<(), Rejection> {
        self.apply(Edit::SetProgressivePercentage {
            channel,
            percentage,
        })
    }

    pub fn pause_progressive(&mut self, channel: Channel) -> Result<(), Rejection> {
        self.apply(Edit::PauseProgressive { channel })
    }

    pub fn resume_progressive(&mut self, channel: Channel) -> Result<(), Rejection> {
        self.apply(Edit::ResumeProgressive { channel })
    }

    /// Revert the live rollouts of `channel` to `revert_to`, or to each
    /// cell's previous revision when none is given.
    pub fn cancel_progressive(&mut self, channel: Channel, revert_to: Option<RevisionId>) -> Result<(), Rejection> {
        self.apply(Edit::CancelProgressive { channel, revert_to })
    }

    /// Queue a default-track change.
    pub fn set_default_track(&mut self, track: impl Into<String>) -> Result<(), Rejection> {
        self.apply(Edit::SetDefaultTrack {
            track: track.into(),
        })
    }

    pub fn clear_default_track(&mut self) -> Result<(), Rejection> {
        self.apply(Edit::ClearDefaultTrack)
    }

    /// Select `revision` in the `available` row for each of its architectures.
    pub fn select_revision(&mut self, revision: RevisionId) -> Result<(), Rejection> {
        self.apply(Edit::SelectRevision { revision })
    }

    pub fn clear_selection(&mut self) -> Result<(), Rejection> {
        self.apply(Edit::ClearSelection)
    }

    /// Discard every pending release, close and default-track change.
    pub fn cancel_all_pending(&mut self) -> Result<(), Rejection> {
        self.apply(Edit::CancelAll)
    }

    fn view(&self) -> ChannelView<'_> {
        self.store.view(&self.server)
    }

    /// See [`chanmap_rules::legal_promotion_targets`].
    pub fn legal_promotion_targets(&self, source: &Channel) -> Vec<PromotionTarget> {
        chanmap_rules::legal_promotion_targets(&self.view(), source)
    }

    pub fn can_close(&self, channel: &Channel) -> bool {
        chanmap_rules::can_close(&self.view(), channel)
    }

    pub fn can_drop_revision(
        &self,
        revision: RevisionId,
        source: &Channel,
        target: &Channel,
        architectures: &[Architecture],
    ) -> bool {
        chanmap_rules::can_drop_revision(&self.view(), revision, source, target, architectures)
    }

    /// The channel map as it would be after a commit, without branches
    /// expired at `now`.
    pub fn pending_channel_map(&self, now: DateTime<Utc>) -> ResolvedChannels {
        chanmap_views::pending_channel_map(&self.server, self.store.edits(), now, self.options())
    }

    /// Pending changes bucketed for the confirmation dialog.
    pub fn separated_pending_changes(&self) -> SeparatedChanges<'_> {
        chanmap_views::separated_pending_changes(&self.server, self.store.edits())
    }

    /// Revisions offered in the `available` row under `filter`.
    pub fn filtered_available_revisions(
        &self,
        architecture: &str,
        filter: &AvailableFilter,
        now: DateTime<Utc>,
    ) -> Vec<&Revision> {
        chanmap_views::filtered_available_revisions(&self.server, architecture, filter, now, self.options())
    }

    pub fn progressive_state_for(&self, channel: &Channel, architecture: &str) -> ProgressiveState {
        chanmap_views::progressive_state_for(&self.server, self.store.edits(), channel, architecture)
    }

    /// Rollout controls to offer for one cell.
    pub fn progressive_controls(&self, channel: &Channel, architecture: &str) -> ProgressiveControls {
        chanmap_views::progressive_controls(&self.progressive_state_for(channel, architecture))
    }

    /// Live branches of `track` at `now`.
    pub fn branches(&self, track: &str, now: DateTime<Utc>) -> Vec<Branch> {
        chanmap_views::branches(&self.server, track, now, self.options())
    }

    pub fn tracks(&self) -> &[String] {
        chanmap_views::tracks(&self.server)
    }

    /// Every architecture a known revision builds for.
    pub fn architectures(&self) -> BTreeSet<Architecture> {
        chanmap_views::architectures(&self.server)
    }

    /// Revisions produced by one build request.
    pub fn revisions_from_build(&self, build_request_id: &str) -> Vec<&Revision> {
        chanmap_views::revisions_from_build(&self.server, build_request_id)
    }

    /// Release history matching `filter`, newest first.
    pub fn release_history(&self, filter: &HistoryFilter) -> Vec<&ReleaseRecord> {
        chanmap_views::release_history(&self.server, filter)
    }

    /// Whether the pending channel map carries a devmode or devel grade
    /// revision.
    pub fn has_devmode_revisions(&self) -> bool {
        chanmap_views::has_devmode_revisions(&self.server, self.store.edits())
    }

    /// Replace the server state after a refetch. Pending entries the new
    /// state makes meaningless are dropped; the count is returned.
    pub fn replace_server_state(&mut self, snapshot: Snapshot) -> usize {
        self.server = ServerState::from_snapshot(snapshot);
        let dropped = self.store.reconcile(&self.server);
        if dropped > 0 {
            warn!(dropped, "pending edits dropped by the new server state");
        }
        self.record(EventType::SnapshotReplaced { dropped }, None);
        dropped
    }

    /// Freeze the pending edits into a commit ticket.
    pub fn begin_commit(&mut self) -> Result<CommitTicket, CommitError> {
        let ticket = self.tracker.begin(&self.server, &self.store)?;
        let request = ticket.request();
        self.record(
            EventType::CommitStarted {
                releases: request.release_count(),
                closes: request.closes.len(),
                default_track: request.default_track.clone(),
            },
            None,
        );
        Ok(ticket)
    }

    /// Fold the transport's answer for `ticket` in.
    ///
    /// On success the returned snapshot replaces the server state and the
    /// committed edits leave the store. On failure nothing but the phase
    /// changes and the error is handed back.
    pub fn complete_commit(
        &mut self,
        ticket: &CommitTicket,
        result: Result<Snapshot, CommitError>,
    ) -> Result<usize, CommitError> {
        match result {
            Ok(snapshot) => {
                let outcome = self.tracker.succeed(ticket, &mut self.store, snapshot)?;
                self.server = outcome.server;
                let request = ticket.request();
                self.record(
                    EventType::CommitSucceeded {
                        releases: request.release_count(),
                        closes: request.closes.len(),
                    },
                    None,
                );
                Ok(outcome.dropped)
            }
            Err(error) => {
                self.tracker.fail(ticket, &error)?;
                self.record(
                    EventType::CommitFailed {
                        message: error.to_string(),
                    },
                    None,
                );
                Err(error)
            }
        }
    }

    /// Commit through `transport` when the console has a single owner.
    /// Use [`crate::ConsoleHandle::commit`] to keep editing meanwhile.
    pub async fn commit<T: CommitTransport>(&mut self, transport: &T) -> Result<usize, CommitError> {
        let ticket = self.begin_commit()?;
        let result = transport.commit(ticket.request()).await;
        self.complete_commit(&ticket, result)
    }
}
