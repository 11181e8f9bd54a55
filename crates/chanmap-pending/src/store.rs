use chanmap_rules::{
    ChannelView, ProgressiveKind, Rejection, check_close, check_default_track,
    check_drop_revision, check_percentage, check_promotion,
};
use chanmap_types::{
    Architecture, Assignments, Channel, EngineOptions, ResolvedChannels, RevisionId, ServerState,
};
use chrono::{DateTime, Utc};

use crate::{Edit, PendingEdits, PendingProgressive, PendingRelease};

/// The mutable, client-only state of the release console: pending edits
/// plus the per-architecture selection of the `available` row.
///
/// Every mutation validates against the rule engine first and leaves the
/// store untouched when it is rejected.
#[derive(Debug, Clone, Default)]
pub struct PendingStore {
    edits: PendingEdits,
    selection: Assignments,
    options: EngineOptions,
}

impl PendingStore {
    /// An empty store evaluating edits with `options`.
    pub fn new(options: EngineOptions) -> Self {
        Self {
            edits: PendingEdits::new(),
            selection: Assignments::new(),
            options,
        }
    }

    /// Pending overlays queued so far.
    pub fn edits(&self) -> &PendingEdits {
        &self.edits
    }

    /// Per-architecture selection of the `available` row.
    pub fn selection(&self) -> &Assignments {
        &self.selection
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Whether anything is waiting to be committed. The selection
    /// does not count.
    pub fn is_dirty(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Live assignments overlaid with pending releases.
    pub fn pending_channel_map(&self, server: &ServerState) -> ResolvedChannels {
        self.edits.overlay(server)
    }

    /// The view the rule engine evaluates against right now.
    pub fn view<'a>(&'a self, server: &'a ServerState) -> ChannelView<'a> {
        self.view_at(server, Utc::now())
    }

    /// The view the rule engine evaluates against at `now`: branches
    /// expired by then are out of reach.
    pub fn view_at<'a>(&'a self, server: &'a ServerState, now: DateTime<Utc>) -> ChannelView<'a> {
        ChannelView::new(
            server,
            self.edits.overlay(server),
            &self.selection,
            &self.edits.closes,
        )
        .with_pending_default_track(self.edits.default_track.as_deref())
        .with_expired_branches(server.expired_branches(now, self.options.branch_lifetime))
    }

    /// Validate and apply one edit.
    pub fn apply(&mut self, server: &ServerState, edit: Edit) -> Result<(), Rejection> {
        self.apply_at(server, edit, Utc::now())
    }

    /// [`apply`](Self::apply) with branch expiry judged at `now`.
    pub fn apply_at(&mut self, server: &ServerState, edit: Edit, now: DateTime<Utc>) -> Result<(), Rejection> {
        match edit {
            Edit::Promote { source, target } => self.promote(server, &source, &target, now),
            Edit::PromoteRevision { revision, target } => {
                self.promote_revision(server, revision, &target, now)
            }
            Edit::DropRevision {
                revision,
                source,
                target,
                architectures,
            } => self.drop_revision(server, revision, &source, &target, &architectures, now),
            Edit::CloseChannel { channel } => self.close_channel(server, &channel),
            Edit::UndoClose { channel } => self.undo_close(&channel),
            Edit::UndoRelease {
                channel,
                architecture,
            } => self.undo_release(&channel, &architecture),
            Edit::SetProgressivePercentage {
                channel,
                percentage,
            } => self.set_progressive_percentage(server, &channel, percentage),
            Edit::PauseProgressive { channel } => self.set_paused(server, &channel, true),
            Edit::ResumeProgressive { channel } => self.set_paused(server, &channel, false),
            Edit::CancelProgressive { channel, revert_to } => {
                self.cancel_progressive(server, &channel, revert_to)
            }
            Edit::SetDefaultTrack { track } => self.set_default_track(server, track, now),
            Edit::ClearDefaultTrack => self.clear_default_track(),
            Edit::SelectRevision { revision } => self.select_revision(server, revision),
            Edit::ClearSelection => {
                self.selection.clear();
                Ok(())
            }
            Edit::CancelAll => {
                self.edits.clear();
                Ok(())
            }
        }
    }

    /// Replace the server state underneath the overlay: drop pending
    /// entries it makes meaningless and selections of unknown revisions.
    /// Returns how many pending entries were dropped.
    pub fn reconcile(&mut self, server: &ServerState) -> usize {
        self.selection.retain(|arch, rev| {
            server
                .revision(*rev)
                .is_some_and(|r| r.builds_for(arch))
        });
        self.edits.reconcile(server)
    }

    /// Forget what a successful commit carried, then reconcile against
    /// the server state it returned.
    pub fn settle(&mut self, committed: &PendingEdits, server: &ServerState) -> usize {
        self.edits.settle(committed);
        self.reconcile(server)
    }

    fn queue(&mut self, server: &ServerState, channel: &Channel, architecture: &str, revision: RevisionId) {
        let live = server.cell(channel, architecture).map(|c| c.revision);
        if live == Some(revision) {
            self.edits.remove(channel, architecture);
            self.edits.closes.remove(channel);
            return;
        }

        let mut release = PendingRelease::new(channel.clone(), architecture.to_string(), revision);
        if live.is_some() {
            release.progressive = Some(PendingProgressive::full());
        }
        self.edits.insert(release);
    }

    fn promote(
        &mut self,
        server: &ServerState,
        source: &Channel,
        target: &Channel,
        now: DateTime<Utc>,
    ) -> Result<(), Rejection> {
        let assignments = check_promotion(&self.view_at(server, now), source, target)?;
        for (arch, revision) in assignments {
            self.queue(server, target, &arch, revision);
        }
        Ok(())
    }

    fn promote_revision(
        &mut self,
        server: &ServerState,
        revision: RevisionId,
        target: &Channel,
        now: DateTime<Utc>,
    ) -> Result<(), Rejection> {
        let rev = server
            .revision(revision)
            .ok_or(Rejection::UnknownRevision(revision))?;
        let architectures: Vec<Architecture> = rev.architectures.iter().cloned().collect();
        let source = Channel::available(target.track());
        self.drop_revision(server, revision, &source, target, &architectures, now)
    }

    fn drop_revision(
        &mut self,
        server: &ServerState,
        revision: RevisionId,
        source: &Channel,
        target: &Channel,
        architectures: &[Architecture],
        now: DateTime<Utc>,
    ) -> Result<(), Rejection> {
        check_drop_revision(&self.view_at(server, now), revision, source, target, architectures)?;
        for arch in architectures {
            self.queue(server, target, arch, revision);
        }
        Ok(())
    }

    fn close_channel(&mut self, server: &ServerState, channel: &Channel) -> Result<(), Rejection> {
        check_close(&self.view(server), channel)?;
        self.edits.remove_channel(channel);
        self.edits.closes.insert(channel.clone());
        Ok(())
    }

    fn undo_close(&mut self, channel: &Channel) -> Result<(), Rejection> {
        if self.edits.closes.remove(channel) {
            Ok(())
        } else {
            Err(Rejection::NotClosing(channel.clone()))
        }
    }

    fn undo_release(&mut self, channel: &Channel, architecture: &str) -> Result<(), Rejection> {
        self.edits
            .remove(channel, architecture)
            .map(|_| ())
            .ok_or_else(|| Rejection::NoPendingRelease {
                channel: channel.clone(),
                architecture: architecture.to_string(),
            })
    }

    /// Rollout edits must not revive a channel queued for closing.
    fn ensure_not_closing(&self, channel: &Channel) -> Result<(), Rejection> {
        if self.edits.closes.contains(channel) {
            Err(Rejection::PendingClose(channel.clone()))
        } else {
            Ok(())
        }
    }

    /// Pending progressive entries of `channel`, or, when there are none,
    /// fresh update entries mirroring the live rollout.
    fn progressive_entries(
        &self,
        server: &ServerState,
        channel: &Channel,
    ) -> Result<Vec<PendingRelease>, Rejection> {
        self.ensure_not_closing(channel)?;
        let pending: Vec<PendingRelease> = self
            .edits
            .releases_in(channel)
            .filter(|r| r.progressive.is_some())
            .cloned()
            .collect();
        if !pending.is_empty() {
            return Ok(pending);
        }

        let live: Vec<PendingRelease> = server
            .channel_map
            .get(channel)
            .into_iter()
            .flat_map(|cells| cells.iter())
            .filter(|(arch, _)| self.edits.release(channel, arch).is_none())
            .filter_map(|(arch, cell)| {
                cell.active_progressive().map(|status| PendingRelease {
                    revision: cell.revision,
                    channel: channel.clone(),
                    architecture: arch.clone(),
                    progressive: Some(PendingProgressive {
                        percentage: status.percentage,
                        paused: status.paused,
                    }),
                    replaces: None,
                })
            })
            .collect();

        if live.is_empty() {
            Err(Rejection::NoProgressiveRelease(channel.clone()))
        } else {
            Ok(live)
        }
    }

    fn kind_of(server: &ServerState, release: &PendingRelease) -> ProgressiveKind {
        if release.is_progressive_update(server) {
            let previous_percentage = server
                .live_progressive(&release.channel, &release.architecture)
                .map(|s| s.percentage)
                .unwrap_or(1);
            ProgressiveKind::Update {
                previous_percentage,
            }
        } else {
            ProgressiveKind::Release
        }
    }

    fn set_progressive_percentage(
        &mut self,
        server: &ServerState,
        channel: &Channel,
        percentage: u8,
    ) -> Result<(), Rejection> {
        let mut entries = self.progressive_entries(server, channel)?;
        for entry in &entries {
            check_percentage(Self::kind_of(server, entry), percentage, &self.options)?;
        }
        for entry in &mut entries {
            if let Some(progressive) = entry.progressive.as_mut() {
                progressive.percentage = percentage;
            }
        }
        for entry in entries {
            self.edits.insert(entry);
        }
        Ok(())
    }

    fn set_paused(&mut self, server: &ServerState, channel: &Channel, paused: bool) -> Result<(), Rejection> {
        let mut entries = self.progressive_entries(server, channel)?;
        let already = entries
            .iter()
            .all(|e| e.progressive.is_some_and(|p| p.paused == paused));
        if already {
            return Err(if paused {
                Rejection::AlreadyPaused(channel.clone())
            } else {
                Rejection::NotPaused(channel.clone())
            });
        }

        for entry in &mut entries {
            if let Some(progressive) = entry.progressive.as_mut() {
                progressive.paused = paused;
            }
        }
        for entry in entries {
            self.edits.insert(entry);
        }
        Ok(())
    }

    fn cancel_progressive(
        &mut self,
        server: &ServerState,
        channel: &Channel,
        revert_to: Option<RevisionId>,
    ) -> Result<(), Rejection> {
        self.ensure_not_closing(channel)?;
        let cells: Vec<(&Architecture, RevisionId)> = server
            .channel_map
            .get(channel)
            .into_iter()
            .flat_map(|cells| cells.iter())
            .filter(|(_, cell)| cell.active_progressive().is_some())
            .map(|(arch, cell)| (arch, cell.revision))
            .collect();
        if cells.is_empty() {
            return Err(Rejection::NoProgressiveRelease(channel.clone()));
        }

        let mut reverts = Vec::with_capacity(cells.len());
        for (arch, current) in cells {
            let target = match revert_to {
                Some(rev) => {
                    let revision = server.revision(rev).ok_or(Rejection::UnknownRevision(rev))?;
                    if !revision.builds_for(arch) {
                        return Err(Rejection::ArchitectureMismatch {
                            revision: rev,
                            architecture: arch.clone(),
                        });
                    }
                    rev
                }
                None => server
                    .catalog
                    .previous_revision(channel, arch, current)
                    .ok_or_else(|| Rejection::NoPreviousRevision {
                        channel: channel.clone(),
                        architecture: arch.clone(),
                    })?,
            };
            reverts.push(PendingRelease {
                revision: target,
                channel: channel.clone(),
                architecture: arch.clone(),
                progressive: None,
                replaces: Some(current),
            });
        }

        for revert in reverts {
            self.edits.insert(revert);
        }
        Ok(())
    }

    fn set_default_track(
        &mut self,
        server: &ServerState,
        track: String,
        now: DateTime<Utc>,
    ) -> Result<(), Rejection> {
        check_default_track(&self.view_at(server, now), &track)?;
        self.edits.default_track = Some(track);
        Ok(())
    }

    fn clear_default_track(&mut self) -> Result<(), Rejection> {
        self.edits
            .default_track
            .take()
            .map(|_| ())
            .ok_or(Rejection::NoDefaultTrackChange)
    }

    fn select_revision(&mut self, server: &ServerState, revision: RevisionId) -> Result<(), Rejection> {
        let rev = server
            .revision(revision)
            .ok_or(Rejection::UnknownRevision(revision))?;
        for arch in &rev.architectures {
            self.selection.insert(arch.clone(), revision);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chanmap_types::{Confinement, Grade, Snapshot};
    use proptest::prelude::*;

    use super::*;
    use crate::fixtures::{ch, record, revision, server, server_with_history, strict, ts};

    fn store() -> PendingStore {
        PendingStore::new(EngineOptions::default())
    }

    fn percentage(store: &PendingStore, channel: &str, arch: &str) -> Option<u8> {
        store
            .edits()
            .release(&ch(channel), arch)
            .and_then(|r| r.progressive)
            .map(|p| p.percentage)
    }

    #[test]
    fn closing_a_channel_discards_its_pending_releases() {
        let server = server(
            vec![strict(12, &["amd64"]), strict(20, &["amd64"])],
            &[("stable", "amd64", 12, None)],
        );
        let mut store = store();

        store
            .apply(
                &server,
                Edit::PromoteRevision {
                    revision: RevisionId(20),
                    target: ch("stable"),
                },
            )
            .unwrap();
        assert_eq!(
            store.edits().release(&ch("stable"), "amd64").map(|r| r.revision),
            Some(RevisionId(20))
        );

        store
            .apply(&server, Edit::CloseChannel { channel: ch("stable") })
            .unwrap();
        assert_eq!(store.edits().release_count(), 0);
        assert!(store.edits().closes().contains(&ch("stable")));
        assert!(!store.pending_channel_map(&server).contains_key(&ch("stable")));
    }

    #[test]
    fn promote_marks_replacements_as_full_releases() {
        let server = server(
            vec![strict(1, &["amd64", "arm64"]), strict(2, &["amd64"])],
            &[
                ("edge", "amd64", 2, None),
                ("edge", "arm64", 1, None),
                ("beta", "amd64", 1, None),
            ],
        );
        let mut store = store();
        store
            .apply(
                &server,
                Edit::Promote {
                    source: ch("edge"),
                    target: ch("beta"),
                },
            )
            .unwrap();

        let amd64 = store.edits().release(&ch("beta"), "amd64").unwrap();
        assert_eq!(amd64.revision, RevisionId(2));
        assert_eq!(amd64.progressive, Some(PendingProgressive::full()));

        let arm64 = store.edits().release(&ch("beta"), "arm64").unwrap();
        assert_eq!(arm64.revision, RevisionId(1));
        assert_eq!(arm64.progressive, None);
    }

    #[test]
    fn queueing_the_live_revision_drops_the_pending_entry() {
        let server = server(
            vec![strict(1, &["amd64"]), strict(2, &["amd64"])],
            &[("edge", "amd64", 2, None), ("beta", "amd64", 1, None)],
        );
        let mut store = store();
        store
            .apply(
                &server,
                Edit::Promote {
                    source: ch("edge"),
                    target: ch("beta"),
                },
            )
            .unwrap();
        assert_eq!(store.edits().release_count(), 1);

        store
            .apply(
                &server,
                Edit::DropRevision {
                    revision: RevisionId(1),
                    source: ch("edge"),
                    target: ch("beta"),
                    architectures: vec!["amd64".to_string()],
                },
            )
            .unwrap();
        assert_eq!(store.edits().release_count(), 0);
        assert_eq!(store.pending_channel_map(&server), server.resolved());
    }

    #[test]
    fn rejected_edit_leaves_the_store_untouched() {
        let server = server(
            vec![revision(10, &["arm64"], Confinement::Devmode, Grade::Stable)],
            &[("edge", "arm64", 10, None)],
        );
        let mut store = store();

        let err = store
            .apply(
                &server,
                Edit::Promote {
                    source: ch("edge"),
                    target: ch("stable"),
                },
            )
            .unwrap_err();
        assert_eq!(
            err,
            Rejection::RestrictedRevision {
                revision: RevisionId(10),
                target: ch("stable"),
            }
        );
        assert!(!store.is_dirty());

        store
            .apply(
                &server,
                Edit::Promote {
                    source: ch("edge"),
                    target: ch("beta"),
                },
            )
            .unwrap();
        assert!(store.is_dirty());
    }

    #[test]
    fn progressive_update_only_widens() {
        let server = server(
            vec![strict(5, &["amd64"]), strict(6, &["amd64"])],
            &[("stable", "amd64", 6, Some(30))],
        );
        let mut store = store();

        store
            .apply(
                &server,
                Edit::SetProgressivePercentage {
                    channel: ch("stable"),
                    percentage: 55,
                },
            )
            .unwrap();
        assert_eq!(percentage(&store, "stable", "amd64"), Some(55));

        let err = store
            .apply(
                &server,
                Edit::SetProgressivePercentage {
                    channel: ch("stable"),
                    percentage: 20,
                },
            )
            .unwrap_err();
        assert_eq!(
            err,
            Rejection::PercentageOutOfRange {
                value: 20,
                min: 30,
                max: 100,
            }
        );
        assert_eq!(percentage(&store, "stable", "amd64"), Some(55));
    }

    #[test]
    fn fresh_progressive_release_moves_freely() {
        let server = server(
            vec![strict(1, &["amd64"]), strict(2, &["amd64"])],
            &[("stable", "amd64", 1, None), ("candidate", "amd64", 2, None)],
        );
        let mut store = store();
        store
            .apply(
                &server,
                Edit::Promote {
                    source: ch("candidate"),
                    target: ch("stable"),
                },
            )
            .unwrap();

        for value in [10, 80, 5] {
            store
                .apply(
                    &server,
                    Edit::SetProgressivePercentage {
                        channel: ch("stable"),
                        percentage: value,
                    },
                )
                .unwrap();
            assert_eq!(percentage(&store, "stable", "amd64"), Some(value));
        }

        assert!(matches!(
            store.apply(
                &server,
                Edit::SetProgressivePercentage {
                    channel: ch("stable"),
                    percentage: 0,
                },
            ),
            Err(Rejection::PercentageOutOfRange { .. })
        ));
    }

    #[test]
    fn percentage_needs_a_rollout() {
        let server = server(vec![strict(1, &["amd64"])], &[("stable", "amd64", 1, None)]);
        let mut store = store();
        assert_eq!(
            store.apply(
                &server,
                Edit::SetProgressivePercentage {
                    channel: ch("stable"),
                    percentage: 40,
                },
            ),
            Err(Rejection::NoProgressiveRelease(ch("stable")))
        );
    }

    #[test]
    fn pause_and_resume_toggle_once() {
        let server = server(vec![strict(6, &["amd64"])], &[("stable", "amd64", 6, Some(30))]);
        let mut store = store();
        let pause = Edit::PauseProgressive { channel: ch("stable") };
        let resume = Edit::ResumeProgressive { channel: ch("stable") };

        store.apply(&server, pause.clone()).unwrap();
        let entry = store.edits().release(&ch("stable"), "amd64").unwrap();
        assert_eq!(
            entry.progressive,
            Some(PendingProgressive {
                percentage: 30,
                paused: true,
            })
        );
        assert_eq!(
            store.apply(&server, pause),
            Err(Rejection::AlreadyPaused(ch("stable")))
        );

        store.apply(&server, resume.clone()).unwrap();
        assert_eq!(
            store.apply(&server, resume),
            Err(Rejection::NotPaused(ch("stable")))
        );
    }

    #[test]
    fn cancel_reverts_to_the_previous_revision() {
        let server = server_with_history(
            vec![strict(5, &["amd64"]), strict(6, &["amd64"])],
            &[("stable", "amd64", 6, Some(30))],
            vec![
                record(5, "stable", "amd64", 1),
                record(6, "stable", "amd64", 5),
            ],
        );
        let mut store = store();
        store
            .apply(
                &server,
                Edit::SetProgressivePercentage {
                    channel: ch("stable"),
                    percentage: 50,
                },
            )
            .unwrap();

        store
            .apply(
                &server,
                Edit::CancelProgressive {
                    channel: ch("stable"),
                    revert_to: None,
                },
            )
            .unwrap();

        let entry = store.edits().release(&ch("stable"), "amd64").unwrap();
        assert_eq!(entry.revision, RevisionId(5));
        assert_eq!(entry.replaces, Some(RevisionId(6)));
        assert_eq!(entry.progressive, None);
        assert_eq!(store.edits().release_count(), 1);
    }

    #[test]
    fn cancel_failures_change_nothing() {
        let server = server(vec![strict(6, &["amd64"])], &[("stable", "amd64", 6, Some(30))]);
        let mut store = store();

        assert_eq!(
            store.apply(
                &server,
                Edit::CancelProgressive {
                    channel: ch("stable"),
                    revert_to: None,
                },
            ),
            Err(Rejection::NoPreviousRevision {
                channel: ch("stable"),
                architecture: "amd64".to_string(),
            })
        );
        assert_eq!(
            store.apply(
                &server,
                Edit::CancelProgressive {
                    channel: ch("stable"),
                    revert_to: Some(RevisionId(99)),
                },
            ),
            Err(Rejection::UnknownRevision(RevisionId(99)))
        );
        assert_eq!(
            store.apply(
                &server,
                Edit::CancelProgressive {
                    channel: ch("edge"),
                    revert_to: None,
                },
            ),
            Err(Rejection::NoProgressiveRelease(ch("edge")))
        );
        assert!(!store.is_dirty());
    }

    #[test]
    fn default_track_change_can_be_cleared() {
        let server = server(vec![strict(1, &["amd64"])], &[("2.0/stable", "amd64", 1, None)]);
        let mut store = store();

        store
            .apply(
                &server,
                Edit::SetDefaultTrack {
                    track: "2.0".to_string(),
                },
            )
            .unwrap();
        assert_eq!(store.edits().default_track(), Some("2.0"));

        store.apply(&server, Edit::ClearDefaultTrack).unwrap();
        assert_eq!(store.edits().default_track(), None);
        assert_eq!(
            store.apply(&server, Edit::ClearDefaultTrack),
            Err(Rejection::NoDefaultTrackChange)
        );
        assert_eq!(
            store.apply(
                &server,
                Edit::SetDefaultTrack {
                    track: "3.0".to_string(),
                },
            ),
            Err(Rejection::UnknownTrack("3.0".to_string()))
        );
    }

    #[test]
    fn selection_feeds_the_available_row() {
        let server = server(vec![strict(7, &["amd64", "arm64"])], &[]);
        let mut store = store();

        store
            .apply(&server, Edit::SelectRevision { revision: RevisionId(7) })
            .unwrap();
        assert_eq!(store.selection().len(), 2);

        store
            .apply(
                &server,
                Edit::Promote {
                    source: Channel::available("latest"),
                    target: ch("edge"),
                },
            )
            .unwrap();
        assert_eq!(store.edits().releases_in(&ch("edge")).count(), 2);

        store.apply(&server, Edit::CancelAll).unwrap();
        assert!(!store.is_dirty());
        assert_eq!(store.selection().len(), 2);

        store.apply(&server, Edit::ClearSelection).unwrap();
        assert!(store.selection().is_empty());
    }

    #[test]
    fn undo_requires_something_to_undo() {
        let server = server(vec![strict(1, &["amd64"])], &[("edge", "amd64", 1, None)]);
        let mut store = store();

        assert_eq!(
            store.apply(&server, Edit::UndoClose { channel: ch("edge") }),
            Err(Rejection::NotClosing(ch("edge")))
        );
        assert_eq!(
            store.apply(
                &server,
                Edit::UndoRelease {
                    channel: ch("edge"),
                    architecture: "amd64".to_string(),
                },
            ),
            Err(Rejection::NoPendingRelease {
                channel: ch("edge"),
                architecture: "amd64".to_string(),
            })
        );

        store
            .apply(&server, Edit::CloseChannel { channel: ch("edge") })
            .unwrap();
        store
            .apply(&server, Edit::UndoClose { channel: ch("edge") })
            .unwrap();
        assert!(!store.is_dirty());
    }

    #[test]
    fn settle_keeps_edits_made_during_a_commit() {
        let before = server(
            vec![strict(1, &["amd64"]), strict(2, &["amd64"])],
            &[
                ("stable", "amd64", 1, None),
                ("candidate", "amd64", 2, None),
                ("edge", "amd64", 1, None),
            ],
        );
        let mut store = store();
        store
            .apply(
                &before,
                Edit::Promote {
                    source: ch("candidate"),
                    target: ch("stable"),
                },
            )
            .unwrap();
        let committed = store.edits().clone();

        store
            .apply(&before, Edit::CloseChannel { channel: ch("edge") })
            .unwrap();

        let after = server(
            vec![strict(1, &["amd64"]), strict(2, &["amd64"])],
            &[
                ("stable", "amd64", 2, None),
                ("candidate", "amd64", 2, None),
                ("edge", "amd64", 1, None),
            ],
        );
        store.settle(&committed, &after);

        assert_eq!(store.edits().release_count(), 0);
        assert_eq!(
            store.edits().closes().iter().collect::<Vec<_>>(),
            vec![&ch("edge")]
        );
    }

    #[test]
    fn reconcile_drops_entries_the_server_made_meaningless() {
        let before = server(
            vec![strict(1, &["amd64"]), strict(2, &["amd64"])],
            &[("stable", "amd64", 1, None), ("beta", "amd64", 2, None)],
        );
        let mut store = store();
        store
            .apply(
                &before,
                Edit::PromoteRevision {
                    revision: RevisionId(2),
                    target: ch("stable"),
                },
            )
            .unwrap();
        store
            .apply(&before, Edit::CloseChannel { channel: ch("beta") })
            .unwrap();
        store
            .apply(&before, Edit::SelectRevision { revision: RevisionId(1) })
            .unwrap();

        let after = ServerState::from_snapshot(Snapshot {
            revisions: vec![strict(2, &["arm64"])],
            ..Snapshot::default()
        });
        let dropped = store.reconcile(&after);

        assert_eq!(dropped, 2);
        assert!(!store.is_dirty());
        assert!(store.selection().is_empty());
    }

    #[test]
    fn cancel_keeps_pending_releases_of_other_architectures() {
        let server = server_with_history(
            vec![strict(5, &["amd64"]), strict(6, &["amd64"]), strict(7, &["arm64"])],
            &[("stable", "amd64", 6, Some(30))],
            vec![
                record(5, "stable", "amd64", 1),
                record(6, "stable", "amd64", 5),
            ],
        );
        let mut store = store();
        store
            .apply(
                &server,
                Edit::PromoteRevision {
                    revision: RevisionId(7),
                    target: ch("stable"),
                },
            )
            .unwrap();

        store
            .apply(
                &server,
                Edit::CancelProgressive {
                    channel: ch("stable"),
                    revert_to: None,
                },
            )
            .unwrap();

        let arm64 = store.edits().release(&ch("stable"), "arm64").unwrap();
        assert_eq!(arm64.revision, RevisionId(7));
        assert_eq!(arm64.replaces, None);
        let amd64 = store.edits().release(&ch("stable"), "amd64").unwrap();
        assert_eq!(amd64.revision, RevisionId(5));
        assert_eq!(amd64.replaces, Some(RevisionId(6)));
        assert_eq!(store.edits().release_count(), 2);
    }

    #[test]
    fn rollout_edits_refuse_a_channel_pending_close() {
        let server = server_with_history(
            vec![strict(5, &["amd64"]), strict(6, &["amd64"])],
            &[("stable", "amd64", 6, Some(30))],
            vec![
                record(5, "stable", "amd64", 1),
                record(6, "stable", "amd64", 5),
            ],
        );
        let mut store = store();
        store
            .apply(&server, Edit::CloseChannel { channel: ch("stable") })
            .unwrap();
        let closing = Err(Rejection::PendingClose(ch("stable")));

        assert_eq!(
            store.apply(
                &server,
                Edit::SetProgressivePercentage {
                    channel: ch("stable"),
                    percentage: 50,
                },
            ),
            closing
        );
        assert_eq!(
            store.apply(&server, Edit::PauseProgressive { channel: ch("stable") }),
            closing
        );
        assert_eq!(
            store.apply(
                &server,
                Edit::CancelProgressive {
                    channel: ch("stable"),
                    revert_to: None,
                },
            ),
            closing
        );
        assert!(store.edits().closes().contains(&ch("stable")));
        assert_eq!(store.edits().release_count(), 0);
    }

    #[test]
    fn configured_minimum_raises_the_update_floor() {
        let options = EngineOptions {
            min_progressive_percentage: 40,
            ..EngineOptions::default()
        };
        let below = server(vec![strict(6, &["amd64"])], &[("stable", "amd64", 6, Some(30))]);
        let mut store = PendingStore::new(options.clone());

        assert_eq!(
            store.apply(
                &below,
                Edit::SetProgressivePercentage {
                    channel: ch("stable"),
                    percentage: 35,
                },
            ),
            Err(Rejection::PercentageOutOfRange {
                value: 35,
                min: 40,
                max: 100,
            })
        );
        store
            .apply(
                &below,
                Edit::SetProgressivePercentage {
                    channel: ch("stable"),
                    percentage: 40,
                },
            )
            .unwrap();
        assert_eq!(percentage(&store, "stable", "amd64"), Some(40));

        let above = server(vec![strict(6, &["amd64"])], &[("stable", "amd64", 6, Some(60))]);
        let mut store = PendingStore::new(options);
        assert_eq!(
            store.apply(
                &above,
                Edit::SetProgressivePercentage {
                    channel: ch("stable"),
                    percentage: 50,
                },
            ),
            Err(Rejection::PercentageOutOfRange {
                value: 50,
                min: 60,
                max: 100,
            })
        );
        assert!(!store.is_dirty());
    }

    #[test]
    fn pending_default_track_change_keeps_latest_empty() {
        let server = server(vec![strict(1, &["amd64"])], &[("2.0/edge", "amd64", 1, None)]);
        let mut store = store();
        let into_latest = Edit::PromoteRevision {
            revision: RevisionId(1),
            target: ch("edge"),
        };

        store
            .apply(
                &server,
                Edit::SetDefaultTrack {
                    track: "2.0".to_string(),
                },
            )
            .unwrap();
        assert_eq!(
            store.apply(&server, into_latest.clone()),
            Err(Rejection::LatestTrackReserved(ch("edge")))
        );
        store
            .apply(
                &server,
                Edit::Promote {
                    source: ch("2.0/edge"),
                    target: ch("2.0/beta"),
                },
            )
            .unwrap();

        store.apply(&server, Edit::ClearDefaultTrack).unwrap();
        store.apply(&server, into_latest).unwrap();
        assert_eq!(
            store.apply(
                &server,
                Edit::SetDefaultTrack {
                    track: "2.0".to_string(),
                },
            ),
            Err(Rejection::LatestTrackNotEmpty)
        );
        assert_eq!(store.edits().default_track(), None);
    }

    #[test]
    fn expired_branches_are_out_of_reach() {
        let server = server_with_history(
            vec![strict(3, &["amd64"]), strict(4, &["amd64"])],
            &[("beta/fix", "amd64", 3, None)],
            vec![record(3, "beta/fix", "amd64", 0)],
        );
        let mut store = store();
        let into_branch = Edit::PromoteRevision {
            revision: RevisionId(4),
            target: ch("beta/fix"),
        };
        let from_branch = Edit::Promote {
            source: ch("beta/fix"),
            target: ch("beta"),
        };

        assert_eq!(
            store.apply_at(&server, into_branch.clone(), ts(40)),
            Err(Rejection::ExpiredBranch(ch("beta/fix")))
        );
        assert_eq!(
            store.apply_at(&server, from_branch.clone(), ts(40)),
            Err(Rejection::ExpiredBranch(ch("beta/fix")))
        );
        assert!(!store.is_dirty());

        store.apply_at(&server, from_branch, ts(10)).unwrap();
        store.apply_at(&server, into_branch, ts(10)).unwrap();
        assert_eq!(store.edits().release_count(), 2);
    }

    proptest! {
        #[test]
        fn promote_then_undo_restores_the_pending_map(
            edge in 1u64..4,
            beta in proptest::option::of(1u64..4),
            target in 0usize..3,
        ) {
            let mut cells = vec![("edge", "amd64", edge, None)];
            if let Some(beta) = beta {
                cells.push(("beta", "amd64", beta, None));
            }
            let server = server(
                (1..4).map(|id| strict(id, &["amd64"])).collect(),
                &cells,
            );
            let target = ch(["stable", "candidate", "beta"][target]);
            let mut store = store();
            let before = store.pending_channel_map(&server);

            if store
                .apply(&server, Edit::Promote { source: ch("edge"), target: target.clone() })
                .is_ok()
            {
                let _ = store.apply(
                    &server,
                    Edit::UndoRelease { channel: target, architecture: "amd64".to_string() },
                );
            }

            prop_assert_eq!(store.pending_channel_map(&server), before);
            prop_assert!(!store.is_dirty());
        }
    }
}
