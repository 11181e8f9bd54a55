use chanmap_pending::{PendingEdits, PendingRelease};
use chanmap_types::{Channel, ServerState};

/// Confirmation bucket of one pending release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeKind {
    /// A plain release, including a full release over an occupied cell
    Release,
    /// A new release starting a partial rollout
    ProgressiveRelease,
    /// A new percentage or pause state for a rollout that is already live
    ProgressiveUpdate,
    /// Revert of a live rollout to an earlier revision
    Cancellation,
}

impl ChangeKind {
    /// Whether the change lands in the new-releases bucket.
    pub fn is_new_release(self) -> bool {
        matches!(self, ChangeKind::Release | ChangeKind::ProgressiveRelease)
    }
}

/// Classify a pending release.
///
/// An entry carrying `replaces` is a cancellation. Otherwise it is an
/// update when it keeps the live revision of a cell whose rollout is still
/// active. Anything else is a new release, progressive when it targets
/// less than 100%.
pub fn classify(server: &ServerState, release: &PendingRelease) -> ChangeKind {
    if release.replaces.is_some() {
        ChangeKind::Cancellation
    } else if release.is_progressive_update(server) {
        ChangeKind::ProgressiveUpdate
    } else if release.progressive.is_some_and(|p| p.is_partial()) {
        ChangeKind::ProgressiveRelease
    } else {
        ChangeKind::Release
    }
}

/// Pending edits split into the disjoint buckets of the confirmation panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeparatedChanges<'a> {
    pub new_releases: Vec<&'a PendingRelease>,
    pub progressive_updates: Vec<&'a PendingRelease>,
    pub cancellations: Vec<&'a PendingRelease>,
    pub closes: Vec<&'a Channel>,
    pub default_track: Option<&'a str>,
}

impl SeparatedChanges<'_> {
    pub fn is_empty(&self) -> bool {
        self.release_count() == 0 && self.closes.is_empty() && self.default_track.is_none()
    }

    /// Entries across the three release buckets.
    pub fn release_count(&self) -> usize {
        self.new_releases.len() + self.progressive_updates.len() + self.cancellations.len()
    }

    /// Every release entry, new releases first, then updates, then
    /// cancellations.
    pub fn releases(&self) -> impl Iterator<Item = &PendingRelease> {
        self.new_releases
            .iter()
            .chain(&self.progressive_updates)
            .chain(&self.cancellations)
            .copied()
    }
}

/// Partition `edits` for confirmation and commit.
pub fn separated_pending_changes<'a>(
    server: &ServerState,
    edits: &'a PendingEdits,
) -> SeparatedChanges<'a> {
    let mut changes = SeparatedChanges {
        closes: edits.closes().iter().collect(),
        default_track: edits.default_track(),
        ..SeparatedChanges::default()
    };

    for release in edits.releases() {
        match classify(server, release) {
            ChangeKind::Release | ChangeKind::ProgressiveRelease => changes.new_releases.push(release),
            ChangeKind::ProgressiveUpdate => changes.progressive_updates.push(release),
            ChangeKind::Cancellation => changes.cancellations.push(release),
        }
    }

    changes
}
