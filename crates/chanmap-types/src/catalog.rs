use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::{Architecture, Channel, ReleaseRecord, Revision, RevisionId};

/// Known revisions plus their release history, as of the last fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionCatalog {
    revisions: BTreeMap<RevisionId, Revision>,
    /// Newest first
    history: Vec<ReleaseRecord>,
}

impl RevisionCatalog {
    /// Index `revisions` by id and order `history` newest first.
    pub fn new(revisions: Vec<Revision>, mut history: Vec<ReleaseRecord>) -> Self {
        history.sort_by(|a, b| b.when.cmp(&a.when));
        Self {
            revisions: revisions.into_iter().map(|r| (r.revision, r)).collect(),
            history,
        }
    }

    pub fn get(&self, id: RevisionId) -> Option<&Revision> {
        self.revisions.get(&id)
    }

    /// Whether `id` is a known revision.
    pub fn contains(&self, id: RevisionId) -> bool {
        self.revisions.contains_key(&id)
    }

    /// Revisions, newest revision number first.
    pub fn iter(&self) -> impl Iterator<Item = &Revision> {
        self.revisions.values().rev()
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Every architecture any revision builds for.
    pub fn architectures(&self) -> BTreeSet<Architecture> {
        self.revisions
            .values()
            .flat_map(|r| r.architectures.iter().cloned())
            .collect()
    }

    /// Revisions produced by one build request, newest first.
    pub fn from_build(&self, build_request_id: &str) -> Vec<&Revision> {
        self.iter()
            .filter(|r| r.build_request_id.as_deref() == Some(build_request_id))
            .collect()
    }

    /// Release history, newest first.
    pub fn history(&self) -> &[ReleaseRecord] {
        &self.history
    }

    /// The revision that was live in `channel`/`architecture` before `current`.
    ///
    /// Walks the history newest first, skips records of `current` and returns
    /// the first other revision released into the cell.
    pub fn previous_revision(
        &self,
        channel: &Channel,
        architecture: &str,
        current: RevisionId,
    ) -> Option<RevisionId> {
        self.history
            .iter()
            .filter(|r| &r.channel == channel && r.architecture == architecture)
            .map(|r| r.revision)
            .find(|rev| *rev != current)
    }

    /// Time of the most recent release into `channel` on any architecture.
    pub fn last_release_into(&self, channel: &Channel) -> Option<DateTime<Utc>> {
        self.history
            .iter()
            .find(|r| &r.channel == channel)
            .map(|r| r.when)
    }
}
