use chanmap_pending::PendingEdits;
use chanmap_types::{
    Architecture, Channel, EngineOptions, ReleaseRecord, Revision, RevisionId, ServerState,
};
use chrono::{DateTime, Utc};

/// Which revisions the available row offers for one architecture.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AvailableFilter {
    /// Uploaded within the recent window
    #[default]
    Recent,
    /// Never released to a channel and not live on this architecture
    Unreleased,
    All,
    /// Produced by one build request
    Build(String),
}

fn is_live_on(server: &ServerState, revision: RevisionId, architecture: &str) -> bool {
    server
        .channel_map
        .values()
        .any(|cells| cells.get(architecture).is_some_and(|c| c.revision == revision))
}

/// Revisions offered for `architecture`, newest first.
///
/// Scoped to one architecture: a revision live on `amd64` in some channel
/// may still be unreleased on `arm64`.
pub fn filtered_available_revisions<'a>(
    server: &'a ServerState,
    architecture: &str,
    filter: &AvailableFilter,
    now: DateTime<Utc>,
    options: &EngineOptions,
) -> Vec<&'a Revision> {
    let cutoff = now - options.recent_window;
    server
        .catalog
        .iter()
        .filter(|r| r.builds_for(architecture))
        .filter(|r| match filter {
            AvailableFilter::Recent => r.created_at >= cutoff,
            AvailableFilter::Unreleased => {
                r.is_unreleased() && !is_live_on(server, r.revision, architecture)
            }
            AvailableFilter::All => true,
            AvailableFilter::Build(id) => r.build_request_id.as_deref() == Some(id.as_str()),
        })
        .collect()
}

/// Revisions produced by one build request, newest first.
pub fn revisions_from_build<'a>(server: &'a ServerState, build_request_id: &str) -> Vec<&'a Revision> {
    server.catalog.from_build(build_request_id)
}

/// Narrowing of the release history. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub channel: Option<Channel>,
    pub architecture: Option<Architecture>,
    pub revision: Option<RevisionId>,
}

impl HistoryFilter {
    /// Whether `record` passes every set criterion.
    pub fn matches(&self, record: &ReleaseRecord) -> bool {
        self.channel.as_ref().is_none_or(|c| c == &record.channel)
            && self
                .architecture
                .as_ref()
                .is_none_or(|a| a == &record.architecture)
            && self.revision.is_none_or(|r| r == record.revision)
    }
}

/// Release history, newest first.
pub fn release_history<'a>(server: &'a ServerState, filter: &HistoryFilter) -> Vec<&'a ReleaseRecord> {
    server
        .catalog
        .history()
        .iter()
        .filter(|record| filter.matches(record))
        .collect()
}

/// Whether the pending channel map carries any devmode or devel grade
/// revision.
pub fn has_devmode_revisions(server: &ServerState, edits: &PendingEdits) -> bool {
    edits
        .overlay(server)
        .values()
        .flat_map(|cells| cells.values())
        .filter_map(|id| server.revision(*id))
        .any(Revision::is_restricted)
}
