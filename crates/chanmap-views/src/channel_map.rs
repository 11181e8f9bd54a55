use std::collections::BTreeSet;

use chanmap_pending::PendingEdits;
use chanmap_types::{Architecture, Branch, Channel, EngineOptions, ResolvedChannels, ServerState};
use chrono::{DateTime, Utc};

/// The branch record for `channel`, when it is a branch with a known age.
pub fn branch_of(server: &ServerState, channel: &Channel, options: &EngineOptions) -> Option<Branch> {
    server.branch(channel, options.branch_lifetime)
}

/// Whether `channel` is shown at `now`. Branches of unknown age are shown.
pub fn is_visible(server: &ServerState, channel: &Channel, now: DateTime<Utc>, options: &EngineOptions) -> bool {
    branch_of(server, channel, options).is_none_or(|branch| branch.is_live(now))
}

/// Live assignments overlaid with every pending release, as they would be
/// after a commit. Expired branches are left out.
pub fn pending_channel_map(
    server: &ServerState,
    edits: &PendingEdits,
    now: DateTime<Utc>,
    options: &EngineOptions,
) -> ResolvedChannels {
    let mut map = edits.overlay(server);
    map.retain(|channel, _| is_visible(server, channel, now, options));
    map
}

/// Live branches of `track`, in canonical channel order.
pub fn branches(
    server: &ServerState,
    track: &str,
    now: DateTime<Utc>,
    options: &EngineOptions,
) -> Vec<Branch> {
    server
        .channel_map
        .iter()
        .filter(|(channel, cells)| channel.track() == track && channel.is_branch() && !cells.is_empty())
        .filter_map(|(channel, _)| branch_of(server, channel, options))
        .filter(|branch| branch.is_live(now))
        .collect()
}

/// Known tracks, `latest` first.
pub fn tracks(server: &ServerState) -> &[String] {
    &server.tracks
}

/// Every architecture any known revision builds for.
pub fn architectures(server: &ServerState) -> BTreeSet<Architecture> {
    server.catalog.architectures()
}

#[cfg(test)]
mod tests {
    use chanmap_pending::{Edit, PendingStore};
    use chanmap_types::RevisionId;
    use chrono::TimeDelta;

    use super::*;
    use crate::fixtures::{ch, record, server_with_history, strict, ts};

    #[test]
    fn expired_branches_are_left_out() {
        let server = server_with_history(
            vec![strict(1, &["amd64"]), strict(2, &["amd64"])],
            &[
                ("edge", "amd64", 1, None),
                ("edge/old-fix", "amd64", 1, None),
                ("edge/new-fix", "amd64", 2, None),
            ],
            vec![
                record(1, "edge/old-fix", "amd64", 0),
                record(2, "edge/new-fix", "amd64", 20),
            ],
        );
        let options = EngineOptions::default();
        let now = ts(35);

        let map = pending_channel_map(&server, &PendingEdits::new(), now, &options);
        let shown: Vec<String> = map.keys().map(ToString::to_string).collect();
        assert_eq!(shown, vec!["latest/edge", "latest/edge/new-fix"]);

        let live = branches(&server, "latest", now, &options);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].channel, ch("edge/new-fix"));
        assert_eq!(live[0].expires_at, ts(20) + TimeDelta::days(30));
        assert!(branches(&server, "latest", ts(10), &options).len() == 2);
    }

    #[test]
    fn pending_map_reflects_the_latest_edit() {
        let server = server_with_history(
            vec![strict(1, &["amd64"]), strict(2, &["amd64", "arm64"])],
            &[("edge", "amd64", 2, None), ("beta", "amd64", 1, None)],
            vec![],
        );
        let options = EngineOptions::default();
        let mut store = PendingStore::new(options.clone());
        store
            .apply(
                &server,
                Edit::Promote {
                    source: ch("edge"),
                    target: ch("beta"),
                },
            )
            .unwrap();

        let map = pending_channel_map(&server, store.edits(), ts(0), &options);
        assert_eq!(map[&ch("beta")]["amd64"], RevisionId(2));
        assert_eq!(
            architectures(&server).into_iter().collect::<Vec<_>>(),
            vec!["amd64", "arm64"]
        );
        assert_eq!(tracks(&server), ["latest"]);
    }
}
