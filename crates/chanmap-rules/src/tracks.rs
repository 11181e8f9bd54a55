use chanmap_types::LATEST_TRACK;

use crate::{ChannelView, Rejection};

/// Validate changing the default track to `track`.
///
/// The track must exist and differ from the current default. Moving the
/// default away from `latest` requires the `latest` track to have nothing
/// live or pending in any risk.
pub fn check_default_track(view: &ChannelView<'_>, track: &str) -> Result<(), Rejection> {
    let server = view.server();
    if !server.has_track(track) {
        return Err(Rejection::UnknownTrack(track.to_string()));
    }

    let current = server.default_track.as_deref().unwrap_or(LATEST_TRACK);
    if current == track {
        return Err(Rejection::AlreadyDefaultTrack(track.to_string()));
    }

    if track != LATEST_TRACK {
        let latest_has_live = server
            .channel_map
            .iter()
            .any(|(channel, cells)| channel.is_latest_track() && !cells.is_empty());
        let latest_has_pending = view
            .resolved()
            .iter()
            .any(|(channel, cells)| channel.is_latest_track() && !cells.is_empty());
        if latest_has_live || latest_has_pending {
            return Err(Rejection::LatestTrackNotEmpty);
        }
    }

    Ok(())
}
