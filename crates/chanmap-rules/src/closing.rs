use chanmap_types::Channel;

use crate::{ChannelView, Rejection};

/// Validate queueing `channel` for closure.
///
/// The `available` pseudo-channel cannot be closed, nor can a channel with
/// nothing live or pending, nor one that is already pending close.
pub fn check_close(view: &ChannelView<'_>, channel: &Channel) -> Result<(), Rejection> {
    if channel.is_available() {
        return Err(Rejection::PseudoChannel(channel.clone()));
    }
    if view.is_pending_close(channel) {
        return Err(Rejection::AlreadyClosing(channel.clone()));
    }

    let live = view
        .server()
        .channel_map
        .get(channel)
        .is_some_and(|m| !m.is_empty());
    let pending = view.resolved().get(channel).is_some_and(|m| !m.is_empty());
    if !live && !pending {
        return Err(Rejection::NothingToClose(channel.clone()));
    }

    Ok(())
}

/// Boolean form of [`check_close`].
pub fn can_close(view: &ChannelView<'_>, channel: &Channel) -> bool {
    check_close(view, channel).is_ok()
}
