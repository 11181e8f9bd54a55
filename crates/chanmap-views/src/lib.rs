//! Derived read-only views for chanmap.
//!
//! Pure functions of the server state and the pending edits, cheap enough
//! to recompute on every read. Expired branches never show up here.

mod available;
mod changes;
mod channel_map;
mod progressive;

pub use available::{
    AvailableFilter, HistoryFilter, filtered_available_revisions, has_devmode_revisions,
    release_history, revisions_from_build,
};
pub use changes::{ChangeKind, SeparatedChanges, classify, separated_pending_changes};
pub use channel_map::{architectures, branch_of, branches, is_visible, pending_channel_map, tracks};
pub use progressive::{
    ProgressiveControls, ProgressiveState, progressive_controls, progressive_state_for,
};
