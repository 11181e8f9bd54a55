//! Pending edit store for chanmap.
//!
//! Holds the client-only overlays on top of the server channel map:
//! pending releases keyed by `(channel, architecture)`, pending channel
//! closes and a pending default-track change, plus the selection of the
//! `available` row.
//!
//! Every [`Edit`] goes through [`PendingStore::apply`], which asks the rule
//! engine first and leaves the store untouched on a [`Rejection`].
//!
//! [`Rejection`]: chanmap_rules::Rejection

mod edit;
mod overlay;
mod store;

pub use edit::Edit;
pub use overlay::{CellKey, PendingEdits, PendingProgressive, PendingRelease};
pub use store::PendingStore;
