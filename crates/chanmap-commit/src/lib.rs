//! Commit protocol for chanmap.
//!
//! Turns the pending edits into one [`CommitRequest`], tracks the single
//! in-flight commit with a [`CommitTracker`] and delivers requests through
//! a [`CommitTransport`]. [`HttpTransport`] talks to the publisher API.
//!
//! A commit freezes the pending edits at dispatch. Edits applied while it
//! is in flight go to the next commit; a failed commit leaves every
//! overlay as it was.

mod error;
mod protocol;
mod request;
mod transport;

pub use error::CommitError;
pub use protocol::{CommitOutcome, CommitPhase, CommitTicket, CommitTracker};
pub use request::{CommitRequest, ProgressivePayload, ReleaseInstruction};
pub use transport::{CommitTransport, DEFAULT_TIMEOUT, HttpTransport};
