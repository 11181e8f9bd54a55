use chanmap_pending::{PendingEdits, PendingStore};
use chanmap_types::{ServerState, Snapshot};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{CommitError, CommitRequest};

/// Where the console stands with respect to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPhase {
    /// No pending edits
    Clean,
    /// Pending edits, nothing in flight
    Dirty,
    /// A commit request is in flight
    Committing,
}

/// A dispatched commit: the payload plus the pending edits it was built
/// from, frozen at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitTicket {
    id: u64,
    edits: PendingEdits,
    request: CommitRequest,
}

impl CommitTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The payload to send.
    pub fn request(&self) -> &CommitRequest {
        &self.request
    }

    /// The edits frozen when the commit began.
    pub fn edits(&self) -> &PendingEdits {
        &self.edits
    }
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The server state returned by the commit
    pub server: ServerState,
    /// Pending entries made meaningless by it and dropped
    pub dropped: usize,
}

/// Commit state machine. At most one commit is in flight at a time.
#[derive(Debug, Clone, Default)]
pub struct CommitTracker {
    in_flight: Option<u64>,
    next_id: u64,
}

impl CommitTracker {
    /// A tracker with no commit in flight.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_committing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Commit phase given the current state of `store`.
    pub fn phase(&self, store: &PendingStore) -> CommitPhase {
        if self.in_flight.is_some() {
            CommitPhase::Committing
        } else if store.is_dirty() {
            CommitPhase::Dirty
        } else {
            CommitPhase::Clean
        }
    }

    /// Freeze the pending edits into a ticket and mark it in flight.
    ///
    /// Edits applied after this call belong to the next commit.
    pub fn begin(&mut self, server: &ServerState, store: &PendingStore) -> Result<CommitTicket, CommitError> {
        if self.in_flight.is_some() {
            return Err(CommitError::InFlight);
        }
        if !store.is_dirty() {
            return Err(CommitError::NothingToCommit);
        }

        let edits = store.edits().clone();
        let request = CommitRequest::build(server, &edits);
        if request.is_empty() {
            return Err(CommitError::NothingToCommit);
        }

        self.next_id += 1;
        let id = self.next_id;
        self.in_flight = Some(id);
        info!(
            commit = id,
            releases = request.release_count(),
            closes = request.closes.len(),
            "commit started"
        );

        Ok(CommitTicket { id, edits, request })
    }

    /// Fold a successful commit in: adopt the returned server state and
    /// drop what the ticket carried from the store.
    pub fn succeed(
        &mut self,
        ticket: &CommitTicket,
        store: &mut PendingStore,
        snapshot: Snapshot,
    ) -> Result<CommitOutcome, CommitError> {
        self.finish(ticket)?;

        let server = ServerState::from_snapshot(snapshot);
        let dropped = store.settle(&ticket.edits, &server);
        info!(commit = ticket.id, dropped, "commit succeeded");

        Ok(CommitOutcome { server, dropped })
    }

    /// Record a failed commit. The store is left exactly as it was.
    pub fn fail(&mut self, ticket: &CommitTicket, error: &CommitError) -> Result<(), CommitError> {
        self.finish(ticket)?;
        warn!(commit = ticket.id, error = %error, "commit failed");
        Ok(())
    }

    fn finish(&mut self, ticket: &CommitTicket) -> Result<(), CommitError> {
        if self.in_flight != Some(ticket.id) {
            return Err(CommitError::StaleTicket(ticket.id));
        }
        self.in_flight = None;
        Ok(())
    }
}
