use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chanmap_commit::{CommitError, CommitPhase, CommitTransport};
use chanmap_pending::Edit;
use chanmap_rules::Rejection;

use crate::ReleaseConsole;

/// Shared handle to a [`ReleaseConsole`].
///
/// The lock is only held for synchronous sections, never across the
/// transport call, so edits keep flowing while a commit is in flight.
#[derive(Debug, Clone)]
pub struct ConsoleHandle {
    inner: Arc<Mutex<ReleaseConsole>>,
}

impl ConsoleHandle {
    /// Share `console`.
    pub fn new(console: ReleaseConsole) -> Self {
        Self {
            inner: Arc::new(Mutex::new(console)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReleaseConsole> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the console.
    pub fn with<R>(&self, f: impl FnOnce(&mut ReleaseConsole) -> R) -> R {
        f(&mut self.lock())
    }

    /// Validate and apply one edit under the lock.
    pub fn apply(&self, edit: Edit) -> Result<(), Rejection> {
        self.with(|console| console.apply(edit))
    }

    pub fn phase(&self) -> CommitPhase {
        self.with(|console| console.phase())
    }

    /// Dispatch a commit of the edits pending right now.
    ///
    /// A second call while one is in flight fails with
    /// [`CommitError::InFlight`].
    pub async fn commit<T: CommitTransport>(&self, transport: &T) -> Result<usize, CommitError> {
        let ticket = self.with(|console| console.begin_commit())?;
        let result = transport.commit(ticket.request()).await;
        self.with(|console| console.complete_commit(&ticket, result))
    }
}
