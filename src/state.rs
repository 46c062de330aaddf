//! Router state management

use crate::error::CommitOutcome;
use crate::{trace_log, Location};
use futures::channel::oneshot;
use std::fmt;

/// Identifies one staged location.
///
/// Every stage, restage and resync produces a new token. The rendering
/// surface hands the token of what it rendered back to
/// [`Coordinator::displayed`](crate::Coordinator::displayed); tokens of
/// superseded stages commit nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageToken(u64);

impl StageToken {
    /// Raw generation number.
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// The platform-visible effect owed for the staged location.
pub enum PendingCommit {
    /// Write `url` to the address bar with a new history entry.
    PushState { url: String },
    /// Let the platform finish its intercepted navigation.
    FinishNavigation(oneshot::Sender<()>),
    /// Nothing to do; the platform already shows the location.
    Noop,
}

impl fmt::Debug for PendingCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PushState { url } => f.debug_struct("PushState").field("url", url).finish(),
            Self::FinishNavigation(_) => write!(f, "FinishNavigation"),
            Self::Noop => write!(f, "Noop"),
        }
    }
}

/// Router state
///
/// Holds the staged location, the one commit owed for it, and the last
/// location whose commit ran.
#[derive(Debug)]
pub struct RouterState {
    /// Staged (displayed-to-be) location
    current: Location,
    /// Last location whose commit ran
    committed: Location,
    /// Commit owed for `current`, if it has not run yet
    pending: Option<PendingCommit>,
    /// Stage counter; each stage supersedes every earlier one
    generation: u64,
}

impl RouterState {
    /// Create state already committed at `initial`.
    pub fn new(initial: Location) -> Self {
        Self {
            current: initial.clone(),
            committed: initial,
            pending: None,
            generation: 0,
        }
    }

    /// Staged location
    pub fn current(&self) -> &Location {
        &self.current
    }

    /// Last committed location
    pub fn committed(&self) -> &Location {
        &self.committed
    }

    /// Token of the latest stage
    pub fn token(&self) -> StageToken {
        StageToken(self.generation)
    }

    /// Check if a token still refers to the latest stage
    pub fn is_current(&self, token: StageToken) -> bool {
        token.0 == self.generation
    }

    /// Check if a commit is owed
    pub fn has_pending_commit(&self) -> bool {
        self.pending.is_some()
    }

    /// Peek at the owed commit
    pub fn pending_commit(&self) -> Option<&PendingCommit> {
        self.pending.as_ref()
    }

    /// Stage `location` with the commit that will make it platform-visible.
    ///
    /// Returns the new token and the superseded commit, if one was still owed.
    /// Dropping a superseded [`PendingCommit::FinishNavigation`] aborts that
    /// platform navigation.
    pub fn stage(
        &mut self,
        location: Location,
        commit: PendingCommit,
    ) -> (StageToken, Option<PendingCommit>) {
        self.generation += 1;
        self.current = location;
        let superseded = self.pending.replace(commit);
        trace_log!(
            "Stage {} → '{}' (superseded: {:?})",
            self.generation,
            self.current,
            superseded
        );
        (self.token(), superseded)
    }

    /// Re-stage the current location under a new token.
    ///
    /// An owed commit is carried over unchanged.
    pub fn restage(&mut self) -> StageToken {
        self.generation += 1;
        self.token()
    }

    /// Take the owed commit if `token` is the latest stage.
    ///
    /// On success `committed` becomes the staged location.
    pub fn take_commit(&mut self, token: StageToken) -> Result<PendingCommit, CommitOutcome> {
        if !self.is_current(token) {
            return Err(CommitOutcome::Superseded);
        }
        let commit = self.pending.take().ok_or(CommitOutcome::AlreadyCommitted)?;
        self.committed = self.current.clone();
        Ok(commit)
    }
}

impl Default for RouterState {
    fn default() -> Self {
        Self::new(Location::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(url: &str) -> PendingCommit {
        PendingCommit::PushState {
            url: url.to_string(),
        }
    }

    #[test]
    fn test_initial_state_is_committed() {
        let state = RouterState::new(Location::parse("/login"));
        assert_eq!(state.current().path(), "/login");
        assert_eq!(state.committed(), state.current());
        assert!(!state.has_pending_commit());
    }

    #[test]
    fn test_stage_then_commit() {
        let mut state = RouterState::default();
        let (token, superseded) = state.stage(Location::parse("/login"), push("/login"));
        assert!(superseded.is_none());
        assert_eq!(state.committed().path(), "/");

        let commit = state.take_commit(token).unwrap();
        assert!(matches!(commit, PendingCommit::PushState { ref url } if url == "/login"));
        assert_eq!(state.committed().path(), "/login");
    }

    #[test]
    fn test_second_stage_supersedes_first() {
        let mut state = RouterState::default();
        let (first, _) = state.stage(Location::parse("/?tab=wip"), push("/?tab=wip"));
        let (second, superseded) = state.stage(Location::parse("/?q=a&tab=wip"), push("/?q=a&tab=wip"));

        assert!(matches!(superseded, Some(PendingCommit::PushState { .. })));
        assert_eq!(state.take_commit(first).unwrap_err(), CommitOutcome::Superseded);
        assert!(state.take_commit(second).is_ok());
    }

    #[test]
    fn test_commit_runs_once() {
        let mut state = RouterState::default();
        let (token, _) = state.stage(Location::parse("/login"), PendingCommit::Noop);
        assert!(state.take_commit(token).is_ok());
        assert_eq!(
            state.take_commit(token).unwrap_err(),
            CommitOutcome::AlreadyCommitted
        );
    }

    #[test]
    fn test_restage_carries_pending_commit() {
        let mut state = RouterState::default();
        let (staged, _) = state.stage(Location::parse("/login"), push("/login"));
        let restaged = state.restage();

        assert_ne!(staged, restaged);
        assert!(state.has_pending_commit());
        assert_eq!(state.take_commit(staged).unwrap_err(), CommitOutcome::Superseded);
        assert!(state.take_commit(restaged).is_ok());
    }
}
