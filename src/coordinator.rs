//! Navigation coordinator.
//!
//! [`Coordinator`] owns the displayed [`Location`] and turns navigation
//! intents into stages. A stage becomes platform-visible only when the
//! rendering surface reports it as displayed:
//!
//! ```text
//! navigate / set_param / refresh / platform event
//!        │
//!        ▼
//!   Requested ──► Staged ──(render, subscribers notified)──► displayed(token) ──► Committed
//!                   │
//!                   └── a newer stage supersedes it: its commit never runs
//! ```
//!
//! Each stage owes exactly one commit. [`Coordinator::displayed`] runs it
//! only for the token of the latest stage and only once, so a render of a
//! superseded stage or a repeated signal produces no address-bar write.
//!
//! # Example
//!
//! ```
//! use async_navigator::platform::{MemoryHistory, PlatformCapabilities};
//! use async_navigator::Coordinator;
//! use std::rc::Rc;
//!
//! let history = Rc::new(MemoryHistory::new("/"));
//! let mut coordinator = Coordinator::new(&PlatformCapabilities::history_only(history.clone()));
//!
//! coordinator.set_param("tab", "wip");
//! coordinator.set_param("q", "async");
//! assert!(history.pushes().is_empty());
//!
//! let snapshot = coordinator.snapshot();
//! assert!(coordinator.displayed(snapshot.token).is_committed());
//! assert_eq!(history.pushes(), vec!["/?q=async&tab=wip"]);
//! ```

use crate::backend::{
    initial_location, select_backend, BackendKind, LocationChange, NavigationBackend,
};
use crate::cache::Revalidate;
use crate::error::CommitOutcome;
use crate::platform::{PlatformCapabilities, PlatformEvent};
use crate::state::{RouterState, StageToken};
use crate::{debug_log, info_log, trace_log, warn_log, Location};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Callback invoked for every stage.
pub type Listener = Rc<RefCell<dyn FnMut(&LocationChange)>>;

/// Handle returned by [`Coordinator::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

// ============================================================================
// Subscribers
// ============================================================================

#[derive(Default)]
struct SubscribersInner {
    listeners: RefCell<Vec<(SubscriptionId, Listener)>>,
    next_id: Cell<u64>,
    queue: RefCell<VecDeque<LocationChange>>,
    delivering: Cell<bool>,
}

/// Stage listeners, shared between the coordinator and its owner.
///
/// Stages are delivered in order. A stage published while another one is
/// being delivered, or inside [`deferred`](Self::deferred), is queued and
/// delivered afterwards, so listeners may call back into whatever owns the
/// coordinator. Cloning produces another handle to the same list.
#[derive(Clone, Default)]
pub struct Subscribers {
    inner: Rc<SubscribersInner>,
}

impl Subscribers {
    /// Call `listener` for every future stage.
    pub fn subscribe(&self, listener: impl FnMut(&LocationChange) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.get() + 1);
        self.inner.next_id.set(id.0);
        let listener: Listener = Rc::new(RefCell::new(listener));
        self.inner.listeners.borrow_mut().push((id, listener));
        id
    }

    /// Stop calling a listener. Returns `false` for unknown ids.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Number of listeners.
    pub fn len(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Return `true` if nobody listens.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `change` now, or queue it when a delivery is in progress.
    pub fn publish(&self, change: LocationChange) {
        self.inner.queue.borrow_mut().push_back(change);
        if !self.inner.delivering.replace(true) {
            self.drain();
        }
    }

    /// Run `f`, holding back the stages it publishes until it returns.
    pub fn deferred<R>(&self, f: impl FnOnce() -> R) -> R {
        if self.inner.delivering.replace(true) {
            // an outer delivery loop picks the stages up
            return f();
        }
        let result = f();
        self.drain();
        result
    }

    fn drain(&self) {
        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(change) = next else {
                break;
            };
            let listeners: Vec<Listener> = self
                .inner
                .listeners
                .borrow()
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect();
            trace_log!(
                "Publishing stage {:?} to {} listeners",
                change.token,
                listeners.len()
            );
            for listener in listeners {
                (&mut *listener.borrow_mut())(&change);
            }
        }
        self.inner.delivering.set(false);
    }
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("listeners", &self.len())
            .field("queued", &self.inner.queue.borrow().len())
            .finish()
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Read-only view of the staged location and its token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterSnapshot {
    pub location: Location,
    pub token: StageToken,
}

/// Owner of the displayed location.
pub struct Coordinator {
    state: RouterState,
    backend: Box<dyn NavigationBackend>,
    subscribers: Subscribers,
    revalidator: Option<Rc<dyn Revalidate>>,
}

impl Coordinator {
    /// Probe `capabilities` and start on the platform's current location.
    pub fn new(capabilities: &PlatformCapabilities) -> Self {
        Self::with_backend(
            initial_location(capabilities),
            select_backend(capabilities, false),
        )
    }

    /// Create a coordinator with an explicit backend.
    pub fn with_backend(initial: Location, backend: Box<dyn NavigationBackend>) -> Self {
        info_log!(
            "Coordinator starting at '{}' ({:?} backend)",
            initial,
            backend.kind()
        );
        Self {
            state: RouterState::new(initial),
            backend,
            subscribers: Subscribers::default(),
            revalidator: None,
        }
    }

    /// Set what [`refresh`](Self::refresh) revalidates.
    pub fn with_revalidator(mut self, revalidator: Rc<dyn Revalidate>) -> Self {
        self.revalidator = Some(revalidator);
        self
    }

    /// Strategy in use.
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    // ========================================================================
    // Intents
    // ========================================================================

    /// Request a full location replacement.
    pub fn navigate(&mut self, url: &str) {
        info_log!("Navigate '{}' → '{}'", self.state.current(), url);
        let change = self.backend.navigate(&mut self.state, url);
        self.publish(change);
    }

    /// Request an update of one query parameter; an empty `value` removes it.
    pub fn set_param(&mut self, key: &str, value: &str) {
        debug_log!("Set param '{}' = '{}'", key, value);
        let change = self.backend.set_param(&mut self.state, key, value);
        self.publish(change);
    }

    /// Revalidate dependent data and re-stage the current location.
    pub fn refresh(&mut self) {
        if let Some(revalidator) = &self.revalidator {
            revalidator.revalidate();
        }
        debug_log!("Refresh '{}'", self.state.current());
        let change = self.backend.refresh(&mut self.state);
        self.publish(Some(change));
    }

    /// Deliver a platform notification (navigate event or popstate).
    pub fn handle_platform_event(&mut self, event: PlatformEvent) {
        trace_log!("Platform event {:?}", event);
        let change = self.backend.on_platform_event(&mut self.state, event);
        self.publish(change);
    }

    // ========================================================================
    // Commit-timing bridge
    // ========================================================================

    /// Report that the stage identified by `token` has been rendered and
    /// applied to the visible surface.
    ///
    /// Runs the owed commit if `token` is the latest stage and the commit has
    /// not run yet. Call it before the next frame is presented.
    pub fn displayed(&mut self, token: StageToken) -> CommitOutcome {
        match self.state.take_commit(token) {
            Ok(commit) => {
                debug_log!("Committing '{}' ({:?})", self.state.current(), commit);
                self.backend.commit(commit);
                CommitOutcome::Committed
            }
            Err(outcome) => {
                if outcome == CommitOutcome::Superseded {
                    warn_log!(
                        "Ignoring displayed signal for stale stage {:?} (latest {:?})",
                        token,
                        self.state.token()
                    );
                }
                outcome
            }
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Staged location.
    pub fn current_location(&self) -> &Location {
        self.state.current()
    }

    /// Location whose commit last ran.
    pub fn committed_location(&self) -> &Location {
        self.state.committed()
    }

    /// Check if an intercepted platform navigation awaits its commit.
    ///
    /// Always `false` with the history backend.
    pub fn is_navigation_pending(&self) -> bool {
        self.backend.is_pending(&self.state)
    }

    /// Staged location plus the token to report back to [`displayed`](Self::displayed).
    pub fn snapshot(&self) -> RouterSnapshot {
        RouterSnapshot {
            location: self.state.current().clone(),
            token: self.state.token(),
        }
    }

    /// Underlying state, for inspection.
    pub fn state(&self) -> &RouterState {
        &self.state
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Call `listener` for every future stage.
    pub fn subscribe(&mut self, listener: impl FnMut(&LocationChange) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(listener)
    }

    /// Stop calling a listener. Returns `false` for unknown ids.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Handle to the listener list, usable without borrowing the coordinator.
    pub fn subscribers(&self) -> Subscribers {
        self.subscribers.clone()
    }

    fn publish(&mut self, change: Option<LocationChange>) {
        if let Some(change) = change {
            self.subscribers.publish(change);
        }
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("state", &self.state)
            .field("backend", &self.backend.kind())
            .field("listeners", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}
