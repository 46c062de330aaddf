//! Navigation backends.
//!
//! A [`NavigationBackend`] turns navigation intents and platform events into
//! stages on the [`RouterState`], and later performs the platform-visible
//! commit. Two strategies exist:
//!
//! | Backend             | Platform        | Commit                               |
//! |---------------------|-----------------|--------------------------------------|
//! | [`InterceptBackend`]| [`NavigationApi`] | resolve the intercepted navigation |
//! | [`HistoryBackend`]  | [`HistoryApi`]  | `push_state` of the staged URL       |
//!
//! [`select_backend`] probes the platform once at startup. Nothing else in
//! the crate branches on which backend is in use.

use crate::location::UrlParts;
use crate::platform::{
    FocusReset, HistoryApi, InterceptDecision, Interception, NavigateEvent, NavigationApi,
    NavigationType, PlatformCapabilities, PlatformEvent,
};
use crate::state::{PendingCommit, RouterState, StageToken};
use crate::transition::TransitionType;
use crate::{debug_log, info_log, trace_log, warn_log, Location};
use futures::channel::oneshot;
use std::rc::Rc;

// ============================================================================
// Staged navigation
// ============================================================================

/// How urgently the rendering surface should apply a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePriority {
    /// Batched: keep the old screen until the new one is ready.
    Transition,
    /// Render immediately, showing fallbacks on cache misses. Used when the
    /// platform already moved (popstate).
    Sync,
}

/// A stage produced by a backend, reported to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationChange {
    pub token: StageToken,
    pub location: Location,
    pub transition_types: Vec<TransitionType>,
    pub priority: UpdatePriority,
}

/// Which strategy a backend implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Intercept,
    History,
}

// ============================================================================
// NavigationBackend
// ============================================================================

/// Navigation strategy.
///
/// Methods that stage return the resulting [`LocationChange`], or `None` when
/// nothing was staged.
pub trait NavigationBackend {
    /// Strategy implemented by this backend.
    fn kind(&self) -> BackendKind;

    /// Request a full location replacement.
    fn navigate(&mut self, state: &mut RouterState, url: &str) -> Option<LocationChange>;

    /// Request an update of one query parameter of the staged location.
    fn set_param(
        &mut self,
        state: &mut RouterState,
        key: &str,
        value: &str,
    ) -> Option<LocationChange>;

    /// Re-stage the current location so dependent reads run again.
    fn refresh(&mut self, state: &mut RouterState) -> LocationChange {
        let token = state.restage();
        LocationChange {
            token,
            location: state.current().clone(),
            transition_types: Vec::new(),
            priority: UpdatePriority::Transition,
        }
    }

    /// Handle a notification from the platform.
    fn on_platform_event(
        &mut self,
        state: &mut RouterState,
        event: PlatformEvent,
    ) -> Option<LocationChange>;

    /// Perform a commit taken from the state.
    fn commit(&mut self, commit: PendingCommit);

    /// Check if a platform navigation is waiting for its commit
    fn is_pending(&self, _state: &RouterState) -> bool {
        false
    }
}

/// Location the platform starts on.
pub fn initial_location(capabilities: &PlatformCapabilities) -> Location {
    match &capabilities.navigation {
        Some(navigation) => Location::parse(&navigation.current_url()),
        None => Location::parse(&capabilities.history.location()),
    }
}

/// Pick the backend for `capabilities`.
///
/// The intercepting backend is used whenever the platform offers it, unless
/// `force_history` is set.
pub fn select_backend(
    capabilities: &PlatformCapabilities,
    force_history: bool,
) -> Box<dyn NavigationBackend> {
    match &capabilities.navigation {
        Some(navigation) if !force_history => {
            info_log!("Using intercepting navigation backend");
            Box::new(InterceptBackend::new(Rc::clone(navigation)))
        }
        _ => {
            info_log!("Using history navigation backend");
            Box::new(HistoryBackend::new(Rc::clone(&capabilities.history)))
        }
    }
}

// ============================================================================
// InterceptBackend
// ============================================================================

/// Backend for platforms with an intercepting navigation API.
///
/// Intents are turned into platform navigations; the resulting navigate
/// event is intercepted, staged, and held open until the commit resolves it.
pub struct InterceptBackend {
    api: Rc<dyn NavigationApi>,
}

impl InterceptBackend {
    /// Create a backend on top of `api`.
    pub fn new(api: Rc<dyn NavigationApi>) -> Self {
        Self { api }
    }

    /// Run the handler for `event` and deliver its decision to the platform.
    ///
    /// A traverse to the current entry is dropped before the platform sees a
    /// decision, so an ongoing intercepted navigation keeps running.
    fn dispatch(&mut self, state: &mut RouterState, event: NavigateEvent) -> Option<LocationChange> {
        if event.navigation_type == NavigationType::Traverse
            && event.destination_index == self.api.current_index()
        {
            warn_log!(
                "Ignoring traverse {} to the current index {}",
                event.id,
                event.destination_index
            );
            return None;
        }
        let (decision, change) = self.intercept(state, &event);
        self.api.respond(&event, decision);
        change
    }

    fn intercept(
        &self,
        state: &mut RouterState,
        event: &NavigateEvent,
    ) -> (InterceptDecision, Option<LocationChange>) {
        if !event.can_intercept {
            warn_log!(
                "Navigation to '{}' cannot be intercepted",
                event.destination_url
            );
            return (InterceptDecision::Declined, None);
        }

        let mut transition_types = vec![TransitionType::Navigation(event.navigation_type)];
        if event.navigation_type == NavigationType::Traverse {
            // equal indices never get here, see dispatch
            if event.destination_index > self.api.current_index() {
                transition_types.push(TransitionType::Forward);
            } else {
                transition_types.push(TransitionType::Back);
            }
        }

        let current_url = self.api.current_url();
        let only_query_or_fragment = match (
            UrlParts::split(&current_url),
            UrlParts::split(&event.destination_url),
        ) {
            (Some(current), Some(destination)) => {
                current.only_query_or_fragment_differs(&destination)
            }
            _ => false,
        };
        let focus_reset = if only_query_or_fragment {
            FocusReset::Manual
        } else {
            FocusReset::AfterTransition
        };

        let (finish, handler) = oneshot::channel();
        let location = Location::parse(&event.destination_url);
        let (token, superseded) = state.stage(location, PendingCommit::FinishNavigation(finish));
        if superseded.is_some() {
            debug_log!("Navigation {} supersedes an uncommitted stage", event.id);
        }
        debug_log!(
            "Intercepted {} '{}' → '{}' (focus: {:?}, tags: {:?})",
            event.navigation_type.as_str(),
            current_url,
            event.destination_url,
            focus_reset,
            transition_types
        );

        let change = LocationChange {
            token,
            location: state.current().clone(),
            transition_types,
            priority: UpdatePriority::Transition,
        };
        let decision = InterceptDecision::Intercepted(Interception {
            handler,
            focus_reset,
        });
        (decision, Some(change))
    }
}

impl NavigationBackend for InterceptBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Intercept
    }

    fn navigate(&mut self, state: &mut RouterState, url: &str) -> Option<LocationChange> {
        let event = self.api.navigate(url);
        self.dispatch(state, event)
    }

    fn set_param(
        &mut self,
        state: &mut RouterState,
        key: &str,
        value: &str,
    ) -> Option<LocationChange> {
        // Built from the staged location so back-to-back updates accumulate.
        let url = state.current().with_param(key, value).to_url();
        let event = self.api.navigate(&url);
        self.dispatch(state, event)
    }

    fn on_platform_event(
        &mut self,
        state: &mut RouterState,
        event: PlatformEvent,
    ) -> Option<LocationChange> {
        match event {
            PlatformEvent::Navigate(event) => self.dispatch(state, event),
            PlatformEvent::PopState => {
                trace_log!("Ignoring popstate: intercepting backend handles traversals");
                None
            }
        }
    }

    fn commit(&mut self, commit: PendingCommit) {
        match commit {
            PendingCommit::FinishNavigation(finish) => {
                if finish.send(()).is_err() {
                    warn_log!("Platform dropped the navigation before it was committed");
                }
            }
            PendingCommit::PushState { url } => {
                warn_log!("Intercepting backend skipped a pushState commit for '{}'", url);
            }
            PendingCommit::Noop => {}
        }
    }

    fn is_pending(&self, state: &RouterState) -> bool {
        matches!(
            state.pending_commit(),
            Some(PendingCommit::FinishNavigation(_))
        )
    }
}

// ============================================================================
// HistoryBackend
// ============================================================================

/// Backend for platforms with only the legacy history API.
///
/// Stages purely in memory and writes the address bar in the commit. Pop
/// notifications resynchronize immediately with a no-op commit.
pub struct HistoryBackend {
    history: Rc<dyn HistoryApi>,
}

impl HistoryBackend {
    /// Create a backend on top of `history`.
    pub fn new(history: Rc<dyn HistoryApi>) -> Self {
        Self { history }
    }

    fn stage_push(&mut self, state: &mut RouterState, location: Location) -> LocationChange {
        let url = location.to_url();
        let (token, superseded) = state.stage(location, PendingCommit::PushState { url });
        if let Some(PendingCommit::PushState { url }) = superseded {
            debug_log!("Dropped uncommitted pushState for '{}'", url);
        }
        LocationChange {
            token,
            location: state.current().clone(),
            transition_types: vec![TransitionType::Navigation(NavigationType::Push)],
            priority: UpdatePriority::Transition,
        }
    }
}

impl NavigationBackend for HistoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::History
    }

    fn navigate(&mut self, state: &mut RouterState, url: &str) -> Option<LocationChange> {
        let location = Location::resolve(state.current(), url);
        Some(self.stage_push(state, location))
    }

    fn set_param(
        &mut self,
        state: &mut RouterState,
        key: &str,
        value: &str,
    ) -> Option<LocationChange> {
        let location = state.current().with_param(key, value);
        Some(self.stage_push(state, location))
    }

    fn on_platform_event(
        &mut self,
        state: &mut RouterState,
        event: PlatformEvent,
    ) -> Option<LocationChange> {
        match event {
            PlatformEvent::PopState => {
                let location = Location::parse(&self.history.location());
                let (token, superseded) = state.stage(location, PendingCommit::Noop);
                if let Some(PendingCommit::PushState { url }) = superseded {
                    warn_log!("Popstate discarded the queued pushState for '{}'", url);
                }
                debug_log!("Popstate resynchronized to '{}'", state.current());
                Some(LocationChange {
                    token,
                    location: state.current().clone(),
                    transition_types: vec![TransitionType::Navigation(NavigationType::Traverse)],
                    priority: UpdatePriority::Sync,
                })
            }
            PlatformEvent::Navigate(event) => {
                warn_log!(
                    "History backend received navigate event {} for '{}'",
                    event.id,
                    event.destination_url
                );
                None
            }
        }
    }

    fn commit(&mut self, commit: PendingCommit) {
        match commit {
            PendingCommit::PushState { url } => self.history.push_state(&url),
            PendingCommit::Noop => {}
            PendingCommit::FinishNavigation(finish) => {
                warn_log!("History backend released a navigation it did not intercept");
                if finish.send(()).is_err() {
                    warn_log!("Platform dropped the navigation before it was committed");
                }
            }
        }
    }
}
