//! Platform navigation primitives.
//!
//! The coordinator never touches a real browser. It talks to one of two
//! traits describing what the host platform offers:
//!
//! - [`NavigationApi`]: an intercepting navigation API. Starting a
//!   navigation produces a [`NavigateEvent`]; the handler answers with an
//!   [`InterceptDecision`]. An intercepted navigation finishes (address bar,
//!   entry index, focus reset) only once its [`Interception::handler`]
//!   channel resolves.
//! - [`HistoryApi`]: the legacy pair: `push_state` plus a pop notification
//!   delivered as [`PlatformEvent::PopState`] after the address bar moved.
//!
//! [`MemoryNavigation`] and [`MemoryHistory`] are in-memory hosts that record
//! every platform-visible effect. Tests and demos drive them directly.

use crate::location::{join_url, APP_ORIGIN};
use crate::{debug_log, trace_log, warn_log};
use futures::channel::oneshot;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use url::Url;

// ============================================================================
// Event types
// ============================================================================

/// Kind of navigation reported by the intercepting API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationType {
    /// A new entry is pushed.
    Push,
    /// The current entry is replaced.
    Replace,
    /// The current entry is reloaded.
    Reload,
    /// Back/forward to an existing entry.
    Traverse,
}

impl NavigationType {
    /// Lowercase name, as used in transition tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationType::Push => "push",
            NavigationType::Replace => "replace",
            NavigationType::Reload => "reload",
            NavigationType::Traverse => "traverse",
        }
    }
}

/// What the platform does with focus when an intercepted navigation finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusReset {
    /// Reset focus once the navigation has committed.
    AfterTransition,
    /// Leave focus where it is; the app manages it.
    Manual,
}

/// A navigation the platform is about to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigateEvent {
    /// Platform-assigned id, unique per platform instance.
    pub id: u64,
    pub navigation_type: NavigationType,
    /// Destination URL as the platform will show it.
    pub destination_url: String,
    /// History index of the destination entry.
    pub destination_index: usize,
    /// `false` for cross-origin and other navigations that cannot be intercepted.
    pub can_intercept: bool,
}

/// The handler's claim on an intercepted navigation.
pub struct Interception {
    /// Resolves when the app allows the navigation to finish. Dropping the
    /// sender side aborts the navigation.
    pub handler: oneshot::Receiver<()>,
    pub focus_reset: FocusReset,
}

impl fmt::Debug for Interception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interception")
            .field("focus_reset", &self.focus_reset)
            .finish_non_exhaustive()
    }
}

/// Answer given to a [`NavigateEvent`].
#[derive(Debug)]
pub enum InterceptDecision {
    /// Not handled; the platform performs its default navigation.
    Declined,
    /// Handled; the platform waits for the interception to resolve.
    Intercepted(Interception),
}

impl InterceptDecision {
    /// Check if the navigation was intercepted
    pub fn is_intercepted(&self) -> bool {
        matches!(self, InterceptDecision::Intercepted(_))
    }
}

/// Notification delivered by the host platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// The intercepting API is about to navigate.
    Navigate(NavigateEvent),
    /// The legacy history moved (back/forward); the address bar already changed.
    PopState,
}

// ============================================================================
// Platform traits
// ============================================================================

/// Intercepting navigation API.
pub trait NavigationApi {
    /// URL of the current (committed) entry.
    fn current_url(&self) -> String;

    /// History index of the current entry.
    fn current_index(&self) -> usize;

    /// Begin a navigation to `url` and return the event describing it.
    fn navigate(&self, url: &str) -> NavigateEvent;

    /// Deliver the handler's decision for `event`.
    fn respond(&self, event: &NavigateEvent, decision: InterceptDecision);
}

/// Legacy history API.
pub trait HistoryApi {
    /// Path and query currently in the address bar.
    fn location(&self) -> String;

    /// Push a new entry and write `url` to the address bar.
    fn push_state(&self, url: &str);
}

/// What the host offers, probed once at startup.
#[derive(Clone)]
pub struct PlatformCapabilities {
    /// Present when the intercepting API is available.
    pub navigation: Option<Rc<dyn NavigationApi>>,
    pub history: Rc<dyn HistoryApi>,
}

impl PlatformCapabilities {
    /// Capabilities of a host with only the legacy history API.
    pub fn history_only(history: Rc<dyn HistoryApi>) -> Self {
        Self {
            navigation: None,
            history,
        }
    }

    /// Capabilities of a host with the intercepting API.
    pub fn with_navigation(navigation: Rc<dyn NavigationApi>, history: Rc<dyn HistoryApi>) -> Self {
        Self {
            navigation: Some(navigation),
            history,
        }
    }

    /// Check if the intercepting API is available
    pub fn supports_intercept(&self) -> bool {
        self.navigation.is_some()
    }
}

impl fmt::Debug for PlatformCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformCapabilities")
            .field("navigation", &self.navigation.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// MemoryNavigation
// ============================================================================

/// Progress of the ongoing intercepted navigation, see [`MemoryNavigation::settle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleStatus {
    /// No navigation in flight.
    Idle,
    /// Still waiting for the app to commit.
    Pending,
    /// Finished; the address bar now shows this URL.
    Finished(String),
    /// The app dropped the navigation without committing it.
    Aborted,
}

struct OngoingNavigation {
    event: NavigateEvent,
    interception: Interception,
}

struct NavigationEntries {
    origin: String,
    entries: Vec<String>,
    index: usize,
    next_event_id: u64,
    ongoing: Option<OngoingNavigation>,
    focus_resets: usize,
    aborted: usize,
    url_writes: Vec<String>,
}

impl NavigationEntries {
    fn current_url(&self) -> &str {
        &self.entries[self.index]
    }

    fn next_id(&mut self) -> u64 {
        self.next_event_id += 1;
        self.next_event_id
    }

    fn apply(&mut self, event: &NavigateEvent) {
        match event.navigation_type {
            NavigationType::Push => {
                self.entries.truncate(self.index + 1);
                self.entries.push(event.destination_url.clone());
                self.index = self.entries.len() - 1;
            }
            NavigationType::Replace | NavigationType::Reload => {
                self.entries[self.index] = event.destination_url.clone();
            }
            NavigationType::Traverse => {
                if event.destination_index < self.entries.len() {
                    self.index = event.destination_index;
                }
            }
        }
        self.url_writes.push(event.destination_url.clone());
    }
}

/// In-memory intercepting navigation host.
///
/// Keeps a list of entries and one ongoing intercepted navigation, like a
/// browser tab: starting a new navigation aborts the previous one.
pub struct MemoryNavigation {
    inner: RefCell<NavigationEntries>,
}

impl MemoryNavigation {
    /// Create a host on `initial_url` for [`APP_ORIGIN`].
    pub fn new(initial_url: impl Into<String>) -> Self {
        Self::with_origin(APP_ORIGIN, initial_url)
    }

    /// Create a host for a specific origin.
    pub fn with_origin(origin: impl Into<String>, initial_url: impl Into<String>) -> Self {
        Self {
            inner: RefCell::new(NavigationEntries {
                origin: origin.into(),
                entries: vec![initial_url.into()],
                index: 0,
                next_event_id: 0,
                ongoing: None,
                focus_resets: 0,
                aborted: 0,
                url_writes: Vec::new(),
            }),
        }
    }

    /// Build the event for a user traversal (back/forward button) to `index`.
    ///
    /// Returns `None` when no entry exists at `index`.
    pub fn traverse_to(&self, index: usize) -> Option<NavigateEvent> {
        let mut inner = self.inner.borrow_mut();
        let destination_url = inner.entries.get(index)?.clone();
        let id = inner.next_id();
        Some(NavigateEvent {
            id,
            navigation_type: NavigationType::Traverse,
            destination_url,
            destination_index: index,
            can_intercept: true,
        })
    }

    /// Event for the browser back button.
    pub fn back(&self) -> Option<NavigateEvent> {
        let index = self.inner.borrow().index.checked_sub(1)?;
        self.traverse_to(index)
    }

    /// Event for the browser forward button.
    pub fn forward(&self) -> Option<NavigateEvent> {
        let index = self.inner.borrow().index + 1;
        self.traverse_to(index)
    }

    /// Event for the browser reload button.
    pub fn reload(&self) -> NavigateEvent {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id();
        NavigateEvent {
            id,
            navigation_type: NavigationType::Reload,
            destination_url: inner.current_url().to_string(),
            destination_index: inner.index,
            can_intercept: true,
        }
    }

    /// Finish or abort the ongoing navigation if its handler settled.
    ///
    /// Hosts call this once per frame.
    pub fn settle(&self) -> SettleStatus {
        let mut inner = self.inner.borrow_mut();
        let Some(mut ongoing) = inner.ongoing.take() else {
            return SettleStatus::Idle;
        };
        match ongoing.interception.handler.try_recv() {
            Ok(Some(())) => {
                inner.apply(&ongoing.event);
                if ongoing.interception.focus_reset == FocusReset::AfterTransition {
                    inner.focus_resets += 1;
                }
                debug_log!(
                    "Intercepted navigation {} finished at '{}'",
                    ongoing.event.id,
                    ongoing.event.destination_url
                );
                SettleStatus::Finished(ongoing.event.destination_url)
            }
            Ok(None) => {
                inner.ongoing = Some(ongoing);
                SettleStatus::Pending
            }
            Err(oneshot::Canceled) => {
                inner.aborted += 1;
                debug_log!("Intercepted navigation {} aborted", ongoing.event.id);
                SettleStatus::Aborted
            }
        }
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.inner.borrow().entries.clone()
    }

    /// Every URL the address bar has shown since creation, in order.
    pub fn url_writes(&self) -> Vec<String> {
        self.inner.borrow().url_writes.clone()
    }

    /// Number of focus resets performed.
    pub fn focus_resets(&self) -> usize {
        self.inner.borrow().focus_resets
    }

    /// Number of navigations aborted before they finished.
    pub fn aborted(&self) -> usize {
        self.inner.borrow().aborted
    }

    /// Check if an intercepted navigation is waiting to finish
    pub fn has_ongoing(&self) -> bool {
        self.inner.borrow().ongoing.is_some()
    }
}

impl NavigationApi for MemoryNavigation {
    fn current_url(&self) -> String {
        self.inner.borrow().current_url().to_string()
    }

    fn current_index(&self) -> usize {
        self.inner.borrow().index
    }

    fn navigate(&self, url: &str) -> NavigateEvent {
        let mut inner = self.inner.borrow_mut();
        let cross_origin = match (Url::parse(&inner.origin), join_url(&inner.origin, url)) {
            (Ok(origin), Some(destination)) => destination.origin() != origin.origin(),
            _ => true,
        };
        // Navigating to the current URL replaces the entry.
        let (navigation_type, destination_index) = if url == inner.current_url() {
            (NavigationType::Replace, inner.index)
        } else {
            (NavigationType::Push, inner.index + 1)
        };
        let id = inner.next_id();
        trace_log!("Navigate event {} → '{}' ({:?})", id, url, navigation_type);
        NavigateEvent {
            id,
            navigation_type,
            destination_url: url.to_string(),
            destination_index,
            can_intercept: !cross_origin,
        }
    }

    fn respond(&self, event: &NavigateEvent, decision: InterceptDecision) {
        let mut inner = self.inner.borrow_mut();
        if let Some(previous) = inner.ongoing.take() {
            inner.aborted += 1;
            debug_log!(
                "Navigation {} aborted by navigation {}",
                previous.event.id,
                event.id
            );
        }
        match decision {
            InterceptDecision::Declined => {
                warn_log!(
                    "Navigation {} to '{}' not intercepted, performing default navigation",
                    event.id,
                    event.destination_url
                );
                inner.apply(event);
            }
            InterceptDecision::Intercepted(interception) => {
                inner.ongoing = Some(OngoingNavigation {
                    event: event.clone(),
                    interception,
                });
            }
        }
    }
}

// ============================================================================
// MemoryHistory
// ============================================================================

struct HistoryEntries {
    entries: Vec<String>,
    index: usize,
    pushes: Vec<String>,
}

/// In-memory legacy history host.
///
/// [`back`](Self::back) and [`forward`](Self::forward) move the address bar
/// the way physical browser buttons do; the caller then delivers
/// [`PlatformEvent::PopState`] to the coordinator.
pub struct MemoryHistory {
    inner: RefCell<HistoryEntries>,
}

impl MemoryHistory {
    /// Create a history whose only entry is `initial_url`.
    pub fn new(initial_url: impl Into<String>) -> Self {
        Self {
            inner: RefCell::new(HistoryEntries {
                entries: vec![initial_url.into()],
                index: 0,
                pushes: Vec::new(),
            }),
        }
    }

    /// Move one entry back. Returns `false` at the first entry.
    pub fn back(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.index == 0 {
            return false;
        }
        inner.index -= 1;
        true
    }

    /// Move one entry forward. Returns `false` at the last entry.
    pub fn forward(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.index + 1 >= inner.entries.len() {
            return false;
        }
        inner.index += 1;
        true
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.inner.borrow().entries.clone()
    }

    /// Every URL written through [`HistoryApi::push_state`], in order.
    pub fn pushes(&self) -> Vec<String> {
        self.inner.borrow().pushes.clone()
    }
}

impl HistoryApi for MemoryHistory {
    fn location(&self) -> String {
        let inner = self.inner.borrow();
        inner.entries[inner.index].clone()
    }

    fn push_state(&self, url: &str) {
        let mut inner = self.inner.borrow_mut();
        let keep = inner.index + 1;
        inner.entries.truncate(keep);
        inner.entries.push(url.to_string());
        inner.index = inner.entries.len() - 1;
        inner.pushes.push(url.to_string());
        trace_log!("pushState '{}'", url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_type_names() {
        assert_eq!(NavigationType::Push.as_str(), "push");
        assert_eq!(NavigationType::Traverse.as_str(), "traverse");
    }

    #[test]
    fn test_memory_history_push_and_back() {
        let history = MemoryHistory::new("/");
        history.push_state("/login");
        history.push_state("/?tab=wip");
        assert_eq!(history.location(), "/?tab=wip");

        assert!(history.back());
        assert_eq!(history.location(), "/login");

        // pushing truncates forward entries
        history.push_state("/about");
        assert!(!history.forward());
        assert_eq!(history.entries(), vec!["/", "/login", "/about"]);
    }

    #[test]
    fn test_memory_history_back_at_start() {
        let history = MemoryHistory::new("/");
        assert!(!history.back());
        assert_eq!(history.location(), "/");
    }

    #[test]
    fn test_memory_navigation_event_types() {
        let nav = MemoryNavigation::new("/");
        let push = nav.navigate("/login");
        assert_eq!(push.navigation_type, NavigationType::Push);
        assert_eq!(push.destination_index, 1);
        assert!(push.can_intercept);

        let same = nav.navigate("/");
        assert_eq!(same.navigation_type, NavigationType::Replace);
        assert_eq!(same.destination_index, 0);

        let external = nav.navigate("https://github.com/");
        assert!(!external.can_intercept);

        let own_origin = nav.navigate("https://app.local/login");
        assert!(own_origin.can_intercept);

        let url_in_query = nav.navigate("/login?next=https://other.example/x");
        assert!(url_in_query.can_intercept);

        let other_scheme = nav.navigate("http://app.local/login");
        assert!(!other_scheme.can_intercept);
    }

    #[test]
    fn test_memory_navigation_declined_applies_immediately() {
        let nav = MemoryNavigation::new("/");
        let event = nav.navigate("/login");
        nav.respond(&event, InterceptDecision::Declined);
        assert_eq!(nav.current_url(), "/login");
        assert_eq!(nav.current_index(), 1);
        assert_eq!(nav.settle(), SettleStatus::Idle);
    }

    #[test]
    fn test_memory_navigation_waits_for_handler() {
        let nav = MemoryNavigation::new("/");
        let event = nav.navigate("/login");
        let (tx, rx) = oneshot::channel();
        nav.respond(
            &event,
            InterceptDecision::Intercepted(Interception {
                handler: rx,
                focus_reset: FocusReset::AfterTransition,
            }),
        );

        assert_eq!(nav.settle(), SettleStatus::Pending);
        assert_eq!(nav.current_url(), "/");

        tx.send(()).unwrap();
        assert_eq!(nav.settle(), SettleStatus::Finished("/login".to_string()));
        assert_eq!(nav.current_url(), "/login");
        assert_eq!(nav.focus_resets(), 1);
    }

    #[test]
    fn test_memory_navigation_dropped_handler_aborts() {
        let nav = MemoryNavigation::new("/");
        let event = nav.navigate("/login");
        let (tx, rx) = oneshot::channel::<()>();
        nav.respond(
            &event,
            InterceptDecision::Intercepted(Interception {
                handler: rx,
                focus_reset: FocusReset::Manual,
            }),
        );
        drop(tx);
        assert_eq!(nav.settle(), SettleStatus::Aborted);
        assert_eq!(nav.current_url(), "/");
        assert!(nav.url_writes().is_empty());
    }

    #[test]
    fn test_memory_navigation_traverse() {
        let nav = MemoryNavigation::new("/");
        let event = nav.navigate("/login");
        nav.respond(&event, InterceptDecision::Declined);

        let back = nav.back().unwrap();
        assert_eq!(back.navigation_type, NavigationType::Traverse);
        assert_eq!(back.destination_index, 0);
        assert_eq!(back.destination_url, "/");
        nav.respond(&back, InterceptDecision::Declined);
        assert_eq!(nav.current_index(), 0);

        assert!(nav.traverse_to(5).is_none());
    }
}
