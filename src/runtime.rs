//! Application runtime.
//!
//! [`AppRuntime`] is the constructed owner of everything the app shares: the
//! [`Coordinator`], the lessons cache and the data source. Tests build fresh
//! runtimes instead of relying on globals; the gpui integration stores one in
//! a [`Global`](gpui::Global).
//!
//! # Example
//!
//! ```
//! use async_navigator::config::RuntimeConfig;
//! use async_navigator::data::{immediate_timer, Tab};
//! use async_navigator::platform::{MemoryHistory, PlatformCapabilities};
//! use async_navigator::AppRuntime;
//! use std::rc::Rc;
//!
//! let history = Rc::new(MemoryHistory::new("/login"));
//! let caps = PlatformCapabilities::history_only(history.clone());
//! let (runtime, _source) =
//!     AppRuntime::with_fake_source(&caps, immediate_timer(), RuntimeConfig::default());
//!
//! pollster::block_on(runtime.login_action("rick", "hunter2")).unwrap();
//! assert_eq!(runtime.current_location().path(), "/");
//!
//! runtime.tab_action(Tab::Wip);
//! let token = runtime.snapshot().token;
//! runtime.displayed(token);
//! assert_eq!(history.pushes(), vec!["/?tab=wip"]);
//! ```

use crate::backend::{initial_location, select_backend, BackendKind, LocationChange};
use crate::cache::ReadState;
use crate::config::RuntimeConfig;
use crate::coordinator::{Coordinator, RouterSnapshot, SubscriptionId, Subscribers};
use crate::data::{
    FakeLessons, Lesson, LessonMutation, LessonSource, LessonsQuery, LessonsResource,
    PrefetchOutcome, Tab, Timer,
};
use crate::error::{CommitOutcome, FetchError};
use crate::optimistic::{LoadingIndicator, Optimistic};
use crate::platform::{PlatformCapabilities, PlatformEvent};
use crate::state::StageToken;
use crate::transition::{Transition, TransitionConfig};
use crate::{debug_log, info_log, warn_log, Location};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Kind of interaction, for picking a loading threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Tab switch, search keystroke or completion toggle.
    Control,
    /// Full-page navigation.
    Page,
}

struct RuntimeInner {
    coordinator: RefCell<Coordinator>,
    subscribers: Subscribers,
    lessons: LessonsResource,
    source: Rc<dyn LessonSource>,
    timer: Timer,
    config: RuntimeConfig,
    transitions: RefCell<TransitionConfig>,
    completions: RefCell<HashMap<String, Optimistic<bool>>>,
    loading: LoadingIndicator,
}

/// Owner of the coordinator, the lessons cache and the data source.
///
/// Cloning produces another handle to the same runtime. Stage listeners run
/// after the coordinator is released, so they may read the runtime and report
/// a stage as displayed.
#[derive(Clone)]
pub struct AppRuntime {
    inner: Rc<RuntimeInner>,
}

impl AppRuntime {
    /// Build a runtime on the platform described by `capabilities`.
    ///
    /// The backend is chosen here, once.
    pub fn new(
        capabilities: &PlatformCapabilities,
        source: Rc<dyn LessonSource>,
        timer: Timer,
        config: RuntimeConfig,
    ) -> Self {
        let lessons = LessonsResource::new(Rc::clone(&source));
        let backend = select_backend(capabilities, config.prefers_history());
        let coordinator = Coordinator::with_backend(initial_location(capabilities), backend)
            .with_revalidator(Rc::new(lessons.clone()));
        let subscribers = coordinator.subscribers();
        let transitions = config.transition_config().clone();

        Self {
            inner: Rc::new(RuntimeInner {
                coordinator: RefCell::new(coordinator),
                subscribers,
                lessons,
                source,
                timer,
                config,
                transitions: RefCell::new(transitions),
                completions: RefCell::new(HashMap::new()),
                loading: LoadingIndicator::new(),
            }),
        }
    }

    /// Build a runtime over a [`FakeLessons`] source using the configured
    /// endpoint delays. The source handle is returned for inspection.
    pub fn with_fake_source(
        capabilities: &PlatformCapabilities,
        timer: Timer,
        config: RuntimeConfig,
    ) -> (Self, FakeLessons) {
        let source = FakeLessons::new(config.network(), Rc::clone(&timer));
        let runtime = Self::new(capabilities, Rc::new(source.clone()), timer, config);
        (runtime, source)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn navigate(&self, url: &str) {
        self.with_coordinator(|coordinator| coordinator.navigate(url));
    }

    pub fn set_param(&self, key: &str, value: &str) {
        self.with_coordinator(|coordinator| coordinator.set_param(key, value));
    }

    /// Revalidate the lessons cache and re-stage the current location.
    pub fn refresh(&self) {
        self.with_coordinator(Coordinator::refresh);
    }

    pub fn handle_platform_event(&self, event: PlatformEvent) {
        self.with_coordinator(|coordinator| coordinator.handle_platform_event(event));
    }

    /// Run a staging call; listeners see its stages once the borrow is released.
    fn with_coordinator(&self, f: impl FnOnce(&mut Coordinator)) {
        self.inner
            .subscribers
            .deferred(|| f(&mut *self.inner.coordinator.borrow_mut()));
    }

    /// Report that the stage `token` is on screen; see [`Coordinator::displayed`].
    ///
    /// A committed stage also ends the current loading interaction.
    pub fn displayed(&self, token: StageToken) -> CommitOutcome {
        let outcome = self.inner.coordinator.borrow_mut().displayed(token);
        if outcome.is_committed() {
            self.inner.loading.finish();
        }
        outcome
    }

    pub fn current_location(&self) -> Location {
        self.inner.coordinator.borrow().current_location().clone()
    }

    pub fn committed_location(&self) -> Location {
        self.inner.coordinator.borrow().committed_location().clone()
    }

    pub fn is_navigation_pending(&self) -> bool {
        self.inner.coordinator.borrow().is_navigation_pending()
    }

    pub fn snapshot(&self) -> RouterSnapshot {
        self.inner.coordinator.borrow().snapshot()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.inner.coordinator.borrow().backend_kind()
    }

    pub fn subscribe(&self, listener: impl FnMut(&LocationChange) + 'static) -> SubscriptionId {
        self.inner.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.unsubscribe(id)
    }

    /// Transition to play for a stage.
    pub fn transition_for(&self, change: &LocationChange) -> Transition {
        self.inner
            .transitions
            .borrow_mut()
            .resolve(&change.transition_types)
    }

    /// Use `transition` for the next stage only.
    pub fn override_next_transition(&self, transition: Transition) {
        self.inner.transitions.borrow_mut().set_override(transition);
    }

    // ========================================================================
    // Data
    // ========================================================================

    pub fn lessons(&self) -> &LessonsResource {
        &self.inner.lessons
    }

    /// Query implied by the staged location.
    pub fn current_query(&self) -> LessonsQuery {
        LessonsQuery::from_location(self.inner.coordinator.borrow().current_location())
    }

    /// Lessons for the staged location, without suspending.
    pub fn current_lessons(&self) -> ReadState<Vec<Lesson>> {
        self.inner.lessons.read_state(&self.current_query())
    }

    /// Completion state to display for `lesson`, including a pending toggle.
    pub fn lesson_complete(&self, lesson: &Lesson) -> bool {
        match self.inner.completions.borrow().get(&lesson.id) {
            Some(state) if state.is_pending() => *state.value(),
            _ => lesson.complete,
        }
    }

    /// Check if a completion toggle for the lesson `id` is still in flight
    pub fn lesson_pending(&self, id: &str) -> bool {
        self.inner
            .completions
            .borrow()
            .get(id)
            .is_some_and(Optimistic::is_pending)
    }

    // ========================================================================
    // Loading
    // ========================================================================

    pub fn loading(&self) -> &LoadingIndicator {
        &self.inner.loading
    }

    /// Start the loading timer for an interaction; drive the returned future
    /// on the app's executor. Reaching [`displayed`](Self::displayed) first
    /// keeps the indicator hidden.
    pub fn start_loading(&self, interaction: Interaction) -> LocalBoxFuture<'static, ()> {
        let thresholds = self.inner.config.thresholds();
        let threshold = match interaction {
            Interaction::Control => thresholds.interaction,
            Interaction::Page => thresholds.page,
        };
        self.inner.loading.start(&self.inner.timer, threshold)
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Search-as-you-type: set or clear `q`.
    pub fn search_action(&self, term: &str) {
        self.set_param("q", term);
    }

    /// Switch the lessons tab.
    pub fn tab_action(&self, tab: Tab) {
        self.set_param("tab", tab.as_str());
    }

    /// Toggle completion of `lesson`.
    ///
    /// The new state shows immediately. Once the write settles the toggle
    /// stops being pending; on success the current location is then
    /// refreshed so every list re-reads, on failure the displayed state
    /// reverts to the lesson's committed value.
    pub fn complete_action(&self, lesson: &Lesson) -> LocalBoxFuture<'static, Result<(), FetchError>> {
        {
            let mut completions = self.inner.completions.borrow_mut();
            let state = completions
                .entry(lesson.id.clone())
                .or_insert_with(|| Optimistic::new(lesson.complete));
            state.sync(lesson.complete);
            state.set_optimistic(!lesson.complete);
        }

        let id = lesson.id.clone();
        let write = self
            .inner
            .lessons
            .write(LessonMutation::Toggle { id: id.clone() });
        let runtime = self.clone();
        async move {
            let result = write.await;
            if let Some(state) = runtime.inner.completions.borrow_mut().get_mut(&id) {
                state.settle(&result);
            }
            match &result {
                Ok(()) => {
                    debug_log!("Lesson {} toggled, refreshing", id);
                    runtime.refresh();
                }
                Err(error) => warn_log!("Toggling lesson {} failed: {}", id, error),
            }
            result
        }
        .boxed_local()
    }

    /// Sign in, warm the lessons cache, then go to the lessons page.
    ///
    /// The prefetch waits at most the configured timeout; the navigation
    /// happens either way.
    pub fn login_action(
        &self,
        user: &str,
        password: &str,
    ) -> LocalBoxFuture<'static, Result<(), FetchError>> {
        let login = self.inner.source.login(user, password);
        let runtime = self.clone();
        async move {
            login.await?;
            let prefetch = runtime.inner.lessons.prefetch(
                &LessonsQuery::default(),
                &runtime.inner.timer,
                runtime.inner.config.timeout(),
            );
            match prefetch.await {
                PrefetchOutcome::Loaded => debug_log!("Lessons prefetched"),
                PrefetchOutcome::TimedOut => debug_log!("Lessons prefetch still running"),
                PrefetchOutcome::Failed(error) => warn_log!("Lessons prefetch failed: {}", error),
            }
            info_log!("Logged in");
            runtime.navigate("/");
            Ok(())
        }
        .boxed_local()
    }
}

impl fmt::Debug for AppRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppRuntime")
            .field("coordinator", &self.inner.coordinator.borrow())
            .field("lessons", &self.inner.lessons)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
