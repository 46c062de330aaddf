//! Test utilities for coordinator, cache and runtime tests
//!
//! Provides fixtures for both platform backends and a lessons source whose
//! reads stay in flight until the test releases them.

#![allow(dead_code)]

use async_navigator::cache::FetchFuture;
use async_navigator::config::RuntimeConfig;
use async_navigator::data::{immediate_timer, FakeLessons, Lesson, LessonSource, LessonsQuery};
use async_navigator::network::NetworkSettings;
use async_navigator::platform::{MemoryHistory, MemoryNavigation, PlatformCapabilities};
use async_navigator::{AppRuntime, Coordinator, FetchError, LocationChange};
use futures::channel::oneshot;
use futures::FutureExt;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Initialise `env_logger` once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Coordinator on the history backend.
pub fn history_coordinator(url: &str) -> (Rc<MemoryHistory>, Coordinator) {
    let history = Rc::new(MemoryHistory::new(url));
    let coordinator = Coordinator::new(&PlatformCapabilities::history_only(history.clone()));
    (history, coordinator)
}

/// Coordinator on the intercepting backend.
pub fn intercept_coordinator(url: &str) -> (Rc<MemoryNavigation>, Coordinator) {
    let navigation = Rc::new(MemoryNavigation::new(url));
    let history = Rc::new(MemoryHistory::new(url));
    let coordinator = Coordinator::new(&PlatformCapabilities::with_navigation(
        navigation.clone(),
        history,
    ));
    (navigation, coordinator)
}

/// Record every stage published by `coordinator`.
pub fn record_changes(coordinator: &mut Coordinator) -> Rc<RefCell<Vec<LocationChange>>> {
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&changes);
    coordinator.subscribe(move |change| sink.borrow_mut().push(change.clone()));
    changes
}

/// Render the latest stage: report its token as displayed.
pub fn render(coordinator: &mut Coordinator) {
    let token = coordinator.snapshot().token;
    coordinator.displayed(token);
}

/// Runtime on the history backend over the seed lessons, answering immediately.
pub fn history_runtime(url: &str) -> (AppRuntime, FakeLessons, Rc<MemoryHistory>) {
    let history = Rc::new(MemoryHistory::new(url));
    let caps = PlatformCapabilities::history_only(history.clone());
    let (runtime, source) =
        AppRuntime::with_fake_source(&caps, immediate_timer(), RuntimeConfig::default());
    (runtime, source, history)
}

/// Lessons source whose reads wait for [`GatedLessons::release_all`].
pub struct GatedLessons {
    inner: FakeLessons,
    gates: RefCell<Vec<oneshot::Sender<()>>>,
    fetches: Cell<usize>,
}

impl GatedLessons {
    pub fn new() -> Self {
        Self::with_lessons(async_navigator::data::seed_lessons())
    }

    pub fn with_lessons(lessons: Vec<Lesson>) -> Self {
        Self {
            inner: FakeLessons::with_lessons(lessons, NetworkSettings::new(), immediate_timer()),
            gates: RefCell::new(Vec::new()),
            fetches: Cell::new(0),
        }
    }

    /// Number of `get_lessons` calls so far.
    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }

    /// Number of reads still waiting.
    pub fn waiting(&self) -> usize {
        self.gates.borrow().len()
    }

    /// Let every waiting read finish.
    pub fn release_all(&self) {
        for gate in self.gates.borrow_mut().drain(..) {
            let _ = gate.send(());
        }
    }

    pub fn inner(&self) -> &FakeLessons {
        &self.inner
    }
}

impl LessonSource for GatedLessons {
    fn get_lessons(&self, query: &LessonsQuery) -> FetchFuture<Vec<Lesson>> {
        self.fetches.set(self.fetches.get() + 1);
        let (gate, released) = oneshot::channel();
        self.gates.borrow_mut().push(gate);
        let fetch = self.inner.get_lessons(query);
        async move {
            released.await.map_err(|_| FetchError::Cancelled {
                endpoint: "/lessons".to_string(),
            })?;
            fetch.await
        }
        .boxed_local()
    }

    fn toggle(&self, id: &str) -> FetchFuture<()> {
        self.inner.toggle(id)
    }

    fn login(&self, user: &str, password: &str) -> FetchFuture<()> {
        self.inner.login(user, password)
    }
}
