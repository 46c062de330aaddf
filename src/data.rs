//! Lessons data source and its cache-backed resource.
//!
//! - [`LessonSource`]: the asynchronous data-source boundary
//!   (`get_lessons`, `toggle`, `login`).
//! - [`FakeLessons`]: in-memory source with simulated per-endpoint latency
//!   taken from [`NetworkSettings`].
//! - [`LessonsResource`]: reads lessons through a [`SuspenseCache`] keyed by
//!   `(lessons, tab, search)`; writes go to the source untouched and callers
//!   invalidate afterwards.

use crate::cache::{CacheKey, FetchFuture, ReadState, Revalidate, SharedRead, SuspenseCache};
use crate::error::FetchError;
use crate::network::{Endpoint, NetworkSettings};
use crate::search::{self, DEFAULT_THRESHOLD};
use crate::{debug_log, trace_log, Location};
use futures::future::{self, Either, LocalBoxFuture};
use futures::FutureExt;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Injected sleep: returns a future that completes after the duration.
pub type Timer = Rc<dyn Fn(Duration) -> LocalBoxFuture<'static, ()>>;

/// Timer whose sleeps complete immediately.
pub fn immediate_timer() -> Timer {
    Rc::new(|_: Duration| future::ready(()).boxed_local())
}

// ============================================================================
// Model
// ============================================================================

/// A lesson in the course list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub complete: bool,
}

impl Lesson {
    /// Text the search matches against.
    pub fn search_key(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

const SEED: [(&str, &str, &str, &str); 6] = [
    ("1", "Intro", "Introduction to Async React", "lightbulb"),
    ("2", "Transitions", "Coordinating Async", "shuffle"),
    ("3", "Actions", "Coordinating changes", "zap"),
    ("4", "Suspense", "Deferred loading", "hourglass"),
    ("5", "Optimistic updates", "Pretending async is sync", "fastforward"),
    ("6", "Putting it together", "The vision for Async React", "puzzle"),
];

/// The course lessons, none complete.
pub fn seed_lessons() -> Vec<Lesson> {
    SEED.iter()
        .map(|(id, title, description, icon)| Lesson {
            id: (*id).to_string(),
            title: (*title).to_string(),
            description: (*description).to_string(),
            icon: (*icon).to_string(),
            complete: false,
        })
        .collect()
}

/// Lesson list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tab {
    #[default]
    All,
    /// Lessons not yet complete.
    Wip,
    /// Completed lessons.
    Done,
}

impl Tab {
    /// Parse the `tab` query value; anything unknown shows all lessons.
    pub fn from_param(value: &str) -> Self {
        match value {
            "wip" => Tab::Wip,
            "done" => Tab::Done,
            _ => Tab::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::All => "all",
            Tab::Wip => "wip",
            Tab::Done => "done",
        }
    }

    fn includes(&self, lesson: &Lesson) -> bool {
        match self {
            Tab::All => true,
            Tab::Wip => !lesson.complete,
            Tab::Done => lesson.complete,
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a lessons read.
///
/// A missing search, an empty one and the literal `"undefined"` all mean
/// "no filter" and produce the same cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LessonsQuery {
    pub tab: Tab,
    pub search: Option<String>,
}

impl LessonsQuery {
    pub fn new(tab: Tab, search: Option<&str>) -> Self {
        let search = search
            .filter(|term| !term.is_empty() && *term != "undefined")
            .map(str::to_string);
        Self { tab, search }
    }

    /// Query shown by the lessons page at `location` (`?tab=...&q=...`).
    pub fn from_location(location: &Location) -> Self {
        let tab = location
            .query()
            .get("tab")
            .map(Tab::from_param)
            .unwrap_or_default();
        Self::new(tab, location.query().get("q"))
    }

    /// Cache slot for this query.
    pub fn cache_key(&self) -> CacheKey {
        let key = CacheKey::new(LessonsResource::KIND).param("tab", self.tab.as_str());
        match &self.search {
            Some(search) => key.param("search", search),
            None => key,
        }
    }

    /// Apply the query to `lessons`: tab first, then fuzzy search.
    pub fn filter(&self, lessons: &[Lesson]) -> Vec<Lesson> {
        let in_tab: Vec<Lesson> = lessons
            .iter()
            .filter(|lesson| self.tab.includes(lesson))
            .cloned()
            .collect();
        match &self.search {
            Some(term) => search::search(term, &in_tab, Lesson::search_key, DEFAULT_THRESHOLD)
                .into_iter()
                .cloned()
                .collect(),
            None => in_tab,
        }
    }
}

// ============================================================================
// LessonSource
// ============================================================================

/// Asynchronous lessons backend.
///
/// Latency is opaque: callers must not assume any bound.
pub trait LessonSource {
    /// Lessons matching `query`.
    fn get_lessons(&self, query: &LessonsQuery) -> FetchFuture<Vec<Lesson>>;

    /// Flip the completion state of lesson `id`.
    fn toggle(&self, id: &str) -> FetchFuture<()>;

    /// Sign in.
    fn login(&self, user: &str, password: &str) -> FetchFuture<()>;
}

/// In-memory [`LessonSource`] with simulated latency.
///
/// Filtering happens when the call is made; the result is delivered after
/// the endpoint's delay. A toggle takes effect after its delay.
#[derive(Clone)]
pub struct FakeLessons {
    lessons: Rc<RefCell<Vec<Lesson>>>,
    network: NetworkSettings,
    timer: Timer,
    failures: Rc<RefCell<HashMap<Endpoint, String>>>,
}

impl FakeLessons {
    /// Source over the seed lessons.
    pub fn new(network: NetworkSettings, timer: Timer) -> Self {
        Self::with_lessons(seed_lessons(), network, timer)
    }

    pub fn with_lessons(lessons: Vec<Lesson>, network: NetworkSettings, timer: Timer) -> Self {
        Self {
            lessons: Rc::new(RefCell::new(lessons)),
            network,
            timer,
            failures: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Make the next call to `endpoint` fail with `message`.
    pub fn fail_next(&self, endpoint: Endpoint, message: impl Into<String>) {
        self.failures.borrow_mut().insert(endpoint, message.into());
    }

    /// Current server-side lessons.
    pub fn lessons(&self) -> Vec<Lesson> {
        self.lessons.borrow().clone()
    }

    /// Latency settings used by this source.
    pub fn network(&self) -> &NetworkSettings {
        &self.network
    }

    /// Record the request and build the delayed response.
    fn respond<T: 'static>(
        &self,
        endpoint: Endpoint,
        reply: impl FnOnce() -> Result<T, FetchError> + 'static,
    ) -> FetchFuture<T> {
        let delay = self.network.record_request(endpoint);
        let failure = self.failures.borrow_mut().remove(&endpoint);
        let sleep = (self.timer)(delay);
        async move {
            sleep.await;
            match failure {
                Some(message) => Err(FetchError::failed(endpoint.path(), message)),
                None => reply(),
            }
        }
        .boxed_local()
    }
}

impl LessonSource for FakeLessons {
    fn get_lessons(&self, query: &LessonsQuery) -> FetchFuture<Vec<Lesson>> {
        let lessons = query.filter(&self.lessons.borrow());
        debug_log!("GET {} ({:?}): {} lessons", Endpoint::Lessons, query, lessons.len());
        self.respond(Endpoint::Lessons, move || Ok(lessons))
    }

    fn toggle(&self, id: &str) -> FetchFuture<()> {
        debug_log!("POST /lesson/{}/toggle", id);
        let lessons = Rc::clone(&self.lessons);
        let id = id.to_string();
        self.respond(Endpoint::Toggle, move || {
            let mut lessons = lessons.borrow_mut();
            let lesson = lessons
                .iter_mut()
                .find(|lesson| lesson.id == id)
                .ok_or_else(|| FetchError::not_found(id.as_str()))?;
            lesson.complete = !lesson.complete;
            trace_log!("Lesson {} complete = {}", lesson.id, lesson.complete);
            Ok(())
        })
    }

    fn login(&self, user: &str, _password: &str) -> FetchFuture<()> {
        debug_log!("POST {} as '{}'", Endpoint::Login, user);
        self.respond(Endpoint::Login, || Ok(()))
    }
}

impl fmt::Debug for FakeLessons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeLessons")
            .field("lessons", &self.lessons.borrow().len())
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// LessonsResource
// ============================================================================

/// External mutation of a lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonMutation {
    Toggle { id: String },
}

/// Result of [`LessonsResource::prefetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchOutcome {
    /// The read settled with data before the timeout.
    Loaded,
    /// The read settled with an error before the timeout.
    Failed(FetchError),
    /// The timeout elapsed first; the read stays in the cache.
    TimedOut,
}

/// Lessons reads through a coalescing cache.
///
/// Cloning produces another handle to the same cache and source.
#[derive(Clone)]
pub struct LessonsResource {
    cache: SuspenseCache<Vec<Lesson>>,
    source: Rc<dyn LessonSource>,
}

impl LessonsResource {
    /// Cache kind of every lessons read.
    pub const KIND: &'static str = "lessons";

    pub fn new(source: Rc<dyn LessonSource>) -> Self {
        Self {
            cache: SuspenseCache::new(),
            source,
        }
    }

    /// Underlying cache.
    pub fn cache(&self) -> &SuspenseCache<Vec<Lesson>> {
        &self.cache
    }

    /// Read lessons for `query`, joining an existing read if there is one.
    pub fn read(&self, query: &LessonsQuery) -> SharedRead<Vec<Lesson>> {
        let source = Rc::clone(&self.source);
        let query = query.clone();
        self.cache
            .read(query.cache_key(), move || source.get_lessons(&query))
    }

    /// Read lessons for `query` without suspending.
    pub fn read_state(&self, query: &LessonsQuery) -> ReadState<Vec<Lesson>> {
        let source = Rc::clone(&self.source);
        let query = query.clone();
        self.cache
            .read_state(query.cache_key(), move || source.get_lessons(&query))
    }

    /// Perform `mutation` against the source.
    ///
    /// The cache is left untouched: call [`invalidate`](Self::invalidate)
    /// once the write resolves.
    pub fn write(&self, mutation: LessonMutation) -> FetchFuture<()> {
        match mutation {
            LessonMutation::Toggle { id } => self.source.toggle(&id),
        }
    }

    /// Drop every lessons read. Returns the number of entries removed.
    pub fn invalidate(&self) -> usize {
        self.cache.invalidate(Some(Self::KIND), None)
    }

    /// Drop the read for one exact query.
    pub fn invalidate_query(&self, query: &LessonsQuery) -> usize {
        let key = query.cache_key();
        self.cache.invalidate(Some(key.kind()), Some(key.params()))
    }

    /// Start the read for `query` and wait for it or for `timeout`.
    ///
    /// The read is never cancelled: on timeout it stays in the cache and the
    /// next reader of the same query joins it.
    pub fn prefetch(
        &self,
        query: &LessonsQuery,
        timer: &Timer,
        timeout: Duration,
    ) -> LocalBoxFuture<'static, PrefetchOutcome> {
        let read = self.read(query);
        let deadline = timer(timeout);
        async move {
            match future::select(read, deadline).await {
                Either::Left((Ok(_), _)) => PrefetchOutcome::Loaded,
                Either::Left((Err(error), _)) => PrefetchOutcome::Failed(error),
                Either::Right(((), _)) => {
                    debug_log!("Prefetch timed out after {:?}", timeout);
                    PrefetchOutcome::TimedOut
                }
            }
        }
        .boxed_local()
    }
}

impl Revalidate for LessonsResource {
    fn revalidate(&self) {
        self.invalidate();
    }
}

impl fmt::Debug for LessonsResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LessonsResource")
            .field("entries", &self.cache.len())
            .field("stats", &self.cache.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake() -> FakeLessons {
        FakeLessons::new(NetworkSettings::new(), immediate_timer())
    }

    fn ids(lessons: &[Lesson]) -> Vec<&str> {
        lessons.iter().map(|lesson| lesson.id.as_str()).collect()
    }

    #[test]
    fn test_search_normalization() {
        let none = LessonsQuery::new(Tab::All, None);
        assert_eq!(LessonsQuery::new(Tab::All, Some("")), none);
        assert_eq!(LessonsQuery::new(Tab::All, Some("undefined")), none);
        assert_eq!(
            LessonsQuery::new(Tab::All, Some("")).cache_key(),
            none.cache_key()
        );
        assert_ne!(
            LessonsQuery::new(Tab::All, Some("async")).cache_key(),
            none.cache_key()
        );
    }

    #[test]
    fn test_query_from_location() {
        let query = LessonsQuery::from_location(&Location::parse("/?tab=wip&q=async"));
        assert_eq!(query, LessonsQuery::new(Tab::Wip, Some("async")));

        let query = LessonsQuery::from_location(&Location::parse("/?tab=bogus"));
        assert_eq!(query, LessonsQuery::default());
    }

    #[test]
    fn test_tab_filter() {
        let mut lessons = seed_lessons();
        lessons[0].complete = true;

        assert_eq!(LessonsQuery::new(Tab::All, None).filter(&lessons).len(), 6);
        assert_eq!(ids(&LessonsQuery::new(Tab::Done, None).filter(&lessons)), vec!["1"]);
        assert_eq!(LessonsQuery::new(Tab::Wip, None).filter(&lessons).len(), 5);
    }

    #[test]
    fn test_fuzzy_filter() {
        let lessons = seed_lessons();
        let found = LessonsQuery::new(Tab::All, Some("async react")).filter(&lessons);
        assert_eq!(ids(&found), vec!["1", "6"]);

        let found = LessonsQuery::new(Tab::All, Some("asxnc")).filter(&lessons);
        assert!(found.is_empty());
    }

    #[test]
    fn test_toggle_unknown_lesson() {
        let source = fake();
        let result = pollster::block_on(source.toggle("42"));
        assert_eq!(result, Err(FetchError::not_found("42")));
    }

    #[test]
    fn test_fail_next_applies_once() {
        let source = fake();
        source.fail_next(Endpoint::Login, "offline");

        let first = pollster::block_on(source.login("rick", "hunter2"));
        assert!(matches!(first, Err(FetchError::Failed { .. })));
        assert!(pollster::block_on(source.login("rick", "hunter2")).is_ok());
        assert_eq!(source.network().request_count(Endpoint::Login), 2);
    }

    #[test]
    fn test_prefetch_loads() {
        let resource = LessonsResource::new(Rc::new(fake()));
        let timer = immediate_timer();
        let query = LessonsQuery::default();
        // the read is polled first, so an immediate fetch wins over the deadline
        let outcome = pollster::block_on(resource.prefetch(&query, &timer, Duration::from_secs(1)));
        assert_eq!(outcome, PrefetchOutcome::Loaded);
        assert!(resource.cache().peek(&query.cache_key()).is_some());
    }

    #[test]
    fn test_prefetch_times_out() {
        let (_gate, pending) = futures::channel::oneshot::channel::<()>();
        let pending = pending.map(|_| ()).shared();
        let slow: Timer = {
            let pending = pending.clone();
            Rc::new(move |_: Duration| pending.clone().boxed_local())
        };
        let source = FakeLessons::new(NetworkSettings::new(), slow);
        let resource = LessonsResource::new(Rc::new(source));

        let query = LessonsQuery::default();
        let outcome = pollster::block_on(resource.prefetch(
            &query,
            &immediate_timer(),
            Duration::from_secs(1),
        ));
        assert_eq!(outcome, PrefetchOutcome::TimedOut);
        // still cached, still in flight
        assert!(resource.cache().contains(&query.cache_key()));
        assert!(resource.cache().peek(&query.cache_key()).is_none());
    }
}
