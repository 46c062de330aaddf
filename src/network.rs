//! Simulated network settings for the fake data source.
//!
//! The debugger panel sits outside the crate; this module is its boundary.
//! Every fake endpoint call asks [`NetworkSettings::record_request`] for its
//! delay, which logs the request and broadcasts a [`NetworkEvent`] to
//! subscribers. [`NetworkSettings::set_delay`] applies from the next call.

use crate::{debug_log, trace_log};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Largest delay the panel can select.
pub const MAX_DELAY: Duration = Duration::from_millis(3000);

/// Step of the panel's delay slider.
pub const DELAY_STEP: Duration = Duration::from_millis(50);

/// Number of recent requests kept for the panel.
pub const REQUEST_LOG_LEN: usize = 100;

/// Fake backend endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Endpoint {
    Lessons,
    Toggle,
    Login,
}

impl Endpoint {
    /// All endpoints, in panel order.
    pub const ALL: [Endpoint; 3] = [Endpoint::Lessons, Endpoint::Toggle, Endpoint::Login];

    /// Route shown in the panel.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Lessons => "/lessons",
            Endpoint::Toggle => "/lesson/:id/toggle",
            Endpoint::Login => "/login",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// One simulated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub endpoint: Endpoint,
    pub started_at: Instant,
    pub delay: Duration,
}

/// Broadcast to panel subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// Current delay of every endpoint.
    Update(BTreeMap<Endpoint, Duration>),
}

type NetworkListener = Rc<dyn Fn(&NetworkEvent)>;

struct NetworkInner {
    delays: BTreeMap<Endpoint, Duration>,
    requests: VecDeque<RequestRecord>,
    totals: BTreeMap<Endpoint, usize>,
    listeners: Vec<(u64, NetworkListener)>,
    next_listener: u64,
}

/// Per-endpoint latency settings, shared by the data source and the panel.
///
/// Cloning produces another handle to the same settings.
#[derive(Clone)]
pub struct NetworkSettings {
    inner: Rc<RefCell<NetworkInner>>,
}

impl NetworkSettings {
    /// Settings where every endpoint answers immediately.
    pub fn new() -> Self {
        Self::with_delays(std::iter::empty())
    }

    /// Settings with explicit delays; missing endpoints answer immediately.
    pub fn with_delays(delays: impl IntoIterator<Item = (Endpoint, Duration)>) -> Self {
        let mut map: BTreeMap<Endpoint, Duration> = Endpoint::ALL
            .iter()
            .map(|endpoint| (*endpoint, Duration::ZERO))
            .collect();
        for (endpoint, delay) in delays {
            map.insert(endpoint, delay.min(MAX_DELAY));
        }
        Self {
            inner: Rc::new(RefCell::new(NetworkInner {
                delays: map,
                requests: VecDeque::with_capacity(REQUEST_LOG_LEN),
                totals: BTreeMap::new(),
                listeners: Vec::new(),
                next_listener: 0,
            })),
        }
    }

    /// Current delay of `endpoint`.
    pub fn delay(&self, endpoint: Endpoint) -> Duration {
        self.inner
            .borrow()
            .delays
            .get(&endpoint)
            .copied()
            .unwrap_or_default()
    }

    /// Change the delay of `endpoint`, clamped to [`MAX_DELAY`].
    ///
    /// Requests already in flight keep their delay.
    pub fn set_delay(&self, endpoint: Endpoint, delay: Duration) {
        let delay = delay.min(MAX_DELAY);
        debug_log!("Delay for {} set to {:?}", endpoint, delay);
        self.inner.borrow_mut().delays.insert(endpoint, delay);
        self.broadcast();
    }

    /// Log a request to `endpoint` and return the delay it should simulate.
    pub fn record_request(&self, endpoint: Endpoint) -> Duration {
        let delay = self.delay(endpoint);
        trace_log!("Request to {} (delay {:?})", endpoint, delay);
        {
            let mut inner = self.inner.borrow_mut();
            if inner.requests.len() == REQUEST_LOG_LEN {
                inner.requests.pop_front();
            }
            inner.requests.push_back(RequestRecord {
                endpoint,
                started_at: Instant::now(),
                delay,
            });
            *inner.totals.entry(endpoint).or_default() += 1;
        }
        self.broadcast();
        delay
    }

    /// The last [`REQUEST_LOG_LEN`] requests, oldest first.
    pub fn requests(&self) -> Vec<RequestRecord> {
        self.inner.borrow().requests.iter().cloned().collect()
    }

    /// Number of requests made to `endpoint` since creation.
    pub fn request_count(&self, endpoint: Endpoint) -> usize {
        self.inner
            .borrow()
            .totals
            .get(&endpoint)
            .copied()
            .unwrap_or_default()
    }

    /// Call `listener` on every settings change and request.
    pub fn subscribe(&self, listener: impl Fn(&NetworkEvent) + 'static) -> u64 {
        let mut inner = self.inner.borrow_mut();
        inner.next_listener += 1;
        let id = inner.next_listener;
        inner.listeners.push((id, Rc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` for unknown ids.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|(listener_id, _)| *listener_id != id);
        inner.listeners.len() != before
    }

    fn broadcast(&self) {
        // Listeners may call back into the settings; release the borrow first.
        let (event, listeners) = {
            let inner = self.inner.borrow();
            let listeners: Vec<NetworkListener> = inner
                .listeners
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect();
            (NetworkEvent::Update(inner.delays.clone()), listeners)
        };
        for listener in listeners {
            listener(&event);
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NetworkSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("NetworkSettings")
            .field("delays", &inner.delays)
            .field("requests", &inner.requests.len())
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::Lessons.path(), "/lessons");
        assert_eq!(Endpoint::Toggle.to_string(), "/lesson/:id/toggle");
        assert_eq!(Endpoint::Login.path(), "/login");
    }

    #[test]
    fn test_set_delay_clamps() {
        let settings = NetworkSettings::new();
        settings.set_delay(Endpoint::Lessons, Duration::from_secs(10));
        assert_eq!(settings.delay(Endpoint::Lessons), MAX_DELAY);

        settings.set_delay(Endpoint::Lessons, Duration::from_millis(200));
        assert_eq!(settings.delay(Endpoint::Lessons), Duration::from_millis(200));
    }

    #[test]
    fn test_record_request_uses_current_delay() {
        let settings = NetworkSettings::new();
        assert_eq!(settings.record_request(Endpoint::Login), Duration::ZERO);
        settings.set_delay(Endpoint::Login, Duration::from_millis(100));
        assert_eq!(
            settings.record_request(Endpoint::Login),
            Duration::from_millis(100)
        );

        let requests = settings.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].delay, Duration::ZERO);
        assert_eq!(settings.request_count(Endpoint::Login), 2);
        assert_eq!(settings.request_count(Endpoint::Lessons), 0);
    }

    #[test]
    fn test_request_log_is_bounded() {
        let settings = NetworkSettings::new();
        settings.record_request(Endpoint::Login);
        for _ in 0..REQUEST_LOG_LEN {
            settings.record_request(Endpoint::Lessons);
        }

        let requests = settings.requests();
        assert_eq!(requests.len(), REQUEST_LOG_LEN);
        // the oldest entry made room
        assert!(requests.iter().all(|record| record.endpoint == Endpoint::Lessons));
        assert_eq!(settings.request_count(Endpoint::Login), 1);
        assert_eq!(settings.request_count(Endpoint::Lessons), REQUEST_LOG_LEN);
    }

    #[test]
    fn test_subscribers_receive_updates() {
        let settings = NetworkSettings::new();
        let calls = Rc::new(Cell::new(0));
        let last_lessons = Rc::new(Cell::new(Duration::ZERO));

        let id = {
            let calls = Rc::clone(&calls);
            let last_lessons = Rc::clone(&last_lessons);
            settings.subscribe(move |NetworkEvent::Update(delays)| {
                calls.set(calls.get() + 1);
                last_lessons.set(delays[&Endpoint::Lessons]);
            })
        };

        settings.set_delay(Endpoint::Lessons, Duration::from_millis(450));
        settings.record_request(Endpoint::Lessons);
        assert_eq!(calls.get(), 2);
        assert_eq!(last_lessons.get(), Duration::from_millis(450));

        assert!(settings.unsubscribe(id));
        settings.record_request(Endpoint::Lessons);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_listener_may_read_settings() {
        let settings = NetworkSettings::new();
        let handle = settings.clone();
        let seen = Rc::new(Cell::new(0));
        let sink = Rc::clone(&seen);
        settings.subscribe(move |_| sink.set(handle.requests().len()));

        settings.record_request(Endpoint::Toggle);
        assert_eq!(seen.get(), 1);
    }
}
