//! Runtime configuration.

use crate::network::{Endpoint, NetworkSettings};
use crate::optimistic::LoadingThresholds;
use crate::transition::TransitionConfig;
use std::time::Duration;

/// Settings for building an [`AppRuntime`](crate::AppRuntime).
///
/// # Example
///
/// ```
/// use async_navigator::config::RuntimeConfig;
/// use async_navigator::network::Endpoint;
/// use std::time::Duration;
///
/// let config = RuntimeConfig::new()
///     .force_history(true)
///     .endpoint_delay(Endpoint::Lessons, Duration::from_millis(800))
///     .prefetch_timeout(Duration::from_millis(500));
///
/// assert!(config.prefers_history());
/// assert_eq!(config.network().delay(Endpoint::Lessons), Duration::from_millis(800));
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    force_history: bool,
    thresholds: LoadingThresholds,
    delays: Vec<(Endpoint, Duration)>,
    prefetch_timeout: Duration,
    transitions: TransitionConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            force_history: false,
            thresholds: LoadingThresholds::default(),
            delays: Vec::new(),
            prefetch_timeout: Duration::from_secs(1),
            transitions: TransitionConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the history backend even when the platform can intercept.
    pub fn force_history(mut self, force: bool) -> Self {
        self.force_history = force;
        self
    }

    /// Loading indicator thresholds.
    pub fn loading_thresholds(mut self, thresholds: LoadingThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Initial simulated latency of `endpoint`.
    pub fn endpoint_delay(mut self, endpoint: Endpoint, delay: Duration) -> Self {
        self.delays.retain(|(existing, _)| *existing != endpoint);
        self.delays.push((endpoint, delay));
        self
    }

    /// How long login waits for the lessons prefetch.
    pub fn prefetch_timeout(mut self, timeout: Duration) -> Self {
        self.prefetch_timeout = timeout;
        self
    }

    /// Transition styling.
    pub fn transitions(mut self, transitions: TransitionConfig) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn prefers_history(&self) -> bool {
        self.force_history
    }

    pub fn thresholds(&self) -> LoadingThresholds {
        self.thresholds
    }

    pub fn timeout(&self) -> Duration {
        self.prefetch_timeout
    }

    pub fn transition_config(&self) -> &TransitionConfig {
        &self.transitions
    }

    /// Fresh network settings with the configured delays.
    pub fn network(&self) -> NetworkSettings {
        NetworkSettings::with_delays(self.delays.iter().copied())
    }
}
