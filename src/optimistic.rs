//! Optimistic control state and loading indicators.
//!
//! [`Optimistic`] holds the value a control shows while an action is in
//! flight. [`LoadingIndicator`] shows a spinner only when an interaction
//! takes longer than its [`LoadingThresholds`] bound; it never affects
//! navigation or data.

use crate::data::Timer;
use crate::trace_log;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

// ============================================================================
// Optimistic
// ============================================================================

/// A control value with an optional optimistic override.
///
/// `set_optimistic` shows the new value immediately and marks the control
/// pending. When the action settles, success promotes the optimistic value
/// to committed and failure discards it, reverting to the committed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Optimistic<T> {
    committed: T,
    optimistic: Option<T>,
    pending: bool,
}

impl<T: Clone> Optimistic<T> {
    pub fn new(committed: T) -> Self {
        Self {
            committed,
            optimistic: None,
            pending: false,
        }
    }

    /// Value to display.
    pub fn value(&self) -> &T {
        self.optimistic.as_ref().unwrap_or(&self.committed)
    }

    /// Last confirmed value.
    pub fn committed(&self) -> &T {
        &self.committed
    }

    /// Check if an action is in flight
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Show `value` until the pending action settles.
    pub fn set_optimistic(&mut self, value: T) {
        self.optimistic = Some(value);
        self.pending = true;
    }

    /// Reconcile with the outcome of the pending action.
    ///
    /// Returns `true` if the optimistic value was kept.
    pub fn settle<E>(&mut self, result: &Result<(), E>) -> bool {
        self.pending = false;
        let optimistic = self.optimistic.take();
        match (result, optimistic) {
            (Ok(()), Some(value)) => {
                self.committed = value;
                true
            }
            (Ok(()), None) => true,
            (Err(_), _) => {
                trace_log!("Optimistic value discarded");
                false
            }
        }
    }

    /// Replace the committed value with fresh data.
    ///
    /// An optimistic value is dropped unless an action is still pending.
    pub fn sync(&mut self, committed: T) {
        self.committed = committed;
        if !self.pending {
            self.optimistic = None;
        }
    }
}

impl<T: Clone + Default> Default for Optimistic<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// ============================================================================
// Loading indicator
// ============================================================================

/// How long an interaction may take before a loading indicator appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingThresholds {
    /// Tab, search and complete interactions.
    pub interaction: Duration,
    /// Full-page navigations.
    pub page: Duration,
}

impl Default for LoadingThresholds {
    fn default() -> Self {
        Self {
            interaction: Duration::from_millis(150),
            page: Duration::from_millis(1000),
        }
    }
}

/// Delayed loading flag for one interaction at a time.
///
/// Cloning produces another handle to the same indicator.
#[derive(Debug, Clone, Default)]
pub struct LoadingIndicator {
    visible: Rc<Cell<bool>>,
    active: Rc<Cell<Option<u64>>>,
    started: Rc<Cell<u64>>,
}

impl LoadingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin an interaction.
    ///
    /// The returned future must be driven by the caller's executor; once
    /// `threshold` elapses it shows the indicator, unless the interaction
    /// finished or a newer one started meanwhile.
    pub fn start(&self, timer: &Timer, threshold: Duration) -> LocalBoxFuture<'static, ()> {
        let id = self.started.get() + 1;
        self.started.set(id);
        self.active.set(Some(id));
        self.visible.set(false);

        let sleep = timer(threshold);
        let visible = Rc::clone(&self.visible);
        let active = Rc::clone(&self.active);
        async move {
            sleep.await;
            if active.get() == Some(id) {
                trace_log!("Interaction {} exceeded {:?}, showing indicator", id, threshold);
                visible.set(true);
            }
        }
        .boxed_local()
    }

    /// End the current interaction and hide the indicator.
    pub fn finish(&self) {
        self.active.set(None);
        self.visible.set(false);
    }

    /// Check if the indicator is shown
    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    /// Check if an interaction is in progress
    pub fn is_active(&self) -> bool {
        self.active.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::immediate_timer;
    use crate::error::FetchError;

    #[test]
    fn test_optimistic_success_commits() {
        let mut complete = Optimistic::new(false);
        complete.set_optimistic(true);
        assert!(*complete.value());
        assert!(!*complete.committed());
        assert!(complete.is_pending());

        assert!(complete.settle::<FetchError>(&Ok(())));
        assert!(*complete.value());
        assert!(*complete.committed());
        assert!(!complete.is_pending());
    }

    #[test]
    fn test_optimistic_failure_reverts() {
        let mut complete = Optimistic::new(false);
        complete.set_optimistic(true);
        let failed: Result<(), FetchError> = Err(FetchError::failed("/lesson/:id/toggle", "offline"));

        assert!(!complete.settle(&failed));
        assert!(!*complete.value());
        assert!(!complete.is_pending());
    }

    #[test]
    fn test_sync_keeps_pending_override() {
        let mut value = Optimistic::new(1);
        value.set_optimistic(2);
        value.sync(5);
        assert_eq!(*value.value(), 2);
        assert_eq!(*value.committed(), 5);

        value.settle::<()>(&Err(()));
        value.sync(6);
        assert_eq!(*value.value(), 6);
    }

    #[test]
    fn test_default_thresholds() {
        let thresholds = LoadingThresholds::default();
        assert_eq!(thresholds.interaction, Duration::from_millis(150));
        assert_eq!(thresholds.page, Duration::from_secs(1));
    }

    #[test]
    fn test_indicator_shows_after_threshold() {
        let indicator = LoadingIndicator::new();
        let pending = indicator.start(&immediate_timer(), Duration::from_millis(150));
        assert!(!indicator.is_visible());

        pollster::block_on(pending);
        assert!(indicator.is_visible());
        indicator.finish();
        assert!(!indicator.is_visible());
    }

    #[test]
    fn test_indicator_skipped_when_finished_first() {
        let indicator = LoadingIndicator::new();
        let pending = indicator.start(&immediate_timer(), Duration::from_millis(150));
        indicator.finish();

        pollster::block_on(pending);
        assert!(!indicator.is_visible());
    }

    #[test]
    fn test_newer_interaction_wins() {
        let indicator = LoadingIndicator::new();
        let timer = immediate_timer();
        let first = indicator.start(&timer, Duration::from_millis(150));
        let second = indicator.start(&timer, Duration::from_millis(150));

        pollster::block_on(first);
        assert!(!indicator.is_visible());
        pollster::block_on(second);
        assert!(indicator.is_visible());
    }
}
