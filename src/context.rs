//! Runtime context integration for GPUI.
//!
//! This module stores the application's [`AppRuntime`] in GPUI's context:
//!
//! - [`GlobalRuntime`]: the runtime wrapped as a GPUI `Global`.
//! - [`Navigator`]: static methods (`Navigator::navigate`,
//!   `Navigator::set_param`, …) that reach the runtime through `cx` and
//!   refresh all windows so the staged location renders.
//! - [`gpui_timer`]: a [`Timer`] backed by the GPUI background executor.
//!
//! # Initialization
//!
//! ```ignore
//! use async_navigator::context::{gpui_timer, init_runtime};
//!
//! let timer = gpui_timer(cx);
//! let (runtime, _source) = AppRuntime::with_fake_source(&caps, timer, RuntimeConfig::default());
//! init_runtime(cx, runtime);
//! ```
//!
//! Views read [`Navigator::snapshot`] while rendering and report the token
//! back through [`Navigator::displayed`] once the frame is laid out.

use crate::coordinator::RouterSnapshot;
use crate::data::Timer;
use crate::error::CommitOutcome;
use crate::platform::PlatformEvent;
use crate::runtime::AppRuntime;
use crate::state::StageToken;
use crate::{debug_log, Location};
use futures::FutureExt;
use gpui::{App, BorrowAppContext, Global};
use std::borrow::BorrowMut;
use std::rc::Rc;
use std::time::Duration;

/// The application runtime as a GPUI global.
#[derive(Clone)]
pub struct GlobalRuntime(pub AppRuntime);

impl Global for GlobalRuntime {}

// ============================================================================
// UseRuntime trait
// ============================================================================

/// Trait for accessing the global runtime from context.
pub trait UseRuntime {
    /// Get reference to the global runtime.
    fn runtime(&self) -> &AppRuntime;
}

impl UseRuntime for App {
    fn runtime(&self) -> &AppRuntime {
        &self.global::<GlobalRuntime>().0
    }
}

// ============================================================================
// init_runtime
// ============================================================================

/// Install `runtime` as the global runtime.
pub fn init_runtime(cx: &mut App, runtime: AppRuntime) {
    debug_log!("Installing runtime at '{}'", runtime.current_location());
    cx.set_global(GlobalRuntime(runtime));
}

/// A [`Timer`] that sleeps on the GPUI background executor.
pub fn gpui_timer(cx: &App) -> Timer {
    let executor = cx.background_executor().clone();
    Rc::new(move |duration: Duration| executor.timer(duration).boxed_local())
}

// ============================================================================
// Navigator
// ============================================================================

/// Static navigation API over the global runtime.
///
/// Mutating calls stage a new location and refresh all windows; the address
/// bar changes only after [`Navigator::displayed`].
///
/// ```ignore
/// use async_navigator::Navigator;
///
/// Navigator::set_param(cx, "tab", "wip");
/// Navigator::navigate(cx, "/login");
/// ```
pub struct Navigator;

impl Navigator {
    fn runtime(cx: &mut (impl BorrowAppContext + BorrowMut<App>)) -> AppRuntime {
        let app: &mut App = cx.borrow_mut();
        app.runtime().clone()
    }

    fn refresh_windows(cx: &mut (impl BorrowAppContext + BorrowMut<App>)) {
        let app: &mut App = cx.borrow_mut();
        app.refresh_windows();
    }

    /// Navigate to `url`.
    pub fn navigate(cx: &mut (impl BorrowAppContext + BorrowMut<App>), url: &str) {
        debug_log!("Navigator::navigate: '{}'", url);
        Self::runtime(cx).navigate(url);
        Self::refresh_windows(cx);
    }

    /// Set one query parameter; an empty `value` removes it.
    pub fn set_param(cx: &mut (impl BorrowAppContext + BorrowMut<App>), key: &str, value: &str) {
        Self::runtime(cx).set_param(key, value);
        Self::refresh_windows(cx);
    }

    /// Revalidate data and re-stage the current location.
    pub fn refresh(cx: &mut (impl BorrowAppContext + BorrowMut<App>)) {
        Self::runtime(cx).refresh();
        Self::refresh_windows(cx);
    }

    /// Deliver a platform navigation notification.
    pub fn handle_platform_event(
        cx: &mut (impl BorrowAppContext + BorrowMut<App>),
        event: PlatformEvent,
    ) {
        Self::runtime(cx).handle_platform_event(event);
        Self::refresh_windows(cx);
    }

    /// Report that the stage `token` is on screen.
    pub fn displayed(
        cx: &mut (impl BorrowAppContext + BorrowMut<App>),
        token: StageToken,
    ) -> CommitOutcome {
        Self::runtime(cx).displayed(token)
    }

    /// Get the staged location.
    pub fn current_location(cx: &App) -> Location {
        cx.runtime().current_location()
    }

    /// Get the staged location and its token.
    pub fn snapshot(cx: &App) -> RouterSnapshot {
        cx.runtime().snapshot()
    }

    /// Check if an intercepted navigation awaits its commit.
    pub fn is_pending(cx: &App) -> bool {
        cx.runtime().is_navigation_pending()
    }
}
