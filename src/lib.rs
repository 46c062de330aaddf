//! # async-navigator
//!
//! Transition-aware navigation for GPUI apps: the URL and the data it
//! depends on change together, as seen by the user, even though fetching,
//! rendering and history updates are all asynchronous.
//!
//! ## Pieces
//!
//! - [`Coordinator`]: owns the displayed [`Location`]. `navigate`,
//!   `set_param` and `refresh` stage a new location; the platform-visible
//!   commit (address-bar write, or letting an intercepted navigation finish)
//!   runs only when the renderer reports the stage as displayed.
//! - [`backend`]: the two interchangeable strategies: an intercepting one
//!   for platforms with a navigation API, and a history one that writes the
//!   address bar itself. One is picked at startup.
//! - [`SuspenseCache`]: coalescing cache of asynchronous reads keyed by
//!   `(kind, params)`, with explicit invalidation.
//! - [`AppRuntime`]: owns the coordinator, the lessons cache and the data
//!   source, and implements the user actions.
//! - [`context`]: GPUI glue: the runtime as a `Global` and the static
//!   [`Navigator`] API.
//!
//! ## Quick start
//!
//! ```
//! use async_navigator::platform::{MemoryHistory, PlatformCapabilities};
//! use async_navigator::Coordinator;
//! use std::rc::Rc;
//!
//! let history = Rc::new(MemoryHistory::new("/"));
//! let mut coordinator = Coordinator::new(&PlatformCapabilities::history_only(history.clone()));
//!
//! coordinator.navigate("/login");
//! let stage = coordinator.snapshot();
//! // ... render stage.location ...
//! coordinator.displayed(stage.token);
//!
//! assert_eq!(history.pushes(), vec!["/login"]);
//! ```
//!
//! ## Feature flags
//!
//! | Feature   | Default | Description                     |
//! |-----------|---------|---------------------------------|
//! | `log`     | yes     | Logging through the `log` crate |
//! | `tracing` | no      | Logging through `tracing`       |

#![cfg_attr(docsrs, feature(doc_cfg))]

mod logging;

pub mod backend;
pub mod cache;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod data;
pub mod error;
pub mod location;
pub mod network;
pub mod optimistic;
pub mod platform;
pub mod runtime;
pub mod search;
pub mod state;
pub mod transition;

pub use backend::{BackendKind, LocationChange, NavigationBackend, UpdatePriority};
pub use cache::{CacheKey, CacheStats, ReadState, Revalidate, SuspenseCache};
pub use config::RuntimeConfig;
pub use context::{gpui_timer, init_runtime, GlobalRuntime, Navigator, UseRuntime};
pub use coordinator::{Coordinator, RouterSnapshot, SubscriptionId, Subscribers};
pub use data::{Lesson, LessonSource, LessonsQuery, LessonsResource, Tab, Timer};
pub use error::{CommitOutcome, FetchError};
pub use location::{Location, QueryParams};
pub use optimistic::{LoadingIndicator, LoadingThresholds, Optimistic};
pub use runtime::{AppRuntime, Interaction};
pub use state::{RouterState, StageToken};
pub use transition::{Transition, TransitionConfig, TransitionType};
