//! Transition tags and styling.
//!
//! Every staged navigation carries a list of [`TransitionType`] tags
//! describing how it happened (`navigation-push`, `navigation-traverse`,
//! `navigation-back`, ...). The rendering surface picks its animation from
//! those tags; [`TransitionConfig::resolve`] does this with the built-in
//! [`Transition`] styles.

use crate::platform::NavigationType;
use std::fmt;
use std::time::Duration;

// ============================================================================
// TransitionType
// ============================================================================

/// Tag attached to a staged navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionType {
    /// `navigation-<type>` for every intercepted navigation.
    Navigation(NavigationType),
    /// Traversal to a higher history index.
    Forward,
    /// Traversal to a lower history index.
    Back,
}

impl fmt::Display for TransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionType::Navigation(kind) => write!(f, "navigation-{}", kind.as_str()),
            TransitionType::Forward => write!(f, "navigation-forward"),
            TransitionType::Back => write!(f, "navigation-back"),
        }
    }
}

/// Direction for slide transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideDirection {
    /// Slide from left to right
    Left,
    /// Slide from right to left
    Right,
}

// ============================================================================
// Transition
// ============================================================================

/// Built-in transition styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transition {
    /// No transition animation
    #[default]
    None,

    /// Cross-fade
    Fade {
        /// Duration in milliseconds
        duration_ms: u64,
    },

    /// Slide transition
    Slide {
        direction: SlideDirection,
        /// Duration in milliseconds
        duration_ms: u64,
    },
}

impl Transition {
    /// Create a fade transition
    pub fn fade(duration_ms: u64) -> Self {
        Self::Fade { duration_ms }
    }

    /// Create a slide-left transition
    pub fn slide_left(duration_ms: u64) -> Self {
        Self::Slide {
            direction: SlideDirection::Left,
            duration_ms,
        }
    }

    /// Create a slide-right transition
    pub fn slide_right(duration_ms: u64) -> Self {
        Self::Slide {
            direction: SlideDirection::Right,
            duration_ms,
        }
    }

    /// Get the duration of this transition
    pub fn duration(&self) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fade { duration_ms } | Self::Slide { duration_ms, .. } => {
                Duration::from_millis(*duration_ms)
            }
        }
    }

    /// Check if this is a no-op transition
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

// ============================================================================
// TransitionConfig
// ============================================================================

/// Maps transition tags to a [`Transition`].
///
/// Back traversals slide right, forward traversals slide left, and anything
/// else uses `default`. A one-shot override wins over all of them.
#[derive(Debug, Clone)]
pub struct TransitionConfig {
    /// Transition for non-directional navigations
    pub default: Transition,

    /// Duration of the directional slides, in milliseconds
    pub slide_ms: u64,

    /// Override transition for the next navigation only
    pub override_next: Option<Transition>,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            default: Transition::None,
            slide_ms: 250,
            override_next: None,
        }
    }
}

impl TransitionConfig {
    /// Create a config with a default transition
    pub fn new(default: Transition) -> Self {
        Self {
            default,
            ..Self::default()
        }
    }

    /// Set an override transition for the next navigation
    pub fn set_override(&mut self, transition: Transition) {
        self.override_next = Some(transition);
    }

    /// Check if there's an active override
    pub fn has_override(&self) -> bool {
        self.override_next.is_some()
    }

    /// Pick the transition for a navigation tagged with `types`.
    ///
    /// Consumes a pending override.
    pub fn resolve(&mut self, types: &[TransitionType]) -> Transition {
        if let Some(transition) = self.override_next.take() {
            return transition;
        }
        if types.contains(&TransitionType::Back) {
            Transition::slide_right(self.slide_ms)
        } else if types.contains(&TransitionType::Forward) {
            Transition::slide_left(self.slide_ms)
        } else {
            self.default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_type_tags() {
        assert_eq!(
            TransitionType::Navigation(NavigationType::Push).to_string(),
            "navigation-push"
        );
        assert_eq!(
            TransitionType::Navigation(NavigationType::Traverse).to_string(),
            "navigation-traverse"
        );
        assert_eq!(TransitionType::Back.to_string(), "navigation-back");
        assert_eq!(TransitionType::Forward.to_string(), "navigation-forward");
    }

    #[test]
    fn test_transition_duration() {
        assert_eq!(Transition::None.duration(), Duration::ZERO);
        assert_eq!(Transition::fade(200).duration(), Duration::from_millis(200));
        assert_eq!(
            Transition::slide_left(300).duration(),
            Duration::from_millis(300)
        );
        assert!(Transition::default().is_none());
    }

    #[test]
    fn test_resolve_directional() {
        let mut config = TransitionConfig::new(Transition::fade(150));
        let back = [
            TransitionType::Navigation(NavigationType::Traverse),
            TransitionType::Back,
        ];
        assert_eq!(config.resolve(&back), Transition::slide_right(250));

        let forward = [
            TransitionType::Navigation(NavigationType::Traverse),
            TransitionType::Forward,
        ];
        assert_eq!(config.resolve(&forward), Transition::slide_left(250));

        let push = [TransitionType::Navigation(NavigationType::Push)];
        assert_eq!(config.resolve(&push), Transition::fade(150));
    }

    #[test]
    fn test_override_is_consumed() {
        let mut config = TransitionConfig::default();
        config.set_override(Transition::fade(100));
        assert!(config.has_override());

        assert_eq!(config.resolve(&[TransitionType::Back]), Transition::fade(100));
        assert!(!config.has_override());
        assert_eq!(
            config.resolve(&[TransitionType::Back]),
            Transition::slide_right(250)
        );
    }
}
