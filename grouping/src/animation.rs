//! Declarative animation phases.
//!
//! Timing lives in the engine; the rendering host only maps a phase plus
//! its style payload onto CSS. Ghosts and group placeholders both move
//! through the same phases.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationPhase {
    /// Nothing animating; natural layout applies.
    #[default]
    Idle,
    /// Appearing, or following a live drag.
    Entering,
    /// Moving toward a resting place after a drop.
    Settling,
    /// Being removed.
    Exiting,
}

impl AnimationPhase {
    /// Whether the host should keep requesting animation frames.
    #[must_use]
    pub fn is_animating(self) -> bool {
        matches!(self, Self::Entering | Self::Settling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(AnimationPhase::default(), AnimationPhase::Idle);
    }

    #[test]
    fn only_live_phases_animate() {
        assert!(!AnimationPhase::Idle.is_animating());
        assert!(AnimationPhase::Entering.is_animating());
        assert!(AnimationPhase::Settling.is_animating());
        assert!(!AnimationPhase::Exiting.is_animating());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&AnimationPhase::Settling).unwrap_or_default(), "\"settling\"");
    }
}
