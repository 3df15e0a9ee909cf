//! Group container height animations around pickup and landing.
//!
//! Removing the last card from a group would otherwise make the column
//! jump; the container collapses to zero first. A landing that forms a
//! brand-new single-card group grows its container from zero instead.

use serde::Serialize;

use crate::animation::AnimationPhase;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GroupAnimation {
    /// Shrink from `from_height` to zero.
    Collapse { from_height: f64, duration_ms: u32 },
    /// Grow from zero to `to_height`.
    Expand { to_height: f64, duration_ms: u32 },
    /// Drop any inline height; natural layout applies.
    Reset,
}

impl GroupAnimation {
    #[must_use]
    pub fn phase(&self) -> AnimationPhase {
        match self {
            Self::Collapse { .. } => AnimationPhase::Exiting,
            Self::Expand { .. } => AnimationPhase::Entering,
            Self::Reset => AnimationPhase::Idle,
        }
    }
}

/// Animation for the source group once a card has been lifted out.
///
/// `remaining` counts the group's static cards after the pickup.
#[must_use]
pub fn on_pickup(remaining: usize, height: Option<f64>, duration_ms: u32) -> Option<GroupAnimation> {
    if remaining > 0 {
        return None;
    }
    height.map(|from_height| GroupAnimation::Collapse { from_height, duration_ms })
}

/// Animation for the destination group when a card lands.
///
/// `occupants` counts the group's static cards including the lander.
#[must_use]
pub fn on_landing(occupants: usize, is_new_group: bool, height: Option<f64>, duration_ms: u32) -> GroupAnimation {
    match height {
        Some(to_height) if is_new_group && occupants == 1 => GroupAnimation::Expand { to_height, duration_ms },
        _ => GroupAnimation::Reset,
    }
}
