//! Drop Finalizer: turn a release into exactly one finalize request.
//!
//! The target type rule:
//!
//! | Card group vs target | Other cards in the column | Result |
//! |----------------------|---------------------------|--------|
//! | target is a different group | any | `REFLECTION_GROUP` |
//! | no group target | at least one | `REFLECTION_GRID` (new group) |
//! | otherwise | - | cancel (`None`), card stays put |
//!
//! Dropping a card back onto its own group, or a lone card onto empty
//! space in its column, changes nothing and is sent as a cancel.

use frames::drag::DropTargetType;

use crate::cards::GroupId;
use crate::config::DragConfig;

/// Resolved drop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropResolution {
    pub target_type: Option<DropTargetType>,
    pub target_group_id: Option<GroupId>,
}

impl DropResolution {
    #[must_use]
    pub fn cancel() -> Self {
        Self { target_type: None, target_group_id: None }
    }

    #[must_use]
    pub fn is_cancel(&self) -> bool {
        self.target_type.is_none()
    }
}

/// Apply the three-way target type rule.
#[must_use]
pub fn resolve_drop(card_group: GroupId, target_group: Option<GroupId>, zone_siblings: usize) -> DropResolution {
    match target_group {
        Some(target) if target != card_group => DropResolution {
            target_type: Some(DropTargetType::ReflectionGroup),
            target_group_id: Some(target),
        },
        None if zone_siblings > 0 => {
            DropResolution { target_type: Some(DropTargetType::ReflectionGrid), target_group_id: None }
        }
        _ => DropResolution::cancel(),
    }
}

/// Who made the drop being settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOrigin {
    Local,
    Remote,
}

/// Settle countdown for a drop.
#[must_use]
pub fn settle_duration(origin: DropOrigin, config: &DragConfig) -> u32 {
    match origin {
        DropOrigin::Local => config.local_drop_ms,
        DropOrigin::Remote => config.remote_drop_ms,
    }
}

/// A finalize request awaiting the server's verdict.
///
/// Kept until the card's `is_dropping` push arrives (accepted) or the
/// server rejects the drop, so the optimistic state can be rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDrop {
    /// Group the card was in when released.
    pub from_group: GroupId,
    pub resolution: DropResolution,
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn other_group_target_merges() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        let res = resolve_drop(own, Some(other), 0);
        assert_eq!(res.target_type, Some(DropTargetType::ReflectionGroup));
        assert_eq!(res.target_group_id, Some(other));
    }

    #[test]
    fn own_group_target_cancels() {
        let own = Uuid::new_v4();
        assert!(resolve_drop(own, Some(own), 4).is_cancel());
    }

    #[test]
    fn open_space_with_siblings_forms_grid_group() {
        let res = resolve_drop(Uuid::new_v4(), None, 1);
        assert_eq!(res.target_type, Some(DropTargetType::ReflectionGrid));
        assert!(res.target_group_id.is_none());
    }

    #[test]
    fn lone_card_on_open_space_cancels() {
        assert_eq!(resolve_drop(Uuid::new_v4(), None, 0), DropResolution::cancel());
    }

    #[test]
    fn settle_duration_depends_on_origin() {
        let config = DragConfig::default();
        assert_eq!(settle_duration(DropOrigin::Local, &config), config.local_drop_ms);
        assert_eq!(settle_duration(DropOrigin::Remote, &config), config.remote_drop_ms);
        assert!(config.remote_drop_ms > config.local_drop_ms);
    }
}
