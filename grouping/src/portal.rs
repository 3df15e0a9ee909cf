//! Portal slots: where clones and ghosts render outside the card lists.
//!
//! The engine never touches a portal directly. It emits
//! [`Action::SetPortal`] and the host forwards those to its
//! [`PortalRegistry`]. Clearing a slot that is already empty is a no-op, so
//! every cleanup path may clear unconditionally.

use std::collections::HashMap;

use crate::engine::Action;
use crate::remote::GhostView;

/// Host-side target of [`Action::SetPortal`].
pub trait PortalRegistry {
    /// Show `view` in slot `key`, or clear the slot when `view` is `None`.
    fn set_portal(&mut self, key: &str, view: Option<GhostView>);
}

/// In-memory portal registry used by headless hosts and tests.
#[derive(Debug, Default)]
pub struct PortalSlots {
    slots: HashMap<String, GhostView>,
}

impl PortalSlots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward every portal action in `actions`.
    pub fn apply(&mut self, actions: &[Action]) {
        for action in actions {
            if let Action::SetPortal { key, view } = action {
                self.set_portal(key, view.clone());
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&GhostView> {
        self.slots.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl PortalRegistry for PortalSlots {
    fn set_portal(&mut self, key: &str, view: Option<GhostView>) {
        match view {
            Some(view) => {
                self.slots.insert(key.to_owned(), view);
            }
            None => {
                if self.slots.remove(key).is_some() {
                    log::trace!("portal {key} cleared");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::animation::AnimationPhase;
    use crate::geom::Point;
    use crate::remote::{GhostStyle, portal_key};

    fn view(card_id: Uuid) -> GhostView {
        GhostView {
            card_id,
            drag_user_name: None,
            phase: AnimationPhase::Entering,
            style: GhostStyle::dragging(Point::new(1.0, 2.0), None),
        }
    }

    #[test]
    fn set_and_clear_slot() {
        let card = Uuid::new_v4();
        let key = portal_key(card);
        let mut slots = PortalSlots::new();
        slots.set_portal(&key, Some(view(card)));
        assert_eq!(slots.get(&key).map(|v| v.card_id), Some(card));

        slots.set_portal(&key, None);
        assert!(slots.is_empty());
    }

    #[test]
    fn clearing_absent_slot_is_noop() {
        let mut slots = PortalSlots::new();
        slots.set_portal("clone-missing", None);
        slots.set_portal("clone-missing", None);
        assert!(slots.is_empty());
    }

    #[test]
    fn apply_ignores_other_actions() {
        let card = Uuid::new_v4();
        let mut slots = PortalSlots::new();
        slots.apply(&[
            Action::RequestFrame,
            Action::SetPortal { key: portal_key(card), view: Some(view(card)) },
            Action::CardChanged(card),
        ]);
        assert_eq!(slots.len(), 1);
    }
}
