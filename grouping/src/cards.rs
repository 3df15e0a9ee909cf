//! Reflection cards, their groups, and the in-memory store.
//!
//! The store is the client's copy of the authoritative card records. Server
//! state pushes overwrite the drag fields of one card at a time; the engine
//! also writes optimistic values (`is_viewer_dragging` on pickup, cleared
//! transient fields after a settle) without waiting for a round-trip.

#[cfg(test)]
#[path = "cards_test.rs"]
mod cards_test;

use std::collections::HashMap;

use frames::drag::{DragStatePush, MeetingSnapshot, RemoteDrag};
use uuid::Uuid;

/// Unique identifier for a reflection card.
pub type CardId = Uuid;

/// Unique identifier for a reflection group.
pub type GroupId = Uuid;

/// One reflection card.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq)]
pub struct Reflection {
    pub id: CardId,
    pub group_id: GroupId,
    /// Column the card's group lives in.
    pub zone_id: String,
    pub content: String,
    /// Position within the group; lower sorts first.
    pub sort_order: f64,
    /// The card's text editor is open; editing cards cannot be picked up.
    pub is_editing: bool,
    /// The card has been dropped and is settling into place.
    pub is_dropping: bool,
    /// This viewer is the server-recognised dragger.
    pub is_viewer_dragging: bool,
    /// Another participant is dragging (or just dropped) the card.
    pub remote_drag: Option<RemoteDrag>,
}

impl Reflection {
    #[must_use]
    pub fn new(id: CardId, group_id: GroupId, zone_id: impl Into<String>) -> Self {
        Self {
            id,
            group_id,
            zone_id: zone_id.into(),
            content: String::new(),
            sort_order: 0.0,
            is_editing: false,
            is_dropping: false,
            is_viewer_dragging: false,
            remote_drag: None,
        }
    }

    /// Whether the card occupies a slot in its group's list.
    ///
    /// A dropping card already sits in its destination list; a held card
    /// does not sit anywhere.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_dropping || (!self.is_viewer_dragging && self.remote_drag.is_none())
    }

    /// Whether a local press may start a drag on this card.
    #[must_use]
    pub fn can_pick_up(&self) -> bool {
        self.is_static() && !self.is_dropping && !self.is_editing
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionGroup {
    pub id: GroupId,
    pub zone_id: String,
    pub sort_order: f64,
}

/// A card's record immediately before and after a state push.
#[derive(Debug, Clone)]
pub struct PushDelta {
    pub before: Reflection,
    pub after: Reflection,
}

impl PushDelta {
    #[must_use]
    pub fn dropping_started(&self) -> bool {
        !self.before.is_dropping && self.after.is_dropping
    }

    /// A newer drag cleared `is_dropping` before the old drop settled.
    #[must_use]
    pub fn dropping_cancelled(&self) -> bool {
        self.before.is_dropping && !self.after.is_dropping
    }

    #[must_use]
    pub fn picked_up(&self) -> bool {
        self.before.is_static() && !self.after.is_static()
    }

    #[must_use]
    pub fn remote_appeared(&self) -> bool {
        self.before.remote_drag.is_none() && self.after.remote_drag.is_some()
    }

    #[must_use]
    pub fn remote_cleared(&self) -> bool {
        self.before.remote_drag.is_some() && self.after.remote_drag.is_none()
    }

    #[must_use]
    pub fn moved_group(&self) -> bool {
        self.before.group_id != self.after.group_id
    }
}

/// Live reflections and groups for one meeting.
#[derive(Debug, Default)]
pub struct CardStore {
    reflections: HashMap<CardId, Reflection>,
    groups: HashMap<GroupId, ReflectionGroup>,
}

impl CardStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all contents with a server snapshot.
    pub fn load_snapshot(&mut self, snapshot: &MeetingSnapshot) {
        self.reflections.clear();
        self.groups.clear();
        for group in &snapshot.groups {
            self.groups.insert(
                group.id,
                ReflectionGroup { id: group.id, zone_id: group.zone_id.clone(), sort_order: group.sort_order },
            );
        }
        for row in &snapshot.reflections {
            let mut reflection = Reflection::new(row.id, row.group_id, row.zone_id.clone());
            reflection.content.clone_from(&row.content);
            reflection.sort_order = row.sort_order;
            self.insert(reflection);
        }
    }

    /// Insert a reflection, creating its group record if missing.
    pub fn insert(&mut self, reflection: Reflection) {
        let zone_id = reflection.zone_id.clone();
        let group_id = reflection.group_id;
        let next_order = self.next_group_order();
        self.groups
            .entry(group_id)
            .or_insert_with(|| ReflectionGroup { id: group_id, zone_id, sort_order: next_order });
        self.reflections.insert(reflection.id, reflection);
    }

    #[must_use]
    pub fn get(&self, id: CardId) -> Option<&Reflection> {
        self.reflections.get(&id)
    }

    pub fn get_mut(&mut self, id: CardId) -> Option<&mut Reflection> {
        self.reflections.get_mut(&id)
    }

    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&ReflectionGroup> {
        self.groups.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reflections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reflections.is_empty()
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Cards in `group_id` that currently occupy a slot in its list.
    #[must_use]
    pub fn static_count(&self, group_id: GroupId) -> usize {
        self.reflections
            .values()
            .filter(|r| r.group_id == group_id && r.is_static())
            .count()
    }

    /// Position of a card among its group's static cards, or `None` while held.
    #[must_use]
    pub fn static_index(&self, id: CardId) -> Option<usize> {
        let card = self.reflections.get(&id)?;
        if !card.is_static() {
            return None;
        }
        let mut list: Vec<&Reflection> = self
            .reflections
            .values()
            .filter(|r| r.group_id == card.group_id && r.is_static())
            .collect();
        list.sort_by(|a, b| a.sort_order.total_cmp(&b.sort_order).then(a.id.cmp(&b.id)));
        list.iter().position(|r| r.id == id)
    }

    /// Other reflections in the same column as `id`.
    #[must_use]
    pub fn zone_siblings(&self, id: CardId) -> usize {
        let Some(card) = self.reflections.get(&id) else {
            return 0;
        };
        self.reflections
            .values()
            .filter(|r| r.id != id && r.zone_id == card.zone_id)
            .count()
    }

    /// Overwrite one card's drag fields with a server push.
    ///
    /// Unknown cards are ignored. A push naming an unknown group means the
    /// server formed a new group for the card; the group is recorded in the
    /// card's column and emptied groups are pruned.
    pub fn apply_push(&mut self, push: &DragStatePush) -> Option<PushDelta> {
        let next_group_order = self.next_group_order();
        let before = self.reflections.get(&push.reflection_id)?.clone();

        if before.group_id != push.reflection_group_id {
            let zone_id = before.zone_id.clone();
            self.groups.entry(push.reflection_group_id).or_insert_with(|| ReflectionGroup {
                id: push.reflection_group_id,
                zone_id,
                sort_order: next_group_order,
            });
        }
        let next_card_order = self.next_card_order(push.reflection_group_id);

        let card = self.reflections.get_mut(&push.reflection_id)?;
        if card.group_id != push.reflection_group_id {
            card.group_id = push.reflection_group_id;
            card.sort_order = next_card_order;
        }
        card.is_dropping = push.is_dropping;
        card.is_viewer_dragging = push.is_viewer_dragging;
        card.remote_drag.clone_from(&push.remote_drag);
        let after = card.clone();

        if before.group_id != after.group_id {
            self.prune_group(before.group_id);
        }
        Some(PushDelta { before, after })
    }

    /// Optimistically mark the viewer as the dragger (or not).
    pub fn set_viewer_dragging(&mut self, id: CardId, dragging: bool) {
        if let Some(card) = self.reflections.get_mut(&id) {
            card.is_viewer_dragging = dragging;
        }
    }

    /// Clear `is_dropping` and `remote_drag` once a drop has settled.
    ///
    /// Returns whether anything changed.
    pub fn clear_transient(&mut self, id: CardId) -> bool {
        let Some(card) = self.reflections.get_mut(&id) else {
            return false;
        };
        let changed = card.is_dropping || card.remote_drag.is_some();
        card.is_dropping = false;
        card.remote_drag = None;
        changed
    }

    fn prune_group(&mut self, group_id: GroupId) {
        if !self.reflections.values().any(|r| r.group_id == group_id) {
            self.groups.remove(&group_id);
        }
    }

    fn next_group_order(&self) -> f64 {
        self.groups.values().map(|g| g.sort_order).fold(-1.0, f64::max) + 1.0
    }

    fn next_card_order(&self, group_id: GroupId) -> f64 {
        self.reflections
            .values()
            .filter(|r| r.group_id == group_id)
            .map(|r| r.sort_order)
            .fold(-1.0, f64::max)
            + 1.0
    }
}
