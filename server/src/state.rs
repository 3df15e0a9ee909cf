//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds a map of live meetings. Each meeting keeps its reflections,
//! groups and connected clients in memory; nothing outlives the process.
//! Drag ownership lives on the reflection itself so a claim, a location
//! update and a drop for the same card always serialize through the
//! meeting's write lock.

use std::collections::HashMap;
use std::sync::Arc;

use frames::drag::{GroupSnapshot, MeetingSnapshot, ReflectionSnapshot};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::frame::Frame;

// =============================================================================
// REFLECTIONS
// =============================================================================

/// The drag currently claiming a reflection.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveDrag {
    pub drag_id: Uuid,
    pub client_id: Uuid,
    pub user_name: String,
    pub x: f64,
    pub y: f64,
    pub target_id: Option<Uuid>,
    pub target_offset_x: f64,
    pub target_offset_y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reflection {
    pub id: Uuid,
    pub group_id: Uuid,
    pub zone_id: String,
    pub content: String,
    pub sort_order: f64,
    pub drag: Option<ActiveDrag>,
    /// Set by a finalized drop; cleared by the next claim.
    pub is_dropping: bool,
}

impl Reflection {
    #[must_use]
    pub fn snapshot(&self) -> ReflectionSnapshot {
        ReflectionSnapshot {
            id: self.id,
            group_id: self.group_id,
            zone_id: self.zone_id.clone(),
            content: self.content.clone(),
            sort_order: self.sort_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: Uuid,
    pub zone_id: String,
    pub sort_order: f64,
}

impl Group {
    #[must_use]
    pub fn snapshot(&self) -> GroupSnapshot {
        GroupSnapshot { id: self.id, zone_id: self.zone_id.clone(), sort_order: self.sort_order }
    }
}

// =============================================================================
// MEETING STATE
// =============================================================================

/// A socket joined to a meeting.
#[derive(Debug, Clone)]
pub struct ConnectedClient {
    pub user_name: String,
    pub tx: mpsc::Sender<Frame>,
}

/// Per-meeting live state.
#[derive(Debug, Default)]
pub struct MeetingState {
    pub reflections: HashMap<Uuid, Reflection>,
    pub groups: HashMap<Uuid, Group>,
    /// Connected clients: `client_id` -> display name and outbound sender.
    pub clients: HashMap<Uuid, ConnectedClient>,
}

impl MeetingState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups and reflections ordered by `sort_order`.
    #[must_use]
    pub fn snapshot(&self) -> MeetingSnapshot {
        let mut groups: Vec<GroupSnapshot> = self.groups.values().map(Group::snapshot).collect();
        groups.sort_by(|a, b| a.sort_order.total_cmp(&b.sort_order));
        let mut reflections: Vec<ReflectionSnapshot> = self.reflections.values().map(Reflection::snapshot).collect();
        reflections.sort_by(|a, b| a.sort_order.total_cmp(&b.sort_order));
        MeetingSnapshot { groups, reflections }
    }

    /// Reflections currently in `group_id`.
    pub fn group_members(&self, group_id: Uuid) -> impl Iterator<Item = &Reflection> {
        self.reflections.values().filter(move |r| r.group_id == group_id)
    }

    /// One past the highest group `sort_order` in `zone_id`.
    #[must_use]
    pub fn next_group_order(&self, zone_id: &str) -> f64 {
        self.groups
            .values()
            .filter(|g| g.zone_id == zone_id)
            .map(|g| g.sort_order)
            .fold(-1.0, f64::max)
            + 1.0
    }

    /// One past the highest reflection `sort_order` in `group_id`.
    #[must_use]
    pub fn next_reflection_order(&self, group_id: Uuid) -> f64 {
        self.group_members(group_id)
            .map(|r| r.sort_order)
            .fold(-1.0, f64::max)
            + 1.0
    }

    /// Add a new empty group at the end of `zone_id`.
    pub fn create_group(&mut self, zone_id: &str) -> Uuid {
        let id = Uuid::new_v4();
        let sort_order = self.next_group_order(zone_id);
        self.groups.insert(id, Group { id, zone_id: zone_id.to_string(), sort_order });
        id
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub meetings: Arc<RwLock<HashMap<Uuid, MeetingState>>>,
    pub config: ServerConfig,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self { meetings: Arc::new(RwLock::new(HashMap::new())), config }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(ServerConfig::default())
    }

    /// Seed an empty meeting and return its ID.
    pub async fn seed_meeting(state: &AppState) -> Uuid {
        let meeting_id = Uuid::new_v4();
        state.meetings.write().await.insert(meeting_id, MeetingState::new());
        meeting_id
    }

    /// Seed one reflection in its own new group; returns `(reflection, group)`.
    pub async fn seed_reflection(state: &AppState, meeting_id: Uuid, zone_id: &str) -> (Uuid, Uuid) {
        let mut meetings = state.meetings.write().await;
        let meeting = meetings.entry(meeting_id).or_default();
        let group_id = meeting.create_group(zone_id);
        let id = Uuid::new_v4();
        meeting.reflections.insert(
            id,
            Reflection {
                id,
                group_id,
                zone_id: zone_id.to_string(),
                content: String::new(),
                sort_order: 0.0,
                drag: None,
                is_dropping: false,
            },
        );
        (id, group_id)
    }

    /// Register a client channel directly; returns its receiver.
    pub async fn attach_client(
        state: &AppState,
        meeting_id: Uuid,
        client_id: Uuid,
        user_name: &str,
    ) -> mpsc::Receiver<Frame> {
        let (tx, rx) = mpsc::channel(64);
        let mut meetings = state.meetings.write().await;
        let meeting = meetings.entry(meeting_id).or_default();
        meeting
            .clients
            .insert(client_id, ConnectedClient { user_name: user_name.to_string(), tx });
        rx
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
