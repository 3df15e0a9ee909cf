//! Meeting service: join/part, card seeding and fan-out.
//!
//! DESIGN
//! ======
//! Meetings are created in memory on first join and hold every reflection
//! and group for as long as the process lives. A meeting is evicted only
//! when its last client leaves and it has no reflections, so reconnecting
//! participants find their board intact.

use frames::drag::{CreateReflection, MeetingSnapshot, ReflectionSnapshot};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::frame::{ErrorCode, Frame};
use crate::services::drag;
use crate::state::{AppState, ConnectedClient, MeetingState, Reflection};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MeetingError {
    #[error("meeting not found: {0}")]
    NotFound(Uuid),
    #[error("group not found: {0}")]
    GroupNotFound(Uuid),
    #[error("zone_id required when no group is given")]
    MissingZone,
}

impl ErrorCode for MeetingError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_MEETING_NOT_FOUND",
            Self::GroupNotFound(_) => "E_GROUP_NOT_FOUND",
            Self::MissingZone => "E_ZONE_REQUIRED",
        }
    }
}

// =============================================================================
// JOIN / PART
// =============================================================================

/// Register a client with a meeting, creating the meeting if needed.
///
/// Returns the snapshot the client renders its board from.
pub async fn join_meeting(
    state: &AppState,
    meeting_id: Uuid,
    client_id: Uuid,
    user_name: &str,
    tx: mpsc::Sender<Frame>,
) -> MeetingSnapshot {
    let mut meetings = state.meetings.write().await;
    let meeting = meetings.entry(meeting_id).or_insert_with(MeetingState::new);
    meeting
        .clients
        .insert(client_id, ConnectedClient { user_name: user_name.to_owned(), tx });
    info!(%meeting_id, %client_id, clients = meeting.clients.len(), "client joined meeting");
    meeting.snapshot()
}

/// Remove a client, releasing every drag it still held.
///
/// Viewers receive a fresh `reflection:drag_state` for each released card.
/// Returns the released reflection IDs.
pub async fn part_meeting(state: &AppState, meeting_id: Uuid, client_id: Uuid) -> Vec<Uuid> {
    let mut meetings = state.meetings.write().await;
    let Some(meeting) = meetings.get_mut(&meeting_id) else {
        return Vec::new();
    };

    meeting.clients.remove(&client_id);
    let released = drag::release_client(meeting, client_id);
    for reflection_id in &released {
        drag::fan_out(meeting, meeting_id, *reflection_id, None);
    }
    info!(%meeting_id, %client_id, remaining = meeting.clients.len(), released = released.len(), "client left meeting");

    if meeting.clients.is_empty() && meeting.reflections.is_empty() {
        meetings.remove(&meeting_id);
        info!(%meeting_id, "evicted empty meeting");
    }
    released
}

// =============================================================================
// REFLECTIONS
// =============================================================================

/// Seed a reflection into a meeting.
///
/// Joins `group_id` when given; otherwise forms a new group at the end of
/// `zone_id`.
///
/// # Errors
///
/// Returns [`MeetingError`] when the meeting or group is unknown, or when
/// neither a group nor a zone is provided.
pub async fn create_reflection(
    state: &AppState,
    meeting_id: Uuid,
    req: &CreateReflection,
) -> Result<ReflectionSnapshot, MeetingError> {
    let mut meetings = state.meetings.write().await;
    let meeting = meetings
        .get_mut(&meeting_id)
        .ok_or(MeetingError::NotFound(meeting_id))?;

    let (group_id, zone_id) = match req.group_id {
        Some(group_id) => {
            let group = meeting
                .groups
                .get(&group_id)
                .ok_or(MeetingError::GroupNotFound(group_id))?;
            (group_id, group.zone_id.clone())
        }
        None => {
            if req.zone_id.is_empty() {
                return Err(MeetingError::MissingZone);
            }
            (meeting.create_group(&req.zone_id), req.zone_id.clone())
        }
    };

    let reflection = Reflection {
        id: Uuid::new_v4(),
        group_id,
        zone_id,
        content: req.content.clone(),
        sort_order: meeting.next_reflection_order(group_id),
        drag: None,
        is_dropping: false,
    };
    let snapshot = reflection.snapshot();
    meeting.reflections.insert(reflection.id, reflection);
    debug!(%meeting_id, reflection_id = %snapshot.id, %group_id, "reflection created");
    Ok(snapshot)
}

// =============================================================================
// FAN-OUT
// =============================================================================

/// Send a frame to every client in a meeting, optionally skipping one.
pub async fn broadcast(state: &AppState, meeting_id: Uuid, frame: &Frame, exclude: Option<Uuid>) {
    let meetings = state.meetings.read().await;
    let Some(meeting) = meetings.get(&meeting_id) else {
        return;
    };
    send_to_all(meeting, frame, exclude);
}

/// Best-effort delivery; a full client channel skips that client.
fn send_to_all(meeting: &MeetingState, frame: &Frame, exclude: Option<Uuid>) {
    for (client_id, client) in &meeting.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        if let Err(e) = client.tx.try_send(frame.clone()) {
            debug!(%client_id, syscall = %frame.syscall, error = %e, "dropped frame for slow client");
        }
    }
}

#[cfg(test)]
#[path = "meeting_test.rs"]
mod tests;
