//! Drag service: claim, relocate and finalize reflection drags.
//!
//! DESIGN
//! ======
//! The server is the arbiter of drag ownership. Every reflection carries at
//! most one [`ActiveDrag`]; a new claim always replaces the old one, so the
//! latest `drag_start` wins and the previous holder learns about it from
//! its next `reflection:drag_state` push.
//!
//! Pushes are tailored per viewer: the holder sees `is_viewer_dragging`,
//! everyone else sees `remote_drag` with the holder's name and position.
//! Each push is the full current state of one card, never a delta, so a
//! dropped or reordered push is repaired by the next one.
//!
//! The pure functions here operate on a locked [`MeetingState`]; the async
//! wrappers take the lock, apply one operation and fan out the result.

use frames::drag::{self, DragStatePush, DropTargetType, EndDrag, RemoteDrag, StartDrag, UpdateDragLocation};
use tracing::{debug, info};
use uuid::Uuid;

use crate::frame::ErrorCode;
use crate::state::{ActiveDrag, AppState, MeetingState, Reflection};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DragError {
    #[error("meeting not found: {0}")]
    MeetingNotFound(Uuid),
    #[error("reflection not found: {0}")]
    ReflectionNotFound(Uuid),
    #[error("not the drag owner of reflection {0}")]
    NotDragOwner(Uuid),
    #[error("group not found: {0}")]
    GroupNotFound(Uuid),
    #[error("target_group_id required for a group drop")]
    MissingTargetGroup,
}

impl ErrorCode for DragError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MeetingNotFound(_) => "E_MEETING_NOT_FOUND",
            Self::ReflectionNotFound(_) => "E_REFLECTION_NOT_FOUND",
            Self::NotDragOwner(_) => "E_NOT_DRAG_OWNER",
            Self::GroupNotFound(_) => "E_GROUP_NOT_FOUND",
            Self::MissingTargetGroup => "E_TARGET_GROUP_REQUIRED",
        }
    }
}

/// Display name used when a claim arrives from a socket that never joined.
const UNKNOWN_USER: &str = "Someone";

/// What a finalized drop changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropOutcome {
    pub from_group: Uuid,
    pub to_group: Uuid,
    /// Group removed because the drop left it empty.
    pub pruned_group: Option<Uuid>,
}

impl DropOutcome {
    #[must_use]
    pub fn moved(&self) -> bool {
        self.from_group != self.to_group
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Claim a reflection for `client_id`, replacing any existing drag.
///
/// Returns the client that held the card before, if it was someone else.
///
/// # Errors
///
/// Returns [`DragError::ReflectionNotFound`] for an unknown card.
pub fn claim(meeting: &mut MeetingState, client_id: Uuid, req: &StartDrag) -> Result<Option<Uuid>, DragError> {
    let user_name = meeting
        .clients
        .get(&client_id)
        .map_or_else(|| UNKNOWN_USER.to_string(), |c| c.user_name.clone());
    let reflection = meeting
        .reflections
        .get_mut(&req.reflection_id)
        .ok_or(DragError::ReflectionNotFound(req.reflection_id))?;

    let previous = reflection
        .drag
        .as_ref()
        .map(|d| d.client_id)
        .filter(|holder| *holder != client_id);

    // Until the first move arrives, viewers project the ghost onto the card's own group.
    reflection.drag = Some(ActiveDrag {
        drag_id: req.drag_id,
        client_id,
        user_name,
        x: 0.0,
        y: 0.0,
        target_id: Some(reflection.group_id),
        target_offset_x: 0.0,
        target_offset_y: 0.0,
    });
    reflection.is_dropping = false;
    Ok(previous)
}

/// Record the dragger's latest position.
///
/// Returns `false` when the update belongs to a drag that no longer owns
/// the card; such updates are ignored.
///
/// # Errors
///
/// Returns [`DragError::ReflectionNotFound`] for an unknown card.
pub fn relocate(meeting: &mut MeetingState, client_id: Uuid, req: &UpdateDragLocation) -> Result<bool, DragError> {
    let reflection = meeting
        .reflections
        .get_mut(&req.reflection_id)
        .ok_or(DragError::ReflectionNotFound(req.reflection_id))?;
    let Some(active) = reflection
        .drag
        .as_mut()
        .filter(|d| d.drag_id == req.drag_id && d.client_id == client_id)
    else {
        return Ok(false);
    };
    active.x = req.client_x;
    active.y = req.client_y;
    active.target_id = req.target_id;
    active.target_offset_x = req.target_offset_x;
    active.target_offset_y = req.target_offset_y;
    Ok(true)
}

/// Finalize a drag: apply the move, clear ownership and mark the card dropping.
///
/// A `None` target type cancels without moving. A group that the move leaves
/// empty is pruned.
///
/// # Errors
///
/// Returns [`DragError::NotDragOwner`] when `drag_id` does not hold the card,
/// and [`DragError::GroupNotFound`] / [`DragError::MissingTargetGroup`] for a
/// bad group target.
pub fn finish(meeting: &mut MeetingState, client_id: Uuid, req: &EndDrag) -> Result<DropOutcome, DragError> {
    let reflection = meeting
        .reflections
        .get(&req.reflection_id)
        .ok_or(DragError::ReflectionNotFound(req.reflection_id))?;
    let owns = reflection
        .drag
        .as_ref()
        .is_some_and(|d| d.drag_id == req.drag_id && d.client_id == client_id);
    if !owns {
        return Err(DragError::NotDragOwner(req.reflection_id));
    }
    let from_group = reflection.group_id;
    let zone_id = reflection.zone_id.clone();

    let to_group = match req.target_type {
        None => from_group,
        Some(DropTargetType::ReflectionGroup) => {
            let target = req.target_group_id.ok_or(DragError::MissingTargetGroup)?;
            if !meeting.groups.contains_key(&target) {
                return Err(DragError::GroupNotFound(target));
            }
            target
        }
        Some(DropTargetType::ReflectionGrid) => meeting.create_group(&zone_id),
    };

    let sort_order = meeting.next_reflection_order(to_group);
    let to_zone = meeting
        .groups
        .get(&to_group)
        .map_or(zone_id, |g| g.zone_id.clone());
    let Some(reflection) = meeting.reflections.get_mut(&req.reflection_id) else {
        return Err(DragError::ReflectionNotFound(req.reflection_id));
    };
    reflection.drag = None;
    reflection.is_dropping = true;
    if to_group != from_group {
        reflection.group_id = to_group;
        reflection.zone_id = to_zone;
        reflection.sort_order = sort_order;
    }

    let emptied = to_group != from_group && meeting.group_members(from_group).next().is_none();
    let pruned_group = if emptied { meeting.groups.remove(&from_group).map(|g| g.id) } else { None };
    Ok(DropOutcome { from_group, to_group, pruned_group })
}

/// Drop every drag held by `client_id`. Returns the released card IDs.
pub fn release_client(meeting: &mut MeetingState, client_id: Uuid) -> Vec<Uuid> {
    meeting
        .reflections
        .values_mut()
        .filter(|r| r.drag.as_ref().is_some_and(|d| d.client_id == client_id))
        .map(|r| {
            r.drag = None;
            r.id
        })
        .collect()
}

/// The state of one reflection as seen by `viewer`.
#[must_use]
pub fn push_for(reflection: &Reflection, viewer: Uuid) -> DragStatePush {
    let is_viewer_dragging = reflection
        .drag
        .as_ref()
        .is_some_and(|d| d.client_id == viewer);
    let remote_drag = reflection
        .drag
        .as_ref()
        .filter(|d| d.client_id != viewer)
        .map(|d| RemoteDrag {
            drag_user_name: d.user_name.clone(),
            x: d.x,
            y: d.y,
            target_id: d.target_id,
            target_offset_x: d.target_offset_x,
            target_offset_y: d.target_offset_y,
        });
    DragStatePush {
        reflection_id: reflection.id,
        reflection_group_id: reflection.group_id,
        is_dropping: reflection.is_dropping,
        is_viewer_dragging,
        remote_drag,
    }
}

/// Send every client (but `exclude`) its own view of one reflection.
pub fn fan_out(meeting: &MeetingState, meeting_id: Uuid, reflection_id: Uuid, exclude: Option<Uuid>) {
    let Some(reflection) = meeting.reflections.get(&reflection_id) else {
        return;
    };
    for (viewer, client) in &meeting.clients {
        if exclude == Some(*viewer) {
            continue;
        }
        let frame = drag::request(drag::DRAG_STATE, &push_for(reflection, *viewer)).with_meeting_id(meeting_id);
        if let Err(e) = client.tx.try_send(frame) {
            debug!(client_id = %viewer, %reflection_id, error = %e, "dropped drag state push");
        }
    }
}

// =============================================================================
// SERVICE ENTRY POINTS
// =============================================================================

/// Claim a card and push the new ownership to every viewer, the claimer included.
///
/// # Errors
///
/// Returns [`DragError`] for an unknown meeting or card.
pub async fn start_drag(state: &AppState, meeting_id: Uuid, client_id: Uuid, req: &StartDrag) -> Result<(), DragError> {
    let mut meetings = state.meetings.write().await;
    let meeting = meetings
        .get_mut(&meeting_id)
        .ok_or(DragError::MeetingNotFound(meeting_id))?;
    if let Some(previous) = claim(meeting, client_id, req)? {
        info!(%meeting_id, reflection_id = %req.reflection_id, %previous, %client_id, "drag taken over");
    }
    fan_out(meeting, meeting_id, req.reflection_id, None);
    Ok(())
}

/// Record a location and push it to everyone but the dragger.
///
/// Returns `false` for a stale update, which is dropped silently.
///
/// # Errors
///
/// Returns [`DragError`] for an unknown meeting or card.
pub async fn update_location(
    state: &AppState,
    meeting_id: Uuid,
    client_id: Uuid,
    req: &UpdateDragLocation,
) -> Result<bool, DragError> {
    let mut meetings = state.meetings.write().await;
    let meeting = meetings
        .get_mut(&meeting_id)
        .ok_or(DragError::MeetingNotFound(meeting_id))?;
    let moved = relocate(meeting, client_id, req)?;
    if moved {
        fan_out(meeting, meeting_id, req.reflection_id, Some(client_id));
    } else {
        debug!(%meeting_id, reflection_id = %req.reflection_id, drag_id = %req.drag_id, "stale drag location ignored");
    }
    Ok(moved)
}

/// Finalize a drop and push the settled state to every viewer.
///
/// # Errors
///
/// Returns [`DragError`] for an unknown meeting or card, a non-owner, or a
/// bad group target.
pub async fn end_drag(
    state: &AppState,
    meeting_id: Uuid,
    client_id: Uuid,
    req: &EndDrag,
) -> Result<DropOutcome, DragError> {
    let mut meetings = state.meetings.write().await;
    let meeting = meetings
        .get_mut(&meeting_id)
        .ok_or(DragError::MeetingNotFound(meeting_id))?;
    let outcome = finish(meeting, client_id, req)?;
    info!(
        %meeting_id,
        reflection_id = %req.reflection_id,
        from = %outcome.from_group,
        to = %outcome.to_group,
        moved = outcome.moved(),
        pruned = outcome.pruned_group.is_some(),
        "drop finalized"
    );
    fan_out(meeting, meeting_id, req.reflection_id, None);
    Ok(outcome)
}

#[cfg(test)]
#[path = "drag_test.rs"]
mod tests;
