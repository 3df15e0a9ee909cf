//! Typed payloads and syscall names for the reflection drag protocol.
//!
//! Clients send `reflection:drag_start`, `reflection:drag_move` and
//! `reflection:drop` requests. The server answers with per-viewer
//! `reflection:drag_state` pushes, each of which is the latest known truth
//! for one card rather than a delta.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{CodecError, Frame};

#[cfg(test)]
#[path = "drag_test.rs"]
mod tests;

// =============================================================================
// SYSCALLS
// =============================================================================

/// Join a meeting and receive its reflection snapshot.
pub const MEETING_JOIN: &str = "meeting:join";
/// Server push: a participant joined.
pub const MEETING_PEER_JOINED: &str = "meeting:peer_joined";
/// Server push: a participant left.
pub const MEETING_PART: &str = "meeting:part";
/// Seed a reflection card into a meeting.
pub const REFLECTION_CREATE: &str = "reflection:create";
/// Claim a card for dragging.
pub const DRAG_START: &str = "reflection:drag_start";
/// Report the dragged card's position (throttled to one per frame).
pub const DRAG_MOVE: &str = "reflection:drag_move";
/// Finalize a drag with the resolved drop target.
pub const DROP: &str = "reflection:drop";
/// Server push: authoritative drag state of one card for one viewer.
pub const DRAG_STATE: &str = "reflection:drag_state";

// =============================================================================
// PAYLOADS
// =============================================================================

/// Where a dropped card should land.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DropTargetType {
    /// Merge into an existing group.
    ReflectionGroup,
    /// Drop onto open grid space, forming a new single-card group.
    ReflectionGrid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeetingJoin {
    pub meeting_id: Uuid,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateReflection {
    /// Column the card is created in.
    pub zone_id: String,
    /// Existing group to join; a new group is formed when absent.
    #[serde(default)]
    pub group_id: Option<Uuid>,
    #[serde(default)]
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StartDrag {
    pub reflection_id: Uuid,
    pub drag_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateDragLocation {
    pub reflection_id: Uuid,
    pub drag_id: Uuid,
    /// Card top-left in the dragger's viewport.
    pub client_x: f64,
    pub client_y: f64,
    /// Group the card is currently nearest to, if any.
    #[serde(default)]
    pub target_id: Option<Uuid>,
    /// Card top-left relative to the target's top-left.
    #[serde(default)]
    pub target_offset_x: f64,
    #[serde(default)]
    pub target_offset_y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EndDrag {
    pub reflection_id: Uuid,
    pub drag_id: Uuid,
    /// `None` cancels the drag without moving the card.
    #[serde(default)]
    pub target_type: Option<DropTargetType>,
    #[serde(default)]
    pub target_group_id: Option<Uuid>,
}

/// Another participant's drag as seen by the viewer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteDrag {
    pub drag_user_name: String,
    pub x: f64,
    pub y: f64,
    /// Lets viewers with a different layout re-project the position.
    #[serde(default)]
    pub target_id: Option<Uuid>,
    #[serde(default)]
    pub target_offset_x: f64,
    #[serde(default)]
    pub target_offset_y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DragStatePush {
    pub reflection_id: Uuid,
    pub reflection_group_id: Uuid,
    pub is_dropping: bool,
    pub is_viewer_dragging: bool,
    #[serde(default)]
    pub remote_drag: Option<RemoteDrag>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReflectionSnapshot {
    pub id: Uuid,
    pub group_id: Uuid,
    pub zone_id: String,
    pub content: String,
    pub sort_order: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub id: Uuid,
    pub zone_id: String,
    pub sort_order: f64,
}

/// Reply to [`MEETING_JOIN`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeetingSnapshot {
    pub groups: Vec<GroupSnapshot>,
    pub reflections: Vec<ReflectionSnapshot>,
}

// =============================================================================
// HELPERS
// =============================================================================

/// Serialize a payload into frame data.
///
/// Payload types here contain only maps, strings, floats and booleans, so
/// serialization cannot fail; a failure degrades to `null`.
#[must_use]
pub fn to_data<T: Serialize>(payload: &T) -> Value {
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

/// Build a request frame carrying a typed payload.
pub fn request<T: Serialize>(syscall: &str, payload: &T) -> Frame {
    Frame::request(syscall, to_data(payload))
}

/// Read the `reflection_id` attached to error replies for drag syscalls.
///
/// # Errors
///
/// Returns [`CodecError::Payload`] when the field is missing or malformed.
pub fn error_reflection_id(frame: &Frame) -> Result<Uuid, CodecError> {
    #[derive(Deserialize)]
    struct Target {
        reflection_id: Uuid,
    }
    frame.payload::<Target>().map(|t| t.reflection_id)
}
