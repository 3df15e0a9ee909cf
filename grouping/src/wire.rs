//! Conversion between engine intents and wire frames.

#[cfg(test)]
#[path = "wire_test.rs"]
mod wire_test;

use frames::drag::{self, DragStatePush, EndDrag, MeetingSnapshot, StartDrag, UpdateDragLocation};
use frames::{CodecError, Frame, Status};
use uuid::Uuid;

use crate::cards::CardId;
use crate::engine::Mutation;

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("error frame for {syscall} carried no message")]
    MissingMessage { syscall: String },
}

impl Mutation {
    /// Build the request frame for this mutation.
    #[must_use]
    pub fn to_frame(&self, meeting_id: Uuid) -> Frame {
        let frame = match self {
            Self::StartDrag { card_id, drag_id } => {
                drag::request(drag::DRAG_START, &StartDrag { reflection_id: *card_id, drag_id: *drag_id })
            }
            Self::UpdateDragLocation(location) => drag::request(
                drag::DRAG_MOVE,
                &UpdateDragLocation {
                    reflection_id: location.card_id,
                    drag_id: location.drag_id,
                    client_x: location.client.x,
                    client_y: location.client.y,
                    target_id: location.target.target_id,
                    target_offset_x: location.target.offset.x,
                    target_offset_y: location.target.offset.y,
                },
            ),
            Self::FinalizeDrop { card_id, drag_id, resolution } => drag::request(
                drag::DROP,
                &EndDrag {
                    reflection_id: *card_id,
                    drag_id: *drag_id,
                    target_type: resolution.target_type,
                    target_group_id: resolution.target_group_id,
                },
            ),
        };
        frame.with_meeting_id(meeting_id)
    }
}

/// Server messages the engine reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    StatePush(DragStatePush),
    Snapshot(MeetingSnapshot),
    DropRejected { reflection_id: CardId, message: String },
}

impl Inbound {
    /// Decode a frame the engine cares about.
    ///
    /// Returns `Ok(None)` for frames addressed to other parts of the client.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] when a relevant frame has a malformed payload.
    pub fn from_frame(frame: &Frame) -> Result<Option<Self>, WireError> {
        match (frame.syscall.as_str(), frame.status) {
            (drag::DRAG_STATE, _) => Ok(Some(Self::StatePush(frame.payload()?))),
            (drag::MEETING_JOIN, Status::Done) => Ok(Some(Self::Snapshot(frame.payload()?))),
            (drag::DROP, Status::Error) => {
                let reflection_id = drag::error_reflection_id(frame)?;
                let message = frame
                    .data
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| WireError::MissingMessage { syscall: frame.syscall.clone() })?;
                Ok(Some(Self::DropRejected { reflection_id, message: message.to_owned() }))
            }
            _ => Ok(None),
        }
    }
}
