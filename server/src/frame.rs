//! Server-side helpers over the shared [`frames::Frame`].
//!
//! ARCHITECTURE
//! ============
//! Every message on the meeting socket is a `frames::Frame`. Clients send
//! request frames, the server dispatches by syscall prefix, and responses
//! flow back as done/error frames correlated through `parent_id`. Server
//! pushes (`reflection:drag_state`, `meeting:peer_joined`) are plain request
//! frames with no parent.
//!
//! DESIGN
//! ======
//! - Flat data: payload is always a JSON object, never nested deeper than
//!   the typed payloads in `frames::drag`.
//! - Error frames carry `code`, `message` and `retryable` so clients can
//!   branch on a grepable code instead of parsing text.

use std::time::{SystemTime, UNIX_EPOCH};

pub use frames::{Frame, Status};
use serde_json::{Map, Value};

// =============================================================================
// FIELD CONSTANTS
// =============================================================================

/// Frame data key for error messages.
pub const FRAME_MESSAGE: &str = "message";

/// Frame data key for grepable error codes.
pub const FRAME_CODE: &str = "code";

/// Frame data key for the retryable flag on error frames.
pub const FRAME_RETRYABLE: &str = "retryable";

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error frames.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

impl ErrorCode for frames::CodecError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Decode(_) | Self::InvalidStatus(_) => "E_BAD_FRAME",
            Self::Payload { .. } => "E_BAD_PAYLOAD",
        }
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

/// Reply and builder helpers the dispatch layer uses on shared frames.
pub trait FrameExt: Sized {
    /// Create a done response carrying `data`. Terminal.
    #[must_use]
    fn done_with(&self, data: Value) -> Frame;

    /// Create an empty done response. Terminal.
    #[must_use]
    fn done(&self) -> Frame {
        self.done_with(Value::Object(Map::new()))
    }

    /// Create an error response from a plain string. Terminal.
    #[must_use]
    fn error(&self, message: impl Into<String>) -> Frame;

    /// Create a structured error response from a typed error. Terminal.
    #[must_use]
    fn error_from(&self, err: &(impl ErrorCode + ?Sized)) -> Frame;

    /// Insert one key into the data object, replacing a non-object payload.
    #[must_use]
    fn with_data(self, key: impl Into<String>, value: impl Into<Value>) -> Self;

    #[must_use]
    fn with_from(self, from: impl Into<String>) -> Self;

    /// Stamp `ts` with the current wall clock.
    #[must_use]
    fn stamped(self) -> Self;

    /// Read a string field from the data object.
    fn data_str(&self, key: &str) -> Option<&str>;
}

impl FrameExt for Frame {
    fn done_with(&self, data: Value) -> Frame {
        reply(self, Status::Done, data)
    }

    fn error(&self, message: impl Into<String>) -> Frame {
        let mut data = Map::new();
        data.insert(FRAME_MESSAGE.into(), Value::String(message.into()));
        reply(self, Status::Error, Value::Object(data))
    }

    fn error_from(&self, err: &(impl ErrorCode + ?Sized)) -> Frame {
        let mut data = Map::new();
        data.insert(FRAME_CODE.into(), Value::String(err.error_code().to_string()));
        data.insert(FRAME_MESSAGE.into(), Value::String(err.to_string()));
        data.insert(FRAME_RETRYABLE.into(), Value::Bool(err.retryable()));
        reply(self, Status::Error, Value::Object(data))
    }

    fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if !self.data.is_object() {
            self.data = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.data {
            map.insert(key.into(), value.into());
        }
        self
    }

    fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    fn stamped(mut self) -> Self {
        self.ts = now_ms();
        self
    }

    fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Build a reply frame. Inherits `parent_id`, `meeting_id`, and `syscall`.
fn reply(request: &Frame, status: Status, data: Value) -> Frame {
    Frame {
        id: uuid::Uuid::new_v4().to_string(),
        parent_id: Some(request.id.clone()),
        ts: now_ms(),
        meeting_id: request.meeting_id.clone(),
        from: None,
        syscall: request.syscall.clone(),
        status,
        data,
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
