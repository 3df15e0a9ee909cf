use serde_json::json;
use uuid::Uuid;

use super::*;

#[test]
fn reply_inherits_context() {
    let meeting_id = Uuid::new_v4();
    let req = Frame::request("reflection:drag_start", json!({})).with_meeting_id(meeting_id);
    let done = req.done_with(json!({ "ok": true }));

    assert_eq!(done.parent_id.as_deref(), Some(req.id.as_str()));
    assert_eq!(done.meeting_id, Some(meeting_id.to_string()));
    assert_eq!(done.syscall, "reflection:drag_start");
    assert_eq!(done.status, Status::Done);
    assert_ne!(done.id, req.id);
    assert!(done.ts > 0);
}

#[test]
fn empty_done_has_object_data() {
    let req = Frame::request("meeting:join", json!({}));
    let done = req.done();
    assert_eq!(done.data, json!({}));
}

#[test]
fn plain_error_carries_message() {
    let req = Frame::request("reflection:drop", json!({}));
    let err = req.error("reflection_id required");
    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data_str(FRAME_MESSAGE), Some("reflection_id required"));
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("not found")]
    struct NotFound;

    impl ErrorCode for NotFound {
        fn error_code(&self) -> &'static str {
            "E_NOT_FOUND"
        }
    }

    let req = Frame::request("reflection:drop", json!({}));
    let err = req.error_from(&NotFound);

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data_str("code"), Some("E_NOT_FOUND"));
    assert_eq!(err.data_str("message"), Some("not found"));
    assert_eq!(err.data.get("retryable").and_then(serde_json::Value::as_bool), Some(false));
}

#[test]
fn with_data_replaces_non_object_payload() {
    let frame = Frame::request("meeting:part", serde_json::Value::Null).with_data("name", "Ada");
    assert_eq!(frame.data, json!({ "name": "Ada" }));
}

#[test]
fn with_from_and_stamp() {
    let frame = Frame::request("meeting:join", json!({})).with_from("client-1").stamped();
    assert_eq!(frame.from.as_deref(), Some("client-1"));
    assert!(frame.ts > 0);
}

#[test]
fn codec_errors_map_to_codes() {
    let req = Frame::request("reflection:drop", json!({ "reflection_id": 7 }));
    let err = req.payload::<frames::drag::EndDrag>().unwrap_err();
    assert_eq!(err.error_code(), "E_BAD_PAYLOAD");
    assert_eq!(frames::CodecError::InvalidStatus(42).error_code(), "E_BAD_FRAME");
}
