use super::*;
use crate::{decode_frame, encode_frame};

#[test]
fn drop_target_type_uses_screaming_snake_case() {
    assert_eq!(to_data(&DropTargetType::ReflectionGroup), Value::String("REFLECTION_GROUP".into()));
    assert_eq!(to_data(&DropTargetType::ReflectionGrid), Value::String("REFLECTION_GRID".into()));
}

#[test]
fn end_drag_without_target_decodes_as_cancel() {
    let reflection_id = Uuid::new_v4();
    let drag_id = Uuid::new_v4();
    let frame = Frame::request(
        DROP,
        serde_json::json!({ "reflection_id": reflection_id, "drag_id": drag_id }),
    );
    let end: EndDrag = frame.payload().expect("payload");
    assert_eq!(end.reflection_id, reflection_id);
    assert!(end.target_type.is_none());
    assert!(end.target_group_id.is_none());
}

#[test]
fn state_push_survives_protobuf_transport() {
    let push = DragStatePush {
        reflection_id: Uuid::new_v4(),
        reflection_group_id: Uuid::new_v4(),
        is_dropping: false,
        is_viewer_dragging: false,
        remote_drag: Some(RemoteDrag {
            drag_user_name: "Bob".into(),
            x: 120.0,
            y: 48.5,
            target_id: None,
            target_offset_x: 0.0,
            target_offset_y: 0.0,
        }),
    };
    let frame = request(DRAG_STATE, &push);
    let decoded = decode_frame(&encode_frame(&frame)).expect("decode");
    let restored: DragStatePush = decoded.payload().expect("payload");
    assert_eq!(restored, push);
}

#[test]
fn location_update_defaults_missing_target_fields() {
    let frame = Frame::request(
        DRAG_MOVE,
        serde_json::json!({
            "reflection_id": Uuid::new_v4(),
            "drag_id": Uuid::new_v4(),
            "client_x": 10.0,
            "client_y": 20.0,
        }),
    );
    let update: UpdateDragLocation = frame.payload().expect("payload");
    assert!(update.target_id.is_none());
    assert!(update.target_offset_x.abs() < f64::EPSILON);
}

#[test]
fn error_reflection_id_reads_attached_card() {
    let reflection_id = Uuid::new_v4();
    let frame = Frame::request(DROP, serde_json::json!({ "reflection_id": reflection_id, "code": "E_NOT_DRAG_OWNER" }));
    assert_eq!(error_reflection_id(&frame).expect("id"), reflection_id);
}

#[test]
fn error_reflection_id_rejects_missing_field() {
    let frame = Frame::request(DROP, serde_json::json!({ "code": "E_NOT_DRAG_OWNER" }));
    assert!(error_reflection_id(&frame).is_err());
}

#[test]
fn snapshot_defaults_to_empty() {
    let snapshot = MeetingSnapshot::default();
    assert!(snapshot.groups.is_empty());
    assert!(snapshot.reflections.is_empty());
}
