use frames::drag::{DRAG_STATE, DragStatePush, StartDrag};
use serde_json::json;

use super::*;
use crate::frame::FrameExt;
use crate::state::test_helpers::*;

fn create(zone_id: &str, group_id: Option<Uuid>) -> CreateReflection {
    CreateReflection { zone_id: zone_id.into(), group_id, content: "Standups ran long".into() }
}

#[tokio::test]
async fn join_creates_meeting_and_returns_snapshot() {
    let state = test_app_state();
    let meeting_id = Uuid::new_v4();
    let (tx, _rx) = mpsc::channel(8);

    let snapshot = join_meeting(&state, meeting_id, Uuid::new_v4(), "Ada", tx).await;
    assert!(snapshot.groups.is_empty());

    let meetings = state.meetings.read().await;
    assert_eq!(meetings[&meeting_id].clients.len(), 1);
}

#[tokio::test]
async fn create_without_group_forms_one() {
    let state = test_app_state();
    let meeting_id = seed_meeting(&state).await;

    let first = create_reflection(&state, meeting_id, &create("start", None)).await.unwrap();
    let second = create_reflection(&state, meeting_id, &create("start", Some(first.group_id)))
        .await
        .unwrap();

    assert_eq!(first.group_id, second.group_id);
    assert!(second.sort_order > first.sort_order);
    assert_eq!(second.content, "Standups ran long");
}

#[tokio::test]
async fn joined_group_wins_over_requested_zone() {
    let state = test_app_state();
    let meeting_id = seed_meeting(&state).await;
    let (_, group) = seed_reflection(&state, meeting_id, "stop").await;

    let card = create_reflection(&state, meeting_id, &create("start", Some(group))).await.unwrap();
    assert_eq!(card.zone_id, "stop");
}

#[tokio::test]
async fn create_errors_carry_codes() {
    let state = test_app_state();
    let meeting_id = seed_meeting(&state).await;

    let err = create_reflection(&state, Uuid::new_v4(), &create("start", None)).await.unwrap_err();
    assert_eq!(err.error_code(), "E_MEETING_NOT_FOUND");
    let err = create_reflection(&state, meeting_id, &create("", None)).await.unwrap_err();
    assert_eq!(err.error_code(), "E_ZONE_REQUIRED");
    let err = create_reflection(&state, meeting_id, &create("start", Some(Uuid::new_v4())))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "E_GROUP_NOT_FOUND");
}

#[tokio::test]
async fn part_releases_held_drags_and_tells_peers() {
    let state = test_app_state();
    let meeting_id = seed_meeting(&state).await;
    let (card, _) = seed_reflection(&state, meeting_id, "start").await;
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let _alice_rx = attach_client(&state, meeting_id, alice, "Alice").await;
    let mut bob_rx = attach_client(&state, meeting_id, bob, "Bob").await;

    drag::start_drag(&state, meeting_id, alice, &StartDrag { reflection_id: card, drag_id: Uuid::new_v4() })
        .await
        .unwrap();
    let held: DragStatePush = bob_rx.recv().await.unwrap().payload().unwrap();
    assert!(held.remote_drag.is_some());

    assert_eq!(part_meeting(&state, meeting_id, alice).await, vec![card]);

    let frame = bob_rx.recv().await.unwrap();
    assert_eq!(frame.syscall, DRAG_STATE);
    let released: DragStatePush = frame.payload().unwrap();
    assert!(released.remote_drag.is_none());
    assert!(!released.is_dropping);
}

#[tokio::test]
async fn meeting_with_cards_survives_last_part() {
    let state = test_app_state();
    let meeting_id = seed_meeting(&state).await;
    seed_reflection(&state, meeting_id, "start").await;
    let client = Uuid::new_v4();
    let _rx = attach_client(&state, meeting_id, client, "Ada").await;

    part_meeting(&state, meeting_id, client).await;
    assert!(state.meetings.read().await.contains_key(&meeting_id));
}

#[tokio::test]
async fn empty_meeting_is_evicted_on_last_part() {
    let state = test_app_state();
    let meeting_id = seed_meeting(&state).await;
    let client = Uuid::new_v4();
    let _rx = attach_client(&state, meeting_id, client, "Ada").await;

    part_meeting(&state, meeting_id, client).await;
    assert!(!state.meetings.read().await.contains_key(&meeting_id));
}

#[tokio::test]
async fn broadcast_skips_excluded_client() {
    let state = test_app_state();
    let meeting_id = seed_meeting(&state).await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let mut a_rx = attach_client(&state, meeting_id, a, "A").await;
    let mut b_rx = attach_client(&state, meeting_id, b, "B").await;

    let frame = Frame::request("meeting:peer_joined", json!({})).with_data("name", "C");
    broadcast(&state, meeting_id, &frame, Some(a)).await;

    assert_eq!(b_rx.recv().await.unwrap().data_str("name"), Some("C"));
    assert!(a_rx.try_recv().is_err());
}
