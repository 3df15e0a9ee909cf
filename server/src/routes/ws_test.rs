use frames::drag::{DragStatePush, DropTargetType, MeetingSnapshot, ReflectionSnapshot};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::*;
use crate::state::test_helpers;

// =============================================================================
// HELPERS
// =============================================================================

struct Peer {
    conn: Connection,
    tx: mpsc::Sender<Frame>,
    rx: mpsc::Receiver<Frame>,
}

fn peer(name: &str) -> Peer {
    let (tx, rx) = mpsc::channel(64);
    Peer { conn: Connection { client_id: Uuid::new_v4(), user_name: name.into(), meeting: None }, tx, rx }
}

fn request_bytes(syscall: &str, data: Value) -> Vec<u8> {
    frames::encode_frame(&Frame::request(syscall, data))
}

async fn send(state: &AppState, peer: &mut Peer, syscall: &str, data: Value) -> Vec<Frame> {
    process_inbound_bytes(state, &mut peer.conn, &peer.tx, &request_bytes(syscall, data)).await
}

async fn recv_push(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("push receive timed out")
        .expect("push channel closed unexpectedly")
}

async fn assert_no_push(rx: &mut mpsc::Receiver<Frame>) {
    assert!(timeout(Duration::from_millis(80), rx.recv()).await.is_err(), "expected no push");
}

fn single(mut frames: Vec<Frame>) -> Frame {
    assert_eq!(frames.len(), 1, "expected exactly one reply");
    frames.remove(0)
}

async fn join(state: &AppState, peer: &mut Peer, meeting_id: Uuid) -> MeetingSnapshot {
    let name = peer.conn.user_name.clone();
    let reply = single(send(state, peer, drag::MEETING_JOIN, json!({ "meeting_id": meeting_id, "name": name })).await);
    assert_eq!(reply.status, Status::Done);
    reply.payload().expect("snapshot payload")
}

async fn create(state: &AppState, peer: &mut Peer, zone: &str) -> ReflectionSnapshot {
    let reply = single(send(state, peer, drag::REFLECTION_CREATE, json!({ "zone_id": zone })).await);
    assert_eq!(reply.status, Status::Done);
    reply.payload().expect("reflection payload")
}

fn drain(rx: &mut mpsc::Receiver<Frame>) {
    while rx.try_recv().is_ok() {}
}

// =============================================================================
// DISPATCH
// =============================================================================

#[tokio::test]
async fn invalid_bytes_yield_gateway_error() {
    let state = test_helpers::test_app_state();
    let mut alice = peer("Alice");
    let replies = process_inbound_bytes(&state, &mut alice.conn, &alice.tx, &[0xff, 0xff, 0xff]).await;
    let reply = single(replies);
    assert_eq!(reply.syscall, "gateway:error");
    assert!(reply.data_str("message").is_some_and(|m| m.starts_with("invalid frame")));
}

#[tokio::test]
async fn unknown_prefix_is_an_error() {
    let state = test_helpers::test_app_state();
    let mut alice = peer("Alice");
    let reply = single(send(&state, &mut alice, "board:list", json!({})).await);
    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.data_str("message"), Some("unknown prefix: board"));
}

#[tokio::test]
async fn reflection_ops_require_a_meeting() {
    let state = test_helpers::test_app_state();
    let mut alice = peer("Alice");
    let reply = single(send(&state, &mut alice, drag::REFLECTION_CREATE, json!({ "zone_id": "start" })).await);
    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.data_str("message"), Some("must join a meeting first"));
}

#[tokio::test]
async fn join_replies_with_snapshot_and_notifies_peers() {
    let state = test_helpers::test_app_state();
    let meeting_id = Uuid::new_v4();
    let mut alice = peer("Alice");
    let mut bob = peer("Bob");

    join(&state, &mut alice, meeting_id).await;
    create(&state, &mut alice, "start").await;
    let snapshot = join(&state, &mut bob, meeting_id).await;
    assert_eq!(snapshot.reflections.len(), 1);
    assert_eq!(snapshot.groups.len(), 1);

    // Alice saw her own create broadcast only as a reply; Bob's join is a notice.
    let notice = recv_push(&mut alice.rx).await;
    assert_eq!(notice.syscall, drag::MEETING_PEER_JOINED);
    assert_eq!(notice.data_str("name"), Some("Bob"));
    assert_eq!(notice.meeting_id, Some(meeting_id.to_string()));
}

#[tokio::test]
async fn bad_payload_reports_code() {
    let state = test_helpers::test_app_state();
    let mut alice = peer("Alice");
    let reply = single(send(&state, &mut alice, drag::MEETING_JOIN, json!({ "meeting_id": "nope" })).await);
    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.data_str("code"), Some("E_BAD_PAYLOAD"));
}

#[tokio::test]
async fn create_is_broadcast_to_peers_without_parent() {
    let state = test_helpers::test_app_state();
    let meeting_id = Uuid::new_v4();
    let mut alice = peer("Alice");
    let mut bob = peer("Bob");
    join(&state, &mut alice, meeting_id).await;
    join(&state, &mut bob, meeting_id).await;
    drain(&mut alice.rx);

    let card = create(&state, &mut bob, "start").await;
    let copy = recv_push(&mut alice.rx).await;
    assert_eq!(copy.syscall, drag::REFLECTION_CREATE);
    assert!(copy.parent_id.is_none());
    assert_eq!(copy.payload::<ReflectionSnapshot>().expect("payload"), card);
}

// =============================================================================
// DRAG PROTOCOL
// =============================================================================

#[tokio::test]
async fn drag_round_trip_reaches_peer() {
    let state = test_helpers::test_app_state();
    let meeting_id = Uuid::new_v4();
    let mut alice = peer("Alice");
    let mut bob = peer("Bob");
    join(&state, &mut alice, meeting_id).await;
    join(&state, &mut bob, meeting_id).await;
    let card = create(&state, &mut alice, "start").await;
    let target = create(&state, &mut alice, "start").await;
    drain(&mut alice.rx);
    drain(&mut bob.rx);

    let drag_id = Uuid::new_v4();
    let start = single(send(&state, &mut alice, drag::DRAG_START, json!({ "reflection_id": card.id, "drag_id": drag_id })).await);
    assert_eq!(start.status, Status::Done);
    let own: DragStatePush = recv_push(&mut alice.rx).await.payload().unwrap();
    assert!(own.is_viewer_dragging);
    let seen: DragStatePush = recv_push(&mut bob.rx).await.payload().unwrap();
    assert_eq!(seen.remote_drag.map(|d| d.drag_user_name).as_deref(), Some("Alice"));

    let moved = send(
        &state,
        &mut alice,
        drag::DRAG_MOVE,
        json!({ "reflection_id": card.id, "drag_id": drag_id, "client_x": 40.0, "client_y": 60.0 }),
    )
    .await;
    assert!(moved.is_empty(), "moves are not acknowledged");
    let seen: DragStatePush = recv_push(&mut bob.rx).await.payload().unwrap();
    assert_eq!(seen.remote_drag.map(|d| (d.x, d.y)), Some((40.0, 60.0)));
    assert_no_push(&mut alice.rx).await;

    let dropped = single(
        send(
            &state,
            &mut alice,
            drag::DROP,
            json!({
                "reflection_id": card.id,
                "drag_id": drag_id,
                "target_type": DropTargetType::ReflectionGroup,
                "target_group_id": target.group_id,
            }),
        )
        .await,
    );
    assert_eq!(dropped.status, Status::Done);
    assert_eq!(dropped.data["pruned_group_id"], json!(card.group_id));
    let settled: DragStatePush = recv_push(&mut bob.rx).await.payload().unwrap();
    assert!(settled.is_dropping);
    assert_eq!(settled.reflection_group_id, target.group_id);
}

#[tokio::test]
async fn stolen_drop_is_rejected_with_reflection_id() {
    let state = test_helpers::test_app_state();
    let meeting_id = Uuid::new_v4();
    let mut alice = peer("Alice");
    let mut bob = peer("Bob");
    join(&state, &mut alice, meeting_id).await;
    join(&state, &mut bob, meeting_id).await;
    let card = create(&state, &mut alice, "start").await;

    let alice_drag = Uuid::new_v4();
    send(&state, &mut alice, drag::DRAG_START, json!({ "reflection_id": card.id, "drag_id": alice_drag })).await;
    send(&state, &mut bob, drag::DRAG_START, json!({ "reflection_id": card.id, "drag_id": Uuid::new_v4() })).await;

    let reply = single(
        send(&state, &mut alice, drag::DROP, json!({ "reflection_id": card.id, "drag_id": alice_drag })).await,
    );
    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.data_str("code"), Some("E_NOT_DRAG_OWNER"));
    assert_eq!(drag::error_reflection_id(&reply).expect("reflection id"), card.id);
}

#[tokio::test]
async fn part_releases_drag_and_notifies() {
    let state = test_helpers::test_app_state();
    let meeting_id = Uuid::new_v4();
    let mut alice = peer("Alice");
    let mut bob = peer("Bob");
    join(&state, &mut alice, meeting_id).await;
    join(&state, &mut bob, meeting_id).await;
    let card = create(&state, &mut alice, "start").await;
    send(&state, &mut alice, drag::DRAG_START, json!({ "reflection_id": card.id, "drag_id": Uuid::new_v4() })).await;
    drain(&mut bob.rx);

    let reply = single(send(&state, &mut alice, drag::MEETING_PART, json!({})).await);
    assert_eq!(reply.status, Status::Done);
    assert!(alice.conn.meeting.is_none());

    let released: DragStatePush = recv_push(&mut bob.rx).await.payload().unwrap();
    assert!(released.remote_drag.is_none());
    let part = recv_push(&mut bob.rx).await;
    assert_eq!(part.syscall, drag::MEETING_PART);
    assert_eq!(part.data_str("name"), Some("Alice"));
}

// =============================================================================
// LIVE SOCKET
// =============================================================================

async fn next_frame<S>(socket: &mut S) -> Frame
where
    S: futures::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("socket receive timed out")
            .expect("socket closed")
            .expect("socket error");
        if let WsMessage::Binary(bytes) = msg {
            return frames::decode_frame(&bytes).expect("decode");
        }
    }
}

#[tokio::test]
async fn live_socket_joins_and_receives_pushes() {
    let state = test_helpers::test_app_state();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, crate::routes::app(state)).await.unwrap();
    });

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/ws?name=Ada"))
        .await
        .expect("connect");

    let welcome = next_frame(&mut socket).await;
    assert_eq!(welcome.syscall, "session:connected");
    assert_eq!(welcome.data_str("name"), Some("Ada"));

    let meeting_id = Uuid::new_v4();
    let join = Frame::request(drag::MEETING_JOIN, json!({ "meeting_id": meeting_id, "name": "Ada" }));
    socket
        .send(WsMessage::Binary(frames::encode_frame(&join).into()))
        .await
        .unwrap();
    let reply = next_frame(&mut socket).await;
    assert_eq!(reply.parent_id.as_deref(), Some(join.id.as_str()));
    assert_eq!(reply.payload::<MeetingSnapshot>().unwrap(), MeetingSnapshot::default());

    let create = Frame::request(drag::REFLECTION_CREATE, json!({ "zone_id": "start" }));
    socket
        .send(WsMessage::Binary(frames::encode_frame(&create).into()))
        .await
        .unwrap();
    let card: ReflectionSnapshot = next_frame(&mut socket).await.payload().unwrap();

    let start = Frame::request(drag::DRAG_START, json!({ "reflection_id": card.id, "drag_id": Uuid::new_v4() }));
    socket
        .send(WsMessage::Binary(frames::encode_frame(&start).into()))
        .await
        .unwrap();
    let mut saw_done = false;
    let mut saw_push = false;
    for _ in 0..2 {
        let frame = next_frame(&mut socket).await;
        match frame.syscall.as_str() {
            drag::DRAG_STATE => {
                saw_push = frame.payload::<DragStatePush>().unwrap().is_viewer_dragging;
            }
            drag::DRAG_START => saw_done = frame.status == Status::Done,
            other => panic!("unexpected frame {other}"),
        }
    }
    assert!(saw_done && saw_push);

    server.abort();
}
