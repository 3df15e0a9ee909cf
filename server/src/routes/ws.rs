//! WebSocket handler: bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client frames → decode + dispatch by syscall prefix
//! - Frames pushed by meeting peers → forward to client
//!
//! Handler functions validate, call a service and return an `Outcome`. The
//! dispatch layer owns all outbound concerns: reply to sender and broadcast
//! to peers. Drag state pushes are the exception: the drag service fans out
//! a tailored push per viewer while it still holds the meeting lock.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `client_id`
//! 2. Client sends `meeting:join` → snapshot reply, `meeting:peer_joined` to peers
//! 3. Drag syscalls → service → Outcome (reply / broadcast / silent)
//! 4. Close → release held drags → `meeting:part` to peers

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use frames::drag::{self, CreateReflection, EndDrag, MeetingJoin, StartDrag, UpdateDragLocation};

use crate::frame::{Frame, FrameExt, Status};
use crate::services;
use crate::state::AppState;

const DEFAULT_USER_NAME: &str = "Anonymous";

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what; handlers never send frames directly.
enum Outcome {
    /// Broadcast done+data to ALL meeting clients including sender.
    /// Sender's copy carries `parent_id` for correlation.
    Broadcast(Value),
    /// Send done+data to sender only.
    Reply(Value),
    /// Send empty done to sender only.
    Done,
    /// No reply. Used for drag moves, which are superseded by the next one.
    Silent,
    /// Reply to sender, and push a differently named notice to peers.
    ReplyAndNotify { reply: Value, syscall: &'static str, notice: Value },
}

/// Per-socket identity and membership.
struct Connection {
    client_id: Uuid,
    user_name: String,
    meeting: Option<Uuid>,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_name = params
        .get("name")
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_USER_NAME)
        .to_owned();
    ws.on_upgrade(move |socket| run_ws(socket, state, user_name))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(socket: WebSocket, state: AppState, user_name: String) {
    let mut conn = Connection { client_id: Uuid::new_v4(), user_name, meeting: None };
    let (mut sink, mut stream) = socket.split();

    // Per-connection channel for pushes from meeting peers and the drag service.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.config.client_channel_capacity);

    let welcome = Frame::request("session:connected", json!({}))
        .with_data("client_id", conn.client_id.to_string())
        .with_data("name", conn.user_name.clone());
    if send_frame(&mut sink, &welcome).await.is_err() {
        return;
    }

    let client_id = conn.client_id;
    info!(%client_id, user_name = %conn.user_name, "ws: client connected");

    'conn: loop {
        tokio::select! {
            msg = stream.next() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Binary(bytes) => {
                        for frame in process_inbound_bytes(&state, &mut conn, &client_tx, &bytes).await {
                            if send_frame(&mut sink, &frame).await.is_err() {
                                break 'conn;
                            }
                        }
                    }
                    Message::Text(_) => {
                        warn!(%client_id, "ws: text frames are not supported");
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut sink, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(meeting_id) = conn.meeting.take() {
        leave(&state, &conn, meeting_id).await;
    }
    info!(%client_id, "ws: client disconnected");
}

/// Release the client's drags and tell peers it left.
async fn leave(state: &AppState, conn: &Connection, meeting_id: Uuid) {
    let released = services::meeting::part_meeting(state, meeting_id, conn.client_id).await;
    if !released.is_empty() {
        info!(client_id = %conn.client_id, %meeting_id, count = released.len(), "ws: released drags on part");
    }
    let notice = Frame::request(drag::MEETING_PART, json!({}))
        .with_meeting_id(meeting_id)
        .with_data("client_id", conn.client_id.to_string())
        .with_data("name", conn.user_name.clone())
        .stamped();
    services::meeting::broadcast(state, meeting_id, &notice, Some(conn.client_id)).await;
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode and process one inbound binary frame; return frames for the sender.
///
/// Kept apart from the socket so tests can drive dispatch end-to-end.
async fn process_inbound_bytes(
    state: &AppState,
    conn: &mut Connection,
    client_tx: &mpsc::Sender<Frame>,
    bytes: &[u8],
) -> Vec<Frame> {
    let req = match frames::decode_frame(bytes) {
        // Stamp the server-assigned client id as `from`.
        Ok(frame) => frame.with_from(conn.client_id.to_string()),
        Err(e) => {
            warn!(client_id = %conn.client_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway:error", json!({})).with_data("message", format!("invalid frame: {e}"));
            return vec![err.stamped()];
        }
    };

    if is_high_frequency(&req.syscall) {
        debug!(client_id = %conn.client_id, syscall = %req.syscall, "ws: recv frame");
    } else {
        info!(client_id = %conn.client_id, id = %req.id, syscall = %req.syscall, status = ?req.status, "ws: recv frame");
    }

    let result = match req.prefix() {
        "meeting" => handle_meeting(state, conn, client_tx, &req).await,
        "reflection" => handle_reflection(state, conn, &req).await,
        prefix => Err(req.error(format!("unknown prefix: {prefix}"))),
    };

    let meeting_id = conn.meeting;
    match result {
        Ok(Outcome::Broadcast(data)) => {
            let sender_frame = req.done_with(data);
            // Peers get a copy without parent_id (they didn't originate the request).
            let mut peer_frame = sender_frame.clone();
            peer_frame.id = Uuid::new_v4().to_string();
            peer_frame.parent_id = None;
            if let Some(mid) = meeting_id {
                services::meeting::broadcast(state, mid, &peer_frame, Some(conn.client_id)).await;
            }
            vec![sender_frame]
        }
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Done) => vec![req.done()],
        Ok(Outcome::Silent) => vec![],
        Ok(Outcome::ReplyAndNotify { reply, syscall, notice }) => {
            let sender_frame = req.done_with(reply);
            if let Some(mid) = meeting_id {
                let notice = Frame::request(syscall, notice).with_meeting_id(mid).stamped();
                services::meeting::broadcast(state, mid, &notice, Some(conn.client_id)).await;
            }
            vec![sender_frame]
        }
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// MEETING HANDLERS
// =============================================================================

async fn handle_meeting(
    state: &AppState,
    conn: &mut Connection,
    client_tx: &mpsc::Sender<Frame>,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let op = req.syscall.split_once(':').map_or("", |(_, op)| op);

    match op {
        "join" => {
            let join: MeetingJoin = req.payload().map_err(|e| req.error_from(&e))?;
            if !join.name.trim().is_empty() {
                conn.user_name = join.name.trim().to_owned();
            }

            // Part current meeting if already joined.
            if let Some(old) = conn.meeting.take() {
                leave(state, conn, old).await;
            }

            let snapshot = services::meeting::join_meeting(
                state,
                join.meeting_id,
                conn.client_id,
                &conn.user_name,
                client_tx.clone(),
            )
            .await;
            conn.meeting = Some(join.meeting_id);

            let notice = json!({ "client_id": conn.client_id, "name": conn.user_name });
            Ok(Outcome::ReplyAndNotify {
                reply: drag::to_data(&snapshot),
                syscall: drag::MEETING_PEER_JOINED,
                notice,
            })
        }
        "part" => {
            let Some(meeting_id) = conn.meeting.take() else {
                return Err(req.error("not in a meeting"));
            };
            leave(state, conn, meeting_id).await;
            Ok(Outcome::Done)
        }
        _ => Err(req.error(format!("unknown meeting op: {op}"))),
    }
}

// =============================================================================
// REFLECTION HANDLERS
// =============================================================================

async fn handle_reflection(state: &AppState, conn: &Connection, req: &Frame) -> Result<Outcome, Frame> {
    let Some(meeting_id) = conn.meeting else {
        return Err(req.error("must join a meeting first"));
    };
    let client_id = conn.client_id;

    match req.syscall.as_str() {
        drag::REFLECTION_CREATE => {
            let create: CreateReflection = req.payload().map_err(|e| req.error_from(&e))?;
            match services::meeting::create_reflection(state, meeting_id, &create).await {
                Ok(reflection) => Ok(Outcome::Broadcast(drag::to_data(&reflection))),
                Err(e) => Err(req.error_from(&e)),
            }
        }
        drag::DRAG_START => {
            let start: StartDrag = req.payload().map_err(|e| req.error_from(&e))?;
            match services::drag::start_drag(state, meeting_id, client_id, &start).await {
                Ok(()) => Ok(Outcome::Done),
                Err(e) => Err(req.error_from(&e).with_data("reflection_id", start.reflection_id.to_string())),
            }
        }
        drag::DRAG_MOVE => {
            let update: UpdateDragLocation = req.payload().map_err(|e| req.error_from(&e))?;
            match services::drag::update_location(state, meeting_id, client_id, &update).await {
                Ok(_) => Ok(Outcome::Silent),
                Err(e) => Err(req.error_from(&e).with_data("reflection_id", update.reflection_id.to_string())),
            }
        }
        drag::DROP => {
            let end: EndDrag = req.payload().map_err(|e| req.error_from(&e))?;
            match services::drag::end_drag(state, meeting_id, client_id, &end).await {
                Ok(outcome) => Ok(Outcome::Reply(json!({
                    "reflection_id": end.reflection_id,
                    "reflection_group_id": outcome.to_group,
                    "pruned_group_id": outcome.pruned_group,
                }))),
                // Clients roll back the optimistic drop keyed by this id.
                Err(e) => Err(req.error_from(&e).with_data("reflection_id", end.reflection_id.to_string())),
            }
        }
        other => Err(req.error(format!("unknown reflection op: {other}"))),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Drag moves and their pushes arrive once per animation frame per dragger.
fn is_high_frequency(syscall: &str) -> bool {
    syscall == drag::DRAG_MOVE || syscall == drag::DRAG_STATE
}

async fn send_frame<S>(sink: &mut S, frame: &Frame) -> Result<(), S::Error>
where
    S: futures::Sink<Message> + Unpin,
{
    if frame.status == Status::Error {
        let code = frame.data_str("code").unwrap_or("-");
        let message = frame.data_str("message").unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else if is_high_frequency(&frame.syscall) {
        debug!(syscall = %frame.syscall, "ws: send frame");
    } else {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }
    sink.send(Message::Binary(frames::encode_frame(frame).into())).await
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
