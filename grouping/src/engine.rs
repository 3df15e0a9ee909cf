//! The drag reducer: every event in, explicit intents out.
//!
//! DESIGN
//! ======
//! The engine is the only place drag state changes. Components are pure
//! helpers that receive snapshots ([`SessionSnapshot`], card records,
//! measured geometry) and answer questions; the engine applies their
//! answers and returns a `Vec<Action>` for the host to carry out. The host
//! owns everything effectful: listeners, timers, animation frames, the
//! network and the portal DOM.
//!
//! LIFECYCLE
//! =========
//! ```text
//! pointer down ──▶ Idle ──move past threshold──▶ Dragging ──pointer up──▶ Resolving
//!                   │                              │                        │
//!                   └─scroll intent / lost──▶ ✕    └─stolen──▶ ✕            │ push is_dropping
//!                                                                           ▼
//!                                               DropSettle timer ◀── settle countdown
//!                                                      │
//!                                                      ▼
//!                                                   Settled
//! ```
//!
//! Timers carry a generation number. A callback whose timer is no longer
//! the current one for its card is ignored, so a host that forgets a
//! `CancelTimer` cannot corrupt a newer session.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::HashMap;

use frames::drag::{DragStatePush, MeetingSnapshot};

use crate::animation::AnimationPhase;
use crate::arbiter::{Notification, Verdict, arbitrate};
use crate::cards::{CardId, CardStore, GroupId, Reflection};
use crate::config::DragConfig;
use crate::finalize::{DropOrigin, DropResolution, PendingDrop, resolve_drop, settle_duration};
use crate::geom::{GeometryProvider, Rect};
use crate::placeholder::{GroupAnimation, on_landing, on_pickup};
use crate::remote::{GhostStyle, GhostView, RemoteGhost, SettleClock, portal_key};
use crate::session::{
    CaptureScope, DragId, DragLocation, DragPhase, DragSession, Movement, PointerKind, PointerSample,
    SessionSnapshot, swipe_direction,
};
use crate::wire::Inbound;

// =============================================================================
// INTENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Touch has rested long enough to count as drag intent.
    Longpress,
    /// A dropped card has finished gliding into place.
    DropSettle,
    /// A freshly expanded group may drop its inline height.
    PlaceholderReset,
}

/// A host timer. Deliver it back to [`DragEngine::on_timer`] unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timer {
    pub kind: TimerKind,
    pub card_id: CardId,
    pub generation: u64,
}

/// Requests for the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    StartDrag { card_id: CardId, drag_id: DragId },
    UpdateDragLocation(DragLocation),
    FinalizeDrop { card_id: CardId, drag_id: DragId, resolution: DropResolution },
}

/// Actions returned from event handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Attach move/up listeners for the gesture.
    AcquireCapture { card_id: CardId, scope: CaptureScope },
    /// Detach them. Emitted exactly once per acquisition.
    ReleaseCapture { card_id: CardId, scope: CaptureScope },
    StartTimer { timer: Timer, after_ms: u32 },
    CancelTimer(Timer),
    /// Show or clear an out-of-flow clone or ghost.
    SetPortal { key: String, view: Option<GhostView> },
    Send(Mutation),
    AnimateGroup { group_id: GroupId, animation: GroupAnimation },
    Notify(Notification),
    /// Scroll the column carousel by one during a touch drag.
    SwipeColumn(i8),
    /// The card record changed; re-render it.
    CardChanged(CardId),
    /// Deliver [`DragEngine::on_frame`] on the next animation frame.
    RequestFrame,
}

// =============================================================================
// ENGINE
// =============================================================================

/// A released local drag awaiting its server verdict and settle.
#[derive(Debug)]
struct LocalDrop {
    session: DragSession,
    /// Cleared once the server accepts the drop.
    pending: Option<PendingDrop>,
    settle: Option<SettleClock>,
}

#[derive(Debug, Default)]
pub struct DragEngine {
    config: DragConfig,
    cards: CardStore,
    session: Option<DragSession>,
    clone_size: Option<Rect>,
    dropping: HashMap<CardId, LocalDrop>,
    ghosts: HashMap<CardId, RemoteGhost>,
    settle_timers: HashMap<CardId, Timer>,
    placeholder_timers: HashMap<CardId, (GroupId, Timer)>,
    generation: u64,
}

impl DragEngine {
    #[must_use]
    pub fn new(config: DragConfig) -> Self {
        Self { config, ..Self::default() }
    }

    // --- Data inputs ---

    /// Replace all cards with a server snapshot, tearing down every drag.
    ///
    /// A card still being dragged is finalized as a cancel so the server
    /// releases its claim.
    pub fn load_snapshot(&mut self, snapshot: &MeetingSnapshot) -> Vec<Action> {
        let mut actions = Vec::new();
        if let Some(session) = self.session.take() {
            actions.extend(release_capture(&session));
            if session.phase() == DragPhase::Dragging {
                let card_id = session.card_id();
                actions.extend(self.finalize(session, DropResolution::cancel()));
                if !self.dropping.contains_key(&card_id) {
                    actions.push(clear_portal(card_id));
                }
            }
        }
        for card_id in self.dropping.keys().chain(self.ghosts.keys()) {
            actions.push(clear_portal(*card_id));
        }
        actions.extend(self.settle_timers.drain().map(|(_, timer)| Action::CancelTimer(timer)));
        actions.extend(self.placeholder_timers.drain().map(|(_, (_, timer))| Action::CancelTimer(timer)));
        self.dropping.clear();
        self.ghosts.clear();
        self.clone_size = None;
        self.cards.load_snapshot(snapshot);
        log::info!("loaded {} reflections in {} groups", self.cards.len(), self.cards.group_count());
        actions
    }

    /// Route a decoded server message.
    pub fn on_inbound(&mut self, inbound: &Inbound, geometry: &impl GeometryProvider) -> Vec<Action> {
        match inbound {
            Inbound::Snapshot(snapshot) => self.load_snapshot(snapshot),
            Inbound::StatePush(push) => self.on_state_push(push, geometry),
            Inbound::DropRejected { reflection_id, message } => self.on_drop_rejected(*reflection_id, message),
        }
    }

    // --- Pointer input ---

    /// Press on a card. Supersedes any session still in progress.
    pub fn on_pointer_down(&mut self, card_id: CardId, sample: PointerSample) -> Vec<Action> {
        if !self.cards.get(card_id).is_some_and(Reflection::can_pick_up) {
            log::debug!("press on {card_id} ignored: card not available");
            return Vec::new();
        }
        let mut actions = self.cancel();
        let generation = self.next_generation();
        let session = DragSession::press(card_id, sample, generation, self.config.target_tie_tolerance_px);
        actions.push(Action::AcquireCapture { card_id, scope: sample.kind.capture_scope() });
        if sample.kind == PointerKind::Touch {
            actions.push(Action::StartTimer {
                timer: longpress_timer(&session),
                after_ms: self.config.touch_longpress_ms,
            });
        }
        self.session = Some(session);
        actions
    }

    pub fn on_pointer_move(&mut self, sample: PointerSample, geometry: &impl GeometryProvider) -> Vec<Action> {
        let threshold = self.config.drag_threshold_px;
        let Some(session) = self.session.as_ref() else {
            return Vec::new();
        };
        let card_id = session.card_id();
        let card_rect = if session.phase() == DragPhase::Idle
            && self.cards.get(card_id).is_some_and(Reflection::can_pick_up)
        {
            geometry.card_rect(card_id)
        } else {
            None
        };
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        match session.track(sample, threshold, card_rect) {
            Movement::Pending => Vec::new(),
            Movement::ScrollIntent | Movement::Lost => {
                log::debug!("press on {card_id} abandoned before drag");
                self.session.take().map(|s| release_capture(&s)).unwrap_or_default()
            }
            Movement::Promoted => {
                let mut actions = self.promote(card_rect, geometry);
                actions.extend(self.follow(sample, geometry));
                actions
            }
            Movement::Moved => self.follow(sample, geometry),
        }
    }

    /// Release. A promoted session issues exactly one finalize request.
    pub fn on_pointer_up(&mut self, sample: PointerSample, geometry: &impl GeometryProvider) -> Vec<Action> {
        let Some(mut session) = self.session.take() else {
            return Vec::new();
        };
        let mut actions = release_capture(&session);
        if session.phase() != DragPhase::Dragging {
            return actions;
        }
        session.track(sample, self.config.drag_threshold_px, None);
        let card_id = session.card_id();
        let resolution = match self.cards.get(card_id) {
            Some(card) => {
                resolve_drop(card.group_id, geometry.group_at(sample.client), self.cards.zone_siblings(card_id))
            }
            None => DropResolution::cancel(),
        };
        actions.extend(self.finalize(session, resolution));
        actions
    }

    /// Abandon the current gesture (escape key, lost focus).
    ///
    /// A promoted session is finalized as a cancel so the server releases
    /// the card.
    pub fn cancel(&mut self) -> Vec<Action> {
        let Some(session) = self.session.take() else {
            return Vec::new();
        };
        let mut actions = release_capture(&session);
        if session.phase() == DragPhase::Dragging {
            actions.extend(self.finalize(session, DropResolution::cancel()));
        }
        actions
    }

    // --- Clock ---

    /// Animation frame callback.
    pub fn on_frame(&mut self, now_ms: f64, geometry: &impl GeometryProvider) -> Vec<Action> {
        let mut actions = Vec::new();
        let mut wants_frame = false;

        if let Some(session) = self.session.as_mut().filter(|s| s.phase() == DragPhase::Dragging) {
            if let Some(location) = session.throttle.on_frame() {
                actions.push(Action::Send(Mutation::UpdateDragLocation(location)));
            }
            wants_frame |= session.throttle.is_in_flight();
        }

        for (card_id, drop) in &mut self.dropping {
            let Some(clock) = drop.settle.as_mut() else {
                continue;
            };
            if let Some(landing) = geometry.card_rect(*card_id)
                && let Some(remaining) = clock.tick(now_ms, landing)
            {
                let view = clone_view(*card_id, GhostStyle::dropping(landing, remaining), true);
                actions.push(Action::SetPortal { key: portal_key(*card_id), view: Some(view) });
            }
            wants_frame |= clock.wants_frame(now_ms);
        }

        for (card_id, ghost) in &mut self.ghosts {
            if let Some(view) = ghost.frame(now_ms, geometry.card_rect(*card_id)) {
                actions.push(Action::SetPortal { key: ghost.key(), view: Some(view) });
            }
            wants_frame |= ghost.wants_frame(now_ms);
        }

        if wants_frame {
            actions.push(Action::RequestFrame);
        }
        actions
    }

    /// Timer callback. Stale timers are ignored.
    pub fn on_timer(&mut self, timer: Timer) -> Vec<Action> {
        match timer.kind {
            TimerKind::Longpress => {
                if let Some(session) = self.session.as_mut().filter(|s| longpress_timer(s) == timer) {
                    session.mark_longpressed();
                    log::debug!("longpress on {}", timer.card_id);
                }
                Vec::new()
            }
            TimerKind::DropSettle => {
                if self.settle_timers.get(&timer.card_id) != Some(&timer) {
                    log::trace!("stale settle timer for {}", timer.card_id);
                    return Vec::new();
                }
                self.settle_timers.remove(&timer.card_id);
                self.finish_settle(timer.card_id)
            }
            TimerKind::PlaceholderReset => match self.placeholder_timers.get(&timer.card_id) {
                Some((group_id, current)) if *current == timer => {
                    let group_id = *group_id;
                    self.placeholder_timers.remove(&timer.card_id);
                    vec![Action::AnimateGroup { group_id, animation: GroupAnimation::Reset }]
                }
                _ => Vec::new(),
            },
        }
    }

    // --- Server pushes ---

    /// Apply the authoritative drag state of one card.
    pub fn on_state_push(&mut self, push: &DragStatePush, geometry: &impl GeometryProvider) -> Vec<Action> {
        let card_id = push.reflection_id;
        let mut actions = Vec::new();

        let snapshot = self.session.as_ref().map(DragSession::snapshot);
        if let Verdict::ForceRelease { stolen_by } = arbitrate(snapshot.as_ref(), push) {
            actions.extend(self.force_release(stolen_by.as_deref()));
        }

        let Some(delta) = self.cards.apply_push(push) else {
            log::debug!("push for unknown card {card_id}");
            return actions;
        };

        if delta.dropping_cancelled() {
            // A newer drag took over before the old drop settled.
            if let Some(timer) = self.settle_timers.remove(&card_id) {
                actions.push(Action::CancelTimer(timer));
            }
            if self.dropping.remove(&card_id).is_some() {
                actions.push(clear_portal(card_id));
            }
            if let Some(mut ghost) = self.ghosts.remove(&card_id) {
                ghost.exit();
                actions.push(clear_portal(card_id));
            }
        }

        let after = &delta.after;
        if let Some(remote) = after.remote_drag.as_ref() {
            // Claimed by someone else while our finalize was in flight.
            if self.dropping.remove(&card_id).is_some() {
                if let Some(timer) = self.settle_timers.remove(&card_id) {
                    actions.push(Action::CancelTimer(timer));
                }
                log::info!("parked drop of {card_id} lost to {}", remote.drag_user_name);
                actions.push(Action::Notify(Notification::stolen(
                    card_id,
                    &remote.drag_user_name,
                    self.config.stolen_notice_secs,
                )));
            }
        }
        if let Some(remote) = after.remote_drag.as_ref().filter(|_| !after.is_dropping) {
            match self.ghosts.get_mut(&card_id) {
                Some(ghost) => {
                    if ghost.track(remote, geometry) {
                        actions.push(Action::SetPortal { key: ghost.key(), view: Some(ghost.view()) });
                    }
                }
                None => {
                    let ghost = RemoteGhost::enter(card_id, remote, geometry);
                    log::debug!("{} picked up {card_id}", ghost.drag_user_name());
                    actions.push(Action::SetPortal { key: ghost.key(), view: Some(ghost.view()) });
                    self.ghosts.insert(card_id, ghost);
                }
            }
        }

        if delta.picked_up() && after.remote_drag.is_some() {
            actions.extend(self.collapse_if_empty(delta.before.group_id, geometry));
        }

        if delta.dropping_started() {
            actions.extend(self.begin_settle(card_id, delta.moved_group(), geometry));
        } else if delta.remote_cleared() && !after.is_dropping {
            // The remote dragger let go without a drop (disconnect).
            if let Some(mut ghost) = self.ghosts.remove(&card_id) {
                ghost.exit();
            }
            actions.push(clear_portal(card_id));
        }

        actions.push(Action::CardChanged(card_id));
        actions
    }

    /// The server refused a finalize: undo the optimistic state.
    pub fn on_drop_rejected(&mut self, card_id: CardId, reason: &str) -> Vec<Action> {
        let Some(pending) = self.dropping.get(&card_id).and_then(|d| d.pending) else {
            log::debug!("rejection for {card_id} with no pending drop");
            return Vec::new();
        };
        self.dropping.remove(&card_id);
        log::warn!("drop of {card_id} rejected: {reason}");
        self.cards.set_viewer_dragging(card_id, false);
        let remote_held = self.cards.get(card_id).is_some_and(|c| c.remote_drag.is_some());
        if !remote_held {
            self.cards.clear_transient(card_id);
        }
        let mut actions = Vec::new();
        if !self.ghosts.contains_key(&card_id) {
            actions.push(clear_portal(card_id));
        }
        actions.extend([
            Action::AnimateGroup { group_id: pending.from_group, animation: GroupAnimation::Reset },
            Action::Notify(Notification::drop_rejected(card_id, reason, self.config.stolen_notice_secs)),
            Action::CardChanged(card_id),
        ]);
        actions
    }

    // --- Queries ---

    #[must_use]
    pub fn config(&self) -> &DragConfig {
        &self.config
    }

    #[must_use]
    pub fn cards(&self) -> &CardStore {
        &self.cards
    }

    #[must_use]
    pub fn session(&self) -> Option<SessionSnapshot> {
        self.session.as_ref().map(DragSession::snapshot)
    }

    #[must_use]
    pub fn ghost(&self, card_id: CardId) -> Option<&RemoteGhost> {
        self.ghosts.get(&card_id)
    }

    /// Whether a local drop of `card_id` is still resolving or settling.
    #[must_use]
    pub fn is_dropping_locally(&self, card_id: CardId) -> bool {
        self.dropping.contains_key(&card_id)
    }

    // --- Internals ---

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn promote(&mut self, card_rect: Option<Rect>, geometry: &impl GeometryProvider) -> Vec<Action> {
        let Some(session) = self.session.as_ref() else {
            return Vec::new();
        };
        let card_id = session.card_id();
        let mut actions = Vec::new();
        if let Some(drag_id) = session.drag_id() {
            log::info!("drag {drag_id} started on {card_id}");
            actions.push(Action::Send(Mutation::StartDrag { card_id, drag_id }));
        }
        self.clone_size = card_rect;
        self.cards.set_viewer_dragging(card_id, true);
        if let Some(group_id) = self.cards.get(card_id).map(|c| c.group_id) {
            actions.extend(self.collapse_if_empty(group_id, geometry));
        }
        actions.push(Action::CardChanged(card_id));
        actions
    }

    fn follow(&mut self, sample: PointerSample, geometry: &impl GeometryProvider) -> Vec<Action> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        let card_id = session.card_id();
        let mut actions = vec![Action::SetPortal {
            key: portal_key(card_id),
            view: Some(clone_view(card_id, GhostStyle::dragging(session.clone_origin(), self.clone_size), false)),
        }];
        session.resolver.enter_zone(session.cursor(), geometry);
        if let Some(location) = session.location().and_then(|l| session.throttle.offer(l)) {
            actions.push(Action::Send(Mutation::UpdateDragLocation(location)));
        }
        actions.push(Action::RequestFrame);
        if session.kind() == PointerKind::Touch
            && let Some(direction) =
                swipe_direction(sample.client.x, geometry.viewport().width, self.config.swipe_edge_ratio)
        {
            actions.push(Action::SwipeColumn(direction));
        }
        actions
    }

    /// Send the finalize request and park the session until it settles.
    fn finalize(&mut self, mut session: DragSession, resolution: DropResolution) -> Vec<Action> {
        let card_id = session.card_id();
        let Some(drag_id) = session.drag_id() else {
            return Vec::new();
        };
        let from_group = self.cards.get(card_id).map(|c| c.group_id);
        session.release();
        log::info!("drag {drag_id} released on {card_id}: {:?}", resolution.target_type);
        let pending = from_group.map(|from_group| PendingDrop { from_group, resolution });
        self.clone_size = None;
        self.dropping.insert(card_id, LocalDrop { session, pending, settle: None });
        vec![Action::Send(Mutation::FinalizeDrop { card_id, drag_id, resolution })]
    }

    /// Tear down a session the server gave to someone else.
    fn force_release(&mut self, stolen_by: Option<&str>) -> Vec<Action> {
        let Some(session) = self.session.take() else {
            return Vec::new();
        };
        let card_id = session.card_id();
        self.clone_size = None;
        log::info!("drag on {card_id} lost to {}", stolen_by.unwrap_or("the server"));
        let mut actions = release_capture(&session);
        actions.push(clear_portal(card_id));
        if let Some(name) = stolen_by {
            actions.push(Action::Notify(Notification::stolen(card_id, name, self.config.stolen_notice_secs)));
        }
        actions
    }

    fn collapse_if_empty(&self, group_id: GroupId, geometry: &impl GeometryProvider) -> Option<Action> {
        let height = geometry.group_rect(group_id).map(|r| r.height);
        on_pickup(self.cards.static_count(group_id), height, self.config.local_drop_ms)
            .map(|animation| Action::AnimateGroup { group_id, animation })
    }

    /// Start the settle countdown for a card the server marked as dropping.
    fn begin_settle(&mut self, card_id: CardId, moved_group: bool, geometry: &impl GeometryProvider) -> Vec<Action> {
        let mut actions = Vec::new();
        let origin = match self.dropping.get_mut(&card_id) {
            Some(drop) => {
                drop.pending = None;
                DropOrigin::Local
            }
            None => DropOrigin::Remote,
        };
        let duration = settle_duration(origin, &self.config);
        match origin {
            DropOrigin::Local => {
                if let Some(drop) = self.dropping.get_mut(&card_id) {
                    drop.settle = Some(SettleClock::new(duration));
                }
            }
            DropOrigin::Remote => {
                if let Some(ghost) = self.ghosts.get_mut(&card_id) {
                    ghost.begin_settle(duration);
                }
            }
        }

        if let Some(previous) = self.settle_timers.remove(&card_id) {
            actions.push(Action::CancelTimer(previous));
        }
        let timer = Timer { kind: TimerKind::DropSettle, card_id, generation: self.next_generation() };
        self.settle_timers.insert(card_id, timer);
        actions.push(Action::StartTimer { timer, after_ms: duration });

        if let Some(group_id) = self.cards.get(card_id).map(|c| c.group_id) {
            let occupants = self.cards.static_count(group_id);
            let height = geometry.group_rect(group_id).map(|r| r.height);
            let animation = on_landing(occupants, moved_group, height, duration);
            if matches!(animation, GroupAnimation::Expand { .. }) {
                let reset = Timer { kind: TimerKind::PlaceholderReset, card_id, generation: self.next_generation() };
                if let Some((_, previous)) = self.placeholder_timers.insert(card_id, (group_id, reset)) {
                    actions.push(Action::CancelTimer(previous));
                }
                actions.push(Action::StartTimer { timer: reset, after_ms: duration });
            }
            actions.push(Action::AnimateGroup { group_id, animation });
        }
        log::debug!("{card_id} settling for {duration}ms ({origin:?})");
        actions.push(Action::RequestFrame);
        actions
    }

    fn finish_settle(&mut self, card_id: CardId) -> Vec<Action> {
        if let Some(mut drop) = self.dropping.remove(&card_id) {
            drop.session.settle();
            log::debug!("drag on {card_id} {:?}", drop.session.phase());
        }
        if let Some(mut ghost) = self.ghosts.remove(&card_id) {
            ghost.exit();
        }
        self.cards.clear_transient(card_id);
        vec![clear_portal(card_id), Action::CardChanged(card_id)]
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn longpress_timer(session: &DragSession) -> Timer {
    Timer { kind: TimerKind::Longpress, card_id: session.card_id(), generation: session.generation() }
}

/// Capture release plus the longpress cancel that always accompanies it.
fn release_capture(session: &DragSession) -> Vec<Action> {
    let card_id = session.card_id();
    let mut actions = vec![Action::ReleaseCapture { card_id, scope: session.kind().capture_scope() }];
    if session.kind() == PointerKind::Touch && !session.is_longpressed() {
        actions.push(Action::CancelTimer(longpress_timer(session)));
    }
    actions
}

fn clear_portal(card_id: CardId) -> Action {
    Action::SetPortal { key: portal_key(card_id), view: None }
}

fn clone_view(card_id: CardId, style: GhostStyle, settling: bool) -> GhostView {
    let phase = if settling { AnimationPhase::Settling } else { AnimationPhase::Entering };
    GhostView { card_id, drag_user_name: None, phase, style }
}
