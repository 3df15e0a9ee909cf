//! Position Tracker: the local drag session from press to release.
//!
//! A session starts on pointer-down in [`DragPhase::Idle`]: the press is
//! recorded but nothing moves yet. The first move past the distance
//! threshold promotes it to [`DragPhase::Dragging`], fixing the
//! cursor-to-card offset and minting the drag id. On touch screens a move
//! before the longpress timer fires means the user is scrolling, and the
//! session is abandoned instead.
//!
//! The session owns the resolver and throttler for its lifetime, so their
//! state can never leak into the next drag.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use uuid::Uuid;

use crate::cards::CardId;
use crate::geom::{Point, Rect};
use crate::target::{TargetReference, TargetResolver};
use crate::throttle::BroadcastThrottler;

/// Unique identifier for one drag, minted on promotion.
pub type DragId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
}

impl PointerKind {
    /// Where the host must listen for the rest of the gesture.
    #[must_use]
    pub fn capture_scope(self) -> CaptureScope {
        match self {
            Self::Mouse => CaptureScope::Document,
            Self::Touch => CaptureScope::Element,
        }
    }
}

/// One pointer or touch event, already reduced to viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub kind: PointerKind,
    pub client: Point,
}

impl PointerSample {
    #[must_use]
    pub fn mouse(x: f64, y: f64) -> Self {
        Self { kind: PointerKind::Mouse, client: Point::new(x, y) }
    }

    #[must_use]
    pub fn touch(x: f64, y: f64) -> Self {
        Self { kind: PointerKind::Touch, client: Point::new(x, y) }
    }
}

/// Listener set the host attaches while a gesture is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureScope {
    /// Move and up listeners on the document (mouse).
    Document,
    /// Move and end listeners on the card element (touch).
    Element,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    /// Pressed, not yet past the threshold.
    Idle,
    /// Following the cursor.
    Dragging,
    /// Released; waiting for the server to confirm the drop.
    Resolving,
    /// Drop animation finished; transient state cleared.
    Settled,
}

/// Result of feeding a move into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// Still under the threshold, or the session is no longer tracking.
    Pending,
    /// A touch moved before the longpress fired.
    ScrollIntent,
    /// The card element vanished before promotion.
    Lost,
    /// This move promoted the session.
    Promoted,
    /// An already-promoted session moved.
    Moved,
}

/// A throttled position report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragLocation {
    pub card_id: CardId,
    pub drag_id: DragId,
    /// Card top-left in the viewer's viewport.
    pub client: Point,
    pub target: TargetReference,
}

/// Immutable view of a session handed to the other components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub card_id: CardId,
    pub drag_id: Option<DragId>,
    pub kind: PointerKind,
    pub phase: DragPhase,
}

impl SessionSnapshot {
    /// Whether the viewer visibly holds the card (a clone is mounted).
    #[must_use]
    pub fn holds_card(&self) -> bool {
        self.phase == DragPhase::Dragging
    }
}

/// Whether the pointer travelled far enough to count as a drag.
#[must_use]
pub fn exceeds_threshold(origin: Point, current: Point, threshold: f64) -> bool {
    origin.distance_to(current) > threshold
}

/// Cursor offset inside the card, clamped into the card's box.
///
/// Fast flicks can report a first move already outside the card; clamping
/// keeps the cursor visually on the clone.
#[must_use]
pub fn clamp_card_offset(cursor: Point, card: Rect) -> Point {
    Point::new(
        (cursor.x - card.left).clamp(0.0, card.width.max(0.0)),
        (cursor.y - card.top).clamp(0.0, card.height.max(0.0)),
    )
}

/// Column swipe requested by a touch drag near a viewport edge.
#[must_use]
pub fn swipe_direction(x: f64, viewport_width: f64, edge_ratio: f64) -> Option<i8> {
    let edge = viewport_width * edge_ratio;
    if edge <= 0.0 {
        return None;
    }
    if x <= edge {
        Some(-1)
    } else if x >= viewport_width - edge {
        Some(1)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct DragSession {
    card_id: CardId,
    drag_id: Option<DragId>,
    kind: PointerKind,
    origin: Point,
    cursor: Point,
    card_offset: Point,
    phase: DragPhase,
    longpressed: bool,
    generation: u64,
    pub(crate) resolver: TargetResolver,
    pub(crate) throttle: BroadcastThrottler<DragLocation>,
}

impl DragSession {
    /// Record a press on `card_id`.
    #[must_use]
    pub fn press(card_id: CardId, sample: PointerSample, generation: u64, tie_tolerance: f64) -> Self {
        Self {
            card_id,
            drag_id: None,
            kind: sample.kind,
            origin: sample.client,
            cursor: sample.client,
            card_offset: Point::default(),
            phase: DragPhase::Idle,
            // Mouse presses never wait for a longpress.
            longpressed: sample.kind == PointerKind::Mouse,
            generation,
            resolver: TargetResolver::new(tie_tolerance),
            throttle: BroadcastThrottler::new(),
        }
    }

    pub fn mark_longpressed(&mut self) {
        self.longpressed = true;
    }

    /// Feed a move. `card_rect` is only consulted at promotion.
    pub fn track(&mut self, sample: PointerSample, threshold: f64, card_rect: Option<Rect>) -> Movement {
        match self.phase {
            DragPhase::Dragging => {
                self.cursor = sample.client;
                Movement::Moved
            }
            DragPhase::Idle => {
                if !exceeds_threshold(self.origin, sample.client, threshold) {
                    return Movement::Pending;
                }
                if !self.longpressed {
                    return Movement::ScrollIntent;
                }
                let Some(rect) = card_rect else {
                    return Movement::Lost;
                };
                self.card_offset = clamp_card_offset(sample.client, rect);
                self.cursor = sample.client;
                self.drag_id = Some(Uuid::new_v4());
                self.phase = DragPhase::Dragging;
                Movement::Promoted
            }
            DragPhase::Resolving | DragPhase::Settled => Movement::Pending,
        }
    }

    /// Resolve the target for the current cursor and build a position report.
    pub fn location(&mut self) -> Option<DragLocation> {
        let drag_id = self.drag_id?;
        let target = self.resolver.resolve(self.cursor, self.card_offset);
        Some(DragLocation { card_id: self.card_id, drag_id, client: self.clone_origin(), target })
    }

    /// Release the pointer: stop broadcasting and wait for the server.
    pub fn release(&mut self) {
        self.throttle.reset();
        self.resolver.reset();
        if self.phase == DragPhase::Dragging {
            self.phase = DragPhase::Resolving;
        }
    }

    pub fn settle(&mut self) {
        self.phase = DragPhase::Settled;
    }

    /// Where the clone's top-left sits for the current cursor.
    #[must_use]
    pub fn clone_origin(&self) -> Point {
        self.cursor.minus(self.card_offset)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot { card_id: self.card_id, drag_id: self.drag_id, kind: self.kind, phase: self.phase }
    }

    #[must_use]
    pub fn card_id(&self) -> CardId {
        self.card_id
    }

    #[must_use]
    pub fn drag_id(&self) -> Option<DragId> {
        self.drag_id
    }

    #[must_use]
    pub fn kind(&self) -> PointerKind {
        self.kind
    }

    #[must_use]
    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    #[must_use]
    pub fn cursor(&self) -> Point {
        self.cursor
    }

    #[must_use]
    pub fn card_offset(&self) -> Point {
        self.card_offset
    }

    #[must_use]
    pub fn is_longpressed(&self) -> bool {
        self.longpressed
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
