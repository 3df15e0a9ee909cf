//! Remote Render Adapter: ghosts of cards other participants are dragging.
//!
//! A ghost lives in the portal slot keyed by [`portal_key`]; the local
//! clone of a card this viewer drags uses the same key, so a card is only
//! ever drawn once outside its list.
//!
//! Lifecycle:
//! 1. First `RemoteDrag` on a card: [`AnimationPhase::Entering`], full
//!    positional style (transform, size, stacking order).
//! 2. Later positions move the ghost.
//! 3. `is_dropping`: [`AnimationPhase::Settling`], reduced style (transform
//!    and stacking order). Each animation frame re-aims the ghost at the
//!    card's landing rectangle with the remaining time as the transition,
//!    skipping frames where the landing top has not moved.
//! 4. Settle timer expiry: [`AnimationPhase::Exiting`], slot cleared.

#[cfg(test)]
#[path = "remote_test.rs"]
mod remote_test;

use frames::drag::RemoteDrag;
use serde::Serialize;

use crate::animation::AnimationPhase;
use crate::cards::CardId;
use crate::consts::{Z_INDEX_DRAGGING, Z_INDEX_DROPPING};
use crate::geom::{GeometryProvider, Point, Rect};

/// Portal slot name shared by a card's local clone and its remote ghost.
#[must_use]
pub fn portal_key(card_id: CardId) -> String {
    format!("clone-{card_id}")
}

/// Inline style for a clone or ghost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GhostStyle {
    /// `translate(x, y)` target in viewport space.
    pub origin: Point,
    pub z_index: i32,
    /// Explicit box; omitted while settling so the element keeps its size.
    pub rect: Option<Rect>,
    /// Transition length; `None` means jump.
    pub transition_ms: Option<u32>,
}

impl GhostStyle {
    /// Full positional style for a card following a cursor.
    #[must_use]
    pub fn dragging(origin: Point, size: Option<Rect>) -> Self {
        Self {
            origin,
            z_index: Z_INDEX_DRAGGING,
            rect: size.map(|r| Rect::new(origin.x, origin.y, r.width, r.height)),
            transition_ms: None,
        }
    }

    /// Reduced style for a card gliding into its landing slot.
    #[must_use]
    pub fn dropping(landing: Rect, remaining_ms: u32) -> Self {
        Self { origin: landing.origin(), z_index: Z_INDEX_DROPPING, rect: None, transition_ms: Some(remaining_ms) }
    }

    #[must_use]
    pub fn transform(&self) -> String {
        format!("translate({}px,{}px)", self.origin.x, self.origin.y)
    }
}

/// What a portal slot should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GhostView {
    pub card_id: CardId,
    /// Name badge; `None` for the viewer's own clone.
    pub drag_user_name: Option<String>,
    pub phase: AnimationPhase,
    pub style: GhostStyle,
}

/// Where a remote drag should appear in this viewer's layout.
///
/// Positions are re-projected through the target group when this viewer
/// has it measured, since column widths differ between screens.
#[must_use]
pub fn project(remote: &RemoteDrag, geometry: &impl GeometryProvider) -> Point {
    remote
        .target_id
        .and_then(|id| geometry.group_rect(id))
        .map_or(Point::new(remote.x, remote.y), |rect| {
            rect.origin().plus(Point::new(remote.target_offset_x, remote.target_offset_y))
        })
}

#[derive(Debug, Clone)]
pub struct RemoteGhost {
    card_id: CardId,
    drag_user_name: String,
    phase: AnimationPhase,
    position: Point,
    size: Option<Rect>,
    settle: Option<SettleClock>,
}

impl RemoteGhost {
    /// A ghost appearing for a newly observed remote drag.
    #[must_use]
    pub fn enter(card_id: CardId, remote: &RemoteDrag, geometry: &impl GeometryProvider) -> Self {
        Self {
            card_id,
            drag_user_name: remote.drag_user_name.clone(),
            phase: AnimationPhase::Entering,
            position: project(remote, geometry),
            size: geometry.card_rect(card_id),
            settle: None,
        }
    }

    /// Follow a newer remote position. Ignored once settling.
    pub fn track(&mut self, remote: &RemoteDrag, geometry: &impl GeometryProvider) -> bool {
        if self.phase != AnimationPhase::Entering {
            return false;
        }
        self.drag_user_name.clone_from(&remote.drag_user_name);
        let position = project(remote, geometry);
        let moved = position != self.position;
        self.position = position;
        moved
    }

    /// Start gliding toward the landing slot over `duration_ms`.
    ///
    /// The clock starts on the next animation frame.
    pub fn begin_settle(&mut self, duration_ms: u32) {
        self.phase = AnimationPhase::Settling;
        self.settle = Some(SettleClock::new(duration_ms));
    }

    /// Per-frame re-aim while settling.
    ///
    /// Returns a view only when the ghost needs re-rendering: it is settling,
    /// time remains, the landing slot is measurable and its top moved.
    pub fn frame(&mut self, now_ms: f64, landing: Option<Rect>) -> Option<GhostView> {
        if self.phase != AnimationPhase::Settling {
            return None;
        }
        let landing = landing?;
        let remaining = self.settle.as_mut()?.tick(now_ms, landing)?;
        self.position = landing.origin();
        Some(self.view_with(GhostStyle::dropping(landing, remaining)))
    }

    /// Whether the host should keep delivering frames for this ghost.
    #[must_use]
    pub fn wants_frame(&self, now_ms: f64) -> bool {
        self.phase == AnimationPhase::Settling && self.settle.is_some_and(|clock| clock.wants_frame(now_ms))
    }

    pub fn exit(&mut self) {
        self.phase = AnimationPhase::Exiting;
    }

    /// Current view for an entering ghost.
    #[must_use]
    pub fn view(&self) -> GhostView {
        self.view_with(GhostStyle::dragging(self.position, self.size))
    }

    fn view_with(&self, style: GhostStyle) -> GhostView {
        GhostView {
            card_id: self.card_id,
            drag_user_name: Some(self.drag_user_name.clone()),
            phase: self.phase,
            style,
        }
    }

    #[must_use]
    pub fn key(&self) -> String {
        portal_key(self.card_id)
    }

    #[must_use]
    pub fn phase(&self) -> AnimationPhase {
        self.phase
    }

    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    #[must_use]
    pub fn drag_user_name(&self) -> &str {
        &self.drag_user_name
    }
}

/// Countdown driving a settle animation.
///
/// The clock starts on the first frame it sees rather than when the drop
/// push arrives, since pushes carry no render timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettleClock {
    duration_ms: u32,
    started: Option<f64>,
    last_top: Option<f64>,
}

impl SettleClock {
    #[must_use]
    pub fn new(duration_ms: u32) -> Self {
        Self { duration_ms, started: None, last_top: None }
    }

    /// Advance to `now_ms` aiming at `landing`.
    ///
    /// Returns the remaining time when a re-render is due: time is left and
    /// the landing top moved since the last render.
    pub fn tick(&mut self, now_ms: f64, landing: Rect) -> Option<u32> {
        let started = *self.started.get_or_insert(now_ms);
        let remaining = remaining_ms(self.duration_ms, now_ms - started);
        if remaining == 0 || self.last_top == Some(landing.top) {
            return None;
        }
        self.last_top = Some(landing.top);
        Some(remaining)
    }

    #[must_use]
    pub fn wants_frame(&self, now_ms: f64) -> bool {
        self.started.is_none_or(|started| remaining_ms(self.duration_ms, now_ms - started) > 0)
    }
}

/// Milliseconds left of a `total_ms` countdown after `elapsed_ms`.
#[must_use]
pub fn remaining_ms(total_ms: u32, elapsed_ms: f64) -> u32 {
    let left = f64::from(total_ms) - elapsed_ms.max(0.0);
    if left <= 0.0 {
        return 0;
    }
    // Bounded by total_ms, so the cast cannot truncate.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let left = left.ceil() as u32;
    left.min(total_ms)
}
