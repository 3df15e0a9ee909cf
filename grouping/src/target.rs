//! Target Resolver: which group the dragged card would land in.
//!
//! Candidate groups are measured once per drop zone. Re-measuring happens
//! only when the cursor crosses into a different zone, which is a cheap
//! containment check; inside a zone the nearest target is re-evaluated on
//! every move so the highlighted target tracks the cursor closely.

#[cfg(test)]
#[path = "target_test.rs"]
mod target_test;

use serde::{Deserialize, Serialize};

use crate::cards::GroupId;
use crate::geom::{GeometryProvider, Point, Rect};

/// A droppable column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropZone {
    pub id: String,
    pub rect: Rect,
}

/// A measured group the card could merge into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropTarget {
    pub id: GroupId,
    pub rect: Rect,
}

/// The chosen target and where the card sits relative to it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetReference {
    pub target_id: Option<GroupId>,
    /// Card top-left minus target top-left.
    pub offset: Point,
}

/// Pick the target whose centre is nearest `pt`.
///
/// `prev` keeps winning while its distance is within `tolerance` of the
/// best candidate, which stops the highlight flickering between two
/// overlapping groups.
#[must_use]
pub fn nearest_target(pt: Point, targets: &[DropTarget], prev: Option<GroupId>, tolerance: f64) -> Option<&DropTarget> {
    let best = targets
        .iter()
        .min_by(|a, b| a.rect.center().distance_to(pt).total_cmp(&b.rect.center().distance_to(pt)))?;
    let Some(prev_target) = prev.and_then(|id| targets.iter().find(|t| t.id == id)) else {
        return Some(best);
    };
    let best_dist = best.rect.center().distance_to(pt);
    let prev_dist = prev_target.rect.center().distance_to(pt);
    if prev_dist - best_dist <= tolerance {
        Some(prev_target)
    } else {
        Some(best)
    }
}

/// Per-session resolver state.
#[derive(Debug, Clone, Default)]
pub struct TargetResolver {
    zone: Option<DropZone>,
    targets: Vec<DropTarget>,
    prev_target: Option<GroupId>,
    tolerance: f64,
}

impl TargetResolver {
    #[must_use]
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance, ..Self::default() }
    }

    /// Track the zone under the cursor; re-measure targets on a zone change.
    ///
    /// Returns `true` when targets were re-measured. Leaving every zone keeps
    /// the last measurement, so a brief excursion over a gutter does not
    /// lose the highlight.
    pub fn enter_zone(&mut self, cursor: Point, geometry: &impl GeometryProvider) -> bool {
        let zone = geometry.drop_zone_at(cursor);
        let current = self.zone.as_ref().map(|z| z.id.as_str());
        if zone.as_ref().map(|z| z.id.as_str()) == current {
            return false;
        }
        match zone {
            Some(zone) => {
                self.targets = geometry.measure_targets(&zone);
                log::debug!("drag entered zone {} with {} targets", zone.id, self.targets.len());
                self.zone = Some(zone);
                true
            }
            None => {
                self.zone = None;
                false
            }
        }
    }

    /// Choose the target for the current cursor.
    pub fn resolve(&mut self, cursor: Point, card_offset: Point) -> TargetReference {
        let Some(target) = nearest_target(cursor, &self.targets, self.prev_target, self.tolerance) else {
            self.prev_target = None;
            return TargetReference::default();
        };
        let card_origin = cursor.minus(card_offset);
        self.prev_target = Some(target.id);
        TargetReference { target_id: Some(target.id), offset: card_origin.minus(target.rect.origin()) }
    }

    #[must_use]
    pub fn zone(&self) -> Option<&DropZone> {
        self.zone.as_ref()
    }

    #[must_use]
    pub fn targets(&self) -> &[DropTarget] {
        &self.targets
    }

    #[must_use]
    pub fn prev_target(&self) -> Option<GroupId> {
        self.prev_target
    }

    /// Forget all measurements; the next drag starts fresh.
    pub fn reset(&mut self) {
        self.zone = None;
        self.targets.clear();
        self.prev_target = None;
    }
}
