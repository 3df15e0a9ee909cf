//! Viewport geometry and the measurement seam.
//!
//! All coordinates are CSS pixels in the viewer's viewport (`clientX` /
//! `clientY` space). The engine never measures anything itself; it asks a
//! [`GeometryProvider`] whenever a lifecycle step needs a bounding box.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use serde::{Deserialize, Serialize};

use crate::cards::{CardId, GroupId};
use crate::target::{DropTarget, DropZone};

/// A point in viewport space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Component-wise difference `self - other`.
    #[must_use]
    pub fn minus(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    /// Component-wise sum `self + other`.
    #[must_use]
    pub fn plus(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

/// An axis-aligned bounding box, as returned by `getBoundingClientRect`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.left && pt.x <= self.right() && pt.y >= self.top && pt.y <= self.bottom()
    }
}

/// Size of the viewer's viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Measures the live layout on demand.
///
/// Every method may return `None` / empty when the element is gone; the
/// engine treats absence as "nothing to do", never as an error.
pub trait GeometryProvider {
    /// Bounding box of a card's static (in-list) element.
    fn card_rect(&self, card_id: CardId) -> Option<Rect>;

    /// Bounding box of a group container.
    fn group_rect(&self, group_id: GroupId) -> Option<Rect>;

    /// The drop zone (column) under a viewport point.
    fn drop_zone_at(&self, pt: Point) -> Option<DropZone>;

    /// Candidate groups inside a zone.
    fn measure_targets(&self, zone: &DropZone) -> Vec<DropTarget>;

    /// The group container directly under a viewport point.
    fn group_at(&self, pt: Point) -> Option<GroupId>;

    fn viewport(&self) -> Viewport;
}

/// A snapshot of measured layout, filled by the host after each render.
#[derive(Debug, Clone, Default)]
pub struct MeasuredLayout {
    pub viewport: Viewport,
    pub zones: Vec<DropZone>,
    /// Group containers with the zone they sit in.
    pub groups: Vec<(String, DropTarget)>,
    pub cards: Vec<(CardId, Rect)>,
}

impl MeasuredLayout {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport, ..Self::default() }
    }

    #[must_use]
    pub fn with_zone(mut self, zone: DropZone) -> Self {
        self.zones.push(zone);
        self
    }

    #[must_use]
    pub fn with_group(mut self, zone_id: impl Into<String>, group_id: GroupId, rect: Rect) -> Self {
        self.groups.push((zone_id.into(), DropTarget { id: group_id, rect }));
        self
    }

    #[must_use]
    pub fn with_card(mut self, card_id: CardId, rect: Rect) -> Self {
        self.cards.push((card_id, rect));
        self
    }

    /// Replace a card's rectangle, or add it.
    pub fn set_card(&mut self, card_id: CardId, rect: Rect) {
        match self.cards.iter_mut().find(|(id, _)| *id == card_id) {
            Some(entry) => entry.1 = rect,
            None => self.cards.push((card_id, rect)),
        }
    }

    /// Forget a card's element, as when it leaves the DOM.
    pub fn remove_card(&mut self, card_id: CardId) {
        self.cards.retain(|(id, _)| *id != card_id);
    }
}

impl GeometryProvider for MeasuredLayout {
    fn card_rect(&self, card_id: CardId) -> Option<Rect> {
        self.cards.iter().find(|(id, _)| *id == card_id).map(|(_, rect)| *rect)
    }

    fn group_rect(&self, group_id: GroupId) -> Option<Rect> {
        self.groups
            .iter()
            .find(|(_, target)| target.id == group_id)
            .map(|(_, target)| target.rect)
    }

    fn drop_zone_at(&self, pt: Point) -> Option<DropZone> {
        self.zones.iter().find(|zone| zone.rect.contains(pt)).cloned()
    }

    fn measure_targets(&self, zone: &DropZone) -> Vec<DropTarget> {
        self.groups
            .iter()
            .filter(|(zone_id, _)| *zone_id == zone.id)
            .map(|(_, target)| target.clone())
            .collect()
    }

    fn group_at(&self, pt: Point) -> Option<GroupId> {
        self.groups
            .iter()
            .find(|(_, target)| target.rect.contains(pt))
            .map(|(_, target)| target.id)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }
}
