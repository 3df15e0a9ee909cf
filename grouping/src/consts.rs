//! Shared numeric constants for the grouping crate.

// ── Input ───────────────────────────────────────────────────────

/// Pointer travel, in CSS pixels, before a press becomes a drag.
pub const DRAG_THRESHOLD_PX: f64 = 3.0;

/// How long a touch must rest before movement counts as drag intent.
pub const TOUCH_LONGPRESS_MS: u32 = 300;

/// Share of the viewport width on each side that swipes columns during a touch drag.
pub const SWIPE_EDGE_RATIO: f64 = 0.1;

// ── Target resolution ───────────────────────────────────────────

/// Centre-distance margin within which the previous target keeps winning.
pub const TARGET_TIE_TOLERANCE_PX: f64 = 8.0;

// ── Drop ────────────────────────────────────────────────────────

/// Settle time for a drop this viewer made.
pub const REFLECTION_DROP_MS: u32 = 1000;

/// Settle time for a drop observed from another participant.
pub const REFLECTION_REMOTE_DROP_MS: u32 = 1500;

// ── Notifications ───────────────────────────────────────────────

/// Seconds before the "stole your reflection" snackbar dismisses itself.
pub const STOLEN_NOTICE_SECS: u32 = 5;

// ── Stacking ────────────────────────────────────────────────────

/// z-index of a clone or ghost while it follows a cursor.
pub const Z_INDEX_DRAGGING: i32 = 100;

/// z-index of a clone or ghost settling into place.
pub const Z_INDEX_DROPPING: i32 = 90;
