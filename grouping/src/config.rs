//! Tunable thresholds and durations for the drag engine.
//!
//! Defaults come from [`crate::consts`]. Hosts may ship overrides as JSON;
//! any field left out keeps its default.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid drag config json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    pub drag_threshold_px: f64,
    pub touch_longpress_ms: u32,
    pub swipe_edge_ratio: f64,
    pub target_tie_tolerance_px: f64,
    pub local_drop_ms: u32,
    pub remote_drop_ms: u32,
    pub stolen_notice_secs: u32,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: consts::DRAG_THRESHOLD_PX,
            touch_longpress_ms: consts::TOUCH_LONGPRESS_MS,
            swipe_edge_ratio: consts::SWIPE_EDGE_RATIO,
            target_tie_tolerance_px: consts::TARGET_TIE_TOLERANCE_PX,
            local_drop_ms: consts::REFLECTION_DROP_MS,
            remote_drop_ms: consts::REFLECTION_REMOTE_DROP_MS,
            stolen_notice_secs: consts::STOLEN_NOTICE_SECS,
        }
    }
}

impl DragConfig {
    /// Parse a JSON override, filling missing fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::NotPositive`] for a non-positive threshold or duration.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make a drag impossible to start or settle.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotPositive`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("drag_threshold_px", self.drag_threshold_px),
            ("touch_longpress_ms", f64::from(self.touch_longpress_ms)),
            ("local_drop_ms", f64::from(self.local_drop_ms)),
            ("remote_drop_ms", f64::from(self.remote_drop_ms)),
        ];
        for (field, value) in checks {
            if value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        Ok(())
    }
}
