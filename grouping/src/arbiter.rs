//! Conflict Arbiter: yield when the server hands the card to someone else.
//!
//! The server is the only authority on who holds a card. Whenever a push
//! arrives for a card the viewer is actively dragging and it says the
//! viewer is no longer the dragger, the local drag is abandoned on the
//! spot. A dropping card is exempt: the drop already won.

use frames::drag::DragStatePush;
use serde::Serialize;

use crate::cards::CardId;
use crate::session::SessionSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing to do.
    Keep,
    /// Abandon the local drag; `stolen_by` names the new holder when known.
    ForceRelease { stolen_by: Option<String> },
}

/// Decide whether a push takes the card away from the viewer.
#[must_use]
pub fn arbitrate(session: Option<&SessionSnapshot>, push: &DragStatePush) -> Verdict {
    let holds = session.is_some_and(|s| s.card_id == push.reflection_id && s.holds_card());
    if !holds || push.is_viewer_dragging || push.is_dropping {
        return Verdict::Keep;
    }
    Verdict::ForceRelease { stolen_by: push.remote_drag.as_ref().map(|r| r.drag_user_name.clone()) }
}

/// A transient message for the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Dedup key; a second notification with the same key replaces the first.
    pub key: String,
    pub message: String,
    pub auto_dismiss_secs: u32,
}

impl Notification {
    /// "Someone took your card" snackbar.
    #[must_use]
    pub fn stolen(card_id: CardId, stolen_by: &str, auto_dismiss_secs: u32) -> Self {
        Self {
            key: format!("reflectionInterception:{card_id}"),
            message: format!("Oh no! {stolen_by} stole your reflection!"),
            auto_dismiss_secs,
        }
    }

    /// The server refused a drop; the card went back where it was.
    #[must_use]
    pub fn drop_rejected(card_id: CardId, reason: &str, auto_dismiss_secs: u32) -> Self {
        Self {
            key: format!("reflectionDropRejected:{card_id}"),
            message: format!("Your drop could not be saved: {reason}"),
            auto_dismiss_secs,
        }
    }
}
