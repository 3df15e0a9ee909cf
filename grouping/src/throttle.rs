//! Broadcast Throttler: at most one position message per rendered frame.
//!
//! Pointer moves arrive far faster than the display refreshes. The first
//! update in a frame goes out immediately and marks the frame as spent;
//! later updates in the same frame overwrite a single pending slot, which
//! the next frame boundary releases. The newest position therefore always
//! reaches peers, one frame late at most.

#[cfg(test)]
#[path = "throttle_test.rs"]
mod throttle_test;

#[derive(Debug, Clone)]
pub struct BroadcastThrottler<T> {
    in_flight: bool,
    pending: Option<T>,
}

impl<T> Default for BroadcastThrottler<T> {
    fn default() -> Self {
        Self { in_flight: false, pending: None }
    }
}

impl<T> BroadcastThrottler<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer an update. Returns it when it may be sent now.
    pub fn offer(&mut self, update: T) -> Option<T> {
        if self.in_flight {
            self.pending = Some(update);
            return None;
        }
        self.in_flight = true;
        Some(update)
    }

    /// Frame boundary. Returns the coalesced update to send, if any.
    ///
    /// Sending a pending update spends the new frame as well.
    pub fn on_frame(&mut self) -> Option<T> {
        match self.pending.take() {
            Some(update) => Some(update),
            None => {
                self.in_flight = false;
                None
            }
        }
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any pending update; nothing more goes out for this session.
    pub fn reset(&mut self) {
        self.in_flight = false;
        self.pending = None;
    }
}
