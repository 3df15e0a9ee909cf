//! Business logic behind the websocket syscalls.
//!
//! Handlers in `routes::ws` parse frames and call into these services;
//! services mutate meeting state and fan out drag pushes, but never reply
//! to the requesting socket.

pub mod drag;
pub mod meeting;
