//! Real-time drag-and-drop synchronization for retrospective reflection cards.
//!
//! This crate is the headless core of the grouping phase. It owns the full
//! lifecycle of a card drag: translating raw pointer/touch input into a drag
//! session, resolving the drop target under the cursor, throttling position
//! broadcasts to one per animation frame, mirroring other participants'
//! drags as ghosts, arbitrating conflicts when two people grab the same card,
//! and finalizing drops with optimistic settle animations. The host (a
//! browser binding or a native shell) wires DOM events, timers and animation
//! frames into [`engine::DragEngine`] and carries out the returned
//! [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | The reducer: applies every event and emits actions |
//! | [`session`] | Position Tracker: press, threshold promotion, input capture |
//! | [`target`] | Target Resolver: drop zones, candidate groups, tie-breaking |
//! | [`throttle`] | Broadcast Throttler: one position message per frame |
//! | [`remote`] | Remote Render Adapter: ghosts of other participants' drags |
//! | [`arbiter`] | Conflict Arbiter: force-release when the server picks another dragger |
//! | [`finalize`] | Drop Finalizer: target type rule and settle countdowns |
//! | [`placeholder`] | Group height animations around pickup and landing |
//! | [`animation`] | Declarative animation phases shared by ghosts and groups |
//! | [`cards`] | In-memory reflection and group store |
//! | [`geom`] | Points, rectangles and the geometry provider seam |
//! | [`portal`] | Portal registry seam and an in-memory implementation |
//! | [`wire`] | Conversion between engine intents and `frames` |
//! | [`config`] | Tunable thresholds and durations |
//! | [`consts`] | Default values and stacking orders |

pub mod animation;
pub mod arbiter;
pub mod cards;
pub mod config;
pub mod consts;
pub mod engine;
pub mod finalize;
pub mod geom;
pub mod placeholder;
pub mod portal;
pub mod remote;
pub mod session;
pub mod target;
pub mod throttle;
pub mod wire;

pub use engine::{Action, DragEngine, Mutation, Timer, TimerKind};
pub use wire::{Inbound, WireError};
