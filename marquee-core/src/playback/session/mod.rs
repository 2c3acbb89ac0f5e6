//! Playback session control
//!
//! One session per player view. Selecting a server releases the current
//! engine, classifies the new URL and attaches its engine to the session's
//! surface. Events are processed from the session's own queue.

pub mod controller;
pub mod state;

pub use controller::PlaybackSession;
pub use state::{RenderRegion, SessionState};
