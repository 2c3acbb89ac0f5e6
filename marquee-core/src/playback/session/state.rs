//! Session lifecycle state and render output

use serde::Serialize;

use crate::playback::embed::FrameSpec;

/// Lifecycle of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionState {
    /// No server selected
    Idle,
    /// A server was selected and its engine is being attached
    Resolving,
    /// Engine attached, events flowing
    Playing,
    /// Terminal error surfaced; only a new selection leaves this state
    Errored,
}

impl SessionState {
    pub fn is_errored(&self) -> bool {
        matches!(self, SessionState::Errored)
    }
}

/// What the player area renders for the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderRegion<'a> {
    /// Nothing selected, or attach failed before anything was shown
    Empty,
    /// The session's video surface
    Video,
    /// A sandboxed embedded frame in place of the surface
    Frame(&'a FrameSpec),
}
