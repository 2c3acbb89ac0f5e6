//! Optional adaptive-streaming runtime
//!
//! The runtime is probed at construction time and injected into the
//! adaptive engine. Its absence is not an error: the engine falls back to
//! the surface's built-in support.

use super::events::EventEmitter;
use super::surface::VideoSurface;

/// Failure reported synchronously by a runtime call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct RuntimeError {
    pub reason: String,
}

impl RuntimeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Factory for adaptive playback sessions.
pub trait AdaptiveRuntime: Send + Sync {
    /// Capability probe, checked before every attach.
    fn is_supported(&self) -> bool;

    /// Creates a session whose callbacks are sent through `emitter`.
    ///
    /// # Errors
    /// - `RuntimeError` - The runtime could not allocate a session
    fn create_session(&self, emitter: EventEmitter)
    -> Result<Box<dyn AdaptiveSession>, RuntimeError>;
}

/// One adaptive playback session bound to one attach.
///
/// Manifest parsing and errors are reported asynchronously as
/// `ManifestParsed` and `RuntimeError` events.
pub trait AdaptiveSession {
    /// Begins loading the manifest at `url`.
    ///
    /// # Errors
    /// - `RuntimeError` - The load could not be started
    fn load_source(&mut self, url: &str) -> Result<(), RuntimeError>;

    /// Binds the session's output to the surface.
    ///
    /// # Errors
    /// - `RuntimeError` - The surface could not be bound
    fn attach_media(&mut self, surface: &mut dyn VideoSurface) -> Result<(), RuntimeError>;

    /// Restarts the segment loader after a network failure.
    ///
    /// # Errors
    /// - `RuntimeError` - The loader could not be restarted
    fn start_load(&mut self) -> Result<(), RuntimeError>;

    /// Attempts to recover the media pipeline after a decode failure.
    ///
    /// # Errors
    /// - `RuntimeError` - Recovery could not be started
    fn recover_media_error(&mut self) -> Result<(), RuntimeError>;

    /// Releases every resource held by the session.
    fn destroy(&mut self);
}
