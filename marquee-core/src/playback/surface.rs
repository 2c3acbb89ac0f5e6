//! Playback surface abstraction

use super::events::EventEmitter;

/// MIME type probed to detect built-in adaptive stream support.
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

/// The video element a session renders into.
///
/// A session owns exactly one surface and lends it only to the engine that
/// is currently attached. Work that completes later (play requests, element
/// errors, metadata) is reported through an [`EventEmitter`].
pub trait VideoSurface {
    /// Assigns the element source, or clears it with `None`.
    fn set_source(&mut self, url: Option<&str>);

    /// Current element source.
    fn source(&self) -> Option<&str>;

    /// Whether the element can play the given MIME type natively.
    fn can_play_type(&self, mime_type: &str) -> bool;

    /// Starts a play request.
    ///
    /// The outcome arrives later as `PlaybackStarted` or `AutoplayRejected`
    /// on `emitter`.
    fn request_play(&mut self, emitter: &EventEmitter);

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Routes element events (`MediaReady`, `MediaError`) to `emitter`.
    ///
    /// `None` stops routing.
    fn bind_events(&mut self, emitter: Option<EventEmitter>);
}
