//! Native media engine
//!
//! Plays a direct video file through the surface's built-in decoder. Element
//! errors are terminal: they are mapped and surfaced without any retry.

use tracing::{debug, error, info, trace, warn};

use super::classifier::PlaybackTarget;
use super::error::UserFacingError;
use super::events::{AttachToken, EngineEvent, EventEmitter};
use super::surface::VideoSurface;
use crate::config::NativeConfig;

/// Engine handle for direct file playback.
#[derive(Debug)]
pub struct NativeEngine {
    token: AttachToken,
    url: String,
    attached: bool,
}

impl NativeEngine {
    /// Assigns the file to the surface and, with autoplay enabled, requests playback.
    pub fn attach(
        target: &PlaybackTarget,
        surface: &mut dyn VideoSurface,
        emitter: EventEmitter,
        config: &NativeConfig,
    ) -> Self {
        let token = emitter.token();
        info!(%token, url = %target.resolved_url, "Attaching native media engine");

        surface.bind_events(Some(emitter.clone()));
        surface.set_source(Some(&target.resolved_url));
        if config.autoplay {
            surface.request_play(&emitter);
        }

        Self {
            token,
            url: target.resolved_url.clone(),
            attached: true,
        }
    }

    /// Reacts to an event for this attach.
    ///
    /// Returns the error to surface when the event is terminal.
    pub fn handle_event(&mut self, event: &EngineEvent) -> Option<UserFacingError> {
        match event {
            EngineEvent::MediaError { code, message } => {
                error!(
                    token = %self.token,
                    code,
                    message = message.as_deref().unwrap_or(""),
                    src = %self.url,
                    "Video playback error"
                );
                Some(UserFacingError::from_media_error_code(*code))
            }
            EngineEvent::AutoplayRejected { reason } => {
                warn!(token = %self.token, reason = %reason, "Autoplay was prevented, waiting for user");
                None
            }
            EngineEvent::PlaybackStarted => {
                debug!(token = %self.token, "Native playback started");
                None
            }
            other => {
                trace!(token = %self.token, event = ?other, "Ignoring event for native playback");
                None
            }
        }
    }

    /// Releases the surface. Safe to call more than once.
    pub fn detach(&mut self, surface: &mut dyn VideoSurface) {
        if !self.attached {
            return;
        }
        self.attached = false;

        surface.bind_events(None);
        surface.pause();
        surface.set_source(None);
        info!(token = %self.token, "Detached native media engine");
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::playback::classifier::classify;
    use crate::playback::error::{ErrorCategory, MEDIA_ERR_DECODE};
    use crate::testing::FakeSurface;

    fn emitter() -> (EventEmitter, mpsc::UnboundedReceiver<crate::playback::SessionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let token = AttachToken {
            session_id: 1,
            generation: 1,
        };
        (EventEmitter::new(token, sender), receiver)
    }

    #[test]
    fn test_attach_assigns_source_and_autoplays() {
        let mut surface = FakeSurface::new();
        let (emitter, mut events) = emitter();
        let target = classify("https://cdn.example.com/movie.mp4");

        let engine = NativeEngine::attach(&target, &mut surface, emitter, &NativeConfig::default());

        assert!(engine.is_attached());
        assert_eq!(surface.source(), Some("https://cdn.example.com/movie.mp4"));
        assert_eq!(surface.play_requests(), 1);
        assert_eq!(
            events.try_recv().unwrap().event,
            EngineEvent::PlaybackStarted
        );
    }

    #[test]
    fn test_attach_without_autoplay_stays_paused() {
        let mut surface = FakeSurface::new();
        let (emitter, _events) = emitter();
        let target = classify("https://cdn.example.com/movie.webm");

        NativeEngine::attach(
            &target,
            &mut surface,
            emitter,
            &NativeConfig { autoplay: false },
        );

        assert_eq!(surface.play_requests(), 0);
        assert!(surface.is_paused());
    }

    #[test]
    fn test_media_error_is_terminal() {
        let mut surface = FakeSurface::new();
        let (emitter, _events) = emitter();
        let target = classify("https://cdn.example.com/movie.mp4");
        let mut engine =
            NativeEngine::attach(&target, &mut surface, emitter, &NativeConfig::default());

        let error = engine
            .handle_event(&EngineEvent::MediaError {
                code: MEDIA_ERR_DECODE,
                message: Some("PIPELINE_ERROR_DECODE".to_string()),
            })
            .unwrap();

        assert_eq!(error.category, ErrorCategory::DecodeError);
        assert!(!error.message.contains("PIPELINE"));
    }

    #[test]
    fn test_autoplay_rejection_is_not_an_error() {
        let mut surface = FakeSurface::new();
        let (emitter, _events) = emitter();
        let target = classify("https://cdn.example.com/movie.mp4");
        let mut engine =
            NativeEngine::attach(&target, &mut surface, emitter, &NativeConfig::default());

        let outcome = engine.handle_event(&EngineEvent::AutoplayRejected {
            reason: "NotAllowedError".to_string(),
        });

        assert!(outcome.is_none());
    }

    #[test]
    fn test_detach_is_idempotent() {
        let mut surface = FakeSurface::new();
        let (emitter, _events) = emitter();
        let target = classify("https://cdn.example.com/movie.mp4");
        let mut engine =
            NativeEngine::attach(&target, &mut surface, emitter, &NativeConfig::default());

        engine.detach(&mut surface);
        engine.detach(&mut surface);

        assert!(!engine.is_attached());
        assert_eq!(surface.source(), None);
        assert!(surface.bound_token().is_none());
        // Attach plus a single clear
        assert_eq!(surface.source_history().len(), 2);
    }
}
