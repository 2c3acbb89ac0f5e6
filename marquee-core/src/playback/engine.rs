//! Engine dispatch
//!
//! One attach produces exactly one engine, chosen by the target's
//! [`PlaybackKind`]. The session only ever talks to [`Engine`].

use std::sync::Arc;

use tracing::{debug, info, trace};

use super::adaptive::AdaptiveEngine;
use super::classifier::{PlaybackKind, PlaybackTarget};
use super::embed::{self, FrameSpec};
use super::error::{PlaybackError, UserFacingError};
use super::events::{EngineEvent, EventEmitter};
use super::native::NativeEngine;
use super::runtime::AdaptiveRuntime;
use super::surface::VideoSurface;
use crate::config::MarqueeConfig;

/// Embedded frame "engine". The frame replaces the surface entirely.
#[derive(Debug)]
pub struct FrameEngine {
    spec: FrameSpec,
    attached: bool,
}

impl FrameEngine {
    fn attach(target: &PlaybackTarget, surface: &mut dyn VideoSurface) -> Self {
        let spec = embed::resolve(target);
        info!(src = %spec.src, sandbox = %spec.sandbox, "Attaching embedded frame");

        // The surface is hidden while a frame is shown and must not keep loading.
        if surface.source().is_some() {
            surface.pause();
            surface.set_source(None);
        }

        Self {
            spec,
            attached: true,
        }
    }

    pub fn spec(&self) -> &FrameSpec {
        &self.spec
    }

    fn detach(&mut self) {
        if self.attached {
            self.attached = false;
            debug!(src = %self.spec.src, "Detached embedded frame");
        }
    }
}

/// Engine bound to the current attach.
#[derive(Debug)]
pub enum Engine {
    Adaptive(AdaptiveEngine),
    Native(NativeEngine),
    Frame(FrameEngine),
}

impl Engine {
    /// Builds and attaches the engine for `target`.
    ///
    /// # Errors
    /// - `PlaybackError::Unplayable` - Adaptive stream with no runtime and no native manifest support
    /// - `PlaybackError::Runtime` - Adaptive runtime refused the attach
    pub fn attach(
        target: &PlaybackTarget,
        surface: &mut dyn VideoSurface,
        runtime: Option<&Arc<dyn AdaptiveRuntime>>,
        emitter: EventEmitter,
        config: &MarqueeConfig,
    ) -> Result<Self, PlaybackError> {
        let engine = match target.kind {
            PlaybackKind::AdaptiveStream => Engine::Adaptive(AdaptiveEngine::attach(
                target,
                surface,
                runtime,
                emitter,
                &config.adaptive,
            )?),
            PlaybackKind::NativeFile => {
                Engine::Native(NativeEngine::attach(target, surface, emitter, &config.native))
            }
            PlaybackKind::EmbeddedFrame => Engine::Frame(FrameEngine::attach(target, surface)),
        };

        Ok(engine)
    }

    /// Forwards an event to the engine. Returns the error to surface when terminal.
    pub fn handle_event(
        &mut self,
        event: &EngineEvent,
        surface: &mut dyn VideoSurface,
    ) -> Option<UserFacingError> {
        match self {
            Engine::Adaptive(engine) => engine.handle_event(event, surface),
            Engine::Native(engine) => engine.handle_event(event),
            Engine::Frame(_) => {
                trace!(event = ?event, "Embedded frame ignores engine events");
                None
            }
        }
    }

    /// Releases everything the engine holds. Safe to call more than once.
    pub fn detach(&mut self, surface: &mut dyn VideoSurface) {
        match self {
            Engine::Adaptive(engine) => engine.detach(surface),
            Engine::Native(engine) => engine.detach(surface),
            Engine::Frame(engine) => engine.detach(),
        }
    }

    pub fn kind(&self) -> PlaybackKind {
        match self {
            Engine::Adaptive(_) => PlaybackKind::AdaptiveStream,
            Engine::Native(_) => PlaybackKind::NativeFile,
            Engine::Frame(_) => PlaybackKind::EmbeddedFrame,
        }
    }

    /// Frame to render, when this is an embedded frame.
    pub fn frame(&self) -> Option<&FrameSpec> {
        match self {
            Engine::Frame(engine) => Some(engine.spec()),
            _ => None,
        }
    }

    /// Whether playback renders into the surface.
    pub fn uses_surface(&self) -> bool {
        !matches!(self, Engine::Frame(_))
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::playback::classifier::classify;
    use crate::playback::events::AttachToken;
    use crate::testing::{FakeRuntime, FakeSurface};

    fn emitter() -> EventEmitter {
        let (sender, _receiver) = mpsc::unbounded_channel();
        EventEmitter::new(
            AttachToken {
                session_id: 9,
                generation: 1,
            },
            sender,
        )
    }

    #[test]
    fn test_attach_dispatches_on_kind() {
        let runtime: Arc<dyn AdaptiveRuntime> = Arc::new(FakeRuntime::new());
        let config = MarqueeConfig::default();
        let mut surface = FakeSurface::new();

        let cases = [
            ("https://cdn.example.com/live.m3u8", PlaybackKind::AdaptiveStream),
            ("https://cdn.example.com/movie.mp4", PlaybackKind::NativeFile),
            ("https://videa.hu/letoltes/abc", PlaybackKind::EmbeddedFrame),
        ];

        for (url, kind) in cases {
            let mut engine = Engine::attach(
                &classify(url),
                &mut surface,
                Some(&runtime),
                emitter(),
                &config,
            )
            .unwrap();
            assert_eq!(engine.kind(), kind);
            engine.detach(&mut surface);
        }
    }

    #[test]
    fn test_frame_engine_clears_surface() {
        let config = MarqueeConfig::default();
        let mut surface = FakeSurface::new();
        surface.set_source(Some("https://cdn.example.com/previous.mp4"));

        let engine = Engine::attach(
            &classify("https://example.com/player/embed/42"),
            &mut surface,
            None,
            emitter(),
            &config,
        )
        .unwrap();

        assert_eq!(surface.source(), None);
        assert!(!engine.uses_surface());
        assert_eq!(
            engine.frame().map(|frame| frame.src.as_str()),
            Some("https://example.com/player/embed/42")
        );
    }

    #[test]
    fn test_frame_engine_ignores_events() {
        let config = MarqueeConfig::default();
        let mut surface = FakeSurface::new();
        let mut engine = Engine::attach(
            &classify("https://example.com/watch/42"),
            &mut surface,
            None,
            emitter(),
            &config,
        )
        .unwrap();

        let outcome = engine.handle_event(
            &EngineEvent::MediaError {
                code: 3,
                message: None,
            },
            &mut surface,
        );

        assert!(outcome.is_none());
    }
}
