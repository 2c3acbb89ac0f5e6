//! Adaptive stream engine
//!
//! Plays a segmented manifest either through an injected adaptive runtime
//! or, when no capable runtime is present, through the surface's built-in
//! support for the manifest MIME type. Fatal network and decode errors get a
//! bounded, category-specific recovery attempt before they are surfaced.

use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use super::classifier::PlaybackTarget;
use super::error::{PlaybackError, UserFacingError};
use super::events::{AttachToken, EngineEvent, EventEmitter, RuntimeErrorEvent, RuntimeErrorKind};
use super::runtime::{AdaptiveRuntime, AdaptiveSession, RuntimeError};
use super::surface::{HLS_MIME_TYPE, VideoSurface};
use crate::config::{AdaptiveConfig, MAX_RECOVERY_ATTEMPTS};

/// Which playback path an adaptive attach ended up on.
enum AdaptivePath {
    /// Injected runtime drives the surface
    Runtime(Box<dyn AdaptiveSession>),
    /// Surface plays the manifest by itself
    NativeSurface,
}

/// Remaining recovery attempts for one attach.
#[derive(Debug, Clone, Copy)]
struct RecoveryBudget {
    network: u32,
    media: u32,
}

impl RecoveryBudget {
    fn from_config(config: &AdaptiveConfig) -> Self {
        Self {
            network: config.network_recovery_attempts.min(MAX_RECOVERY_ATTEMPTS),
            media: config.media_recovery_attempts.min(MAX_RECOVERY_ATTEMPTS),
        }
    }

    /// Consumes one attempt for `kind`, if it has any left.
    fn take(&mut self, kind: RuntimeErrorKind) -> bool {
        let remaining = match kind {
            RuntimeErrorKind::Network => &mut self.network,
            RuntimeErrorKind::Media => &mut self.media,
            RuntimeErrorKind::Unsupported | RuntimeErrorKind::Other => return false,
        };

        if *remaining == 0 {
            return false;
        }
        *remaining -= 1;
        true
    }
}

/// Engine handle for adaptive stream playback.
pub struct AdaptiveEngine {
    token: AttachToken,
    url: String,
    emitter: EventEmitter,
    autoplay: bool,
    path: Option<AdaptivePath>,
    budget: RecoveryBudget,
}

impl AdaptiveEngine {
    /// Attaches a manifest to the surface.
    ///
    /// Prefers the runtime when it is present and reports itself supported,
    /// then the surface's own manifest support.
    ///
    /// # Errors
    /// - `PlaybackError::Runtime` - The runtime refused to create, load, or bind the session
    /// - `PlaybackError::Unplayable` - Neither the runtime nor the surface can play the manifest
    pub fn attach(
        target: &PlaybackTarget,
        surface: &mut dyn VideoSurface,
        runtime: Option<&Arc<dyn AdaptiveRuntime>>,
        emitter: EventEmitter,
        config: &AdaptiveConfig,
    ) -> Result<Self, PlaybackError> {
        let token = emitter.token();
        let url = target.resolved_url.as_str();

        let path = match runtime.filter(|runtime| runtime.is_supported()) {
            Some(runtime) => {
                info!(%token, url, "Attaching adaptive stream through runtime");
                AdaptivePath::Runtime(Self::start_runtime_session(
                    &**runtime,
                    url,
                    surface,
                    emitter.clone(),
                )?)
            }
            None if surface.can_play_type(HLS_MIME_TYPE) => {
                info!(%token, url, "Attaching adaptive stream through native surface support");
                surface.bind_events(Some(emitter.clone()));
                surface.set_source(Some(url));
                AdaptivePath::NativeSurface
            }
            None => {
                warn!(%token, url, "No adaptive runtime or native manifest support available");
                return Err(PlaybackError::Unplayable {
                    url: url.to_string(),
                });
            }
        };

        Ok(Self {
            token,
            url: url.to_string(),
            emitter,
            autoplay: config.autoplay,
            path: Some(path),
            budget: RecoveryBudget::from_config(config),
        })
    }

    /// Creates, loads and binds a runtime session, destroying it on partial failure.
    fn start_runtime_session(
        runtime: &dyn AdaptiveRuntime,
        url: &str,
        surface: &mut dyn VideoSurface,
        emitter: EventEmitter,
    ) -> Result<Box<dyn AdaptiveSession>, PlaybackError> {
        let mut session =
            runtime
                .create_session(emitter)
                .map_err(|source| PlaybackError::Runtime {
                    operation: "create_session",
                    source,
                })?;

        let started = session
            .load_source(url)
            .map_err(|source| PlaybackError::Runtime {
                operation: "load_source",
                source,
            })
            .and_then(|()| {
                session
                    .attach_media(surface)
                    .map_err(|source| PlaybackError::Runtime {
                        operation: "attach_media",
                        source,
                    })
            });

        if let Err(e) = started {
            session.destroy();
            surface.set_source(None);
            return Err(e);
        }

        Ok(session)
    }

    /// Reacts to an event for this attach.
    ///
    /// Returns the error to surface when the event is terminal.
    pub fn handle_event(
        &mut self,
        event: &EngineEvent,
        surface: &mut dyn VideoSurface,
    ) -> Option<UserFacingError> {
        match event {
            EngineEvent::ManifestParsed { levels } => {
                debug!(token = %self.token, levels, "Manifest parsed");
                if self.is_runtime_driven() {
                    self.autoplay(surface);
                }
                None
            }
            EngineEvent::MediaReady => {
                if matches!(self.path, Some(AdaptivePath::NativeSurface)) {
                    debug!(token = %self.token, "Native manifest metadata ready");
                    self.autoplay(surface);
                }
                None
            }
            EngineEvent::AutoplayRejected { reason } => {
                warn!(token = %self.token, reason = %reason, "Autoplay was prevented, waiting for user");
                None
            }
            EngineEvent::PlaybackStarted => {
                debug!(token = %self.token, "Adaptive playback started");
                None
            }
            EngineEvent::RuntimeError(runtime_error) => self.handle_runtime_error(runtime_error),
            EngineEvent::MediaError { code, message } => {
                error!(
                    token = %self.token,
                    code,
                    message = message.as_deref().unwrap_or(""),
                    src = %self.url,
                    "Adaptive surface playback error"
                );
                Some(UserFacingError::from_media_error_code(*code))
            }
        }
    }

    fn autoplay(&self, surface: &mut dyn VideoSurface) {
        if self.autoplay {
            surface.request_play(&self.emitter);
        } else {
            trace!(token = %self.token, "Autoplay disabled, waiting for user");
        }
    }

    fn handle_runtime_error(&mut self, runtime_error: &RuntimeErrorEvent) -> Option<UserFacingError> {
        let kind = runtime_error.kind;

        if !runtime_error.fatal {
            warn!(
                token = %self.token,
                ?kind,
                details = %runtime_error.details,
                "Non-fatal adaptive stream error"
            );
            return None;
        }

        if self.budget.take(kind) {
            match self.recover(kind) {
                Ok(()) => {
                    info!(
                        token = %self.token,
                        ?kind,
                        details = %runtime_error.details,
                        "Fatal adaptive stream error, recovery attempted"
                    );
                    return None;
                }
                Err(e) => {
                    warn!(token = %self.token, ?kind, error = %e, "Adaptive stream recovery failed");
                }
            }
        }

        error!(
            token = %self.token,
            ?kind,
            details = %runtime_error.details,
            src = %self.url,
            "Terminal adaptive stream error"
        );
        Some(UserFacingError::new(kind.category()))
    }

    /// Runs the category-specific recovery on the runtime session.
    fn recover(&mut self, kind: RuntimeErrorKind) -> Result<(), RuntimeError> {
        let Some(AdaptivePath::Runtime(session)) = self.path.as_mut() else {
            return Err(RuntimeError::new("no runtime session to recover"));
        };

        match kind {
            RuntimeErrorKind::Network => session.start_load(),
            RuntimeErrorKind::Media => session.recover_media_error(),
            RuntimeErrorKind::Unsupported | RuntimeErrorKind::Other => {
                Err(RuntimeError::new("error category is not recoverable"))
            }
        }
    }

    /// Releases the runtime session and the surface. Safe to call more than once.
    pub fn detach(&mut self, surface: &mut dyn VideoSurface) {
        let Some(path) = self.path.take() else {
            return;
        };

        match path {
            AdaptivePath::Runtime(mut session) => session.destroy(),
            AdaptivePath::NativeSurface => surface.bind_events(None),
        }
        surface.pause();
        surface.set_source(None);
        info!(token = %self.token, "Detached adaptive stream engine");
    }

    pub fn is_attached(&self) -> bool {
        self.path.is_some()
    }

    /// Whether playback goes through the injected runtime.
    pub fn is_runtime_driven(&self) -> bool {
        matches!(self.path, Some(AdaptivePath::Runtime(_)))
    }
}

impl std::fmt::Debug for AdaptiveEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveEngine")
            .field("token", &self.token)
            .field("url", &self.url)
            .field("attached", &self.is_attached())
            .field("runtime_driven", &self.is_runtime_driven())
            .field("budget", &self.budget)
            .finish()
    }
}

impl Drop for AdaptiveEngine {
    fn drop(&mut self) {
        if let Some(AdaptivePath::Runtime(mut session)) = self.path.take() {
            warn!(token = %self.token, "Adaptive engine dropped while attached, destroying runtime session");
            session.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::playback::classifier::classify;
    use crate::playback::error::ErrorCategory;
    use crate::playback::events::SessionEvent;
    use crate::testing::{FAKE_MEDIA_SOURCE, FakeRuntime, FakeSurface};

    const MANIFEST: &str = "https://cdn.example.com/movie/index.m3u8?token=abc";

    fn emitter() -> (EventEmitter, mpsc::UnboundedReceiver<SessionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let token = AttachToken {
            session_id: 1,
            generation: 1,
        };
        (EventEmitter::new(token, sender), receiver)
    }

    fn attach_with(
        runtime: &Arc<FakeRuntime>,
        surface: &mut FakeSurface,
    ) -> Result<AdaptiveEngine, PlaybackError> {
        let runtime: Arc<dyn AdaptiveRuntime> = runtime.clone();
        let (emitter, _events) = emitter();
        AdaptiveEngine::attach(
            &classify(MANIFEST),
            surface,
            Some(&runtime),
            emitter,
            &AdaptiveConfig::default(),
        )
    }

    fn fatal(kind: RuntimeErrorKind) -> EngineEvent {
        EngineEvent::RuntimeError(RuntimeErrorEvent::fatal(kind, "fragLoadError"))
    }

    #[test]
    fn test_runtime_path_loads_manifest() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut surface = FakeSurface::new();

        let engine = attach_with(&runtime, &mut surface).unwrap();

        assert!(engine.is_runtime_driven());
        assert_eq!(runtime.log().loaded_sources, vec![MANIFEST.to_string()]);
        assert_eq!(surface.source(), Some(FAKE_MEDIA_SOURCE));
        assert_eq!(surface.play_requests(), 0);
    }

    #[test]
    fn test_manifest_parsed_requests_play() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut surface = FakeSurface::new();
        let mut engine = attach_with(&runtime, &mut surface).unwrap();

        let outcome = engine.handle_event(&EngineEvent::ManifestParsed { levels: 3 }, &mut surface);

        assert!(outcome.is_none());
        assert_eq!(surface.play_requests(), 1);
    }

    #[test]
    fn test_native_fallback_when_runtime_unsupported() {
        let runtime = Arc::new(FakeRuntime::unsupported());
        let mut surface = FakeSurface::new().with_native_hls();

        let mut engine = attach_with(&runtime, &mut surface).unwrap();

        assert!(!engine.is_runtime_driven());
        assert_eq!(runtime.log().sessions_created, 0);
        assert_eq!(surface.source(), Some(MANIFEST));

        engine.handle_event(&EngineEvent::MediaReady, &mut surface);
        assert_eq!(surface.play_requests(), 1);
    }

    #[test]
    fn test_native_fallback_maps_surface_errors() {
        let mut surface = FakeSurface::new().with_native_hls();
        let (emitter, _events) = emitter();
        let mut engine = AdaptiveEngine::attach(
            &classify(MANIFEST),
            &mut surface,
            None,
            emitter,
            &AdaptiveConfig::default(),
        )
        .unwrap();

        let error = engine
            .handle_event(
                &EngineEvent::MediaError {
                    code: 2,
                    message: None,
                },
                &mut surface,
            )
            .unwrap();

        assert_eq!(error.category, ErrorCategory::NetworkError);
    }

    #[test]
    fn test_unplayable_without_runtime_or_native_support() {
        let mut surface = FakeSurface::new();
        let (emitter, _events) = emitter();

        let result = AdaptiveEngine::attach(
            &classify(MANIFEST),
            &mut surface,
            None,
            emitter,
            &AdaptiveConfig::default(),
        );

        assert!(matches!(result, Err(PlaybackError::Unplayable { .. })));
        assert_eq!(surface.source(), None);
    }

    #[test]
    fn test_partial_attach_failure_destroys_session() {
        let runtime = Arc::new(FakeRuntime::new().with_failing_attach());
        let mut surface = FakeSurface::new();

        let result = attach_with(&runtime, &mut surface);

        assert!(matches!(
            result,
            Err(PlaybackError::Runtime {
                operation: "attach_media",
                ..
            })
        ));
        assert_eq!(runtime.log().sessions_destroyed, 1);
        assert_eq!(surface.source(), None);
    }

    #[test]
    fn test_second_fatal_network_error_is_terminal() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut surface = FakeSurface::new();
        let mut engine = attach_with(&runtime, &mut surface).unwrap();

        let first = engine.handle_event(&fatal(RuntimeErrorKind::Network), &mut surface);
        assert!(first.is_none());
        assert_eq!(runtime.log().start_load_calls, 1);

        let second = engine
            .handle_event(&fatal(RuntimeErrorKind::Network), &mut surface)
            .unwrap();
        assert_eq!(second.category, ErrorCategory::NetworkError);
        assert_eq!(runtime.log().start_load_calls, 1);
    }

    #[test]
    fn test_fatal_media_error_recovers_once() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut surface = FakeSurface::new();
        let mut engine = attach_with(&runtime, &mut surface).unwrap();

        assert!(
            engine
                .handle_event(&fatal(RuntimeErrorKind::Media), &mut surface)
                .is_none()
        );
        assert_eq!(runtime.log().recover_media_calls, 1);

        let terminal = engine
            .handle_event(&fatal(RuntimeErrorKind::Media), &mut surface)
            .unwrap();
        assert_eq!(terminal.category, ErrorCategory::DecodeError);
    }

    #[test]
    fn test_failed_recovery_is_terminal() {
        let runtime = Arc::new(FakeRuntime::new().with_failing_recovery());
        let mut surface = FakeSurface::new();
        let mut engine = attach_with(&runtime, &mut surface).unwrap();

        let error = engine
            .handle_event(&fatal(RuntimeErrorKind::Network), &mut surface)
            .unwrap();

        assert_eq!(error.category, ErrorCategory::NetworkError);
        assert_eq!(runtime.log().start_load_calls, 1);
    }

    #[test]
    fn test_unrecoverable_categories_are_terminal_immediately() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut surface = FakeSurface::new();
        let mut engine = attach_with(&runtime, &mut surface).unwrap();

        let unsupported = engine
            .handle_event(&fatal(RuntimeErrorKind::Unsupported), &mut surface)
            .unwrap();
        assert_eq!(unsupported.category, ErrorCategory::UnsupportedFormat);

        let other = engine
            .handle_event(&fatal(RuntimeErrorKind::Other), &mut surface)
            .unwrap();
        assert_eq!(other.category, ErrorCategory::Unknown);

        let log = runtime.log();
        assert_eq!(log.start_load_calls + log.recover_media_calls, 0);
    }

    #[test]
    fn test_non_fatal_errors_are_not_surfaced() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut surface = FakeSurface::new();
        let mut engine = attach_with(&runtime, &mut surface).unwrap();

        let event = EngineEvent::RuntimeError(RuntimeErrorEvent::non_fatal(
            RuntimeErrorKind::Media,
            "bufferStalledError",
        ));

        assert!(engine.handle_event(&event, &mut surface).is_none());
        assert_eq!(runtime.log().recover_media_calls, 0);
    }

    #[test]
    fn test_detach_destroys_runtime_session_once() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut surface = FakeSurface::new();
        let mut engine = attach_with(&runtime, &mut surface).unwrap();

        engine.detach(&mut surface);
        engine.detach(&mut surface);
        drop(engine);

        assert_eq!(runtime.log().sessions_destroyed, 1);
        assert_eq!(surface.source(), None);
    }

    #[test]
    fn test_drop_without_detach_destroys_session() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut surface = FakeSurface::new();
        let engine = attach_with(&runtime, &mut surface).unwrap();

        drop(engine);

        assert_eq!(runtime.log().sessions_destroyed, 1);
    }
}
