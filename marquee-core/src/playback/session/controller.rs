//! Session controller state machine

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, watch};
use tracing::{Span, debug, error, info, trace, warn};

use super::state::{RenderRegion, SessionState};
use crate::config::MarqueeConfig;
use crate::movie::Movie;
use crate::playback::classifier::{PlaybackTarget, classify};
use crate::playback::engine::Engine;
use crate::playback::error::{ErrorOverlay, PlaybackError, UserFacingError};
use crate::playback::events::{AttachToken, EventEmitter, SessionEvent};
use crate::playback::runtime::AdaptiveRuntime;
use crate::playback::surface::VideoSurface;
use crate::tracing_setup::session_span;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Playback state for one player view.
///
/// Owns the surface and at most one engine. Engines, runtimes and the
/// surface report back through the session's event queue; events from
/// an engine that has since been released are discarded.
pub struct PlaybackSession<S: VideoSurface> {
    id: u64,
    generation: u64,
    span: Span,
    surface: S,
    runtime: Option<Arc<dyn AdaptiveRuntime>>,
    config: MarqueeConfig,
    current_target: Option<PlaybackTarget>,
    engine: Option<Engine>,
    emitter: Option<EventEmitter>,
    error_state: Option<UserFacingError>,
    state_tx: watch::Sender<SessionState>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl<S: VideoSurface> PlaybackSession<S> {
    /// Creates an idle session rendering into `surface`.
    ///
    /// `runtime` is the adaptive streaming capability, if the host has one.
    /// Recovery budgets above `MAX_RECOVERY_ATTEMPTS` are clamped.
    pub fn new(
        surface: S,
        runtime: Option<Arc<dyn AdaptiveRuntime>>,
        config: MarqueeConfig,
    ) -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let span = session_span(id);
        span.in_scope(|| {
            debug!(adaptive_runtime = runtime.is_some(), "Created playback session");
        });

        Self {
            id,
            generation: 0,
            span,
            surface,
            runtime,
            config: config.bounded(),
            current_target: None,
            engine: None,
            emitter: None,
            error_state: None,
            state_tx,
            events_tx,
            events_rx,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn current_target(&self) -> Option<&PlaybackTarget> {
        self.current_target.as_ref()
    }

    /// Token of the current attach. Events carrying any other token are stale.
    pub fn current_token(&self) -> AttachToken {
        AttachToken {
            session_id: self.id,
            generation: self.generation,
        }
    }

    pub fn error(&self) -> Option<&UserFacingError> {
        self.error_state.as_ref()
    }

    /// Overlay to draw over the player while errored.
    pub fn overlay(&self) -> Option<ErrorOverlay> {
        self.error_state.as_ref().map(UserFacingError::overlay)
    }

    pub fn render_region(&self) -> RenderRegion<'_> {
        match &self.engine {
            None => RenderRegion::Empty,
            Some(engine) => match engine.frame() {
                Some(frame) => RenderRegion::Frame(frame),
                None => RenderRegion::Video,
            },
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Direct surface access for the host. Engines keep their own view of it.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Switches playback to `url`.
    ///
    /// The current engine is released before the new one is attached, and
    /// any surfaced error is cleared. Attach failures leave the session
    /// `Errored`.
    pub fn select_server(&mut self, url: &str) -> SessionState {
        let span = self.span.clone();
        let _entered = span.enter();

        self.release_engine();
        self.generation += 1;
        self.error_state = None;
        self.set_state(SessionState::Resolving);

        let target = classify(url);
        let emitter = EventEmitter::new(self.current_token(), self.events_tx.clone());
        info!(
            token = %emitter.token(),
            kind = %target.kind,
            url = %target.resolved_url,
            "Selecting playback server"
        );

        let attached = Engine::attach(
            &target,
            &mut self.surface,
            self.runtime.as_ref(),
            emitter.clone(),
            &self.config,
        );
        self.current_target = Some(target);

        match attached {
            Ok(engine) => {
                self.engine = Some(engine);
                self.emitter = Some(emitter);
                self.set_state(SessionState::Playing);
            }
            Err(e) => {
                error!(token = %emitter.token(), error = %e, "Failed to attach playback engine");
                self.error_state = Some(e.user_facing());
                self.set_state(SessionState::Errored);
            }
        }

        self.state()
    }

    /// Selects the movie's first server, or clears the session when it has none.
    pub fn select_default(&mut self, movie: &Movie) -> SessionState {
        match movie.default_server() {
            Some(server) => self.select_server(&server.url),
            None => {
                self.span
                    .in_scope(|| warn!(movie_id = %movie.id, "Movie has no playback servers"));
                self.clear();
                self.state()
            }
        }
    }

    /// Selects the movie's server at `index`.
    ///
    /// # Errors
    /// - `PlaybackError::NoServers` - The movie has no servers
    /// - `PlaybackError::ServerNotFound` - `index` is out of range
    pub fn select_movie_server(
        &mut self,
        movie: &Movie,
        index: usize,
    ) -> Result<SessionState, PlaybackError> {
        let url = movie.server(index)?.url.clone();
        Ok(self.select_server(&url))
    }

    /// Manual play request, e.g. after the host refused autoplay.
    ///
    /// Returns false when nothing is playing on the surface.
    pub fn play(&mut self) -> bool {
        if self.state() != SessionState::Playing {
            return false;
        }

        match (&self.engine, &self.emitter) {
            (Some(engine), Some(emitter)) if engine.uses_surface() => {
                self.surface.request_play(emitter);
                true
            }
            _ => false,
        }
    }

    /// Releases the engine and returns to `Idle`.
    pub fn clear(&mut self) {
        let span = self.span.clone();
        let _entered = span.enter();

        self.release_engine();
        self.generation += 1;
        self.current_target = None;
        self.error_state = None;
        self.set_state(SessionState::Idle);
    }

    /// Applies one event.
    ///
    /// Returns true when the event belonged to the current attach and was
    /// routed to its engine.
    pub fn handle_event(&mut self, event: SessionEvent) -> bool {
        let span = self.span.clone();
        let _entered = span.enter();

        let current = self.current_token();
        if event.token != current {
            debug!(
                stale = %event.token,
                %current,
                event = ?event.event,
                "Discarding event from released engine"
            );
            return false;
        }

        if self.state().is_errored() {
            trace!(token = %current, event = ?event.event, "Session errored, ignoring event");
            return false;
        }

        let Some(engine) = self.engine.as_mut() else {
            return false;
        };

        if let Some(user_error) = engine.handle_event(&event.event, &mut self.surface) {
            info!(
                token = %current,
                category = ?user_error.category,
                "Playback entered error state"
            );
            self.error_state = Some(user_error);
            self.set_state(SessionState::Errored);
        }

        true
    }

    /// Waits for the next queued event and applies it.
    pub async fn process_next_event(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => self.handle_event(event),
            None => false,
        }
    }

    /// Applies every event already queued. Returns how many were routed.
    pub fn drain_events(&mut self) -> usize {
        let mut routed = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.handle_event(event) {
                routed += 1;
            }
        }
        routed
    }

    fn release_engine(&mut self) {
        self.emitter = None;
        if let Some(mut engine) = self.engine.take() {
            engine.detach(&mut self.surface);
        }
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "Session state changed");
        }
    }
}

impl<S: VideoSurface> Drop for PlaybackSession<S> {
    fn drop(&mut self) {
        self.release_engine();
    }
}

impl<S: VideoSurface> std::fmt::Debug for PlaybackSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("state", &self.state())
            .field("current_target", &self.current_target)
            .field("engine", &self.engine)
            .field("error_state", &self.error_state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::error::{ErrorCategory, MEDIA_ERR_NETWORK};
    use crate::playback::events::{EngineEvent, RuntimeErrorEvent, RuntimeErrorKind};
    use crate::playback::{PlaybackKind, SessionEvent};
    use crate::testing::{FAKE_MEDIA_SOURCE, FakeRuntime, FakeSurface};

    const MANIFEST_A: &str = "https://cdn.example.com/a/index.m3u8";
    const FILE_B: &str = "https://cdn.example.com/b/movie.mp4";
    const FILE_C: &str = "https://cdn.example.com/c/movie.webm";

    fn session_with(
        surface: FakeSurface,
        runtime: &Arc<FakeRuntime>,
    ) -> PlaybackSession<FakeSurface> {
        let runtime: Arc<dyn AdaptiveRuntime> = runtime.clone();
        PlaybackSession::new(surface, Some(runtime), MarqueeConfig::default())
    }

    fn fatal(kind: RuntimeErrorKind) -> EngineEvent {
        EngineEvent::RuntimeError(RuntimeErrorEvent::fatal(kind, "levelLoadError"))
    }

    #[test]
    fn test_new_session_is_idle() {
        let runtime = Arc::new(FakeRuntime::new());
        let session = session_with(FakeSurface::new(), &runtime);

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.render_region(), RenderRegion::Empty);
        assert!(session.overlay().is_none());
    }

    #[test]
    fn test_session_ids_are_unique() {
        let runtime = Arc::new(FakeRuntime::new());
        let first = session_with(FakeSurface::new(), &runtime);
        let second = session_with(FakeSurface::new(), &runtime);

        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn test_adaptive_selection_plays_on_manifest() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut session = session_with(FakeSurface::new(), &runtime);

        assert_eq!(session.select_server(MANIFEST_A), SessionState::Playing);
        assert_eq!(session.render_region(), RenderRegion::Video);

        let emitter = runtime.latest_emitter().unwrap();
        emitter.emit(EngineEvent::ManifestParsed { levels: 4 });

        assert!(session.process_next_event().await);
        assert_eq!(session.surface().play_requests(), 1);
        // PlaybackStarted from the play request
        assert!(session.process_next_event().await);
        assert!(!session.surface().is_paused());
    }

    #[test]
    fn test_process_next_event_outside_runtime() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut session = session_with(FakeSurface::new(), &runtime);
        session.select_server(FILE_B);

        assert!(tokio_test::block_on(session.process_next_event()));

        session.surface().emit_media_error(MEDIA_ERR_NETWORK);
        assert!(tokio_test::block_on(session.process_next_event()));
        assert_eq!(session.state(), SessionState::Errored);
    }

    #[test]
    fn test_rapid_switching_only_last_engine_survives() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut session = session_with(FakeSurface::new(), &runtime);

        session.select_server(MANIFEST_A);
        let emitter_a = runtime.latest_emitter().unwrap();

        session.select_server(FILE_B);
        let emitter_b = session.surface().bound_emitter().unwrap();

        session.select_server(FILE_C);
        session.drain_events();

        emitter_a.emit(EngineEvent::ManifestParsed { levels: 2 });
        emitter_a.emit(fatal(RuntimeErrorKind::Network));
        emitter_b.emit(EngineEvent::MediaError {
            code: MEDIA_ERR_NETWORK,
            message: None,
        });

        assert_eq!(session.drain_events(), 0);
        assert_eq!(session.state(), SessionState::Playing);
        assert!(session.error().is_none());
        assert_eq!(session.surface().source(), Some(FILE_C));
        assert_eq!(runtime.log().sessions_destroyed, 1);
        assert_eq!(runtime.log().start_load_calls, 0);
    }

    #[test]
    fn test_two_fatal_network_errors_surface_network_error() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut session = session_with(FakeSurface::new(), &runtime);
        session.select_server(MANIFEST_A);

        let emitter = runtime.latest_emitter().unwrap();
        emitter.emit(fatal(RuntimeErrorKind::Network));
        session.drain_events();
        assert_eq!(session.state(), SessionState::Playing);

        emitter.emit(fatal(RuntimeErrorKind::Network));
        session.drain_events();

        assert_eq!(session.state(), SessionState::Errored);
        let error = session.error().unwrap();
        assert_eq!(error.category, ErrorCategory::NetworkError);

        let overlay = session.overlay().unwrap();
        assert_eq!(overlay.message, ErrorCategory::NetworkError.default_message());
        assert!(!overlay.message.contains("levelLoadError"));
    }

    #[test]
    fn test_errored_session_ignores_further_events() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut session = session_with(FakeSurface::new(), &runtime);
        session.select_server(FILE_B);
        session.drain_events();

        session.surface().emit_media_error(3);
        session.surface().emit_media_error(2);
        session.drain_events();

        assert_eq!(session.state(), SessionState::Errored);
        assert_eq!(session.error().unwrap().category, ErrorCategory::DecodeError);
    }

    #[test]
    fn test_new_selection_leaves_errored() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut session = session_with(FakeSurface::new(), &runtime);
        session.select_server(FILE_B);
        session.surface().emit_media_error(4);
        session.drain_events();
        assert_eq!(session.state(), SessionState::Errored);

        assert_eq!(session.select_server(FILE_C), SessionState::Playing);
        assert!(session.error().is_none());
        assert!(session.overlay().is_none());
    }

    #[test]
    fn test_autoplay_rejection_keeps_playing_state() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut session = session_with(FakeSurface::new().with_autoplay_blocked(), &runtime);

        session.select_server(FILE_B);
        assert_eq!(session.drain_events(), 1);

        assert_eq!(session.state(), SessionState::Playing);
        assert!(session.error().is_none());
        assert!(session.surface().is_paused());
        assert!(session.play());
        assert_eq!(session.surface().play_requests(), 2);
    }

    #[test]
    fn test_unplayable_manifest_errors_with_unsupported_format() {
        let runtime = Arc::new(FakeRuntime::unsupported());
        let mut session = session_with(FakeSurface::new(), &runtime);

        assert_eq!(session.select_server(MANIFEST_A), SessionState::Errored);
        assert_eq!(
            session.error().unwrap().category,
            ErrorCategory::UnsupportedFormat
        );
        assert_eq!(session.render_region(), RenderRegion::Empty);
    }

    #[test]
    fn test_embedded_frame_region() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut session = session_with(FakeSurface::new(), &runtime);

        session.select_server("https://files.fm/u/xyz?lang=en");

        assert_eq!(
            session.current_target().map(|target| target.kind),
            Some(PlaybackKind::EmbeddedFrame)
        );
        match session.render_region() {
            RenderRegion::Frame(frame) => assert_eq!(frame.src, "https://files.fm/u/xyz?iframe"),
            other => panic!("expected frame region, got {other:?}"),
        }
        assert!(!session.play());
    }

    #[test]
    fn test_clear_releases_engine_and_ignores_late_events() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut session = session_with(FakeSurface::new(), &runtime);
        session.select_server(MANIFEST_A);
        let emitter = runtime.latest_emitter().unwrap();

        session.clear();
        emitter.emit(fatal(RuntimeErrorKind::Media));

        assert_eq!(session.drain_events(), 0);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.surface().source(), None);
        assert_eq!(runtime.log().sessions_destroyed, 1);
    }

    #[test]
    fn test_drop_releases_runtime_session() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut session = session_with(FakeSurface::new(), &runtime);
        session.select_server(MANIFEST_A);

        drop(session);

        assert_eq!(runtime.log().sessions_destroyed, 1);
    }

    #[test]
    fn test_state_changes_are_published() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut session = session_with(FakeSurface::new(), &runtime);
        let mut states = session.subscribe();

        session.select_server(MANIFEST_A);
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), SessionState::Playing);

        session.clear();
        assert_eq!(*states.borrow_and_update(), SessionState::Idle);
    }

    #[test]
    fn test_foreign_session_events_are_stale() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut session = session_with(FakeSurface::new(), &runtime);
        session.select_server(FILE_B);
        session.drain_events();

        let foreign = SessionEvent {
            token: AttachToken {
                session_id: session.id() + 1000,
                generation: session.current_token().generation,
            },
            event: EngineEvent::MediaError {
                code: 2,
                message: None,
            },
        };

        assert!(!session.handle_event(foreign));
        assert_eq!(session.state(), SessionState::Playing);
    }

    #[test]
    fn test_adaptive_fallback_source_is_the_manifest() {
        let runtime = Arc::new(FakeRuntime::unsupported());
        let mut session = session_with(FakeSurface::new().with_native_hls(), &runtime);

        session.select_server(MANIFEST_A);
        session.surface().emit_media_ready();
        session.drain_events();

        assert_eq!(session.surface().source(), Some(MANIFEST_A));
        assert_eq!(session.surface().play_requests(), 1);
        assert_ne!(session.surface().source(), Some(FAKE_MEDIA_SOURCE));
    }
}
