//! Session lifecycle across source switches
//!
//! Verifies that only the most recent selection ever reaches the surface and
//! that released engines give back everything they acquired.

use std::sync::Arc;

use marquee_core::playback::{
    AdaptiveRuntime, EngineEvent, RenderRegion, RuntimeErrorEvent, RuntimeErrorKind, VideoSurface,
};
use marquee_core::testing::{FAKE_MEDIA_SOURCE, FakeRuntime, FakeSurface};
use marquee_core::{ErrorCategory, MarqueeConfig, PlaybackSession, SessionState};

fn new_session(
    surface: FakeSurface,
    runtime: &Arc<FakeRuntime>,
    config: MarqueeConfig,
) -> PlaybackSession<FakeSurface> {
    let runtime: Arc<dyn AdaptiveRuntime> = runtime.clone();
    PlaybackSession::new(surface, Some(runtime), config)
}

#[tokio::test]
async fn test_rapid_switching_between_three_servers() {
    let runtime = Arc::new(FakeRuntime::new());
    let mut session = new_session(FakeSurface::new(), &runtime, MarqueeConfig::default());

    session.select_server("https://cdn.example.com/a/index.m3u8");
    session.select_server("https://cdn.example.com/b/index.m3u8");
    session.select_server("https://cdn.example.com/c/index.m3u8");

    let stale_adaptive = runtime.emitter(0).unwrap();
    let stale_second = runtime.emitter(1).unwrap();
    let current = runtime.emitter(2).unwrap();
    assert!(runtime.emitter(3).is_none());

    stale_adaptive.emit(EngineEvent::ManifestParsed { levels: 3 });
    stale_second.emit(EngineEvent::RuntimeError(RuntimeErrorEvent::fatal(
        RuntimeErrorKind::Media,
        "bufferAppendError",
    )));
    current.emit(EngineEvent::ManifestParsed { levels: 5 });

    assert_eq!(session.drain_events(), 2);

    let log = runtime.log();
    assert_eq!(log.sessions_created, 3);
    assert_eq!(log.sessions_destroyed, 2);
    assert_eq!(log.recover_media_calls, 0);
    assert_eq!(session.surface().play_requests(), 1);
    assert_eq!(session.surface().source(), Some(FAKE_MEDIA_SOURCE));
    assert_eq!(session.state(), SessionState::Playing);
}

#[tokio::test]
async fn test_events_are_processed_in_order() {
    let runtime = Arc::new(FakeRuntime::new());
    let mut session = new_session(FakeSurface::new(), &runtime, MarqueeConfig::default());
    let mut states = session.subscribe();

    session.select_server("https://cdn.example.com/movie.mp4");
    assert_eq!(*states.borrow_and_update(), SessionState::Playing);

    // Queued by the autoplay request
    assert!(session.process_next_event().await);

    session.surface().emit_media_error(2);
    assert!(session.process_next_event().await);

    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), SessionState::Errored);
    assert_eq!(
        session.error().map(|error| error.category),
        Some(ErrorCategory::NetworkError)
    );
}

#[test]
fn test_switching_from_video_to_frame_and_back() {
    let runtime = Arc::new(FakeRuntime::new());
    let mut session = new_session(FakeSurface::new(), &runtime, MarqueeConfig::default());

    session.select_server("https://cdn.example.com/movie.mp4");
    assert_eq!(session.render_region(), RenderRegion::Video);

    session.select_server("https://videa.hu/letoltes/abc123");
    assert!(matches!(session.render_region(), RenderRegion::Frame(_)));
    assert_eq!(session.surface().source(), None);
    assert!(session.surface().is_paused());

    session.select_server("https://cdn.example.com/other.ogg");
    assert_eq!(session.render_region(), RenderRegion::Video);
    assert_eq!(
        session.surface().source(),
        Some("https://cdn.example.com/other.ogg")
    );
}

#[test]
fn test_sessions_do_not_share_events() {
    let runtime = Arc::new(FakeRuntime::new());
    let mut first = new_session(FakeSurface::new(), &runtime, MarqueeConfig::without_autoplay());
    let mut second = new_session(FakeSurface::new(), &runtime, MarqueeConfig::without_autoplay());

    first.select_server("https://cdn.example.com/one.mp4");
    second.select_server("https://cdn.example.com/two.mp4");

    first.surface().emit_media_error(3);
    first.drain_events();
    second.drain_events();

    assert_eq!(first.state(), SessionState::Errored);
    assert_eq!(second.state(), SessionState::Playing);
    assert_ne!(first.current_token(), second.current_token());
}

#[test]
fn test_without_autoplay_waits_for_user() {
    let runtime = Arc::new(FakeRuntime::new());
    let mut session = new_session(
        FakeSurface::new(),
        &runtime,
        MarqueeConfig::without_autoplay(),
    );

    session.select_server("https://cdn.example.com/a/index.m3u8");
    runtime
        .latest_emitter()
        .unwrap()
        .emit(EngineEvent::ManifestParsed { levels: 1 });
    session.drain_events();

    assert_eq!(session.surface().play_requests(), 0);
    assert!(session.play());
    assert_eq!(session.surface().play_requests(), 1);
}

#[test]
fn test_native_manifest_fallback_without_runtime() {
    let mut session = PlaybackSession::new(
        FakeSurface::new().with_native_hls(),
        None,
        MarqueeConfig::default(),
    );

    assert_eq!(
        session.select_server("https://cdn.example.com/a/index.m3u8"),
        SessionState::Playing
    );
    session.surface().emit_media_ready();
    session.drain_events();

    assert_eq!(session.surface().play_requests(), 1);

    session.surface().emit_media_error(4);
    session.drain_events();
    assert_eq!(
        session.error().map(|error| error.category),
        Some(ErrorCategory::UnsupportedFormat)
    );
}

#[test]
fn test_no_playback_path_is_unsupported_format() {
    let mut session = PlaybackSession::new(FakeSurface::new(), None, MarqueeConfig::default());

    assert_eq!(
        session.select_server("https://cdn.example.com/a/index.m3u8"),
        SessionState::Errored
    );

    let overlay = session.overlay().unwrap();
    assert_eq!(overlay.title, "Playback error");
    assert!(!overlay.message.contains("cdn.example.com"));
    assert_eq!(
        session.error().map(|error| error.category),
        Some(ErrorCategory::UnsupportedFormat)
    );
}
