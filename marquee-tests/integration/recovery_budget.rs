//! Configurable recovery budgets for adaptive streams

use std::sync::Arc;

use marquee_core::config::{AdaptiveConfig, MAX_RECOVERY_ATTEMPTS};
use marquee_core::playback::{AdaptiveRuntime, EngineEvent, RuntimeErrorEvent, RuntimeErrorKind};
use marquee_core::testing::{FakeRuntime, FakeSurface};
use marquee_core::{ErrorCategory, MarqueeConfig, MarqueeError, PlaybackSession, SessionState};

const MANIFEST: &str = "https://cdn.example.com/stream/index.m3u8";

fn config(network: u32, media: u32) -> MarqueeConfig {
    MarqueeConfig {
        adaptive: AdaptiveConfig {
            network_recovery_attempts: network,
            media_recovery_attempts: media,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn fatal(kind: RuntimeErrorKind) -> EngineEvent {
    EngineEvent::RuntimeError(RuntimeErrorEvent::fatal(kind, "fatal runtime error"))
}

fn playing_session(
    runtime: &Arc<FakeRuntime>,
    config: MarqueeConfig,
) -> PlaybackSession<FakeSurface> {
    let shared: Arc<dyn AdaptiveRuntime> = runtime.clone();
    let mut session = PlaybackSession::new(FakeSurface::new(), Some(shared), config);
    session.select_server(MANIFEST);
    session
}

#[test]
fn test_larger_network_budget_allows_more_restarts() {
    let runtime = Arc::new(FakeRuntime::new());
    let mut session = playing_session(&runtime, config(2, 1));
    let emitter = runtime.latest_emitter().unwrap();

    for _ in 0..2 {
        emitter.emit(fatal(RuntimeErrorKind::Network));
        session.drain_events();
        assert_eq!(session.state(), SessionState::Playing);
    }

    emitter.emit(fatal(RuntimeErrorKind::Network));
    session.drain_events();

    assert_eq!(session.state(), SessionState::Errored);
    assert_eq!(runtime.log().start_load_calls, 2);
}

#[test]
fn test_zero_budget_surfaces_first_fatal_error() {
    let runtime = Arc::new(FakeRuntime::new());
    let mut session = playing_session(&runtime, config(1, 0));

    runtime
        .latest_emitter()
        .unwrap()
        .emit(fatal(RuntimeErrorKind::Media));
    session.drain_events();

    assert_eq!(
        session.error().map(|error| error.category),
        Some(ErrorCategory::DecodeError)
    );
    assert_eq!(runtime.log().recover_media_calls, 0);
}

#[test]
fn test_budgets_are_per_category() {
    let runtime = Arc::new(FakeRuntime::new());
    let mut session = playing_session(&runtime, MarqueeConfig::default());
    let emitter = runtime.latest_emitter().unwrap();

    emitter.emit(fatal(RuntimeErrorKind::Network));
    emitter.emit(fatal(RuntimeErrorKind::Media));
    session.drain_events();

    assert_eq!(session.state(), SessionState::Playing);
    let log = runtime.log();
    assert_eq!(log.start_load_calls, 1);
    assert_eq!(log.recover_media_calls, 1);
}

#[test]
fn test_budget_resets_on_new_selection() {
    let runtime = Arc::new(FakeRuntime::new());
    let mut session = playing_session(&runtime, MarqueeConfig::default());

    runtime
        .latest_emitter()
        .unwrap()
        .emit(fatal(RuntimeErrorKind::Network));
    session.drain_events();

    session.select_server(MANIFEST);
    runtime
        .latest_emitter()
        .unwrap()
        .emit(fatal(RuntimeErrorKind::Network));
    session.drain_events();

    assert_eq!(session.state(), SessionState::Playing);
    assert_eq!(runtime.log().start_load_calls, 2);
}

#[test]
fn test_failing_recovery_is_terminal() {
    let runtime = Arc::new(FakeRuntime::new().with_failing_recovery());
    let mut session = playing_session(&runtime, MarqueeConfig::default());

    runtime
        .latest_emitter()
        .unwrap()
        .emit(fatal(RuntimeErrorKind::Media));
    session.drain_events();

    assert_eq!(session.state(), SessionState::Errored);
    assert_eq!(
        session.error().map(|error| error.category),
        Some(ErrorCategory::DecodeError)
    );
}

#[test]
fn test_unbounded_budget_is_rejected() {
    let result = config(MAX_RECOVERY_ATTEMPTS + 1, 1).validate();

    assert!(matches!(result, Err(MarqueeError::Configuration { .. })));
    assert!(config(MAX_RECOVERY_ATTEMPTS, MAX_RECOVERY_ATTEMPTS).validate().is_ok());
}

#[test]
fn test_session_clamps_excessive_budget() {
    let runtime = Arc::new(FakeRuntime::new());
    let mut session = playing_session(&runtime, config(50, 1));
    let emitter = runtime.latest_emitter().unwrap();

    for _ in 0..MAX_RECOVERY_ATTEMPTS {
        emitter.emit(fatal(RuntimeErrorKind::Network));
        session.drain_events();
        assert_eq!(session.state(), SessionState::Playing);
    }

    emitter.emit(fatal(RuntimeErrorKind::Network));
    session.drain_events();

    assert_eq!(session.state(), SessionState::Errored);
    assert_eq!(
        runtime.log().start_load_calls,
        MAX_RECOVERY_ATTEMPTS as usize
    );
}
