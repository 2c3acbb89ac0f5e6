//! Catalog movie records driving a playback session

use std::io::Write;
use std::sync::Arc;

use marquee_core::playback::{AdaptiveRuntime, RenderRegion, VideoSurface};
use marquee_core::testing::{FakeRuntime, FakeSurface};
use marquee_core::{
    MarqueeConfig, MarqueeError, Movie, PlaybackError, PlaybackKind, PlaybackSession,
    SessionState,
};
use tempfile::NamedTempFile;

const CATALOG_RECORD: &str = r#"{
    "id": "tt0000042",
    "title": "Northern Lights",
    "description": "",
    "posterUrl": "https://img.example.com/poster.jpg",
    "backdropUrl": "https://img.example.com/backdrop.jpg",
    "year": 2019,
    "genres": ["Documentary", "Nature"],
    "servers": [
        { "name": "Server 1", "url": "https://files.fm/u/n0rth3rn?x=1", "quality": "1080p" },
        { "name": "Server 2", "url": "https://cdn.example.com/nl/master.m3u8", "quality": "720p" },
        { "name": "Server 3", "url": "https://cdn.example.com/nl/movie.mp4", "quality": "480p" }
    ],
    "downloadUrl": "https://cdn.example.com/nl/movie.mp4",
    "trailerUrl": "https://youtu.be/dQw4w9WgXcQ",
    "createdAt": { "seconds": 1690000000, "nanoseconds": 0 }
}"#;

fn session() -> (PlaybackSession<FakeSurface>, Arc<FakeRuntime>) {
    let fake = Arc::new(FakeRuntime::new());
    let runtime: Arc<dyn AdaptiveRuntime> = fake.clone();
    (
        PlaybackSession::new(FakeSurface::new(), Some(runtime), MarqueeConfig::default()),
        fake,
    )
}

#[test]
fn test_default_selection_uses_first_server() {
    let movie = Movie::from_json(CATALOG_RECORD).unwrap();
    let (mut session, _runtime) = session();

    assert_eq!(session.select_default(&movie), SessionState::Playing);

    match session.render_region() {
        RenderRegion::Frame(frame) => assert_eq!(frame.src, "https://files.fm/u/n0rth3rn?iframe"),
        other => panic!("expected embedded frame, got {other:?}"),
    }
}

#[test]
fn test_selecting_each_server_in_turn() {
    let movie = Movie::from_json(CATALOG_RECORD).unwrap();
    let (mut session, runtime) = session();

    let expected = [
        PlaybackKind::EmbeddedFrame,
        PlaybackKind::AdaptiveStream,
        PlaybackKind::NativeFile,
    ];

    for (index, kind) in expected.into_iter().enumerate() {
        assert_eq!(
            session.select_movie_server(&movie, index).unwrap(),
            SessionState::Playing
        );
        assert_eq!(session.current_target().map(|target| target.kind), Some(kind));
    }

    assert_eq!(runtime.log().sessions_destroyed, 1);
    assert_eq!(
        session.surface().source(),
        Some("https://cdn.example.com/nl/movie.mp4")
    );
}

#[test]
fn test_out_of_range_server_keeps_current_playback() {
    let movie = Movie::from_json(CATALOG_RECORD).unwrap();
    let (mut session, _runtime) = session();
    session.select_movie_server(&movie, 2).unwrap();

    let result = session.select_movie_server(&movie, 5);

    assert!(matches!(
        result,
        Err(PlaybackError::ServerNotFound { index: 5 })
    ));
    assert_eq!(session.state(), SessionState::Playing);
}

#[test]
fn test_movie_without_servers_clears_session() {
    let mut movie = Movie::from_json(CATALOG_RECORD).unwrap();
    let (mut session, _runtime) = session();
    session.select_default(&movie);

    movie.servers.clear();

    assert_eq!(session.select_default(&movie), SessionState::Idle);
    assert_eq!(session.render_region(), RenderRegion::Empty);
    assert!(session.current_target().is_none());
    assert!(matches!(
        session.select_movie_server(&movie, 0),
        Err(PlaybackError::NoServers)
    ));
}

#[test]
fn test_record_loaded_from_disk() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(CATALOG_RECORD.as_bytes()).unwrap();

    let movie = Movie::from_file(file.path()).unwrap();

    assert_eq!(movie.genres, vec!["Documentary", "Nature"]);
    assert_eq!(
        movie.trailer_frame().map(|frame| frame.src),
        Some("https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1&rel=0".to_string())
    );
}

#[test]
fn test_broken_record_reports_friendly_message() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"{ \"id\": 1 ").unwrap();

    let error = Movie::from_file(file.path()).unwrap_err();

    assert!(matches!(error, MarqueeError::Json(_)));
    assert_eq!(error.user_message(), "Movie record could not be read");
}
