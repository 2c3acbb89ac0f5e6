//! Classification scenarios from a catalog's point of view
//!
//! Each server URL either plays on the surface unchanged or is rewritten into
//! an embeddable viewer behind the minimal sandbox.

use marquee_core::playback::{SandboxPermission, resolve};
use marquee_core::{PlaybackKind, classify};
use proptest::prelude::*;

#[test]
fn test_surface_playable_urls_are_never_rewritten() {
    let cases = [
        ("https://cdn.example.com/hls/master.m3u8", PlaybackKind::AdaptiveStream),
        ("https://cdn.example.com/hls/master.m3u8?sig=a1b2", PlaybackKind::AdaptiveStream),
        ("https://cdn.example.com/file/movie.mp4?dl=0", PlaybackKind::NativeFile),
        ("https://cdn.example.com/file/MOVIE.WEBM", PlaybackKind::NativeFile),
    ];

    for (url, kind) in cases {
        let target = classify(url);
        assert_eq!(target.kind, kind, "{url}");
        assert_eq!(target.resolved_url, url, "{url}");
    }
}

#[test]
fn test_embedded_hosts_resolve_to_sandboxed_frames() {
    let cases = [
        (
            "https://files.fm/u/abcd1234?extra=1#gallery",
            "https://files.fm/u/abcd1234?iframe",
        ),
        (
            "https://videa.hu/letoltes/wvx7xjs2Z1TMmWWO",
            "https://videa.hu/player?v=wvx7xjs2Z1TMmWWO",
        ),
        (
            "https://ok.example.ru/videoembed/12345",
            "https://ok.example.ru/videoembed/12345",
        ),
    ];

    for (url, expected_src) in cases {
        let target = classify(url);
        assert_eq!(target.kind, PlaybackKind::EmbeddedFrame, "{url}");

        let frame = resolve(&target);
        assert_eq!(frame.src, expected_src);
        assert_eq!(frame.sandbox.permissions().len(), 3);
        assert!(frame.sandbox.grants(SandboxPermission::Scripts));
        assert!(frame.sandbox.grants(SandboxPermission::SameOrigin));
        assert!(frame.sandbox.grants(SandboxPermission::Fullscreen));
    }
}

#[test]
fn test_classification_serializes_for_tooling() {
    let target = classify("https://cdn.example.com/a.m3u8");
    let json = serde_json::to_value(&target).unwrap();

    assert_eq!(json["kind"], "adaptive_stream");
    assert_eq!(json["resolved_url"], "https://cdn.example.com/a.m3u8");
}

proptest! {
    #[test]
    fn prop_classification_is_deterministic(url in ".{0,64}") {
        prop_assert_eq!(classify(&url), classify(&url));
    }

    #[test]
    fn prop_gallery_frames_always_carry_the_marker(id in "[A-Za-z0-9]{4,12}", query in "[a-z]{1,8}") {
        let target = classify(&format!("https://files.fm/u/{id}?{query}=1"));

        prop_assert_eq!(target.kind, PlaybackKind::EmbeddedFrame);
        prop_assert_eq!(target.resolved_url, format!("https://files.fm/u/{id}?iframe"));
    }
}
