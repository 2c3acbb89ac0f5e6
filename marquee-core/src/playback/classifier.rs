//! Server URL classification
//!
//! Decides, from the URL string alone, whether a server is an adaptive
//! stream manifest, a direct video file, or something that must be shown in
//! an embedded frame. Classification never fails: unknown input falls through
//! to an embedded frame with the URL unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

/// Path segment identifying a file-hosting gallery page.
pub const GALLERY_SEGMENT: &str = "files.fm/u/";
/// Query that switches a gallery page into its embeddable viewer.
pub const GALLERY_EMBED_QUERY: &str = "iframe";
/// Path segment identifying a video host download page.
pub const VIDEA_DOWNLOAD_SEGMENT: &str = "videa.hu/letoltes/";
/// Canonical player endpoint of the same video host.
pub const VIDEA_PLAYER_URL: &str = "https://videa.hu/player";

const ADAPTIVE_SUFFIXES: [&str; 2] = [".m3u8", ".m3u"];
const NATIVE_SUFFIXES: [&str; 3] = [".mp4", ".webm", ".ogg"];

/// How a server URL is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackKind {
    /// Segmented manifest played through an adaptive runtime
    AdaptiveStream,
    /// Direct file played by the built-in media element
    NativeFile,
    /// Third-party page shown in a sandboxed frame
    EmbeddedFrame,
}

impl fmt::Display for PlaybackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackKind::AdaptiveStream => write!(f, "adaptive_stream"),
            PlaybackKind::NativeFile => write!(f, "native_file"),
            PlaybackKind::EmbeddedFrame => write!(f, "embedded_frame"),
        }
    }
}

impl FromStr for PlaybackKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "adaptive_stream" | "adaptive" | "hls" => Ok(PlaybackKind::AdaptiveStream),
            "native_file" | "native" => Ok(PlaybackKind::NativeFile),
            "embedded_frame" | "embed" | "iframe" => Ok(PlaybackKind::EmbeddedFrame),
            _ => Err(format!(
                "Invalid playback kind: '{s}'. Valid options are: adaptive_stream, native_file, embedded_frame"
            )),
        }
    }
}

/// Result of classifying a server URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackTarget {
    pub kind: PlaybackKind,
    pub resolved_url: String,
}

impl PlaybackTarget {
    pub fn new(kind: PlaybackKind, resolved_url: impl Into<String>) -> Self {
        Self {
            kind,
            resolved_url: resolved_url.into(),
        }
    }
}

/// Why an embed URL could not be derived.
#[derive(Debug, thiserror::Error)]
enum EmbedDerivationError {
    #[error("URL could not be parsed: {0}")]
    Parse(#[from] url::ParseError),

    #[error("URL has no video identifier")]
    MissingVideoId,
}

/// One entry of the ordered classification table.
struct ClassificationRule {
    name: &'static str,
    matches: fn(&str) -> bool,
    resolve: fn(&str) -> PlaybackTarget,
}

/// Rules in priority order; the first match wins.
const RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name: "adaptive_manifest",
        matches: is_adaptive_manifest,
        resolve: adaptive_target,
    },
    ClassificationRule {
        name: "native_file",
        matches: is_native_file,
        resolve: native_target,
    },
    ClassificationRule {
        name: "gallery_embed",
        matches: is_gallery_page,
        resolve: gallery_target,
    },
    ClassificationRule {
        name: "videa_player",
        matches: is_videa_download,
        resolve: videa_target,
    },
];

/// Classifies a server URL into a playback target.
///
/// Operates purely on the string; no network access takes place.
pub fn classify(url: &str) -> PlaybackTarget {
    for rule in RULES {
        if (rule.matches)(url) {
            let target = (rule.resolve)(url);
            debug!(
                rule = rule.name,
                kind = %target.kind,
                resolved_url = %target.resolved_url,
                "Classified server URL"
            );
            return target;
        }
    }

    debug!(url, "No classification rule matched, embedding as-is");
    PlaybackTarget::new(PlaybackKind::EmbeddedFrame, url)
}

/// Portion of the URL before any query string or fragment.
fn url_path(url: &str) -> &str {
    let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    &url[..end]
}

fn is_adaptive_manifest(url: &str) -> bool {
    let path = url_path(url);
    ADAPTIVE_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

fn is_native_file(url: &str) -> bool {
    let path = url_path(url).to_ascii_lowercase();
    NATIVE_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

fn is_gallery_page(url: &str) -> bool {
    url.contains(GALLERY_SEGMENT)
}

fn is_videa_download(url: &str) -> bool {
    url.contains(VIDEA_DOWNLOAD_SEGMENT)
}

fn adaptive_target(url: &str) -> PlaybackTarget {
    PlaybackTarget::new(PlaybackKind::AdaptiveStream, url)
}

fn native_target(url: &str) -> PlaybackTarget {
    PlaybackTarget::new(PlaybackKind::NativeFile, url)
}

fn gallery_target(url: &str) -> PlaybackTarget {
    embed_or_passthrough(url, gallery_embed_url(url))
}

fn videa_target(url: &str) -> PlaybackTarget {
    embed_or_passthrough(url, videa_player_url(url))
}

fn embed_or_passthrough(
    url: &str,
    derived: Result<String, EmbedDerivationError>,
) -> PlaybackTarget {
    match derived {
        Ok(embed_url) => PlaybackTarget::new(PlaybackKind::EmbeddedFrame, embed_url),
        Err(e) => {
            warn!(url, error = %e, "Could not derive embed URL, falling back to original");
            PlaybackTarget::new(PlaybackKind::EmbeddedFrame, url)
        }
    }
}

/// Strips the query and fragment and appends the gallery's embed marker.
///
/// The URL must parse, but the kept part is copied verbatim.
fn gallery_embed_url(url: &str) -> Result<String, EmbedDerivationError> {
    Url::parse(url)?;
    Ok(format!("{}?{GALLERY_EMBED_QUERY}", url_path(url)))
}

/// Builds the player URL from the path segment following the download marker.
///
/// The identifier is copied as written; it is already URL-encoded.
fn videa_player_url(url: &str) -> Result<String, EmbedDerivationError> {
    Url::parse(url)?;

    let video_id = url
        .split_once(VIDEA_DOWNLOAD_SEGMENT)
        .and_then(|(_, rest)| rest.split(['/', '?', '#']).next())
        .filter(|id| !id.is_empty())
        .ok_or(EmbedDerivationError::MissingVideoId)?;

    Ok(format!("{VIDEA_PLAYER_URL}?v={video_id}"))
}
