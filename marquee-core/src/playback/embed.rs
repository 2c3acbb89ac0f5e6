//! Embedded frame resolution
//!
//! Servers that are neither manifests nor direct files are shown in a
//! sandboxed third-party frame. Load failures inside the frame belong to the
//! provider and are not observed here.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::classifier::PlaybackTarget;

/// Feature policy granted to embedded players.
pub const FRAME_FEATURE_POLICY: &str = "autoplay; encrypted-media; picture-in-picture";
/// Accessible title of the movie player frame.
pub const PLAYER_FRAME_TITLE: &str = "Movie Player";
/// Accessible title of the trailer frame.
pub const TRAILER_FRAME_TITLE: &str = "Trailer";

const YOUTUBE_EMBED_BASE: &str = "https://www.youtube.com/embed/";
const YOUTUBE_ID_LEN: usize = 11;

static YOUTUBE_ID: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*").ok()
});

/// Single sandbox capability granted to an embedded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SandboxPermission {
    Scripts,
    SameOrigin,
    Fullscreen,
}

impl SandboxPermission {
    /// Token used in the frame's `sandbox` attribute.
    pub fn token(self) -> &'static str {
        match self {
            SandboxPermission::Scripts => "allow-scripts",
            SandboxPermission::SameOrigin => "allow-same-origin",
            SandboxPermission::Fullscreen => "allow-fullscreen",
        }
    }
}

/// Set of capabilities granted to an embedded frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SandboxPolicy {
    permissions: Vec<SandboxPermission>,
}

impl SandboxPolicy {
    /// Minimum set an embedded player needs: scripts, its own origin, and fullscreen.
    pub fn playback() -> Self {
        Self {
            permissions: vec![
                SandboxPermission::Scripts,
                SandboxPermission::SameOrigin,
                SandboxPermission::Fullscreen,
            ],
        }
    }

    pub fn grants(&self, permission: SandboxPermission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn permissions(&self) -> &[SandboxPermission] {
        &self.permissions
    }
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self::playback()
    }
}

impl fmt::Display for SandboxPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<&str> = self.permissions.iter().map(|p| p.token()).collect();
        write!(f, "{}", tokens.join(" "))
    }
}

/// Everything needed to render an embedded frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameSpec {
    pub src: String,
    pub sandbox: SandboxPolicy,
    pub allow: &'static str,
    pub allow_fullscreen: bool,
    pub title: &'static str,
}

impl FrameSpec {
    fn new(src: String, title: &'static str) -> Self {
        Self {
            src,
            sandbox: SandboxPolicy::playback(),
            allow: FRAME_FEATURE_POLICY,
            allow_fullscreen: true,
            title,
        }
    }

    /// Frame for a movie trailer link, or `None` when the link is empty.
    pub fn for_trailer(trailer_url: &str) -> Option<Self> {
        let src = trailer_embed_url(trailer_url);
        (!src.is_empty()).then(|| Self::new(src, TRAILER_FRAME_TITLE))
    }
}

/// Builds the frame for an embedded-frame playback target.
pub fn resolve(target: &PlaybackTarget) -> FrameSpec {
    FrameSpec::new(target.resolved_url.clone(), PLAYER_FRAME_TITLE)
}

/// Turns a trailer link into an autoplaying embed URL.
///
/// Recognized video-sharing links are rewritten to the canonical embed
/// endpoint; anything else is assumed to be embeddable already.
pub fn trailer_embed_url(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }

    match youtube_video_id(url) {
        Some(video_id) => format!("{YOUTUBE_EMBED_BASE}{video_id}?autoplay=1&rel=0"),
        None => url.to_string(),
    }
}

fn youtube_video_id(url: &str) -> Option<&str> {
    if let Some(regex) = YOUTUBE_ID.as_ref()
        && let Some(captures) = regex.captures(url)
        && let Some(id) = captures.get(2)
        && id.as_str().len() == YOUTUBE_ID_LEN
    {
        return Some(id.as_str());
    }

    let (_, rest) = url.split_once("/embed/")?;
    let id = rest.split(['?', '&']).next()?;
    (!id.is_empty()).then_some(id)
}
