//! Playback error taxonomy
//!
//! Every engine failure is reduced to one of four [`ErrorCategory`] values so
//! the player can render a single overlay regardless of which engine failed.

use serde::Serialize;

use super::runtime::RuntimeError;

/// Element error code: fetching was aborted by the user or a script.
pub const MEDIA_ERR_ABORTED: u16 = 1;
/// Element error code: a network error interrupted the fetch.
pub const MEDIA_ERR_NETWORK: u16 = 2;
/// Element error code: the media could not be decoded.
pub const MEDIA_ERR_DECODE: u16 = 3;
/// Element error code: the source format or URL is not supported.
pub const MEDIA_ERR_SRC_NOT_SUPPORTED: u16 = 4;

const ABORTED_MESSAGE: &str = "Loading of the video was stopped.";

/// Closed classification of playback failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCategory {
    NetworkError,
    DecodeError,
    UnsupportedFormat,
    Unknown,
}

impl ErrorCategory {
    /// Message shown to the user for this category.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorCategory::NetworkError => {
                "A network error occurred while loading the video. Please check your internet connection."
            }
            ErrorCategory::DecodeError => {
                "The video cannot be played because of an encoding problem or a damaged file."
            }
            ErrorCategory::UnsupportedFormat => {
                "The video format is not supported or the link is invalid."
            }
            ErrorCategory::Unknown => {
                "An unknown error occurred. Please try again or choose another server."
            }
        }
    }
}

/// Error state surfaced to the player UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserFacingError {
    pub category: ErrorCategory,
    pub message: String,
}

impl UserFacingError {
    /// Creates an error carrying the category's default message.
    pub fn new(category: ErrorCategory) -> Self {
        Self {
            category,
            message: category.default_message().to_string(),
        }
    }

    /// Maps a media element error code onto the user-facing taxonomy.
    ///
    /// An aborted load is reported as `Unknown` with its own message.
    pub fn from_media_error_code(code: u16) -> Self {
        match code {
            MEDIA_ERR_ABORTED => Self {
                category: ErrorCategory::Unknown,
                message: ABORTED_MESSAGE.to_string(),
            },
            MEDIA_ERR_NETWORK => Self::new(ErrorCategory::NetworkError),
            MEDIA_ERR_DECODE => Self::new(ErrorCategory::DecodeError),
            MEDIA_ERR_SRC_NOT_SUPPORTED => Self::new(ErrorCategory::UnsupportedFormat),
            _ => Self::new(ErrorCategory::Unknown),
        }
    }

    /// Builds the blocking overlay rendered over the playback surface.
    pub fn overlay(&self) -> ErrorOverlay {
        ErrorOverlay {
            icon: OverlayIcon::Warning,
            title: "Playback error",
            message: self.message.clone(),
        }
    }
}

/// Icon displayed in the error overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverlayIcon {
    Warning,
}

/// Blocking overlay shown while a session is errored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorOverlay {
    pub icon: OverlayIcon,
    pub title: &'static str,
    pub message: String,
}

/// Errors returned by playback operations.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("No playback path available for {url}")]
    Unplayable { url: String },

    #[error("Adaptive runtime failed during {operation}: {source}")]
    Runtime {
        operation: &'static str,
        #[source]
        source: RuntimeError,
    },

    #[error("Movie has no playback servers")]
    NoServers,

    #[error("Server {index} not found")]
    ServerNotFound { index: usize },
}

impl PlaybackError {
    /// Reduces the error to what the player may show.
    pub fn user_facing(&self) -> UserFacingError {
        match self {
            PlaybackError::Unplayable { .. } => UserFacingError::new(ErrorCategory::UnsupportedFormat),
            PlaybackError::Runtime { .. }
            | PlaybackError::NoServers
            | PlaybackError::ServerNotFound { .. } => UserFacingError::new(ErrorCategory::Unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_error_code_mapping() {
        assert_eq!(
            UserFacingError::from_media_error_code(MEDIA_ERR_ABORTED).category,
            ErrorCategory::Unknown
        );
        assert_eq!(
            UserFacingError::from_media_error_code(MEDIA_ERR_NETWORK).category,
            ErrorCategory::NetworkError
        );
        assert_eq!(
            UserFacingError::from_media_error_code(MEDIA_ERR_DECODE).category,
            ErrorCategory::DecodeError
        );
        assert_eq!(
            UserFacingError::from_media_error_code(MEDIA_ERR_SRC_NOT_SUPPORTED).category,
            ErrorCategory::UnsupportedFormat
        );
        assert_eq!(
            UserFacingError::from_media_error_code(42).category,
            ErrorCategory::Unknown
        );
    }

    #[test]
    fn test_aborted_has_distinct_message() {
        let aborted = UserFacingError::from_media_error_code(MEDIA_ERR_ABORTED);
        let unknown = UserFacingError::from_media_error_code(0);

        assert_eq!(aborted.category, unknown.category);
        assert_ne!(aborted.message, unknown.message);
        assert_eq!(aborted.message, ABORTED_MESSAGE);
    }

    #[test]
    fn test_overlay_carries_category_message() {
        let error = UserFacingError::new(ErrorCategory::DecodeError);
        let overlay = error.overlay();

        assert_eq!(overlay.icon, OverlayIcon::Warning);
        assert_eq!(overlay.title, "Playback error");
        assert_eq!(overlay.message, ErrorCategory::DecodeError.default_message());
    }

    #[test]
    fn test_runtime_failure_does_not_leak_details() {
        let error = PlaybackError::Runtime {
            operation: "load_source",
            source: RuntimeError::new("manifest 403 from origin-7.internal"),
        };

        let shown = error.user_facing();
        assert_eq!(shown.category, ErrorCategory::Unknown);
        assert!(!shown.message.contains("origin-7"));
    }
}
