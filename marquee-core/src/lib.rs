//! Marquee Core - Playback resolution and recovery for the movie catalog
//!
//! This crate decides how a movie server URL is played (native file,
//! adaptive stream, or sandboxed embedded frame), drives the matching engine
//! against a single playback surface, and turns low-level media failures
//! into a small, closed set of user-facing errors.

pub mod config;
pub mod movie;
pub mod playback;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::MarqueeConfig;
pub use movie::{Movie, ServerDescriptor};
pub use playback::{
    ErrorCategory, PlaybackError, PlaybackKind, PlaybackSession, PlaybackTarget, SessionState,
    UserFacingError, classify,
};

/// Core errors that can bubble up from any Marquee subsystem.
#[derive(Debug, thiserror::Error)]
pub enum MarqueeError {
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid movie record: {0}")]
    Json(#[from] serde_json::Error),
}

impl MarqueeError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            MarqueeError::Playback(e) => match e {
                PlaybackError::NoServers => "This movie has no playback servers".to_string(),
                PlaybackError::ServerNotFound { index } => {
                    format!("Server {index} is not available for this movie")
                }
                _ => e.user_facing().message,
            },
            MarqueeError::Configuration { .. } => "Configuration error occurred".to_string(),
            MarqueeError::Io(_) => "File system error occurred".to_string(),
            MarqueeError::Json(_) => "Movie record could not be read".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            MarqueeError::Configuration { .. }
                | MarqueeError::Json(_)
                | MarqueeError::Playback(PlaybackError::ServerNotFound { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, MarqueeError>;
