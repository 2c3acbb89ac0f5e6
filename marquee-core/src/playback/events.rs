//! Events delivered to a playback session
//!
//! Runtimes and surfaces complete their work asynchronously. Every
//! completion is sent through an [`EventEmitter`] that stamps it with the
//! [`AttachToken`] of the attach that produced it, so the session can drop
//! callbacks that belong to an engine it has already released.

use std::fmt;

use tokio::sync::mpsc;

use super::error::ErrorCategory;

/// Identifies one engine attach within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachToken {
    pub session_id: u64,
    pub generation: u64,
}

impl fmt::Display for AttachToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.session_id, self.generation)
    }
}

/// Error families reported on the adaptive runtime's error channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeErrorKind {
    /// Manifest or segment fetch failed
    Network,
    /// Media pipeline failed to decode or append data
    Media,
    /// Stream codecs or container cannot be played in this environment
    Unsupported,
    /// Anything the runtime does not categorize
    Other,
}

impl RuntimeErrorKind {
    /// Maps the runtime's error family onto the user-facing taxonomy.
    pub fn category(self) -> ErrorCategory {
        match self {
            RuntimeErrorKind::Network => ErrorCategory::NetworkError,
            RuntimeErrorKind::Media => ErrorCategory::DecodeError,
            RuntimeErrorKind::Unsupported => ErrorCategory::UnsupportedFormat,
            RuntimeErrorKind::Other => ErrorCategory::Unknown,
        }
    }
}

/// Error reported by the adaptive runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeErrorEvent {
    pub kind: RuntimeErrorKind,
    pub fatal: bool,
    /// Runtime-specific detail, logged but never shown to the user
    pub details: String,
}

impl RuntimeErrorEvent {
    pub fn fatal(kind: RuntimeErrorKind, details: impl Into<String>) -> Self {
        Self {
            kind,
            fatal: true,
            details: details.into(),
        }
    }

    pub fn non_fatal(kind: RuntimeErrorKind, details: impl Into<String>) -> Self {
        Self {
            kind,
            fatal: false,
            details: details.into(),
        }
    }
}

/// Notification from a runtime or surface about an in-flight attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Adaptive runtime finished parsing the manifest
    ManifestParsed { levels: usize },
    /// Surface has enough metadata to start playback
    MediaReady,
    /// A play request settled successfully
    PlaybackStarted,
    /// A play request was refused by the host environment
    AutoplayRejected { reason: String },
    /// Adaptive runtime error channel
    RuntimeError(RuntimeErrorEvent),
    /// Surface-level media error with the element's numeric code
    MediaError { code: u16, message: Option<String> },
}

/// An [`EngineEvent`] tagged with the attach that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub token: AttachToken,
    pub event: EngineEvent,
}

/// Sends events for one attach into its session's queue.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    token: AttachToken,
    sender: mpsc::UnboundedSender<SessionEvent>,
}

impl EventEmitter {
    pub fn new(token: AttachToken, sender: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { token, sender }
    }

    pub fn token(&self) -> AttachToken {
        self.token
    }

    /// Queues an event for the session.
    ///
    /// Returns false when the session no longer exists.
    pub fn emit(&self, event: EngineEvent) -> bool {
        self.sender
            .send(SessionEvent {
                token: self.token,
                event,
            })
            .is_ok()
    }
}
