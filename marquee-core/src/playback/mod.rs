//! Playback resolution, engines and session control
//!
//! A server URL is classified into a [`PlaybackTarget`], the matching engine
//! is attached to the session's surface, and engine, runtime and surface
//! callbacks flow back to the session as [`SessionEvent`]s tagged with the
//! attach they belong to.

pub mod adaptive;
pub mod classifier;
pub mod embed;
pub mod engine;
pub mod error;
pub mod events;
pub mod native;
pub mod runtime;
pub mod session;
pub mod surface;

pub use adaptive::AdaptiveEngine;
pub use classifier::{PlaybackKind, PlaybackTarget, classify};
pub use embed::{FrameSpec, SandboxPermission, SandboxPolicy, resolve, trailer_embed_url};
pub use engine::{Engine, FrameEngine};
pub use error::{ErrorCategory, ErrorOverlay, OverlayIcon, PlaybackError, UserFacingError};
pub use events::{AttachToken, EngineEvent, EventEmitter, RuntimeErrorEvent, RuntimeErrorKind, SessionEvent};
pub use native::NativeEngine;
pub use runtime::{AdaptiveRuntime, AdaptiveSession, RuntimeError};
pub use session::{PlaybackSession, RenderRegion, SessionState};
pub use surface::{HLS_MIME_TYPE, VideoSurface};
