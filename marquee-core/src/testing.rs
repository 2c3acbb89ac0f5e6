//! Test doubles for the playback surface and the adaptive runtime.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::playback::{
    AdaptiveRuntime, AdaptiveSession, AttachToken, EngineEvent, EventEmitter, HLS_MIME_TYPE,
    RuntimeError, VideoSurface,
};

/// Source a fake runtime session assigns to the surface it is bound to.
pub const FAKE_MEDIA_SOURCE: &str = "blob:fake-media-source";

/// In-memory video element.
///
/// Play requests settle immediately on the emitter they were made with.
#[derive(Debug)]
pub struct FakeSurface {
    source: Option<String>,
    paused: bool,
    native_hls: bool,
    autoplay_blocked: bool,
    emitter: Option<EventEmitter>,
    source_history: Vec<Option<String>>,
    play_requests: usize,
}

impl FakeSurface {
    /// Creates a paused surface without built-in manifest support.
    pub fn new() -> Self {
        Self {
            source: None,
            paused: true,
            native_hls: false,
            autoplay_blocked: false,
            emitter: None,
            source_history: Vec::new(),
            play_requests: 0,
        }
    }

    /// Surface that reports built-in support for adaptive manifests.
    pub fn with_native_hls(mut self) -> Self {
        self.native_hls = true;
        self
    }

    /// Surface whose host refuses every play request.
    pub fn with_autoplay_blocked(mut self) -> Self {
        self.autoplay_blocked = true;
        self
    }

    /// Reports an element error on the bound emitter.
    pub fn emit_media_error(&self, code: u16) -> bool {
        self.emit(EngineEvent::MediaError {
            code,
            message: Some(format!("fake element error {code}")),
        })
    }

    /// Reports loaded metadata on the bound emitter.
    pub fn emit_media_ready(&self) -> bool {
        self.emit(EngineEvent::MediaReady)
    }

    fn emit(&self, event: EngineEvent) -> bool {
        self.emitter
            .as_ref()
            .is_some_and(|emitter| emitter.emit(event))
    }

    pub fn bound_token(&self) -> Option<AttachToken> {
        self.emitter.as_ref().map(EventEmitter::token)
    }

    /// Emitter currently receiving element events.
    pub fn bound_emitter(&self) -> Option<EventEmitter> {
        self.emitter.clone()
    }

    /// Every value passed to `set_source`, in order.
    pub fn source_history(&self) -> &[Option<String>] {
        &self.source_history
    }

    pub fn play_requests(&self) -> usize {
        self.play_requests
    }
}

impl Default for FakeSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSurface for FakeSurface {
    fn set_source(&mut self, url: Option<&str>) {
        self.source = url.map(str::to_string);
        self.source_history.push(self.source.clone());
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn can_play_type(&self, mime_type: &str) -> bool {
        self.native_hls && mime_type == HLS_MIME_TYPE
    }

    fn request_play(&mut self, emitter: &EventEmitter) {
        self.play_requests += 1;

        if self.autoplay_blocked {
            emitter.emit(EngineEvent::AutoplayRejected {
                reason: "NotAllowedError".to_string(),
            });
        } else {
            self.paused = false;
            emitter.emit(EngineEvent::PlaybackStarted);
        }
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn bind_events(&mut self, emitter: Option<EventEmitter>) {
        self.emitter = emitter;
    }
}

/// Calls observed by a [`FakeRuntime`] across all of its sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeLog {
    pub sessions_created: usize,
    /// Every `destroy` call, including repeated ones
    pub sessions_destroyed: usize,
    pub loaded_sources: Vec<String>,
    pub start_load_calls: usize,
    pub recover_media_calls: usize,
}

/// Scriptable adaptive runtime.
#[derive(Debug, Clone)]
pub struct FakeRuntime {
    supported: bool,
    fail_recovery: bool,
    fail_attach: bool,
    log: Arc<Mutex<RuntimeLog>>,
    emitters: Arc<Mutex<Vec<EventEmitter>>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            supported: true,
            fail_recovery: false,
            fail_attach: false,
            log: Arc::new(Mutex::new(RuntimeLog::default())),
            emitters: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Runtime whose capability probe fails.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    /// Runtime whose recovery calls return errors.
    pub fn with_failing_recovery(mut self) -> Self {
        self.fail_recovery = true;
        self
    }

    /// Runtime whose sessions cannot bind to a surface.
    pub fn with_failing_attach(mut self) -> Self {
        self.fail_attach = true;
        self
    }

    pub fn log(&self) -> RuntimeLog {
        self.log.lock().clone()
    }

    /// Emitter handed to the `index`-th created session.
    pub fn emitter(&self, index: usize) -> Option<EventEmitter> {
        self.emitters.lock().get(index).cloned()
    }

    pub fn latest_emitter(&self) -> Option<EventEmitter> {
        self.emitters.lock().last().cloned()
    }
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveRuntime for FakeRuntime {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create_session(
        &self,
        emitter: EventEmitter,
    ) -> Result<Box<dyn AdaptiveSession>, RuntimeError> {
        if !self.supported {
            return Err(RuntimeError::new("runtime not supported"));
        }

        self.log.lock().sessions_created += 1;
        self.emitters.lock().push(emitter);

        Ok(Box::new(FakeSession {
            log: Arc::clone(&self.log),
            fail_recovery: self.fail_recovery,
            fail_attach: self.fail_attach,
        }))
    }
}

struct FakeSession {
    log: Arc<Mutex<RuntimeLog>>,
    fail_recovery: bool,
    fail_attach: bool,
}

impl AdaptiveSession for FakeSession {
    fn load_source(&mut self, url: &str) -> Result<(), RuntimeError> {
        self.log.lock().loaded_sources.push(url.to_string());
        Ok(())
    }

    fn attach_media(&mut self, surface: &mut dyn VideoSurface) -> Result<(), RuntimeError> {
        if self.fail_attach {
            return Err(RuntimeError::new("media source unavailable"));
        }
        surface.set_source(Some(FAKE_MEDIA_SOURCE));
        Ok(())
    }

    fn start_load(&mut self) -> Result<(), RuntimeError> {
        self.log.lock().start_load_calls += 1;
        if self.fail_recovery {
            return Err(RuntimeError::new("loader restart failed"));
        }
        Ok(())
    }

    fn recover_media_error(&mut self) -> Result<(), RuntimeError> {
        self.log.lock().recover_media_calls += 1;
        if self.fail_recovery {
            return Err(RuntimeError::new("media recovery failed"));
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.log.lock().sessions_destroyed += 1;
    }
}
