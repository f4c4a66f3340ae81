//! Simulated media elements
//!
//! In-process stand-ins for a video element, an audio element and a
//! fullscreen container. They follow the browser's observable behaviour
//! closely enough to drive a full session: metadata arrives when the driver
//! says so, time only moves on [`SimulatedElement::advance`], and play or
//! fullscreen requests can be resolved immediately, rejected, or held until
//! the driver settles them.

use crate::binding::{
    EventSink, FullscreenContainer, FullscreenFailure, MediaElement, MediaEventKind,
    PlayFailureReason,
};
use crate::TrackKind;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::trace;
use url::Url;

type PlayResult = Result<(), PlayFailureReason>;
type FullscreenResult = Result<(), FullscreenFailure>;

/// How a simulated element answers `play()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayBehavior {
    /// Start playback right away
    Resolve,
    /// Refuse with the given reason
    Reject(PlayFailureReason),
    /// Keep the request pending until [`SimulatedElement::settle_play`]
    Hold,
}

#[derive(Debug)]
struct ElementState {
    source: Option<Url>,
    sink: Option<EventSink>,
    duration: f64,
    metadata_loaded: bool,
    current_time: f64,
    paused: bool,
    muted: bool,
    behavior: PlayBehavior,
    pending_play: Option<oneshot::Sender<PlayResult>>,
    play_calls: usize,
    pause_calls: usize,
}

impl ElementState {
    fn emit(&self, kind: MediaEventKind) -> bool {
        match &self.sink {
            Some(sink) => sink.emit(kind),
            None => false,
        }
    }
}

/// Scriptable media element with a manual clock
#[derive(Debug)]
pub struct SimulatedElement {
    track: TrackKind,
    inner: Mutex<ElementState>,
}

impl SimulatedElement {
    /// Element whose media lasts `duration` seconds
    pub fn new(track: TrackKind, duration: f64) -> Self {
        Self {
            track,
            inner: Mutex::new(ElementState {
                source: None,
                sink: None,
                duration,
                metadata_loaded: false,
                current_time: 0.0,
                paused: true,
                muted: false,
                behavior: PlayBehavior::Resolve,
                pending_play: None,
                play_calls: 0,
                pause_calls: 0,
            }),
        }
    }

    pub fn with_behavior(self, behavior: PlayBehavior) -> Self {
        self.set_behavior(behavior);
        self
    }

    pub fn set_behavior(&self, behavior: PlayBehavior) {
        self.lock().behavior = behavior;
    }

    pub fn track(&self) -> TrackKind {
        self.track
    }

    /// Mark metadata as loaded and report the duration.
    /// Returns false when nobody is listening.
    pub fn load_metadata(&self) -> bool {
        let mut state = self.lock();
        state.metadata_loaded = true;
        let duration = state.duration;
        state.emit(MediaEventKind::MetadataReady { duration })
    }

    /// Move the clock forward by `dt` seconds if playing. Reports the new
    /// position and, at the end of the media, pauses and reports `Ended`.
    pub fn advance(&self, dt: f64) {
        let mut state = self.lock();
        if state.paused || !state.metadata_loaded {
            return;
        }

        state.current_time = (state.current_time + dt).min(state.duration);
        let time = state.current_time;
        state.emit(MediaEventKind::TimeAdvanced { time });

        if time >= state.duration {
            state.paused = true;
            state.emit(MediaEventKind::Ended);
        }
    }

    /// Pause as if the platform did it (media key, device change)
    pub fn pause_externally(&self) {
        let mut state = self.lock();
        if !state.paused {
            state.paused = true;
            state.emit(MediaEventKind::Paused);
        }
    }

    /// Report an element error
    pub fn fail(&self, message: impl Into<String>) {
        let state = self.lock();
        state.emit(MediaEventKind::PlaybackError {
            message: message.into(),
        });
    }

    /// Settle a held `play()`. Returns false when nothing was pending.
    pub fn settle_play(&self, result: PlayResult) -> bool {
        let sender = self.lock().pending_play.take();
        match sender {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }

    pub fn has_pending_play(&self) -> bool {
        self.lock().pending_play.is_some()
    }

    pub fn source(&self) -> Option<Url> {
        self.lock().source.clone()
    }

    pub fn is_attached(&self) -> bool {
        self.lock().sink.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn is_muted(&self) -> bool {
        self.lock().muted
    }

    pub fn play_calls(&self) -> usize {
        self.lock().play_calls
    }

    pub fn pause_calls(&self) -> usize {
        self.lock().pause_calls
    }

    fn lock(&self) -> MutexGuard<'_, ElementState> {
        // a panicking test thread must not wedge the others
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl MediaElement for SimulatedElement {
    fn set_source(&self, uri: &Url) {
        let mut state = self.lock();
        state.source = Some(uri.clone());
        state.metadata_loaded = false;
        state.current_time = 0.0;
        trace!(track = %self.track, %uri, "Source set");
    }

    fn attach(&self, sink: EventSink) {
        self.lock().sink = Some(sink);
    }

    fn detach(&self) {
        self.lock().sink = None;
    }

    async fn play(&self) -> PlayResult {
        let rx = {
            let mut state = self.lock();
            state.play_calls += 1;
            match state.behavior.clone() {
                PlayBehavior::Resolve => {
                    state.paused = false;
                    return Ok(());
                }
                PlayBehavior::Reject(reason) => return Err(reason),
                PlayBehavior::Hold => {
                    let (tx, rx) = oneshot::channel();
                    if let Some(previous) = state.pending_play.replace(tx) {
                        let _ = previous.send(Err(PlayFailureReason::Aborted));
                    }
                    rx
                }
            }
        };

        // a dropped sender means the request was abandoned
        let result = rx.await.unwrap_or(Err(PlayFailureReason::Aborted));
        if result.is_ok() {
            self.lock().paused = false;
        }
        result
    }

    fn pause(&self) {
        let mut state = self.lock();
        state.pause_calls += 1;
        // pausing interrupts a pending play, as in browsers
        if let Some(pending) = state.pending_play.take() {
            let _ = pending.send(Err(PlayFailureReason::Aborted));
        }
        if !state.paused {
            state.paused = true;
            state.emit(MediaEventKind::Paused);
        }
    }

    fn current_time(&self) -> f64 {
        self.lock().current_time
    }

    fn set_current_time(&self, time: f64) {
        let mut state = self.lock();
        state.current_time = if state.metadata_loaded {
            time.clamp(0.0, state.duration)
        } else {
            time.max(0.0)
        };
        if state.metadata_loaded {
            state.emit(MediaEventKind::SeekInProgress);
        }
    }

    fn duration(&self) -> Option<f64> {
        let state = self.lock();
        state.metadata_loaded.then_some(state.duration)
    }

    fn set_muted(&self, muted: bool) {
        self.lock().muted = muted;
    }
}

/// How a simulated container answers fullscreen requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenBehavior {
    Grant,
    Deny,
    /// Keep the request pending until [`SimulatedContainer::settle`]
    Hold,
}

/// Scriptable fullscreen container
#[derive(Debug)]
pub struct SimulatedContainer {
    fullscreen: AtomicBool,
    behavior: Mutex<FullscreenBehavior>,
    pending: Mutex<Option<oneshot::Sender<FullscreenResult>>>,
}

impl SimulatedContainer {
    pub fn new() -> Self {
        Self {
            fullscreen: AtomicBool::new(false),
            behavior: Mutex::new(FullscreenBehavior::Grant),
            pending: Mutex::new(None),
        }
    }

    /// Shortcut for [`FullscreenBehavior::Grant`] / [`FullscreenBehavior::Deny`]
    pub fn set_allowed(&self, allowed: bool) {
        self.set_behavior(if allowed {
            FullscreenBehavior::Grant
        } else {
            FullscreenBehavior::Deny
        });
    }

    pub fn set_behavior(&self, behavior: FullscreenBehavior) {
        *self
            .behavior
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = behavior;
    }

    /// Settle a held request. Returns false when nothing was pending.
    pub fn settle(&self, result: FullscreenResult) -> bool {
        let sender = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match sender {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    async fn transition(&self, target: bool) -> FullscreenResult {
        let behavior = *self
            .behavior
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let result = match behavior {
            FullscreenBehavior::Grant => Ok(()),
            FullscreenBehavior::Deny => Err(FullscreenFailure::PermissionDenied),
            FullscreenBehavior::Hold => {
                let (tx, rx) = oneshot::channel();
                *self
                    .pending
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(tx);
                rx.await
                    .unwrap_or(Err(FullscreenFailure::Other("request abandoned".into())))
            }
        };

        if result.is_ok() {
            self.fullscreen.store(target, Ordering::SeqCst);
        }
        result
    }
}

impl Default for SimulatedContainer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FullscreenContainer for SimulatedContainer {
    fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::SeqCst)
    }

    async fn enter_fullscreen(&self) -> FullscreenResult {
        self.transition(true).await
    }

    async fn exit_fullscreen(&self) -> FullscreenResult {
        self.transition(false).await
    }
}
