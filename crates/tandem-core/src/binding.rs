//! Media binding layer
//!
//! Wraps the video element and the audio element of a session behind one
//! handle. Offsets are applied once at bind time; afterwards every command
//! (play, pause, seek, mute) is issued to both elements so they move in
//! lockstep. Native element events are translated into [`MediaEvent`]s and
//! delivered through a single [`EventStream`].

use crate::{Error, Result, SourceUris, TrackKind, TrackOffsets};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

/// Why an element refused to start playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PlayFailureReason {
    /// Autoplay policy, playback needs a user gesture
    NotAllowed,
    /// No usable media data yet
    NotReady,
    /// Interrupted by a pause or a new load before playback started
    Aborted,
    /// Source cannot be decoded
    NotSupported,
    Other(String),
}

impl std::fmt::Display for PlayFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayFailureReason::NotAllowed => write!(f, "not allowed by autoplay policy"),
            PlayFailureReason::NotReady => write!(f, "media not ready"),
            PlayFailureReason::Aborted => write!(f, "aborted"),
            PlayFailureReason::NotSupported => write!(f, "source not supported"),
            PlayFailureReason::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Play failure together with the track that reported it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayFailure {
    pub track: TrackKind,
    pub reason: PlayFailureReason,
}

/// Why a fullscreen request was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FullscreenFailure {
    PermissionDenied,
    NotSupported,
    Other(String),
}

impl std::fmt::Display for FullscreenFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FullscreenFailure::PermissionDenied => write!(f, "permission denied"),
            FullscreenFailure::NotSupported => write!(f, "fullscreen not supported"),
            FullscreenFailure::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Event vocabulary delivered by the elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MediaEventKind {
    /// Metadata loaded, duration known (seconds)
    MetadataReady { duration: f64 },
    /// Playback position moved (seconds)
    TimeAdvanced { time: f64 },
    /// Element started repositioning
    SeekInProgress,
    /// Element paused
    Paused,
    /// Element reached the end of its media
    Ended,
    /// Element failed while loading or playing
    PlaybackError { message: String },
}

/// Event tagged with its originating track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEvent {
    pub track: TrackKind,
    #[serde(flatten)]
    pub kind: MediaEventKind,
}

impl MediaEvent {
    pub fn new(track: TrackKind, kind: MediaEventKind) -> Self {
        Self { track, kind }
    }
}

/// Receiving side of the event channel, owned by the orchestrator
pub type EventStream = mpsc::UnboundedReceiver<MediaEvent>;

/// Listener handle given to an element by [`MediaElement::attach`]
#[derive(Debug, Clone)]
pub struct EventSink {
    track: TrackKind,
    tx: mpsc::UnboundedSender<MediaEvent>,
}

impl EventSink {
    fn new(track: TrackKind, tx: mpsc::UnboundedSender<MediaEvent>) -> Self {
        Self { track, tx }
    }

    /// Deliver an event. Returns false once the session stopped listening.
    pub fn emit(&self, kind: MediaEventKind) -> bool {
        self.tx.send(MediaEvent::new(self.track, kind)).is_ok()
    }
}

/// A media-capable element (one track).
///
/// Implementations use interior mutability: handles are shared between the
/// binding and whatever owns the element natively.
#[async_trait]
pub trait MediaElement: Send + Sync {
    /// Point the element at its source
    fn set_source(&self, uri: &Url);

    /// Register listeners. Events go to `sink` until [`MediaElement::detach`].
    fn attach(&self, sink: EventSink);

    /// Remove the listeners registered by `attach`. Must be idempotent.
    fn detach(&self);

    /// Start playback. Resolves once playback started or was refused.
    async fn play(&self) -> std::result::Result<(), PlayFailureReason>;

    fn pause(&self);

    fn current_time(&self) -> f64;

    fn set_current_time(&self, time: f64);

    /// Media duration in seconds, `None` until metadata is loaded
    fn duration(&self) -> Option<f64>;

    fn set_muted(&self, muted: bool);
}

/// Container element that can be shown fullscreen
#[async_trait]
pub trait FullscreenContainer: Send + Sync {
    fn is_fullscreen(&self) -> bool;

    async fn enter_fullscreen(&self) -> std::result::Result<(), FullscreenFailure>;

    async fn exit_fullscreen(&self) -> std::result::Result<(), FullscreenFailure>;
}

/// The video + audio pair of one session
pub struct MediaBinding {
    video: Arc<dyn MediaElement>,
    audio: Arc<dyn MediaElement>,
    offsets: TrackOffsets,
    bound: AtomicBool,
}

impl MediaBinding {
    /// Wrap two elements. Offsets are validated here and never change.
    pub fn new(
        video: Arc<dyn MediaElement>,
        audio: Arc<dyn MediaElement>,
        offsets: TrackOffsets,
    ) -> Result<Self> {
        offsets.validate()?;
        Ok(Self {
            video,
            audio,
            offsets,
            bound: AtomicBool::new(false),
        })
    }

    /// Attach listeners, load both sources and move each element to its
    /// start offset. No playback is requested.
    pub fn bind(&self, sources: &SourceUris) -> Result<EventStream> {
        if self.bound.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyBound);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for track in TrackKind::ALL {
            let element = self.element(track);
            element.attach(EventSink::new(track, tx.clone()));
            element.set_source(sources.get(track));
            element.set_current_time(self.offsets.get(track));
        }

        info!(
            video_start = self.offsets.video,
            audio_start = self.offsets.audio,
            "Media bound"
        );

        Ok(rx)
    }

    /// Remove all listeners. Safe to call repeatedly or before `bind`.
    pub fn unbind(&self) {
        for track in TrackKind::ALL {
            self.element(track).detach();
        }
        if self.bound.swap(false, Ordering::SeqCst) {
            info!("Media unbound");
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }

    pub fn offsets(&self) -> TrackOffsets {
        self.offsets
    }

    /// Play both elements. A failure on either track fails the request.
    ///
    /// A track that did start is left running: by the time this resolves a
    /// newer request may own the elements, so rolling back is up to the
    /// caller, which knows whether this request is still current.
    pub async fn request_play(&self) -> std::result::Result<(), PlayFailure> {
        if !self.is_bound() {
            return Err(PlayFailure {
                track: TrackKind::Video,
                reason: PlayFailureReason::NotReady,
            });
        }

        let (video, audio) = tokio::join!(self.video.play(), self.audio.play());

        match (video, audio) {
            (Ok(()), Ok(())) => {
                debug!("Both tracks playing");
                Ok(())
            }
            (Ok(()), Err(reason)) => {
                warn!(%reason, "Audio refused to play");
                Err(PlayFailure {
                    track: TrackKind::Audio,
                    reason,
                })
            }
            (Err(reason), _) => {
                warn!(%reason, "Video refused to play");
                Err(PlayFailure {
                    track: TrackKind::Video,
                    reason,
                })
            }
        }
    }

    pub fn request_pause(&self) {
        self.video.pause();
        self.audio.pause();
    }

    /// Move both elements to the same absolute time, clamped to
    /// `[0, duration]`. Returns the applied time.
    pub fn seek_to(&self, time: f64) -> f64 {
        let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
        let clamped = match self.duration() {
            Some(duration) => time.min(duration),
            None => time,
        };

        self.video.set_current_time(clamped);
        self.audio.set_current_time(clamped);
        debug!(requested = time, applied = clamped, "Seek applied");
        clamped
    }

    pub fn set_muted(&self, muted: bool) {
        self.video.set_muted(muted);
        self.audio.set_muted(muted);
    }

    /// Toggle fullscreen on `container`. Returns the fullscreen state after
    /// the request.
    pub async fn request_fullscreen(
        &self,
        container: &dyn FullscreenContainer,
    ) -> std::result::Result<bool, FullscreenFailure> {
        if container.is_fullscreen() {
            container.exit_fullscreen().await?;
            Ok(false)
        } else {
            container.enter_fullscreen().await?;
            Ok(true)
        }
    }

    /// Longest duration reported by the elements
    pub fn duration(&self) -> Option<f64> {
        match (self.video.duration(), self.audio.duration()) {
            (Some(v), Some(a)) => Some(v.max(a)),
            (Some(d), None) | (None, Some(d)) => Some(d),
            (None, None) => None,
        }
    }

    fn element(&self, track: TrackKind) -> &Arc<dyn MediaElement> {
        match track {
            TrackKind::Video => &self.video,
            TrackKind::Audio => &self.audio,
        }
    }
}
