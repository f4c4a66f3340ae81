//! Reportable, non-fatal session events
//!
//! Every media command failure is recovered inside the session and then
//! surfaced here:
//! - rejected play requests (autoplay policy, media not ready)
//! - rejected fullscreen requests
//! - element playback errors
//! - metadata that did not arrive in time
//! - track durations that disagree

use crate::binding::{FullscreenFailure, PlayFailureReason};
use crate::types::{SessionId, TrackKind};
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::{broadcast, RwLock};
use tracing::warn;
use uuid::Uuid;

/// Notice types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// Play request refused, session reverted to paused
    PlayRejected {
        track: TrackKind,
        reason: PlayFailureReason,
    },

    /// Fullscreen request refused, fullscreen state unchanged
    FullscreenRejected { reason: FullscreenFailure },

    /// Element reported an error
    PlaybackError { track: TrackKind, message: String },

    /// Metadata still missing when the caller's deadline passed
    LoadingStalled { waited_ms: u64 },

    /// Reported durations differ by more than the configured threshold
    DurationDrift { video: f64, audio: f64 },
}

impl Notice {
    /// Stable code, shared with [`crate::Error::error_code`] where both exist
    pub fn code(&self) -> &'static str {
        match self {
            Notice::PlayRejected { .. } => "PLAY_REJECTED",
            Notice::FullscreenRejected { .. } => "FULLSCREEN_REJECTED",
            Notice::PlaybackError { .. } => "PLAYBACK_ERROR",
            Notice::LoadingStalled { .. } => "LOADING_TIMEOUT",
            Notice::DurationDrift { .. } => "DURATION_DRIFT",
        }
    }

    /// The error this notice stands for, if it reports a refused command
    /// or a missed deadline
    pub fn to_error(&self) -> Option<Error> {
        match self {
            Notice::PlayRejected { track, reason } => Some(Error::PlayRejected {
                track: *track,
                reason: reason.clone(),
            }),
            Notice::FullscreenRejected { reason } => {
                Some(Error::FullscreenRejected(reason.clone()))
            }
            Notice::LoadingStalled { waited_ms } => Some(Error::LoadingTimeout {
                waited_ms: *waited_ms,
            }),
            Notice::PlaybackError { .. } | Notice::DurationDrift { .. } => None,
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::PlayRejected { track, reason } => {
                write!(f, "{} track refused to play: {}", track, reason)
            }
            Notice::FullscreenRejected { reason } => write!(f, "fullscreen refused: {}", reason),
            Notice::PlaybackError { track, message } => {
                write!(f, "{} track error: {}", track, message)
            }
            Notice::LoadingStalled { waited_ms } => {
                write!(f, "metadata not ready after {}ms", waited_ms)
            }
            Notice::DurationDrift { video, audio } => write!(
                f,
                "track durations differ by {:.3}s (video {:.3}s, audio {:.3}s)",
                (video - audio).abs(),
                video,
                audio
            ),
        }
    }
}

/// Notice with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeRecord {
    /// Unique notice ID
    pub id: Uuid,
    /// Session ID
    pub session_id: SessionId,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Sequence number, starting at 1
    pub sequence: u64,
    /// The notice
    #[serde(flatten)]
    pub notice: Notice,
}

/// Notice emitter: keeps a bounded history and fans out to subscribers
pub struct NoticeEmitter {
    /// Session ID
    session_id: SessionId,
    /// Notice sequence counter
    sequence: RwLock<u64>,
    /// Most recent notices
    history: RwLock<VecDeque<NoticeRecord>>,
    /// History capacity
    capacity: usize,
    /// Live subscribers
    notice_tx: broadcast::Sender<NoticeRecord>,
}

impl NoticeEmitter {
    /// Create an emitter keeping at most `capacity` notices
    pub fn new(session_id: SessionId, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (notice_tx, _) = broadcast::channel(capacity);

        Self {
            session_id,
            sequence: RwLock::new(0),
            history: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            notice_tx,
        }
    }

    /// Record and broadcast a notice
    pub async fn emit(&self, notice: Notice) -> NoticeRecord {
        let mut seq = self.sequence.write().await;
        *seq += 1;
        let sequence = *seq;
        drop(seq);

        warn!(
            session_id = %self.session_id,
            code = notice.code(),
            sequence,
            "{}",
            notice
        );

        let record = NoticeRecord {
            id: Uuid::new_v4(),
            session_id: self.session_id,
            timestamp: Utc::now(),
            sequence,
            notice,
        };

        let mut history = self.history.write().await;
        if history.len() == self.capacity {
            history.pop_front();
        }
        history.push_back(record.clone());
        drop(history);

        // no subscribers is fine
        let _ = self.notice_tx.send(record.clone());

        record
    }

    /// Subscribe to notices emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<NoticeRecord> {
        self.notice_tx.subscribe()
    }

    /// Retained notices, oldest first
    pub async fn recent(&self) -> Vec<NoticeRecord> {
        self.history.read().await.iter().cloned().collect()
    }

    /// Number of notices emitted so far, including evicted ones
    pub async fn total(&self) -> u64 {
        *self.sequence.read().await
    }
}
