//! Core types for Tandem

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the two independently loaded media resources in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Screen capture, video only
    Video,
    /// Microphone capture, audio only
    Audio,
}

impl TrackKind {
    /// Both tracks, video first
    pub const ALL: [TrackKind; 2] = [TrackKind::Video, TrackKind::Audio];

    /// Value of the `videoType` playlist query parameter
    pub fn playlist_type(&self) -> &'static str {
        match self {
            TrackKind::Video => "screen",
            TrackKind::Audio => "audio",
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
        }
    }
}

/// Video record handed over by the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    /// Video identifier
    pub id: String,
    /// Owner (user) identifier
    pub owner_id: String,
    /// Offset into the video track where playback starts (seconds)
    #[serde(default)]
    pub video_start_time: f64,
    /// Offset into the audio track where playback starts (seconds)
    #[serde(default)]
    pub audio_start_time: f64,
}

impl VideoRecord {
    pub fn new(id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            video_start_time: 0.0,
            audio_start_time: 0.0,
        }
    }

    /// Set both start offsets
    pub fn with_start_times(mut self, video: f64, audio: f64) -> Self {
        self.video_start_time = video;
        self.audio_start_time = audio;
        self
    }

    /// Start offsets of the two tracks
    pub fn offsets(&self) -> TrackOffsets {
        TrackOffsets {
            video: self.video_start_time,
            audio: self.audio_start_time,
        }
    }
}

/// Per-track start offsets, applied once at bind time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackOffsets {
    pub video: f64,
    pub audio: f64,
}

impl TrackOffsets {
    pub fn new(video: f64, audio: f64) -> Self {
        Self { video, audio }
    }

    /// Offset of a single track
    pub fn get(&self, track: TrackKind) -> f64 {
        match track {
            TrackKind::Video => self.video,
            TrackKind::Audio => self.audio,
        }
    }

    /// Offsets must be finite and non-negative
    pub fn validate(&self) -> Result<()> {
        for track in TrackKind::ALL {
            let value = self.get(track);
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidOffset { track, value });
            }
        }
        Ok(())
    }
}

/// Horizontal extent of the seek bar, in the same units as pointer positions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarRect {
    pub left: f64,
    pub width: f64,
}

impl BarRect {
    pub fn new(left: f64, width: f64) -> Self {
        Self { left, width }
    }

    /// Fraction of the bar under `pointer_x`, clamped to [0, 1].
    /// A degenerate bar (zero, negative or non-finite width) maps to 0.
    pub fn fraction_at(&self, pointer_x: f64) -> f64 {
        if !self.width.is_finite() || self.width <= 0.0 {
            return 0.0;
        }
        let fraction = (pointer_x - self.left) / self.width;
        if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        }
    }
}

/// Coarse playback phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackPhase {
    /// Waiting for both tracks to report metadata
    Loading,
    /// Ready, play intent off
    Paused,
    /// Ready, play intent on
    Playing,
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackPhase::Loading => write!(f, "loading"),
            PlaybackPhase::Paused => write!(f, "paused"),
            PlaybackPhase::Playing => write!(f, "playing"),
        }
    }
}

/// Read-only view of a session for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub is_loading: bool,
    pub current_time: f64,
    pub duration: f64,
    pub is_muted: bool,
    pub watched_percentage: f64,
    pub is_seeking: bool,
    pub is_fullscreen: bool,
}

impl PlaybackSnapshot {
    /// Phase derived from the loading and play flags
    pub fn phase(&self) -> PlaybackPhase {
        if self.is_loading {
            PlaybackPhase::Loading
        } else if self.is_playing {
            PlaybackPhase::Playing
        } else {
            PlaybackPhase::Paused
        }
    }
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            is_playing: false,
            is_loading: true,
            current_time: 0.0,
            duration: 0.0,
            is_muted: false,
            watched_percentage: 0.0,
            is_seeking: false,
            is_fullscreen: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_fraction() {
        let bar = BarRect::new(100.0, 200.0);
        assert_eq!(bar.fraction_at(150.0), 0.25);
        assert_eq!(bar.fraction_at(50.0), 0.0);
        assert_eq!(bar.fraction_at(400.0), 1.0);
    }

    #[test]
    fn test_degenerate_bar() {
        assert_eq!(BarRect::new(10.0, 0.0).fraction_at(20.0), 0.0);
        assert_eq!(BarRect::new(10.0, -5.0).fraction_at(20.0), 0.0);
        assert_eq!(BarRect::new(10.0, f64::NAN).fraction_at(20.0), 0.0);
        assert_eq!(BarRect::new(10.0, 100.0).fraction_at(f64::NAN), 0.0);
    }

    #[test]
    fn test_offsets_validation() {
        assert!(TrackOffsets::new(0.0, 1.5).validate().is_ok());

        let err = TrackOffsets::new(0.0, -0.5).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidOffset { track: TrackKind::Audio, .. }));

        let err = TrackOffsets::new(f64::INFINITY, 0.0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidOffset { track: TrackKind::Video, .. }));
    }

    #[test]
    fn test_record_deserialize() {
        let json = r#"{"id":"v1","ownerId":"u1","videoStartTime":1.25}"#;
        let record: VideoRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.owner_id, "u1");
        assert_eq!(record.offsets(), TrackOffsets::new(1.25, 0.0));
    }

    #[test]
    fn test_snapshot_phase() {
        let mut snapshot = PlaybackSnapshot::default();
        assert_eq!(snapshot.phase(), PlaybackPhase::Loading);

        snapshot.is_loading = false;
        assert_eq!(snapshot.phase(), PlaybackPhase::Paused);

        snapshot.is_playing = true;
        assert_eq!(snapshot.phase(), PlaybackPhase::Playing);
        assert_eq!(snapshot.phase().to_string(), "playing");
    }
}
