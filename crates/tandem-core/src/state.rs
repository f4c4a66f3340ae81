//! Session state and its transition function
//!
//! All logical playback state lives in [`SessionState`] and is only ever
//! changed by [`SessionState::apply`]. Element events, user intents and the
//! outcomes of asynchronous commands all arrive as [`Input`]s; the function
//! returns the [`Effect`]s the orchestrator must carry out. Nothing in here
//! awaits or touches a media element.
//!
//! ```text
//!   Loading ──(metadata from both tracks)──► Ready
//!
//!   Ready:   Paused ◄──────► Playing          (toggle / pause / failure)
//!              │                │
//!              └── Seeking ─────┘             (begin_seek .. commit_seek)
//! ```

use crate::binding::{FullscreenFailure, MediaEvent, MediaEventKind, PlayFailure};
use crate::notice::Notice;
use crate::types::{BarRect, PlaybackPhase, PlaybackSnapshot, TrackKind};
use tracing::{debug, info};

/// Everything that can change session state
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Event from one of the elements
    Media(MediaEvent),
    /// User pressed play/pause
    TogglePlay,
    /// A play request finished
    PlayOutcome {
        attempt: u64,
        result: Result<(), PlayFailure>,
    },
    /// User started dragging (or pressed) the seek bar
    BeginSeek,
    /// User released the seek bar
    CommitSeek { pointer_x: f64, bar: BarRect },
    /// User pressed mute
    ToggleMute,
    /// User pressed fullscreen
    FullscreenRequested,
    /// A fullscreen request finished; `Ok` carries the new fullscreen state
    FullscreenOutcome {
        attempt: u64,
        result: Result<bool, FullscreenFailure>,
    },
}

/// Commands the orchestrator carries out after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Play both tracks and feed back [`Input::PlayOutcome`] with `attempt`
    RequestPlay { attempt: u64 },
    RequestPause,
    SeekTo { time: f64 },
    SetMuted { muted: bool },
    /// Toggle fullscreen and feed back [`Input::FullscreenOutcome`]
    RequestFullscreen { attempt: u64 },
    Notify(Notice),
}

/// Target time for a pointer position over the seek bar
pub fn seek_target(pointer_x: f64, bar: BarRect, duration: f64) -> f64 {
    if !duration.is_finite() || duration <= 0.0 {
        return 0.0;
    }
    bar.fraction_at(pointer_x) * duration
}

/// Logical playback state of one session
#[derive(Debug, Clone)]
pub struct SessionState {
    clock_track: TrackKind,
    drift_warning_secs: f64,

    is_playing: bool,
    is_loading: bool,
    is_muted: bool,
    is_seeking: bool,
    is_fullscreen: bool,
    current_time: f64,
    duration: f64,

    video_duration: Option<f64>,
    audio_duration: Option<f64>,

    play_attempt: u64,
    pending_play: Option<u64>,
    fullscreen_attempt: u64,
    pending_fullscreen: Option<u64>,
}

impl SessionState {
    /// Fresh state in `Loading`
    pub fn new(clock_track: TrackKind, drift_warning_secs: f64) -> Self {
        Self {
            clock_track,
            drift_warning_secs,
            is_playing: false,
            is_loading: true,
            is_muted: false,
            is_seeking: false,
            is_fullscreen: false,
            current_time: 0.0,
            duration: 0.0,
            video_duration: None,
            audio_duration: None,
            play_attempt: 0,
            pending_play: None,
            fullscreen_attempt: 0,
            pending_fullscreen: None,
        }
    }

    /// Apply one input and return the effects to carry out, in order
    pub fn apply(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::Media(event) => self.on_media_event(event),
            Input::TogglePlay => self.on_toggle_play(),
            Input::PlayOutcome { attempt, result } => self.on_play_outcome(attempt, result),
            Input::BeginSeek => self.on_begin_seek(),
            Input::CommitSeek { pointer_x, bar } => self.on_commit_seek(pointer_x, bar),
            Input::ToggleMute => {
                self.is_muted = !self.is_muted;
                vec![Effect::SetMuted {
                    muted: self.is_muted,
                }]
            }
            Input::FullscreenRequested => {
                self.fullscreen_attempt += 1;
                self.pending_fullscreen = Some(self.fullscreen_attempt);
                vec![Effect::RequestFullscreen {
                    attempt: self.fullscreen_attempt,
                }]
            }
            Input::FullscreenOutcome { attempt, result } => {
                self.on_fullscreen_outcome(attempt, result)
            }
        }
    }

    fn on_media_event(&mut self, event: MediaEvent) -> Vec<Effect> {
        let MediaEvent { track, kind } = event;
        match kind {
            MediaEventKind::MetadataReady { duration } => self.on_metadata(track, duration),
            MediaEventKind::TimeAdvanced { time } => {
                self.on_time_advanced(track, time);
                Vec::new()
            }
            MediaEventKind::SeekInProgress => {
                debug!(%track, "Element seeking");
                Vec::new()
            }
            MediaEventKind::Paused => self.on_external_pause(track),
            MediaEventKind::Ended => self.on_ended(track),
            MediaEventKind::PlaybackError { message } => {
                let mut effects = Vec::new();
                if self.is_playing {
                    self.is_playing = false;
                    self.pending_play = None;
                    effects.push(Effect::RequestPause);
                }
                effects.push(Effect::Notify(Notice::PlaybackError { track, message }));
                effects
            }
        }
    }

    fn on_metadata(&mut self, track: TrackKind, duration: f64) -> Vec<Effect> {
        if !duration.is_finite() || duration <= 0.0 {
            debug!(%track, duration, "Ignoring unusable duration");
            return Vec::new();
        }

        match track {
            TrackKind::Video => self.video_duration = Some(duration),
            TrackKind::Audio => self.audio_duration = Some(duration),
        }

        if !self.is_loading {
            // never shrinks once ready
            if duration > self.duration {
                debug!(%track, from = self.duration, to = duration, "Duration grew");
                self.duration = duration;
            }
            return Vec::new();
        }

        let (Some(video), Some(audio)) = (self.video_duration, self.audio_duration) else {
            debug!(%track, duration, "Waiting for the other track's metadata");
            return Vec::new();
        };

        self.is_loading = false;
        self.duration = video.max(audio);
        self.current_time = self.current_time.clamp(0.0, self.duration);
        info!(duration = self.duration, video, audio, "Session ready");

        if (video - audio).abs() > self.drift_warning_secs {
            vec![Effect::Notify(Notice::DurationDrift { video, audio })]
        } else {
            Vec::new()
        }
    }

    fn on_time_advanced(&mut self, track: TrackKind, time: f64) {
        if self.is_loading || self.is_seeking || track != self.clock_track {
            return;
        }
        if !time.is_finite() {
            debug!(%track, time, "Ignoring non-finite time update");
            return;
        }
        self.current_time = time.clamp(0.0, self.duration);
    }

    fn on_external_pause(&mut self, track: TrackKind) -> Vec<Effect> {
        // pauses during a seek, or while a play request is still settling,
        // are side effects of our own commands
        if !self.is_playing || self.is_seeking || self.pending_play.is_some() {
            return Vec::new();
        }
        info!(%track, "Element paused externally");
        self.is_playing = false;
        vec![Effect::RequestPause]
    }

    fn on_ended(&mut self, track: TrackKind) -> Vec<Effect> {
        if track != self.clock_track || self.is_loading || self.is_seeking {
            return Vec::new();
        }
        info!(%track, "Playback ended");
        self.is_playing = false;
        self.pending_play = None;
        self.current_time = self.duration;
        vec![Effect::RequestPause]
    }

    fn on_toggle_play(&mut self) -> Vec<Effect> {
        if self.is_playing {
            // drops the pending attempt, its outcome will be stale
            self.is_playing = false;
            self.pending_play = None;
            vec![Effect::RequestPause]
        } else {
            self.is_playing = true;
            vec![self.next_play_request()]
        }
    }

    fn next_play_request(&mut self) -> Effect {
        self.play_attempt += 1;
        self.pending_play = Some(self.play_attempt);
        Effect::RequestPlay {
            attempt: self.play_attempt,
        }
    }

    fn on_play_outcome(&mut self, attempt: u64, result: Result<(), PlayFailure>) -> Vec<Effect> {
        if self.pending_play != Some(attempt) {
            debug!(attempt, ok = result.is_ok(), "Stale play outcome");
            // a superseded request may have started one or both tracks;
            // while paused, pause again (a no-op on paused elements)
            if !self.is_playing {
                return vec![Effect::RequestPause];
            }
            return Vec::new();
        }

        self.pending_play = None;
        match result {
            Ok(()) => Vec::new(),
            Err(PlayFailure { track, reason }) => {
                self.is_playing = false;
                vec![
                    Effect::RequestPause,
                    Effect::Notify(Notice::PlayRejected { track, reason }),
                ]
            }
        }
    }

    fn on_begin_seek(&mut self) -> Vec<Effect> {
        if self.is_loading {
            debug!("Seek ignored while loading");
            return Vec::new();
        }
        self.is_seeking = true;
        Vec::new()
    }

    fn on_commit_seek(&mut self, pointer_x: f64, bar: BarRect) -> Vec<Effect> {
        if self.is_loading {
            self.is_seeking = false;
            debug!("Seek commit ignored while loading");
            return Vec::new();
        }

        let target = seek_target(pointer_x, bar, self.duration);
        self.current_time = target;
        self.is_seeking = false;

        let mut effects = vec![Effect::SeekTo { time: target }];
        if self.is_playing {
            effects.push(self.next_play_request());
        }
        effects
    }

    fn on_fullscreen_outcome(
        &mut self,
        attempt: u64,
        result: Result<bool, FullscreenFailure>,
    ) -> Vec<Effect> {
        if self.pending_fullscreen != Some(attempt) {
            debug!(attempt, "Stale fullscreen outcome");
            return Vec::new();
        }

        self.pending_fullscreen = None;
        match result {
            Ok(fullscreen) => {
                self.is_fullscreen = fullscreen;
                Vec::new()
            }
            Err(reason) => vec![Effect::Notify(Notice::FullscreenRejected { reason })],
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn is_seeking(&self) -> bool {
        self.is_seeking
    }

    pub fn is_fullscreen(&self) -> bool {
        self.is_fullscreen
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Duration reported by a single track, if any
    pub fn track_duration(&self, track: TrackKind) -> Option<f64> {
        match track {
            TrackKind::Video => self.video_duration,
            TrackKind::Audio => self.audio_duration,
        }
    }

    /// True while a play request is in flight
    pub fn has_pending_play(&self) -> bool {
        self.pending_play.is_some()
    }

    /// Progress for rendering, in [0, 100]
    pub fn watched_percentage(&self) -> f64 {
        if self.is_loading || self.duration <= 0.0 {
            return 0.0;
        }
        (self.current_time / self.duration * 100.0).clamp(0.0, 100.0)
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.snapshot().phase()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: self.is_playing,
            is_loading: self.is_loading,
            current_time: self.current_time,
            duration: self.duration,
            is_muted: self.is_muted,
            watched_percentage: self.watched_percentage(),
            is_seeking: self.is_seeking,
            is_fullscreen: self.is_fullscreen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::PlayFailureReason;

    fn metadata(track: TrackKind, duration: f64) -> Input {
        Input::Media(MediaEvent::new(
            track,
            MediaEventKind::MetadataReady { duration },
        ))
    }

    fn time(track: TrackKind, time: f64) -> Input {
        Input::Media(MediaEvent::new(track, MediaEventKind::TimeAdvanced { time }))
    }

    fn ready(duration: f64) -> SessionState {
        let mut state = SessionState::new(TrackKind::Video, 1.0);
        state.apply(metadata(TrackKind::Video, duration));
        state.apply(metadata(TrackKind::Audio, duration));
        state
    }

    fn start_playing(state: &mut SessionState) -> u64 {
        match state.apply(Input::TogglePlay).as_slice() {
            [Effect::RequestPlay { attempt }] => *attempt,
            other => panic!("unexpected effects {:?}", other),
        }
    }

    #[test]
    fn test_ready_needs_both_tracks() {
        let mut state = SessionState::new(TrackKind::Video, 1.0);
        state.apply(metadata(TrackKind::Audio, 30.4));
        assert!(state.is_loading());
        assert_eq!(state.phase(), PlaybackPhase::Loading);

        state.apply(metadata(TrackKind::Video, 30.0));
        assert!(!state.is_loading());
        assert_eq!(state.duration(), 30.4);
        assert_eq!(state.phase(), PlaybackPhase::Paused);
    }

    #[test]
    fn test_unusable_durations_ignored() {
        let mut state = SessionState::new(TrackKind::Video, 1.0);
        state.apply(metadata(TrackKind::Video, f64::INFINITY));
        state.apply(metadata(TrackKind::Audio, 0.0));
        state.apply(metadata(TrackKind::Audio, f64::NAN));
        assert!(state.is_loading());
        assert_eq!(state.track_duration(TrackKind::Video), None);
    }

    #[test]
    fn test_duration_never_shrinks() {
        let mut state = ready(60.0);
        state.apply(metadata(TrackKind::Video, 20.0));
        assert_eq!(state.duration(), 60.0);
        state.apply(metadata(TrackKind::Audio, 61.0));
        assert_eq!(state.duration(), 61.0);
    }

    #[test]
    fn test_drift_notice() {
        let mut state = SessionState::new(TrackKind::Video, 0.5);
        state.apply(metadata(TrackKind::Video, 10.0));
        let effects = state.apply(metadata(TrackKind::Audio, 12.0));
        assert_eq!(
            effects,
            vec![Effect::Notify(Notice::DurationDrift {
                video: 10.0,
                audio: 12.0
            })]
        );
    }

    #[test]
    fn test_time_updates_suppressed_while_loading() {
        let mut state = SessionState::new(TrackKind::Video, 1.0);
        state.apply(time(TrackKind::Video, 4.0));
        assert_eq!(state.current_time(), 0.0);
    }

    #[test]
    fn test_time_updates_follow_clock_track() {
        let mut state = ready(100.0);
        state.apply(time(TrackKind::Video, 12.0));
        state.apply(time(TrackKind::Audio, 11.8));
        assert_eq!(state.current_time(), 12.0);

        state.apply(time(TrackKind::Video, 500.0));
        assert_eq!(state.current_time(), 100.0);
    }

    #[test]
    fn test_time_updates_suppressed_while_seeking() {
        let mut state = ready(100.0);
        state.apply(time(TrackKind::Video, 12.0));
        state.apply(Input::BeginSeek);
        for t in [13.0, 14.0, 15.0] {
            state.apply(time(TrackKind::Video, t));
            assert_eq!(state.current_time(), 12.0);
        }
    }

    #[test]
    fn test_toggle_play_is_optimistic() {
        let mut state = ready(10.0);
        let attempt = start_playing(&mut state);
        assert!(state.is_playing());
        assert!(state.has_pending_play());

        assert!(state
            .apply(Input::PlayOutcome {
                attempt,
                result: Ok(())
            })
            .is_empty());
        assert!(state.is_playing());
        assert!(!state.has_pending_play());
    }

    #[test]
    fn test_play_failure_reverts() {
        let mut state = ready(10.0);
        let attempt = start_playing(&mut state);
        let effects = state.apply(Input::PlayOutcome {
            attempt,
            result: Err(PlayFailure {
                track: TrackKind::Video,
                reason: PlayFailureReason::NotAllowed,
            }),
        });

        assert!(!state.is_playing());
        assert_eq!(effects[0], Effect::RequestPause);
        assert!(matches!(
            effects[1],
            Effect::Notify(Notice::PlayRejected {
                reason: PlayFailureReason::NotAllowed,
                ..
            })
        ));
    }

    #[test]
    fn test_stale_success_after_pause_is_corrected() {
        let mut state = ready(10.0);
        let attempt = start_playing(&mut state);
        assert_eq!(state.apply(Input::TogglePlay), vec![Effect::RequestPause]);

        let effects = state.apply(Input::PlayOutcome {
            attempt,
            result: Ok(()),
        });
        assert_eq!(effects, vec![Effect::RequestPause]);
        assert!(!state.is_playing());
    }

    #[test]
    fn test_stale_partial_start_while_paused_is_corrected() {
        let mut state = ready(10.0);
        let attempt = start_playing(&mut state);
        state.apply(Input::TogglePlay);

        let effects = state.apply(Input::PlayOutcome {
            attempt,
            result: Err(PlayFailure {
                track: TrackKind::Audio,
                reason: PlayFailureReason::Aborted,
            }),
        });
        assert_eq!(effects, vec![Effect::RequestPause]);
        assert!(!state.is_playing());
    }

    #[test]
    fn test_stale_outcome_leaves_newer_play_alone() {
        let mut state = ready(10.0);
        let first = start_playing(&mut state);
        state.apply(Input::TogglePlay);
        let second = start_playing(&mut state);
        assert_ne!(first, second);

        let effects = state.apply(Input::PlayOutcome {
            attempt: first,
            result: Err(PlayFailure {
                track: TrackKind::Audio,
                reason: PlayFailureReason::Aborted,
            }),
        });
        assert!(effects.is_empty());
        assert!(state.is_playing());
        assert!(state.has_pending_play());

        assert!(state
            .apply(Input::PlayOutcome {
                attempt: second,
                result: Ok(())
            })
            .is_empty());
        assert!(state.is_playing());
    }

    #[test]
    fn test_commit_seek_math_and_replay() {
        let mut state = ready(120.0);
        let attempt = start_playing(&mut state);
        state.apply(Input::PlayOutcome {
            attempt,
            result: Ok(()),
        });

        state.apply(Input::BeginSeek);
        assert!(state.is_seeking());

        let effects = state.apply(Input::CommitSeek {
            pointer_x: 150.0,
            bar: BarRect::new(100.0, 200.0),
        });
        assert_eq!(state.current_time(), 30.0);
        assert!(!state.is_seeking());
        assert!(state.is_playing());
        assert_eq!(effects[0], Effect::SeekTo { time: 30.0 });
        assert!(matches!(effects[1], Effect::RequestPlay { attempt } if attempt == 2));
    }

    #[test]
    fn test_commit_seek_while_paused_does_not_play() {
        let mut state = ready(120.0);
        let effects = state.apply(Input::CommitSeek {
            pointer_x: 300.0,
            bar: BarRect::new(100.0, 200.0),
        });
        assert_eq!(effects, vec![Effect::SeekTo { time: 120.0 }]);
        assert!(!state.is_playing());
        assert_eq!(state.watched_percentage(), 100.0);
    }

    #[test]
    fn test_seek_ignored_while_loading() {
        let mut state = SessionState::new(TrackKind::Video, 1.0);
        state.apply(Input::BeginSeek);
        assert!(!state.is_seeking());
        assert!(state
            .apply(Input::CommitSeek {
                pointer_x: 10.0,
                bar: BarRect::new(0.0, 100.0),
            })
            .is_empty());
    }

    #[test]
    fn test_external_pause() {
        let mut state = ready(10.0);
        let attempt = start_playing(&mut state);

        // still settling, left to the outcome
        let pause = Input::Media(MediaEvent::new(TrackKind::Audio, MediaEventKind::Paused));
        assert!(state.apply(pause.clone()).is_empty());
        assert!(state.is_playing());

        state.apply(Input::PlayOutcome {
            attempt,
            result: Ok(()),
        });
        assert_eq!(state.apply(pause), vec![Effect::RequestPause]);
        assert!(!state.is_playing());
    }

    #[test]
    fn test_ended_on_clock_track() {
        let mut state = ready(10.0);
        let attempt = start_playing(&mut state);
        state.apply(Input::PlayOutcome {
            attempt,
            result: Ok(()),
        });

        let ended = |track| Input::Media(MediaEvent::new(track, MediaEventKind::Ended));
        assert!(state.apply(ended(TrackKind::Audio)).is_empty());
        assert_eq!(state.apply(ended(TrackKind::Video)), vec![Effect::RequestPause]);
        assert!(!state.is_playing());
        assert_eq!(state.current_time(), 10.0);
    }

    #[test]
    fn test_playback_error_reverts_and_notifies() {
        let mut state = ready(10.0);
        start_playing(&mut state);
        let effects = state.apply(Input::Media(MediaEvent::new(
            TrackKind::Audio,
            MediaEventKind::PlaybackError {
                message: "decode".into(),
            },
        )));
        assert!(!state.is_playing());
        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0], Effect::RequestPause);
    }

    #[test]
    fn test_mute_toggle() {
        let mut state = SessionState::new(TrackKind::Video, 1.0);
        assert_eq!(
            state.apply(Input::ToggleMute),
            vec![Effect::SetMuted { muted: true }]
        );
        assert_eq!(
            state.apply(Input::ToggleMute),
            vec![Effect::SetMuted { muted: false }]
        );
    }

    #[test]
    fn test_fullscreen_outcomes() {
        let mut state = ready(10.0);
        assert_eq!(
            state.apply(Input::FullscreenRequested),
            vec![Effect::RequestFullscreen { attempt: 1 }]
        );
        state.apply(Input::FullscreenOutcome {
            attempt: 1,
            result: Ok(true),
        });
        assert!(state.is_fullscreen());

        state.apply(Input::FullscreenRequested);
        let effects = state.apply(Input::FullscreenOutcome {
            attempt: 2,
            result: Err(FullscreenFailure::PermissionDenied),
        });
        assert!(state.is_fullscreen());
        assert_eq!(effects.len(), 1);

        // late outcome of an old attempt
        assert!(state
            .apply(Input::FullscreenOutcome {
                attempt: 1,
                result: Ok(false),
            })
            .is_empty());
        assert!(state.is_fullscreen());
    }

    #[test]
    fn test_watched_percentage_bounds() {
        let mut state = SessionState::new(TrackKind::Video, 1.0);
        assert_eq!(state.watched_percentage(), 0.0);

        let mut state_ready = ready(80.0);
        for t in [0.0, 20.0, 40.0, 80.0] {
            state_ready.apply(time(TrackKind::Video, t));
            let pct = state_ready.watched_percentage();
            assert!((0.0..=100.0).contains(&pct));
        }
        assert_eq!(state_ready.watched_percentage(), 100.0);

        state.apply(time(TrackKind::Video, 5.0));
        assert_eq!(state.watched_percentage(), 0.0);
    }

    #[test]
    fn test_seek_target_zero_duration() {
        assert_eq!(seek_target(150.0, BarRect::new(100.0, 200.0), 0.0), 0.0);
        assert_eq!(seek_target(150.0, BarRect::new(100.0, 200.0), 120.0), 30.0);
    }
}
