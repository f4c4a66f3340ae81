//! Playback Session - Orchestrator for one mounted view
//!
//! Coordinates:
//! - Binding the video and audio elements
//! - Funnelling element events and user intents into the state machine
//! - Carrying out the resulting media commands
//! - Reporting recovered failures as notices
//! - Teardown, after which late completions are discarded

use crate::{
    binding::{EventStream, FullscreenContainer, FullscreenFailure, MediaBinding, MediaElement, MediaEvent},
    config::ControllerConfig,
    notice::{Notice, NoticeEmitter, NoticeRecord},
    source::SourceUris,
    state::{Effect, Input, SessionState},
    types::*,
    Error, Result,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Playback session over one video record
pub struct PlaybackSession {
    /// Unique session ID
    id: SessionId,
    /// Session configuration
    config: ControllerConfig,
    /// Record the session was mounted with
    record: VideoRecord,
    /// Playlist URIs of both tracks
    sources: SourceUris,
    /// Video + audio elements
    binding: MediaBinding,
    /// Logical playback state
    state: RwLock<SessionState>,
    /// Snapshot broadcaster
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
    /// Recovered failures
    notices: NoticeEmitter,
    /// Element events, taken on unmount
    events: Mutex<Option<EventStream>>,
    /// Set to false on unmount
    live: watch::Sender<bool>,
    /// Mount time
    mounted_at: Instant,
}

impl PlaybackSession {
    /// Bind both elements for `record` and start in `Loading`
    pub fn mount(
        record: VideoRecord,
        video: Arc<dyn MediaElement>,
        audio: Arc<dyn MediaElement>,
        config: ControllerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let id = SessionId::new();
        let sources = SourceUris::from_record(&config.base_url, &record)?;
        let binding = MediaBinding::new(video, audio, record.offsets())?;
        let events = binding.bind(&sources)?;

        let state = SessionState::new(config.clock_track, config.drift_warning_secs);
        let (snapshot_tx, _) = watch::channel(state.snapshot());

        info!(
            session_id = %id,
            video_id = %record.id,
            owner_id = %record.owner_id,
            "Session mounted"
        );

        Ok(Self {
            id,
            notices: NoticeEmitter::new(id, config.notice_history),
            config,
            record,
            sources,
            binding,
            state: RwLock::new(state),
            snapshot_tx,
            events: Mutex::new(Some(events)),
            live: watch::channel(true).0,
            mounted_at: Instant::now(),
        })
    }

    /// Get session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn record(&self) -> &VideoRecord {
        &self.record
    }

    pub fn sources(&self) -> &SourceUris {
        &self.sources
    }

    pub fn offsets(&self) -> TrackOffsets {
        self.binding.offsets()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// False once the session was unmounted
    pub fn is_live(&self) -> bool {
        *self.live.borrow()
    }

    /// Current state for rendering
    pub async fn snapshot(&self) -> PlaybackSnapshot {
        self.state.read().await.snapshot()
    }

    /// Current phase
    pub async fn phase(&self) -> PlaybackPhase {
        self.state.read().await.phase()
    }

    /// Subscribe to snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Subscribe to notices emitted from now on
    pub fn subscribe_notices(&self) -> broadcast::Receiver<NoticeRecord> {
        self.notices.subscribe()
    }

    /// Retained notices, oldest first
    pub async fn notices(&self) -> Vec<NoticeRecord> {
        self.notices.recent().await
    }

    /// Toggle between playing and paused
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn toggle_play(&self) {
        self.dispatch(Input::TogglePlay, None).await;
    }

    /// Seek bar pressed, time updates stop moving the displayed position
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn begin_seek(&self) {
        self.dispatch(Input::BeginSeek, None).await;
    }

    /// Seek bar released at `pointer_x`
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn commit_seek(&self, pointer_x: f64, bar: BarRect) {
        self.dispatch(Input::CommitSeek { pointer_x, bar }, None).await;
    }

    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn toggle_mute(&self) {
        self.dispatch(Input::ToggleMute, None).await;
    }

    /// Enter or leave fullscreen on `container`
    #[instrument(skip(self, container), fields(session_id = %self.id))]
    pub async fn toggle_fullscreen(&self, container: &dyn FullscreenContainer) {
        self.dispatch(Input::FullscreenRequested, Some(container)).await;
    }

    /// Feed one element event into the state machine
    pub async fn handle_event(&self, event: MediaEvent) {
        self.dispatch(Input::Media(event), None).await;
    }

    /// Handle every event queued so far without waiting for new ones.
    /// Returns the number of events handled, which is always 0 while
    /// [`run`](Self::run) owns the stream.
    pub async fn process_pending_events(&self) -> usize {
        let mut handled = 0;
        loop {
            let next = {
                let mut events = self.events.lock().await;
                match events.as_mut() {
                    Some(rx) => rx.try_recv().ok(),
                    None => None,
                }
            };
            let Some(event) = next else {
                break;
            };
            self.handle_event(event).await;
            handled += 1;
        }
        handled
    }

    /// Handle element events until the session is unmounted.
    ///
    /// Takes the event stream for good: a second call, or one after
    /// unmount, returns immediately.
    pub async fn run(&self) {
        let Some(mut events) = self.events.lock().await.take() else {
            debug!(session_id = %self.id, "Event stream already taken");
            return;
        };

        debug!(session_id = %self.id, "Event loop started");
        while let Some(event) = events.recv().await {
            if !self.is_live() {
                break;
            }
            self.handle_event(event).await;
        }
        debug!(session_id = %self.id, "Event loop stopped");
    }

    /// Wait until both tracks reported metadata.
    ///
    /// Falls back to the configured `loadingTimeoutMs` when `timeout` is
    /// `None`; with neither set this waits indefinitely. On timeout a
    /// `LoadingStalled` notice is emitted and the session stays in
    /// `Loading`. Fails with `SessionClosed` if the session is, or gets,
    /// unmounted first.
    pub async fn await_ready(&self, timeout: Option<Duration>) -> Result<()> {
        if !self.is_live() {
            return Err(Error::SessionClosed);
        }

        let mut snapshots = self.subscribe();
        let mut live = self.live.subscribe();
        let wait = async {
            tokio::select! {
                ready = snapshots.wait_for(|snapshot| !snapshot.is_loading) => {
                    ready.map(|_| ()).map_err(|_| Error::SessionClosed)
                }
                _ = live.wait_for(|live| !*live) => Err(Error::SessionClosed),
            }
        };

        match timeout.or_else(|| self.config.loading_timeout()) {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let waited_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                    if self.is_live() {
                        self.notices.emit(Notice::LoadingStalled { waited_ms }).await;
                    }
                    Err(Error::LoadingTimeout { waited_ms })
                }
            },
            None => wait.await,
        }
    }

    /// Release both elements. Idempotent; completions still in flight are
    /// discarded when they arrive.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn unmount(&self) {
        if !self.live.send_replace(false) {
            return;
        }

        self.binding.unbind();

        // run() owns the stream once started and stops when the sinks drop
        if let Ok(mut events) = self.events.try_lock() {
            events.take();
        }

        info!(
            uptime_ms = self.mounted_at.elapsed().as_millis() as u64,
            "Session unmounted"
        );
    }

    /// Apply an input, carry out its effects and apply the outcomes they
    /// produce, until nothing is left
    async fn dispatch(&self, input: Input, container: Option<&dyn FullscreenContainer>) {
        let mut queue = VecDeque::from([input]);

        while let Some(input) = queue.pop_front() {
            if !self.is_live() {
                debug!(?input, "Session torn down, input discarded");
                return;
            }

            let effects = {
                let mut state = self.state.write().await;
                let mut effects = state.apply(input);
                let snapshot = state.snapshot();
                self.snapshot_tx.send_if_modified(|current| {
                    if *current != snapshot {
                        *current = snapshot;
                        true
                    } else {
                        false
                    }
                });
                // element commands follow the order of state changes
                effects.retain(|effect| !self.issue(effect));
                effects
            };

            for effect in effects {
                if let Some(next) = self.perform(effect, container).await {
                    queue.push_back(next);
                }
            }
        }
    }

    /// Carry out an effect that completes synchronously. Returns false for
    /// effects that have to be awaited; after unmount every effect counts
    /// as handled.
    fn issue(&self, effect: &Effect) -> bool {
        if !self.is_live() {
            return true;
        }

        match *effect {
            Effect::RequestPause => self.binding.request_pause(),
            Effect::SeekTo { time } => {
                self.binding.seek_to(time);
            }
            Effect::SetMuted { muted } => self.binding.set_muted(muted),
            _ => return false,
        }
        true
    }

    async fn perform(
        &self,
        effect: Effect,
        container: Option<&dyn FullscreenContainer>,
    ) -> Option<Input> {
        if !self.is_live() {
            return None;
        }

        match effect {
            Effect::RequestPlay { attempt } => {
                let result = self.binding.request_play().await;
                Some(Input::PlayOutcome { attempt, result })
            }
            Effect::RequestPause | Effect::SeekTo { .. } | Effect::SetMuted { .. } => {
                self.issue(&effect);
                None
            }
            Effect::RequestFullscreen { attempt } => {
                let result = match container {
                    Some(container) => self.binding.request_fullscreen(container).await,
                    None => {
                        warn!("Fullscreen requested without a container");
                        Err(FullscreenFailure::NotSupported)
                    }
                };
                Some(Input::FullscreenOutcome { attempt, result })
            }
            Effect::Notify(notice) => {
                self.notices.emit(notice).await;
                None
            }
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        if self.live.send_replace(false) {
            self.binding.unbind();
        }
    }
}
