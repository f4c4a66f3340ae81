//! CLI command implementations

use crate::output::{self, SimulationReport, TimelineRow};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tandem_core::sim::{PlayBehavior, SimulatedContainer, SimulatedElement};
use tandem_core::{
    BarRect, ControllerConfig, Error, MediaElement, PlayFailureReason, PlaybackSession,
    SourceUris, TrackKind, VideoRecord,
};
use tracing::{debug, info};
use url::Url;

/// Deadline for metadata when the configuration sets none
const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(500);

/// Everything `tandem simulate` was asked to do
pub struct SimulationScript {
    pub record: Option<PathBuf>,
    pub owner_id: Option<String>,
    pub video_id: Option<String>,
    pub video_duration: f64,
    pub audio_duration: f64,
    pub video_start: f64,
    pub audio_start: f64,
    pub reject_autoplay: bool,
    pub deny_fullscreen: bool,
    pub play_seconds: f64,
    pub step: f64,
    pub pointer_x: Option<f64>,
    pub bar_left: f64,
    pub bar_width: f64,
    pub withhold_metadata: bool,
    pub strict: bool,
    pub config: Option<PathBuf>,
}

impl SimulationScript {
    fn video_record(&self) -> anyhow::Result<VideoRecord> {
        if let Some(path) = &self.record {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading record {}", path.display()))?;
            let record: VideoRecord = serde_json::from_str(&content)
                .with_context(|| format!("parsing record {}", path.display()))?;
            return Ok(record);
        }

        match (&self.owner_id, &self.video_id) {
            (Some(owner_id), Some(video_id)) => Ok(VideoRecord::new(video_id, owner_id)
                .with_start_times(self.video_start, self.audio_start)),
            _ => anyhow::bail!("either --record or both --owner-id and --video-id are required"),
        }
    }
}

/// Load configuration: file (or defaults), then environment, then flags
fn load_config(path: Option<&Path>, base_url: Option<&str>) -> anyhow::Result<ControllerConfig> {
    let config = match path {
        Some(path) => ControllerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ControllerConfig::default(),
    };

    let mut config = config.with_env()?;
    if let Some(base_url) = base_url {
        config = config.with_base_url(Url::parse(base_url)?);
    }
    config.validate()?;

    debug!(base_url = %config.base_url, clock_track = %config.clock_track, "Configuration loaded");
    Ok(config)
}

/// Print the playlist URIs of a recording
pub fn sources(
    owner_id: &str,
    video_id: &str,
    base_url: Option<&str>,
    config: Option<PathBuf>,
    format: &str,
) -> anyhow::Result<()> {
    let config = load_config(config.as_deref(), base_url)?;
    let sources = SourceUris::from_record(&config.base_url, &VideoRecord::new(video_id, owner_id))?;

    println!("{}", output::format_sources(&sources, format));
    Ok(())
}

/// Drive a complete session against simulated tracks
pub async fn simulate(script: SimulationScript, format: &str) -> anyhow::Result<()> {
    let config = load_config(script.config.as_deref(), None)?;
    let record = script.video_record()?;
    let ready_timeout = config.loading_timeout().unwrap_or(DEFAULT_READY_TIMEOUT);

    let behavior = if script.reject_autoplay {
        PlayBehavior::Reject(PlayFailureReason::NotAllowed)
    } else {
        PlayBehavior::Resolve
    };
    let video = Arc::new(
        SimulatedElement::new(TrackKind::Video, script.video_duration)
            .with_behavior(behavior.clone()),
    );
    let audio = Arc::new(
        SimulatedElement::new(TrackKind::Audio, script.audio_duration).with_behavior(behavior),
    );
    let container = SimulatedContainer::new();
    container.set_allowed(!script.deny_fullscreen);

    let session = PlaybackSession::mount(record, video.clone(), audio.clone(), config)?;
    info!(session_id = %session.id(), "Simulation started");

    let mut timeline = Vec::new();
    timeline.push(TimelineRow::capture("mount", &session).await);

    if !script.withhold_metadata {
        video.load_metadata();
        audio.load_metadata();
        session.process_pending_events().await;
        timeline.push(TimelineRow::capture("metadata", &session).await);
    }

    match session.await_ready(Some(ready_timeout)).await {
        Ok(()) => {
            run_transport(&script, &session, &video, &audio, &container, &mut timeline).await;
        }
        Err(err @ Error::LoadingTimeout { .. }) => {
            debug!(error = %err, "Skipping transport steps");
            timeline.push(TimelineRow::capture("loading timeout", &session).await);
        }
        Err(err) => return Err(err.into()),
    }

    session.unmount().await;
    timeline.push(TimelineRow::capture("unmount", &session).await);

    let report = SimulationReport {
        session_id: session.id().to_string(),
        sources: session.sources().clone(),
        offsets: session.offsets(),
        timeline,
        notices: session.notices().await,
    };
    println!("{}", output::format_report(&report, format));

    if script.strict {
        if let Some(err) = report
            .notices
            .iter()
            .find_map(|record| record.notice.to_error())
        {
            return Err(anyhow::Error::new(err).context("simulation did not run cleanly"));
        }
    }

    Ok(())
}

async fn run_transport(
    script: &SimulationScript,
    session: &PlaybackSession,
    video: &SimulatedElement,
    audio: &SimulatedElement,
    container: &SimulatedContainer,
    timeline: &mut Vec<TimelineRow>,
) {
    session.toggle_play().await;
    timeline.push(TimelineRow::capture("play", session).await);

    let step = if script.step > 0.0 { script.step } else { 1.0 };
    let mut elapsed = 0.0;
    while elapsed < script.play_seconds && !video.is_paused() {
        let dt = step.min(script.play_seconds - elapsed);
        video.advance(dt);
        audio.advance(dt);
        session.process_pending_events().await;
        elapsed += dt;
        timeline.push(TimelineRow::capture(&format!("advance +{:.2}s", dt), session).await);
    }

    if let Some(pointer_x) = script.pointer_x {
        session.begin_seek().await;
        session
            .commit_seek(pointer_x, BarRect::new(script.bar_left, script.bar_width))
            .await;
        session.process_pending_events().await;
        timeline.push(TimelineRow::capture("seek", session).await);
    }

    session.toggle_mute().await;
    timeline.push(TimelineRow::capture("mute", session).await);

    session.toggle_fullscreen(container).await;
    timeline.push(TimelineRow::capture("fullscreen", session).await);

    if session.snapshot().await.is_playing {
        session.toggle_play().await;
        session.process_pending_events().await;
        timeline.push(TimelineRow::capture("pause", session).await);
    }

    debug!(
        video_time = video.current_time(),
        audio_time = audio.current_time(),
        "Element clocks after transport"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(reject_autoplay: bool, strict: bool) -> SimulationScript {
        SimulationScript {
            record: None,
            owner_id: Some("u1".to_string()),
            video_id: Some("v1".to_string()),
            video_duration: 30.0,
            audio_duration: 30.0,
            video_start: 0.0,
            audio_start: 0.0,
            reject_autoplay,
            deny_fullscreen: false,
            play_seconds: 2.0,
            step: 1.0,
            pointer_x: None,
            bar_left: 0.0,
            bar_width: 100.0,
            withhold_metadata: false,
            strict,
            config: None,
        }
    }

    #[tokio::test]
    async fn test_strict_simulation_fails_on_refused_play() {
        let err = simulate(script(true, true), "json").await.unwrap_err();
        let cause = err.downcast_ref::<Error>().unwrap();
        assert!(matches!(
            cause,
            Error::PlayRejected {
                reason: PlayFailureReason::NotAllowed,
                ..
            }
        ));
        assert_eq!(cause.error_code(), "PLAY_REJECTED");
    }

    #[tokio::test]
    async fn test_lenient_simulation_reports_refusal_only() {
        assert!(simulate(script(true, false), "json").await.is_ok());
        assert!(simulate(script(false, true), "json").await.is_ok());
    }

    #[test]
    fn test_record_requires_ids() {
        let mut script = script(false, false);
        script.video_id = None;
        assert!(script.video_record().is_err());
    }
}
