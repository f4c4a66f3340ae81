//! Tandem CLI - Headless driver for synchronized playback sessions
//!
//! Features:
//! - Playlist URI construction for a recording
//! - Scripted session simulation against simulated tracks

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Tandem CLI - Synchronized video + audio playback toolkit
#[derive(Parser)]
#[command(name = "tandem")]
#[command(version)]
#[command(about = "Drive synchronized video + audio playback sessions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, global = true, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the playlist URIs of both tracks
    Sources {
        /// Owner (user) ID
        #[arg(long)]
        owner_id: String,

        /// Video ID
        #[arg(long)]
        video_id: String,

        /// Base URL for the playlist endpoint
        #[arg(long)]
        base_url: Option<String>,

        /// Controller configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run a scripted session against simulated tracks
    Simulate {
        /// Video record file (JSON)
        #[arg(long, conflicts_with_all = ["owner_id", "video_id"])]
        record: Option<PathBuf>,

        /// Owner (user) ID
        #[arg(long, required_unless_present = "record", requires = "video_id")]
        owner_id: Option<String>,

        /// Video ID
        #[arg(long, required_unless_present = "record", requires = "owner_id")]
        video_id: Option<String>,

        /// Duration of the video track in seconds
        #[arg(long, default_value = "60")]
        video_duration: f64,

        /// Duration of the audio track in seconds
        #[arg(long, default_value = "60")]
        audio_duration: f64,

        /// Start offset of the video track in seconds
        #[arg(long, default_value = "0")]
        video_start: f64,

        /// Start offset of the audio track in seconds
        #[arg(long, default_value = "0")]
        audio_start: f64,

        /// Refuse play requests as an autoplay policy would
        #[arg(long)]
        reject_autoplay: bool,

        /// Refuse fullscreen requests
        #[arg(long)]
        deny_fullscreen: bool,

        /// Seconds of playback to simulate
        #[arg(long, default_value = "10")]
        play_seconds: f64,

        /// Clock step in seconds
        #[arg(long, default_value = "2.5")]
        step: f64,

        /// Pointer position of a seek (enables the seek step)
        #[arg(long)]
        pointer_x: Option<f64>,

        /// Left edge of the seek bar
        #[arg(long, default_value = "0")]
        bar_left: f64,

        /// Width of the seek bar
        #[arg(long, default_value = "100")]
        bar_width: f64,

        /// Never report metadata, to exercise the loading timeout
        #[arg(long)]
        withhold_metadata: bool,

        /// Fail when a command was refused or metadata timed out
        #[arg(long)]
        strict: bool,

        /// Controller configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tandem_core::init();

    match cli.command {
        Commands::Sources {
            owner_id,
            video_id,
            base_url,
            config,
        } => {
            commands::sources(&owner_id, &video_id, base_url.as_deref(), config, &cli.format)?;
        }
        Commands::Simulate {
            record,
            owner_id,
            video_id,
            video_duration,
            audio_duration,
            video_start,
            audio_start,
            reject_autoplay,
            deny_fullscreen,
            play_seconds,
            step,
            pointer_x,
            bar_left,
            bar_width,
            withhold_metadata,
            strict,
            config,
        } => {
            let script = commands::SimulationScript {
                record,
                owner_id,
                video_id,
                video_duration,
                audio_duration,
                video_start,
                audio_start,
                reject_autoplay,
                deny_fullscreen,
                play_seconds,
                step,
                pointer_x,
                bar_left,
                bar_width,
                withhold_metadata,
                strict,
                config,
            };
            commands::simulate(script, &cli.format).await?;
        }
    }

    Ok(())
}
