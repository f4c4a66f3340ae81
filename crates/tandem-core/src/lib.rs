//! Tandem Core - Synchronized video + audio playback
//!
//! A recording is stored as two independent media resources: a screen
//! capture (video only) and a microphone capture (audio only). This crate
//! keeps both playing as one logical presentation:
//! - Playlist URI construction for both tracks
//! - Media binding with per-track start offsets
//! - A pure session state machine (loading, play/pause, seeking, mute, fullscreen)
//! - An async orchestrator that carries out media commands and discards stale completions
//! - Notices for every recovered failure
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Tandem Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │    Source    │  │    Media     │  │   Session    │           │
//! │  │     URIs     │  │   Binding    │  │    State     │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │  Playback   │                              │
//! │                    │   Session   │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │            ┌──────────────┴──────────────┐                      │
//! │     ┌──────┴──────┐               ┌──────┴──────┐               │
//! │     │  Snapshot   │               │   Notice    │               │
//! │     │   (watch)   │               │   Emitter   │               │
//! │     └─────────────┘               └─────────────┘               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod notice;
pub mod session;
#[cfg(feature = "sim")]
pub mod sim;
pub mod source;
pub mod state;
pub mod types;

pub use binding::{
    EventSink, EventStream, FullscreenContainer, FullscreenFailure, MediaBinding, MediaElement,
    MediaEvent, MediaEventKind, PlayFailure, PlayFailureReason,
};
pub use config::ControllerConfig;
pub use error::{Error, Result};
pub use notice::{Notice, NoticeEmitter, NoticeRecord};
pub use session::PlaybackSession;
pub use source::SourceUris;
pub use state::{seek_target, Effect, Input, SessionState};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() {
    tracing::info!(version = VERSION, "Tandem Core initialized");
}
