//! Output formatting for CLI

use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tandem_core::{NoticeRecord, PlaybackSession, SourceUris, TrackKind, TrackOffsets};

/// Output format options
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// One captured session state
#[derive(Debug, Clone, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRow {
    pub step: String,
    pub phase: String,
    #[tabled(rename = "time")]
    pub current_time: f64,
    pub duration: f64,
    #[tabled(rename = "watched %")]
    pub watched_percentage: f64,
    pub muted: bool,
    pub fullscreen: bool,
}

impl TimelineRow {
    pub async fn capture(step: &str, session: &PlaybackSession) -> Self {
        let snapshot = session.snapshot().await;
        Self {
            step: step.to_string(),
            phase: snapshot.phase().to_string(),
            current_time: round(snapshot.current_time),
            duration: round(snapshot.duration),
            watched_percentage: round(snapshot.watched_percentage),
            muted: snapshot.is_muted,
            fullscreen: snapshot.is_fullscreen,
        }
    }
}

#[derive(Tabled)]
struct NoticeRow {
    #[tabled(rename = "#")]
    sequence: u64,
    code: &'static str,
    message: String,
}

#[derive(Tabled)]
struct SourceRow {
    track: TrackKind,
    uri: String,
}

/// Result of `tandem simulate`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub session_id: String,
    pub sources: SourceUris,
    pub offsets: TrackOffsets,
    pub timeline: Vec<TimelineRow>,
    pub notices: Vec<NoticeRecord>,
}

fn round(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn to_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

fn source_rows(sources: &SourceUris) -> Vec<SourceRow> {
    TrackKind::ALL
        .iter()
        .map(|&track| SourceRow {
            track,
            uri: sources.get(track).to_string(),
        })
        .collect()
}

fn notice_rows(notices: &[NoticeRecord]) -> Vec<NoticeRow> {
    notices
        .iter()
        .map(|record| NoticeRow {
            sequence: record.sequence,
            code: record.notice.code(),
            message: record.notice.to_string(),
        })
        .collect()
}

/// Format playlist URIs
pub fn format_sources(sources: &SourceUris, format: &str) -> String {
    match OutputFormat::from(format) {
        OutputFormat::Json => to_json(sources),
        OutputFormat::Table => Table::new(source_rows(sources))
            .with(Style::rounded())
            .to_string(),
        OutputFormat::Text => format!("video: {}\naudio: {}", sources.video, sources.audio),
    }
}

/// Format a simulation report
pub fn format_report(report: &SimulationReport, format: &str) -> String {
    match OutputFormat::from(format) {
        OutputFormat::Json => to_json(report),
        OutputFormat::Table => {
            let mut out = Table::new(source_rows(&report.sources))
                .with(Style::rounded())
                .to_string();
            out.push_str("\n\n");
            out.push_str(
                &Table::new(&report.timeline)
                    .with(Style::rounded())
                    .to_string(),
            );
            if !report.notices.is_empty() {
                out.push_str("\n\n");
                out.push_str(
                    &Table::new(notice_rows(&report.notices))
                        .with(Style::rounded())
                        .to_string(),
                );
            }
            out
        }
        OutputFormat::Text => {
            let mut lines = vec![
                format!("Session {}", report.session_id),
                format!("  video: {}", report.sources.video),
                format!("  audio: {}", report.sources.audio),
                format!(
                    "  offsets: video {:.2}s, audio {:.2}s",
                    report.offsets.video, report.offsets.audio
                ),
                String::new(),
                "Timeline:".to_string(),
            ];
            for row in &report.timeline {
                lines.push(format!(
                    "  {:<16} {:<8} {:>8.2}s / {:>8.2}s  {:>6.2}%{}{}",
                    row.step,
                    row.phase,
                    row.current_time,
                    row.duration,
                    row.watched_percentage,
                    if row.muted { "  muted" } else { "" },
                    if row.fullscreen { "  fullscreen" } else { "" },
                ));
            }
            if !report.notices.is_empty() {
                lines.push(String::new());
                lines.push("Notices:".to_string());
                for record in &report.notices {
                    lines.push(format!(
                        "  {}. [{}] {}",
                        record.sequence,
                        record.notice.code(),
                        record.notice
                    ));
                }
            }
            lines.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_core::VideoRecord;
    use url::Url;

    fn sources() -> SourceUris {
        let base = Url::parse("https://share.example.com").unwrap();
        SourceUris::from_record(&base, &VideoRecord::new("v1", "u1")).unwrap()
    }

    #[test]
    fn test_format_selection() {
        assert!(matches!(OutputFormat::from("JSON"), OutputFormat::Json));
        assert!(matches!(OutputFormat::from("table"), OutputFormat::Table));
        assert!(matches!(OutputFormat::from("other"), OutputFormat::Text));
    }

    #[test]
    fn test_sources_text_and_json() {
        let text = format_sources(&sources(), "text");
        assert!(text.starts_with("video: https://share.example.com/api/playlist?"));
        assert!(text.contains("videoType=audio"));

        let json: serde_json::Value =
            serde_json::from_str(&format_sources(&sources(), "json")).unwrap();
        assert!(json["video"].as_str().unwrap().ends_with("videoType=screen"));
    }

    #[test]
    fn test_sources_table() {
        let table = format_sources(&sources(), "table");
        assert!(table.contains("track"));
        assert!(table.contains("audio"));
    }
}
