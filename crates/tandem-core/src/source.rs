//! Playlist URIs for the two tracks of a recording

use crate::{Error, Result, TrackKind, VideoRecord};
use serde::{Deserialize, Serialize};
use url::Url;

/// Path of the playlist endpoint, relative to the base URL
pub const PLAYLIST_PATH: &str = "api/playlist";

/// Source locators of a session, immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUris {
    pub video: Url,
    pub audio: Url,
}

impl SourceUris {
    /// Build `{base}/api/playlist?userId=..&videoId=..&videoType=screen|audio`
    pub fn from_record(base_url: &Url, record: &VideoRecord) -> Result<Self> {
        if record.id.is_empty() {
            return Err(Error::InvalidSource("video id is empty".into()));
        }
        if record.owner_id.is_empty() {
            return Err(Error::InvalidSource("owner id is empty".into()));
        }

        Ok(Self {
            video: playlist_uri(base_url, record, TrackKind::Video)?,
            audio: playlist_uri(base_url, record, TrackKind::Audio)?,
        })
    }

    /// Locator of a single track
    pub fn get(&self, track: TrackKind) -> &Url {
        match track {
            TrackKind::Video => &self.video,
            TrackKind::Audio => &self.audio,
        }
    }
}

fn playlist_uri(base_url: &Url, record: &VideoRecord, track: TrackKind) -> Result<Url> {
    // Url::join drops the last path segment unless it ends with '/'
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    let mut url = base.join(PLAYLIST_PATH)?;
    url.query_pairs_mut()
        .clear()
        .append_pair("userId", &record.owner_id)
        .append_pair("videoId", &record.id)
        .append_pair("videoType", track.playlist_type());
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> VideoRecord {
        VideoRecord::new("vid-42", "user-7")
    }

    #[test]
    fn test_playlist_uris() {
        let base = Url::parse("https://share.example.com").unwrap();
        let uris = SourceUris::from_record(&base, &record()).unwrap();

        assert_eq!(
            uris.video.as_str(),
            "https://share.example.com/api/playlist?userId=user-7&videoId=vid-42&videoType=screen"
        );
        assert_eq!(
            uris.get(TrackKind::Audio).as_str(),
            "https://share.example.com/api/playlist?userId=user-7&videoId=vid-42&videoType=audio"
        );
    }

    #[test]
    fn test_base_with_path_prefix() {
        let base = Url::parse("https://example.com/share").unwrap();
        let uris = SourceUris::from_record(&base, &record()).unwrap();
        assert_eq!(uris.video.path(), "/share/api/playlist");
    }

    #[test]
    fn test_ids_are_escaped() {
        let base = Url::parse("https://example.com/").unwrap();
        let record = VideoRecord::new("a b", "x&y");
        let uris = SourceUris::from_record(&base, &record).unwrap();
        assert_eq!(
            uris.audio.query(),
            Some("userId=x%26y&videoId=a+b&videoType=audio")
        );
    }

    #[test]
    fn test_empty_ids_rejected() {
        let base = Url::parse("https://example.com/").unwrap();
        let err = SourceUris::from_record(&base, &VideoRecord::new("", "u")).unwrap_err();
        assert!(matches!(err, Error::InvalidSource(_)));
    }
}
