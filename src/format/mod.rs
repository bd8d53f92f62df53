//! Format providers - rendition discovery and retrieval via yt-dlp
//!
//! Each supported platform implements [`FormatProvider`]; the
//! [`ProviderRegistry`] is built once at startup and dispatches a
//! [`PlatformTag`](crate::platform::PlatformTag) to its provider. All
//! backend failures are caught and logged inside the providers - a failed
//! probe or fetch surfaces as an empty/absent result, never as an error.

/// Instagram provider (single best-effort rendition, optional login)
pub mod instagram;
/// TikTok provider (single best-effort rendition)
pub mod tiktok;
/// YouTube provider (full rendition listing), also serves `Other`
pub mod youtube;
/// Shared yt-dlp process wrapper
pub mod ytdlp;

use crate::config::Settings;
use crate::platform::PlatformTag;
use crate::utils::human_readable_size;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// What the user asked to download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadKind {
    /// Merged video + audio container
    Video,
    /// Audio-only, extracted and converted
    Audio,
}

impl fmt::Display for DownloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

impl FromStr for DownloadKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            _ => Err(()),
        }
    }
}

/// Target container for extracted audio
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncoding {
    /// MPEG layer 3 at the configured target bitrate
    #[default]
    Mp3,
    /// AAC in an m4a container, no re-encode when the source is AAC
    M4a,
}

impl AudioEncoding {
    /// File extension and yt-dlp `--audio-format` value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
        }
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioEncoding {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mp3" => Ok(Self::Mp3),
            "m4a" => Ok(Self::M4a),
            _ => Err(()),
        }
    }
}

/// Rendition id of the guaranteed best-effort audio option, which is not
/// tied to a concrete stream
pub const BEST_RENDITION_ID: &str = "best";

/// One selectable quality/format variant of a remote asset.
///
/// The id is opaque and round-trips to the provider that produced it.
/// `size_bytes` is authoritative for filtering and sorting when present;
/// providers may legitimately not know it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rendition {
    /// Provider-scoped identifier, unique within one rendition list
    pub id: String,
    /// Video or audio
    pub kind: DownloadKind,
    /// Human label - resolution ("720p") or bitrate note
    pub label: String,
    /// Container extension
    pub ext: String,
    /// Byte size when the backend reports one
    pub size_bytes: Option<u64>,
    /// Average bitrate in kbit/s, audio renditions only
    pub bitrate_kbps: Option<u32>,
    /// Whether a video rendition carries an audio track
    pub has_audio: bool,
}

impl Rendition {
    /// Human-readable size string, "N/A" when the size is unknown
    #[must_use]
    pub fn human_size(&self) -> String {
        human_readable_size(self.size_bytes)
    }
}

/// The single "Best Quality" video rendition offered by providers that do
/// not enumerate streams
#[must_use]
pub fn best_video_rendition(size_bytes: Option<u64>) -> Rendition {
    Rendition {
        id: BEST_RENDITION_ID.to_string(),
        kind: DownloadKind::Video,
        label: "Best Quality".to_string(),
        ext: "mp4".to_string(),
        size_bytes,
        bitrate_kbps: None,
        has_audio: true,
    }
}

/// Uniform capability set every platform provider implements.
///
/// Failure policy: implementations catch and log every backend error and
/// return an empty/absent result instead - the conversation controller
/// never sees a transport-level fault from this boundary.
#[async_trait]
pub trait FormatProvider: Send + Sync {
    /// List downloadable video renditions. Empty means "nothing usable",
    /// a recoverable condition.
    async fn list_video_renditions(&self, url: &str) -> Vec<Rendition>;

    /// Materialize the chosen video rendition into local storage.
    async fn fetch_video(&self, url: &str, rendition_id: &str) -> Option<PathBuf>;

    /// List audio-only renditions. `None` means the provider offers only
    /// the guaranteed best-effort option.
    async fn list_audio_renditions(&self, url: &str) -> Option<Vec<Rendition>>;

    /// Materialize and convert the chosen audio rendition.
    async fn fetch_audio(
        &self,
        url: &str,
        rendition_id: &str,
        encoding: AudioEncoding,
    ) -> Option<PathBuf>;
}

/// Platform tag to provider dispatch, constructed once at startup.
///
/// `Other` maps to the same concrete instance as `Youtube` by explicit
/// entry; lookup is total over the closed tag set.
pub struct ProviderRegistry {
    youtube: Arc<dyn FormatProvider>,
    instagram: Arc<dyn FormatProvider>,
    tiktok: Arc<dyn FormatProvider>,
}

impl ProviderRegistry {
    /// Build the registry from settings (download directory, optional
    /// Instagram credentials).
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let dir = settings.download_dir().to_path_buf();
        Self {
            youtube: Arc::new(youtube::YoutubeProvider::new(dir.clone())),
            instagram: Arc::new(instagram::InstagramProvider::new(
                dir.clone(),
                settings.ig_username.clone(),
                settings.ig_password.clone(),
            )),
            tiktok: Arc::new(tiktok::TiktokProvider::new(dir)),
        }
    }

    /// Resolve the provider for a platform tag.
    #[must_use]
    pub fn get(&self, tag: PlatformTag) -> Arc<dyn FormatProvider> {
        match tag {
            PlatformTag::Youtube | PlatformTag::Other => Arc::clone(&self.youtube),
            PlatformTag::Instagram => Arc::clone(&self.instagram),
            PlatformTag::Tiktok => Arc::clone(&self.tiktok),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        assert_eq!("video".parse::<DownloadKind>(), Ok(DownloadKind::Video));
        assert_eq!("audio".parse::<DownloadKind>(), Ok(DownloadKind::Audio));
        assert_eq!(DownloadKind::Video.to_string(), "video");
        assert_eq!("document".parse::<DownloadKind>(), Err(()));
    }

    #[test]
    fn test_encoding_round_trip() {
        assert_eq!("mp3".parse::<AudioEncoding>(), Ok(AudioEncoding::Mp3));
        assert_eq!("m4a".parse::<AudioEncoding>(), Ok(AudioEncoding::M4a));
        assert_eq!(AudioEncoding::default(), AudioEncoding::Mp3);
        assert_eq!("wav".parse::<AudioEncoding>(), Err(()));
    }

    #[test]
    fn test_best_video_rendition_shape() {
        let r = best_video_rendition(None);
        assert_eq!(r.id, BEST_RENDITION_ID);
        assert_eq!(r.label, "Best Quality");
        assert_eq!(r.human_size(), "N/A");
        assert!(r.has_audio);
    }
}
