//! Instagram format provider.
//!
//! Instagram does not expose a useful rendition ladder, so the provider
//! offers a single "Best Quality" entry whose size is probed on a
//! best-effort basis. Optional account credentials are threaded into
//! yt-dlp for reels that require a login.

use crate::format::ytdlp::YtDlp;
use crate::format::{
    best_video_rendition, AudioEncoding, FormatProvider, Rendition,
};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::warn;

/// Single-rendition provider with optional login
pub struct InstagramProvider {
    runner: YtDlp,
}

impl InstagramProvider {
    /// Create a provider; credentials are passed to yt-dlp only when both
    /// halves are present.
    #[must_use]
    pub fn new(
        download_dir: PathBuf,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        let extra_args = match (username, password) {
            (Some(user), Some(pass)) => {
                vec![
                    "--username".to_string(),
                    user,
                    "--password".to_string(),
                    pass,
                ]
            }
            _ => Vec::new(),
        };
        Self {
            runner: YtDlp::with_args(download_dir, extra_args),
        }
    }
}

#[async_trait]
impl FormatProvider for InstagramProvider {
    async fn list_video_renditions(&self, url: &str) -> Vec<Rendition> {
        // a failed probe only loses the size hint; the fetch may still work
        let size = match self.runner.probe(url).await {
            Ok(info) => info.size_bytes(),
            Err(e) => {
                warn!(url, error = %e, "instagram probe failed, offering best-effort entry");
                None
            }
        };
        vec![best_video_rendition(size)]
    }

    async fn fetch_video(&self, url: &str, _rendition_id: &str) -> Option<PathBuf> {
        match self.runner.fetch_video(url, "best").await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(url, error = %e, "instagram video fetch failed");
                None
            }
        }
    }

    async fn list_audio_renditions(&self, _url: &str) -> Option<Vec<Rendition>> {
        // no ladder to offer; the menu falls back to the guaranteed option
        None
    }

    async fn fetch_audio(
        &self,
        url: &str,
        _rendition_id: &str,
        encoding: AudioEncoding,
    ) -> Option<PathBuf> {
        match self.runner.fetch_audio(url, "bestaudio/best", encoding).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(url, error = %e, "instagram audio fetch failed");
                None
            }
        }
    }
}
