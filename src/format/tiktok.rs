//! TikTok format provider.
//!
//! Same single-rendition shape as Instagram: one "Best Quality" entry with
//! a best-effort size probe, no audio ladder.

use crate::format::ytdlp::YtDlp;
use crate::format::{
    best_video_rendition, AudioEncoding, FormatProvider, Rendition,
};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::warn;

/// Single-rendition provider
pub struct TiktokProvider {
    runner: YtDlp,
}

impl TiktokProvider {
    /// Create a provider writing into the given download directory.
    #[must_use]
    pub fn new(download_dir: PathBuf) -> Self {
        Self {
            runner: YtDlp::new(download_dir),
        }
    }
}

#[async_trait]
impl FormatProvider for TiktokProvider {
    async fn list_video_renditions(&self, url: &str) -> Vec<Rendition> {
        let size = match self.runner.probe(url).await {
            Ok(info) => info.size_bytes(),
            Err(e) => {
                warn!(url, error = %e, "tiktok probe failed, offering best-effort entry");
                None
            }
        };
        vec![best_video_rendition(size)]
    }

    async fn fetch_video(&self, url: &str, _rendition_id: &str) -> Option<PathBuf> {
        match self.runner.fetch_video(url, "best").await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(url, error = %e, "tiktok video fetch failed");
                None
            }
        }
    }

    async fn list_audio_renditions(&self, _url: &str) -> Option<Vec<Rendition>> {
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
                warn!(url, error = %e, "tiktok audio fetch failed");
                None
            }
        }
    }
}
