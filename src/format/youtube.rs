//! YouTube format provider.
//!
//! The only provider that enumerates concrete renditions; it also serves
//! `Other` links through the registry, since yt-dlp handles most hosts the
//! same way.

use crate::config::{MAX_AUDIO_RENDITIONS, MAX_VIDEO_RENDITIONS};
use crate::format::ytdlp::{ProbeFormat, YtDlp};
use crate::format::{AudioEncoding, DownloadKind, FormatProvider, Rendition, BEST_RENDITION_ID};
use async_trait::async_trait;
use lazy_regex::lazy_regex;
use std::path::PathBuf;
use tracing::warn;

static RE_BITRATE_NOTE: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"(\d+)k");

/// Full-listing provider backed by yt-dlp
pub struct YoutubeProvider {
    runner: YtDlp,
}

impl YoutubeProvider {
    /// Create a provider writing into the given download directory.
    #[must_use]
    pub fn new(download_dir: PathBuf) -> Self {
        Self {
            runner: YtDlp::new(download_dir),
        }
    }
}

#[async_trait]
impl FormatProvider for YoutubeProvider {
    async fn list_video_renditions(&self, url: &str) -> Vec<Rendition> {
        match self.runner.probe(url).await {
            Ok(info) => build_video_renditions(&info.formats),
            Err(e) => {
                warn!(url, error = %e, "video rendition probe failed");
                Vec::new()
            }
        }
    }

    async fn fetch_video(&self, url: &str, rendition_id: &str) -> Option<PathBuf> {
        // fall back through progressively less specific selections, always
        // ending in a merged mp4
        let spec = format!(
            "{id}+bestaudio[ext=m4a]/bestaudio[ext=m4a]/{id}/bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
            id = rendition_id
        );
        match self.runner.fetch_video(url, &spec).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(url, rendition_id, error = %e, "video fetch failed");
                None
            }
        }
    }

    async fn list_audio_renditions(&self, url: &str) -> Option<Vec<Rendition>> {
        let info = match self.runner.probe(url).await {
            Ok(info) => info,
            Err(e) => {
                warn!(url, error = %e, "audio rendition probe failed");
                return None;
            }
        };
        let renditions = build_audio_renditions(&info.formats);
        if renditions.is_empty() {
            None
        } else {
            Some(renditions)
        }
    }

    async fn fetch_audio(
        &self,
        url: &str,
        rendition_id: &str,
        encoding: AudioEncoding,
    ) -> Option<PathBuf> {
        let spec = if rendition_id == BEST_RENDITION_ID {
            "bestaudio/best".to_string()
        } else {
            format!("{rendition_id}/bestaudio/best")
        };
        match self.runner.fetch_audio(url, &spec, encoding).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(url, rendition_id, error = %e, "audio fetch failed");
                None
            }
        }
    }
}

/// Numeric resolution parsed from a label like "720p"; unparseable labels
/// sort lowest.
fn parse_resolution(label: &str) -> u32 {
    let digits = label.strip_suffix('p').unwrap_or(label);
    digits.parse().unwrap_or(0)
}

fn video_label(f: &ProbeFormat) -> String {
    let mut label = f
        .format_note
        .clone()
        .or_else(|| f.resolution.clone())
        .unwrap_or_else(|| "N/A".to_string());
    if !label.is_empty() && label.chars().all(|c| c.is_ascii_digit()) {
        label.push('p');
    }
    label
}

/// Reduce probe formats to the selectable video rendition list: mp4 with a
/// video stream, deduplicated by label - audio-bearing entries win, then
/// the larger known size, then first seen - sorted by descending
/// resolution and truncated.
pub(crate) fn build_video_renditions(formats: &[ProbeFormat]) -> Vec<Rendition> {
    let mut unique: Vec<Rendition> = Vec::new();

    for f in formats {
        if f.ext.as_deref() != Some("mp4") || !f.has_video() {
            continue;
        }
        let label = video_label(f);
        if label == "N/A" {
            continue;
        }
        let candidate = Rendition {
            id: f.format_id.clone(),
            kind: DownloadKind::Video,
            label,
            ext: "mp4".to_string(),
            size_bytes: f.size_bytes(),
            bitrate_kbps: None,
            has_audio: f.has_audio(),
        };

        match unique.iter_mut().find(|r| r.label == candidate.label) {
            None => unique.push(candidate),
            Some(existing) => {
                let better_audio = candidate.has_audio && !existing.has_audio;
                let bigger = candidate.has_audio == existing.has_audio
                    && candidate.size_bytes.unwrap_or(0) > existing.size_bytes.unwrap_or(0);
                if better_audio || bigger {
                    *existing = candidate;
                }
            }
        }
    }

    unique.sort_by(|a, b| parse_resolution(&b.label).cmp(&parse_resolution(&a.label)));
    unique.truncate(MAX_VIDEO_RENDITIONS);
    unique
}

fn audio_bitrate(f: &ProbeFormat) -> Option<u32> {
    if let Some(abr) = f.abr {
        if abr.is_finite() && abr > 0.0 {
            return Some(abr as u32);
        }
    }
    let note = f.format_note.as_deref()?;
    RE_BITRATE_NOTE
        .captures(note)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Reduce probe formats to the audio-only rendition list: deduplicated by
/// id (first seen wins), sorted by descending bitrate with unknown last,
/// truncated.
pub(crate) fn build_audio_renditions(formats: &[ProbeFormat]) -> Vec<Rendition> {
    let mut renditions: Vec<Rendition> = Vec::new();

    for f in formats {
        if f.has_video() || !f.has_audio() {
            continue;
        }
        if renditions.iter().any(|r| r.id == f.format_id) {
            continue;
        }
        let label = f
            .format_note
            .clone()
            .or_else(|| f.format.clone())
            .unwrap_or_else(|| "Audio".to_string());
        renditions.push(Rendition {
            id: f.format_id.clone(),
            kind: DownloadKind::Audio,
            label,
            ext: f.ext.clone().unwrap_or_else(|| "m4a".to_string()),
            size_bytes: f.size_bytes(),
            bitrate_kbps: audio_bitrate(f),
            has_audio: true,
        });
    }

    renditions.sort_by(|a, b| {
        b.bitrate_kbps
            .unwrap_or(0)
            .cmp(&a.bitrate_kbps.unwrap_or(0))
    });
    renditions.truncate(MAX_AUDIO_RENDITIONS);
    renditions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_format(id: &str, note: &str, size: Option<f64>, acodec: &str) -> ProbeFormat {
        ProbeFormat {
            format_id: id.to_string(),
            ext: Some("mp4".to_string()),
            vcodec: Some("avc1".to_string()),
            acodec: Some(acodec.to_string()),
            filesize: size,
            format_note: Some(note.to_string()),
            ..ProbeFormat::default()
        }
    }

    fn audio_format(id: &str, abr: Option<f64>, note: &str) -> ProbeFormat {
        ProbeFormat {
            format_id: id.to_string(),
            ext: Some("webm".to_string()),
            vcodec: Some("none".to_string()),
            acodec: Some("opus".to_string()),
            abr,
            format_note: Some(note.to_string()),
            ..ProbeFormat::default()
        }
    }

    #[test]
    fn test_video_dedup_prefers_audio_bearing() {
        let formats = vec![
            video_format("137", "1080", Some(900.0), "none"),
            video_format("22", "1080", Some(500.0), "mp4a.40.2"),
        ];
        let renditions = build_video_renditions(&formats);
        assert_eq!(renditions.len(), 1);
        assert_eq!(renditions[0].id, "22");
        assert!(renditions[0].has_audio);
        assert_eq!(renditions[0].label, "1080p");
    }

    #[test]
    fn test_video_dedup_prefers_larger_when_audio_equal() {
        let formats = vec![
            video_format("a", "720", Some(100.0), "mp4a"),
            video_format("b", "720", Some(300.0), "mp4a"),
            video_format("c", "720", Some(300.0), "mp4a"),
        ];
        let renditions = build_video_renditions(&formats);
        assert_eq!(renditions.len(), 1);
        // ties on size and audio keep the first seen
        assert_eq!(renditions[0].id, "b");
    }

    #[test]
    fn test_video_sorted_descending_and_truncated() {
        let mut formats: Vec<ProbeFormat> = (1..=20)
            .map(|i| video_format(&format!("f{i}"), &format!("{}", i * 72), None, "mp4a"))
            .collect();
        formats.push(video_format("weird", "premium", None, "mp4a"));

        let renditions = build_video_renditions(&formats);
        assert_eq!(renditions.len(), MAX_VIDEO_RENDITIONS);
        let resolutions: Vec<u32> = renditions.iter().map(|r| parse_resolution(&r.label)).collect();
        let mut sorted = resolutions.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(resolutions, sorted);
    }

    #[test]
    fn test_video_skips_non_mp4_and_unlabelled() {
        let mut webm = video_format("248", "1080", None, "none");
        webm.ext = Some("webm".to_string());
        let mut unlabeled = video_format("x", "", None, "mp4a");
        unlabeled.format_note = None;
        unlabeled.resolution = None;

        let renditions = build_video_renditions(&[webm, unlabeled]);
        assert!(renditions.is_empty());
    }

    #[test]
    fn test_audio_sorted_by_bitrate_unknown_last() {
        let formats = vec![
            audio_format("139", Some(48.0), "low"),
            audio_format("140", Some(128.0), "medium"),
            audio_format("raw", None, "unknown"),
        ];
        let renditions = build_audio_renditions(&formats);
        let ids: Vec<&str> = renditions.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["140", "139", "raw"]);
    }

    #[test]
    fn test_audio_bitrate_parsed_from_note() {
        let f = audio_format("hls-160", None, "audio only 160k");
        assert_eq!(audio_bitrate(&f), Some(160));
    }

    #[test]
    fn test_audio_dedup_by_id_first_seen() {
        let formats = vec![
            audio_format("140", Some(128.0), "medium"),
            audio_format("140", Some(256.0), "duplicate"),
        ];
        let renditions = build_audio_renditions(&formats);
        assert_eq!(renditions.len(), 1);
        assert_eq!(renditions[0].bitrate_kbps, Some(128));
    }

    #[test]
    fn test_audio_truncated() {
        let formats: Vec<ProbeFormat> = (0..15)
            .map(|i| audio_format(&format!("a{i}"), Some(f64::from(i * 16)), "note"))
            .collect();
        assert_eq!(build_audio_renditions(&formats).len(), MAX_AUDIO_RENDITIONS);
    }
}
