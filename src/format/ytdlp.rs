//! Thin wrapper around the `yt-dlp` binary.
//!
//! Probing uses `-J` (single-video JSON dump); fetching uses
//! `--print after_move:filepath` so the final artifact path - merge and
//! audio conversion included - comes back on stdout. Every invocation is
//! bounded by a timeout and scoped to a per-request unique output prefix so
//! concurrent sessions never collide on the download directory.

use crate::config::{
    AUDIO_TARGET_BITRATE_KBPS, FETCH_TIMEOUT_SECS, PROBE_TIMEOUT_SECS,
    RENDITION_SIZE_CEILING_BYTES,
};
use crate::format::AudioEncoding;
use crate::utils::truncate_str;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

/// Single-video metadata as dumped by `yt-dlp -J`
#[derive(Debug, Default, Deserialize)]
pub struct ProbeInfo {
    /// Available stream formats; absent for some extractors
    #[serde(default)]
    pub formats: Vec<ProbeFormat>,
    /// Exact size of the default download when known
    #[serde(default)]
    pub filesize: Option<f64>,
    /// Estimated size of the default download when known
    #[serde(default)]
    pub filesize_approx: Option<f64>,
    /// Video title
    #[serde(default)]
    pub title: Option<String>,
}

impl ProbeInfo {
    /// Size of the default download, exact preferred over estimate
    #[must_use]
    pub fn size_bytes(&self) -> Option<u64> {
        to_bytes(self.filesize).or_else(|| to_bytes(self.filesize_approx))
    }
}

/// One entry of the probe `formats` array
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeFormat {
    /// Opaque format identifier, round-trips into a fetch
    pub format_id: String,
    /// Container extension
    #[serde(default)]
    pub ext: Option<String>,
    /// Video codec, `"none"` for audio-only streams
    #[serde(default)]
    pub vcodec: Option<String>,
    /// Audio codec, `"none"` for video-only streams
    #[serde(default)]
    pub acodec: Option<String>,
    /// Exact byte size
    #[serde(default)]
    pub filesize: Option<f64>,
    /// Estimated byte size
    #[serde(default)]
    pub filesize_approx: Option<f64>,
    /// Short quality note ("720p", "medium")
    #[serde(default)]
    pub format_note: Option<String>,
    /// Resolution string ("1280x720")
    #[serde(default)]
    pub resolution: Option<String>,
    /// Average audio bitrate in kbit/s
    #[serde(default)]
    pub abr: Option<f64>,
    /// Full format description, fallback label for audio streams
    #[serde(default)]
    pub format: Option<String>,
}

impl ProbeFormat {
    /// Exact size preferred over estimate
    #[must_use]
    pub fn size_bytes(&self) -> Option<u64> {
        to_bytes(self.filesize).or_else(|| to_bytes(self.filesize_approx))
    }

    /// A stream counts as video unless the codec is explicitly `"none"`
    #[must_use]
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref() != Some("none")
    }

    /// A stream counts as carrying audio unless the codec is explicitly
    /// `"none"`
    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.acodec.as_deref() != Some("none")
    }
}

fn to_bytes(value: Option<f64>) -> Option<u64> {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => Some(v as u64),
        _ => None,
    }
}

/// One yt-dlp installation bound to a download directory.
///
/// `extra_args` carries provider-specific flags such as Instagram login
/// credentials and is appended to every invocation.
pub struct YtDlp {
    download_dir: PathBuf,
    extra_args: Vec<String>,
}

impl YtDlp {
    /// Bind a runner to a download directory with no extra flags.
    #[must_use]
    pub fn new(download_dir: PathBuf) -> Self {
        Self::with_args(download_dir, Vec::new())
    }

    /// Bind a runner with provider-specific flags.
    #[must_use]
    pub fn with_args(download_dir: PathBuf, extra_args: Vec<String>) -> Self {
        Self {
            download_dir,
            extra_args,
        }
    }

    /// Probe a URL for metadata without downloading.
    ///
    /// # Errors
    ///
    /// Fails on spawn errors, a nonzero exit, timeout, or unparseable JSON.
    pub async fn probe(&self, url: &str) -> Result<ProbeInfo> {
        let mut cmd = self.base_command();
        cmd.args(["-J", "--no-warnings", "--no-playlist"]).arg(url);

        let stdout = run_captured(cmd, Duration::from_secs(PROBE_TIMEOUT_SECS)).await?;
        serde_json::from_slice(&stdout).context("yt-dlp probe output was not valid JSON")
    }

    /// Download a video rendition, merged into an mp4 container, and return
    /// the final file path.
    ///
    /// # Errors
    ///
    /// Fails on spawn errors, a nonzero exit, timeout, or when the reported
    /// artifact is missing from disk.
    pub async fn fetch_video(&self, url: &str, format_spec: &str) -> Result<PathBuf> {
        let mut cmd = self.base_command();
        cmd.args(["-f", format_spec, "--merge-output-format", "mp4"]);
        self.common_fetch_args(&mut cmd, "");
        cmd.arg(url);

        let path = self.printed_path(cmd).await?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            bail!("downloaded video not found at {}", path.display());
        }
        Ok(path)
    }

    /// Download an audio rendition and convert it to the requested
    /// encoding, returning the converted artifact path.
    ///
    /// If the path yt-dlp reports does not exist (older builds print the
    /// pre-conversion name), the artifact is located by swapping the
    /// extension for the target encoding.
    ///
    /// # Errors
    ///
    /// Fails on spawn errors, a nonzero exit, timeout, or when the final
    /// artifact cannot be confirmed on disk.
    pub async fn fetch_audio(
        &self,
        url: &str,
        format_spec: &str,
        encoding: AudioEncoding,
    ) -> Result<PathBuf> {
        let mut cmd = self.base_command();
        cmd.args([
            "-f",
            format_spec,
            "-x",
            "--audio-format",
            encoding.as_str(),
            "--audio-quality",
            "0",
        ]);
        if encoding == AudioEncoding::Mp3 {
            cmd.arg("--postprocessor-args")
                .arg(format!("ffmpeg:-b:a {AUDIO_TARGET_BITRATE_KBPS}k"));
        }
        self.common_fetch_args(&mut cmd, "_audio");
        cmd.arg(url);

        let path = self.printed_path(cmd).await?;
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(path);
        }

        let converted = path.with_extension(encoding.as_str());
        if tokio::fs::try_exists(&converted).await.unwrap_or(false) {
            warn!(
                reported = %path.display(),
                located = %converted.display(),
                "yt-dlp reported the pre-conversion path, using converted artifact"
            );
            return Ok(converted);
        }
        bail!("converted audio not found at {}", converted.display());
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new("yt-dlp");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd.args(&self.extra_args);
        cmd
    }

    /// Fetch options shared by video and audio downloads; the uuid prefix
    /// keeps concurrent sessions on distinct paths.
    fn common_fetch_args(&self, cmd: &mut Command, suffix: &str) {
        let token = Uuid::new_v4().as_simple().to_string();
        let template = self
            .download_dir
            .join(format!("{token}_%(title).60s_%(id)s{suffix}.%(ext)s"));
        cmd.arg("-o").arg(template.as_os_str());
        cmd.args([
            "--no-playlist",
            "--no-warnings",
            "--no-check-certificates",
            "--retries",
            "3",
            "--fragment-retries",
            "3",
            "--max-filesize",
        ]);
        cmd.arg(format!("{}M", RENDITION_SIZE_CEILING_BYTES / (1024 * 1024)));
        cmd.args(["--no-simulate", "--print", "after_move:filepath"]);
    }

    async fn printed_path(&self, cmd: Command) -> Result<PathBuf> {
        let stdout = run_captured(cmd, Duration::from_secs(FETCH_TIMEOUT_SECS)).await?;
        let text = String::from_utf8_lossy(&stdout);
        let path = text
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .context("yt-dlp did not report an output file")?;
        Ok(PathBuf::from(path))
    }
}

async fn run_captured(mut cmd: Command, limit: Duration) -> Result<Vec<u8>> {
    debug!(command = ?cmd.as_std(), "running yt-dlp");
    let output = tokio::time::timeout(limit, cmd.output())
        .await
        .map_err(|_| anyhow::anyhow!("yt-dlp timed out after {}s", limit.as_secs()))?
        .context("failed to spawn yt-dlp")?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "yt-dlp exited with {}: {}",
            output.status,
            truncate_str(stderr.trim(), 500)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_format_codec_semantics() {
        let explicit_none = ProbeFormat {
            format_id: "140".to_string(),
            vcodec: Some("none".to_string()),
            acodec: Some("mp4a.40.2".to_string()),
            ..ProbeFormat::default()
        };
        assert!(!explicit_none.has_video());
        assert!(explicit_none.has_audio());

        // absent codecs count as present, matching extractor output where
        // the field is simply missing
        let unknown = ProbeFormat {
            format_id: "22".to_string(),
            ..ProbeFormat::default()
        };
        assert!(unknown.has_video());
        assert!(unknown.has_audio());
    }

    #[test]
    fn test_size_prefers_exact_over_estimate() {
        let f = ProbeFormat {
            format_id: "137".to_string(),
            filesize: Some(1000.0),
            filesize_approx: Some(2000.0),
            ..ProbeFormat::default()
        };
        assert_eq!(f.size_bytes(), Some(1000));

        let approx_only = ProbeFormat {
            format_id: "137".to_string(),
            filesize_approx: Some(2000.9),
            ..ProbeFormat::default()
        };
        assert_eq!(approx_only.size_bytes(), Some(2000));
    }

    #[test]
    fn test_probe_info_parses_minimal_json() {
        let info: ProbeInfo =
            serde_json::from_str(r#"{"title":"clip","filesize_approx":1234.5}"#)
                .expect("minimal probe JSON");
        assert_eq!(info.size_bytes(), Some(1234));
        assert!(info.formats.is_empty());
    }
}
