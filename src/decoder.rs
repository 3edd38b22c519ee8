//! The video decode/probe collaborator.
//!
//! [`Decoder`] is the seam the extractor talks to; [`Ffmpeg`] implements it by
//! shelling out to `ffprobe` and `ffmpeg`.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::errors::{HunyuanError, Result, ToolErrorKind};
use crate::models::VideoMetadata;

#[async_trait]
pub trait Decoder: Send + Sync {
    /// Read container and stream metadata. Fails if the file has no video
    /// stream or no positive duration.
    async fn probe(&self, video: &Path) -> Result<VideoMetadata>;

    /// Write the frame at `timestamp` seconds to `output` as a JPEG of the
    /// given quality (1-100).
    async fn capture(
        &self,
        video: &Path,
        timestamp: f64,
        output: &Path,
        quality: u8,
    ) -> Result<()>;
}

/// [`Decoder`] backed by the ffmpeg command-line tools.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl Ffmpeg {
    /// Use binaries at explicit paths instead of looking them up on `PATH`.
    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

#[async_trait]
impl Decoder for Ffmpeg {
    async fn probe(&self, video: &Path) -> Result<VideoMetadata> {
        debug!(video = %video.display(), "probing video metadata");

        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(video)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_error("ffprobe", e))?;

        check_status("ffprobe", video, &output)?;
        parse_probe_output(&output.stdout)
    }

    async fn capture(
        &self,
        video: &Path,
        timestamp: f64,
        output: &Path,
        quality: u8,
    ) -> Result<()> {
        let seek = format!("{timestamp:.3}");
        let qscale = qscale_for_quality(quality).to_string();

        debug!(
            video = %video.display(),
            output = %output.display(),
            timestamp,
            qscale = %qscale,
            "capturing frame"
        );

        let result = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-ss", &seek, "-i"])
            .arg(video)
            .args(["-frames:v", "1", "-q:v", &qscale, "-y"])
            .arg(output)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_error("ffmpeg", e))?;

        check_status("ffmpeg", video, &result)
    }
}

/// Map 1-100 quality onto ffmpeg's JPEG `-q:v` scale (31 worst, 2 best).
pub(crate) fn qscale_for_quality(quality: u8) -> u32 {
    let q = u32::from(quality.clamp(1, 100));
    31 - ((q - 1) * 29 + 49) / 99
}

fn spawn_error(tool: &'static str, err: io::Error) -> HunyuanError {
    let kind = match err.kind() {
        io::ErrorKind::NotFound => ToolErrorKind::NotInstalled,
        io::ErrorKind::PermissionDenied => ToolErrorKind::Permission,
        _ => ToolErrorKind::Other,
    };
    HunyuanError::Tool {
        tool,
        kind,
        message: format!("could not start {tool}: {err}"),
    }
}

fn check_status(tool: &'static str, video: &Path, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(classify_failure(tool, video, stderr.trim()))
}

/// Sort a failed run into the error taxonomy by what the tool printed.
pub(crate) fn classify_failure(tool: &'static str, video: &Path, stderr: &str) -> HunyuanError {
    let lower = stderr.to_lowercase();
    let names_video = stderr.contains(video.to_string_lossy().as_ref());
    if lower.contains("no such file or directory") && (tool == "ffprobe" || names_video) {
        return HunyuanError::NotFound {
            path: video.to_path_buf(),
        };
    }

    let kind = if lower.contains("permission denied") {
        ToolErrorKind::Permission
    } else if lower.contains("no space left") {
        ToolErrorKind::DiskFull
    } else if lower.contains("invalid data found") || lower.contains("moov atom not found") {
        ToolErrorKind::InvalidData
    } else if lower.contains("output file is empty") || lower.contains("nothing was encoded") {
        ToolErrorKind::InvalidSeek
    } else {
        ToolErrorKind::Other
    };

    let message = stderr.lines().last().unwrap_or("exited with an error").to_string();
    HunyuanError::Tool { tool, kind, message }
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    format_name: Option<String>,
}

fn invalid_data(message: impl Into<String>) -> HunyuanError {
    HunyuanError::Tool {
        tool: "ffprobe",
        kind: ToolErrorKind::InvalidData,
        message: message.into(),
    }
}

pub(crate) fn parse_probe_output(stdout: &[u8]) -> Result<VideoMetadata> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| invalid_data(format!("unreadable ffprobe output: {e}")))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| invalid_data("no video stream found"))?;

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| parse_seconds(f.duration.as_deref()))
        .or_else(|| parse_seconds(video.duration.as_deref()))
        .unwrap_or(0.0);
    if duration <= 0.0 {
        return Err(invalid_data(format!("video duration must be positive, got {duration}")));
    }

    let frame_rate = parse_rate(video.avg_frame_rate.as_deref())
        .or_else(|| parse_rate(video.r_frame_rate.as_deref()))
        .unwrap_or(0.0);

    Ok(VideoMetadata {
        duration_seconds: duration,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        frame_rate,
        container_format: probe
            .format
            .and_then(|f| f.format_name)
            .unwrap_or_default(),
    })
}

fn parse_seconds(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|d| d.is_finite())
}

/// Parse ffprobe's `num/den` rates. `0/0` means unknown.
fn parse_rate(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}
