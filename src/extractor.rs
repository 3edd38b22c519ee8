use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::decoder::{Decoder, Ffmpeg};
use crate::errors::{HunyuanError, Result, ToolErrorKind};
use crate::models::{ExtractedFrame, FrameRequest, VideoMetadata};
use crate::selector::{FrameSelector, DEFAULT_WARN_ABOVE};

/// Tuning for [`FrameExtractor`].
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Upper bound for one capture. Default: 30s.
    pub capture_timeout: Duration,
    /// Consecutive failures, before any success, that abort the run. Default: 3.
    pub max_consecutive_failures: usize,
    /// Frame counts above this log a cost warning. Default: 20.
    pub warn_above: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            capture_timeout: Duration::from_secs(30),
            max_consecutive_failures: 3,
            warn_above: DEFAULT_WARN_ABOVE,
        }
    }
}

/// Outcome of [`FrameExtractor::cleanup_frames`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub failed: usize,
}

/// Samples still frames from a video through a [`Decoder`].
///
/// One call runs probe, timestamp selection, then one capture per timestamp
/// in increasing order. Probe failures end the call with nothing written.
pub struct FrameExtractor {
    decoder: Arc<dyn Decoder>,
    selector: FrameSelector,
    config: ExtractorConfig,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new(Arc::new(Ffmpeg::default()))
    }
}

impl FrameExtractor {
    pub fn new(decoder: Arc<dyn Decoder>) -> Self {
        Self::with_config(decoder, ExtractorConfig::default())
    }

    pub fn with_config(decoder: Arc<dyn Decoder>, config: ExtractorConfig) -> Self {
        Self {
            decoder,
            selector: FrameSelector::new(config.warn_above),
            config,
        }
    }

    /// Probe a video without extracting anything.
    pub async fn video_info(&self, video: impl AsRef<Path>) -> Result<VideoMetadata> {
        let video = video.as_ref();
        ensure_exists(video).await?;
        self.decoder.probe(video).await
    }

    /// Extract up to `request.max_frames` frames, ordered by timestamp.
    ///
    /// Failed captures are skipped. The run aborts when the first
    /// `max_consecutive_failures` captures all fail, and fails when no frame
    /// at all could be captured.
    ///
    /// # Errors
    ///
    /// - [`HunyuanError::InvalidInput`] for a bad request.
    /// - [`HunyuanError::NotFound`] if the video does not exist.
    /// - [`HunyuanError::Tool`] if probing fails.
    /// - [`HunyuanError::ExtractionAborted`] / [`HunyuanError::NoFramesExtracted`].
    pub async fn extract_frames(
        &self,
        video: impl AsRef<Path>,
        request: &FrameRequest,
    ) -> Result<Vec<ExtractedFrame>> {
        let video = video.as_ref();
        request.validate()?;
        ensure_exists(video).await?;

        let metadata = self.decoder.probe(video).await?;
        if metadata.duration_seconds <= 0.0 {
            return Err(HunyuanError::Tool {
                tool: "ffprobe",
                kind: ToolErrorKind::InvalidData,
                message: format!(
                    "video duration must be positive, got {}",
                    metadata.duration_seconds
                ),
            });
        }
        info!(
            video = %video.display(),
            duration = metadata.duration_seconds,
            width = metadata.width,
            height = metadata.height,
            "probed video"
        );

        let timestamps = self.selector.compute_timestamps(
            metadata.duration_seconds,
            request.max_frames,
            request.strategy,
        )?;

        tokio::fs::create_dir_all(&request.output_dir).await?;

        let mut frames = Vec::with_capacity(timestamps.len());
        let mut failures = Vec::new();
        let mut consecutive = 0usize;

        for (index, &timestamp) in timestamps.iter().enumerate() {
            let path = frame_path(&request.output_dir, index, timestamp);

            match self.capture_one(video, timestamp, &path, request.quality).await {
                Ok(()) => {
                    consecutive = 0;
                    frames.push(ExtractedFrame {
                        path,
                        timestamp_seconds: timestamp,
                        index,
                    });
                }
                Err(e) => {
                    warn!(timestamp, error = %e, "frame capture failed");
                    remove_partial(&path).await;
                    failures.push(format!("{timestamp:.2}s: {e}"));
                    consecutive += 1;

                    if frames.is_empty() && consecutive >= self.config.max_consecutive_failures {
                        return Err(HunyuanError::ExtractionAborted {
                            attempted: consecutive,
                            failures,
                        });
                    }
                }
            }
        }

        if frames.is_empty() {
            return Err(HunyuanError::NoFramesExtracted {
                attempted: timestamps.len(),
                failures,
            });
        }

        info!(
            extracted = frames.len(),
            failed = failures.len(),
            output_dir = %request.output_dir.display(),
            "frame extraction finished"
        );
        Ok(frames)
    }

    async fn capture_one(
        &self,
        video: &Path,
        timestamp: f64,
        path: &Path,
        quality: u8,
    ) -> Result<()> {
        tokio::time::timeout(
            self.config.capture_timeout,
            self.decoder.capture(video, timestamp, path, quality),
        )
        .await
        .map_err(|_| HunyuanError::Tool {
            tool: "ffmpeg",
            kind: ToolErrorKind::Timeout,
            message: format!("no frame after {:?}", self.config.capture_timeout),
        })??;

        // A successful exit is not enough: the file must be there and non-empty.
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(HunyuanError::Tool {
                tool: "ffmpeg",
                kind: ToolErrorKind::InvalidSeek,
                message: format!("no image written at {timestamp:.3}s"),
            }),
        }
    }

    /// Best-effort delete of extracted frames. Never fails; failures are
    /// counted and logged.
    pub async fn cleanup_frames<P: AsRef<Path>>(&self, paths: &[P]) -> CleanupReport {
        cleanup_frames(paths).await
    }
}

/// Free-function form of [`FrameExtractor::cleanup_frames`].
pub async fn cleanup_frames<P: AsRef<Path>>(paths: &[P]) -> CleanupReport {
    let mut report = CleanupReport::default();
    for path in paths {
        let path = path.as_ref();
        match tokio::fs::remove_file(path).await {
            Ok(()) => report.removed += 1,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "could not remove frame");
                report.failed += 1;
            }
        }
    }

    if report.failed > 0 {
        warn!(
            removed = report.removed,
            failed = report.failed,
            "some frame files could not be removed"
        );
    } else {
        debug!(removed = report.removed, "frame files removed");
    }
    report
}

async fn ensure_exists(video: &Path) -> Result<()> {
    if video.as_os_str().is_empty() {
        return Err(HunyuanError::InvalidInput("video path must not be empty".into()));
    }
    match tokio::fs::metadata(video).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(HunyuanError::NotFound {
            path: video.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(HunyuanError::NotFound {
            path: video.to_path_buf(),
        }),
        Err(e) => Err(HunyuanError::Io(e)),
    }
}

fn frame_path(dir: &Path, index: usize, timestamp: f64) -> PathBuf {
    dir.join(format!("frame_{index:03}_{timestamp:.2}s.jpg"))
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!(path = %path.display(), error = %e, "could not remove partial frame");
        }
    }
}
