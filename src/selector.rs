use tracing::{info, warn};

use crate::errors::{HunyuanError, Result};
use crate::models::Strategy;

/// Duration assumed by the keyframe and scene-change strategies when nothing
/// is known about the video.
pub const FALLBACK_DURATION_SECS: f64 = 60.0;

/// Frame counts above this still work but are logged as a cost warning.
pub const DEFAULT_WARN_ABOVE: usize = 20;

/// Turns a duration and a frame budget into sample timestamps.
#[derive(Debug, Clone)]
pub struct FrameSelector {
    warn_above: usize,
}

impl Default for FrameSelector {
    fn default() -> Self {
        Self {
            warn_above: DEFAULT_WARN_ABOVE,
        }
    }
}

impl FrameSelector {
    /// A selector that logs a cost warning above `warn_above` frames.
    pub fn new(warn_above: usize) -> Self {
        Self { warn_above }
    }

    /// Strictly increasing timestamps in `(0, duration)`.
    ///
    /// `uniform` splits the video into `max_frames + 1` equal intervals and
    /// returns the inner boundaries. `keyframe` and `scene_change` have no
    /// detector behind them and use the same timestamps.
    pub fn compute_timestamps(
        &self,
        duration: f64,
        max_frames: usize,
        strategy: Strategy,
    ) -> Result<Vec<f64>> {
        if max_frames == 0 {
            return Err(HunyuanError::InvalidInput(
                "max_frames must be greater than zero".into(),
            ));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(HunyuanError::InvalidInput(format!(
                "duration must be a positive number of seconds, got {duration}"
            )));
        }
        if max_frames > self.warn_above {
            warn!(
                max_frames,
                warn_above = self.warn_above,
                "large frame count requested; every frame costs a capture and API tokens"
            );
        }

        match strategy {
            Strategy::Uniform => {}
            Strategy::Keyframe | Strategy::SceneChange => {
                info!(%strategy, "no detector for this strategy, sampling uniformly");
            }
        }

        Ok(uniform(duration, max_frames))
    }

    /// Like [`compute_timestamps`](Self::compute_timestamps), for callers that
    /// may not know the duration. Detection strategies fall back to
    /// [`FALLBACK_DURATION_SECS`]; `uniform` requires a real duration.
    pub fn select(
        &self,
        duration: Option<f64>,
        max_frames: usize,
        strategy: Strategy,
    ) -> Result<Vec<f64>> {
        let known = duration.filter(|d| d.is_finite() && *d > 0.0);
        match (known, strategy) {
            (Some(d), _) => self.compute_timestamps(d, max_frames, strategy),
            (None, Strategy::Uniform) => Err(HunyuanError::InvalidInput(
                "uniform sampling needs the video duration".into(),
            )),
            (None, _) => {
                warn!(
                    %strategy,
                    fallback_secs = FALLBACK_DURATION_SECS,
                    "video duration unknown, assuming default"
                );
                self.compute_timestamps(FALLBACK_DURATION_SECS, max_frames, strategy)
            }
        }
    }
}

fn uniform(duration: f64, max_frames: usize) -> Vec<f64> {
    let step = duration / (max_frames + 1) as f64;
    (1..=max_frames).map(|i| step * i as f64).collect()
}
