use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::client::Client;
use crate::errors::{HunyuanError, Result};
use crate::extractor::{CleanupReport, FrameExtractor};
use crate::models::{
    AnalysisResult, BatchAnalysis, ExtractedFrame, FrameRequest, ScriptResult, Strategy,
    VideoMetadata,
};
use crate::prompts::ScriptTemplate;

/// Options for [`VideoAnalyzer::analyze_video`] and
/// [`VideoAnalyzer::generate_script`].
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Frames to sample. Capped at the client's per-request image limit. Default: 4.
    pub max_frames: usize,
    pub strategy: Strategy,
    /// JPEG quality, 1-100. Default: 85.
    pub quality: u8,
    /// Where frames are written. Default: a per-process temp directory.
    pub output_dir: Option<PathBuf>,
    /// Leave the frame files on disk after analysis. Default: false.
    pub keep_frames: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            max_frames: 4,
            strategy: Strategy::Uniform,
            quality: 85,
            output_dir: None,
            keep_frames: false,
        }
    }
}

/// Frames sampled from a video and the model's description of them.
#[derive(Debug, Clone)]
pub struct VideoAnalysis {
    /// The sampled frames. Their files are already deleted unless
    /// `keep_frames` was set.
    pub frames: Vec<ExtractedFrame>,
    pub result: AnalysisResult,
}

/// Frame extraction and Hunyuan calls combined into video-level operations.
pub struct VideoAnalyzer {
    client: Client,
    extractor: FrameExtractor,
}

impl VideoAnalyzer {
    pub fn new(client: Client, extractor: FrameExtractor) -> Self {
        Self { client, extractor }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn video_info(&self, video: impl AsRef<Path>) -> Result<VideoMetadata> {
        self.extractor.video_info(video).await
    }

    pub async fn extract_frames(
        &self,
        video: impl AsRef<Path>,
        request: &FrameRequest,
    ) -> Result<Vec<ExtractedFrame>> {
        self.extractor.extract_frames(video, request).await
    }

    pub async fn cleanup_frames(&self, frames: &[ExtractedFrame]) -> CleanupReport {
        let paths: Vec<&Path> = frames.iter().map(|f| f.path.as_path()).collect();
        self.extractor.cleanup_frames(&paths).await
    }

    pub async fn analyze_image_batch<P: AsRef<Path> + Sync>(
        &self,
        paths: &[P],
        prompt: &str,
    ) -> Result<BatchAnalysis> {
        self.client.analyze_image_batch(paths, prompt).await
    }

    /// Sample frames from `video` and describe them in a single API call.
    ///
    /// Frames are removed afterwards, whether or not the call succeeded,
    /// unless `opts.keep_frames` is set.
    pub async fn analyze_video(
        &self,
        video: impl AsRef<Path>,
        prompt: &str,
        opts: &AnalyzeOptions,
    ) -> Result<VideoAnalysis> {
        let video = video.as_ref();
        if prompt.trim().is_empty() {
            return Err(HunyuanError::InvalidInput("prompt must not be empty".into()));
        }

        let request = self.frame_request(opts);
        let frames = self.extractor.extract_frames(video, &request).await?;
        let paths: Vec<&Path> = frames.iter().map(|f| f.path.as_path()).collect();

        let outcome = self
            .client
            .analyze_images_in_single_request(&paths, prompt)
            .await;

        if !opts.keep_frames {
            self.extractor.cleanup_frames(&paths).await;
        }

        let result = outcome?;
        info!(
            video = %video.display(),
            frames = frames.len(),
            tokens = result.usage.total_tokens,
            "video analyzed"
        );
        Ok(VideoAnalysis { frames, result })
    }

    /// Analyze `video`, then write a shooting script from that analysis.
    ///
    /// Exactly two API calls are made; the returned usage is their sum.
    pub async fn generate_script(
        &self,
        video: impl AsRef<Path>,
        template: &ScriptTemplate,
        opts: &AnalyzeOptions,
    ) -> Result<ScriptResult> {
        let analysis = self
            .analyze_video(video, &template.analysis_prompt, opts)
            .await?
            .result;

        let prompt = template.render(&analysis.content);
        let generated = self
            .client
            .generate_text(&prompt, self.client.text_model())
            .await?;

        info!(
            template = %template.name,
            analysis_tokens = analysis.usage.total_tokens,
            script_tokens = generated.usage.total_tokens,
            "shooting script generated"
        );

        Ok(ScriptResult {
            script: generated.content,
            analysis: analysis.content,
            analysis_usage: analysis.usage,
            generation_usage: generated.usage,
            usage: analysis.usage + generated.usage,
        })
    }

    fn frame_request(&self, opts: &AnalyzeOptions) -> FrameRequest {
        let limit = self.client.rate_policy().max_images_per_request.max(1);
        let max_frames = if opts.max_frames > limit {
            warn!(
                requested = opts.max_frames,
                limit, "frame count above the per-request image limit, capping"
            );
            limit
        } else {
            opts.max_frames
        };

        let mut request = FrameRequest::new(max_frames)
            .strategy(opts.strategy)
            .quality(opts.quality);
        if let Some(dir) = &opts.output_dir {
            request = request.output_dir(dir);
        }
        request
    }
}
