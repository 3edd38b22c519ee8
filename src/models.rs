use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{HunyuanError, Result};

/// Tokens billed for one call, or summed over several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: TokenUsage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens + rhs.prompt_tokens,
            completion_tokens: self.completion_tokens + rhs.completion_tokens,
            total_tokens: self.total_tokens + rhs.total_tokens,
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: TokenUsage) {
        *self = *self + rhs;
    }
}

impl Sum for TokenUsage {
    fn sum<I: Iterator<Item = TokenUsage>>(iter: I) -> Self {
        iter.fold(TokenUsage::default(), Add::add)
    }
}

/// Text returned by one API call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisResult {
    pub content: String,
    pub usage: TokenUsage,
    /// Server-assigned id, if the response carried one.
    pub request_id: Option<String>,
    /// Images left out of a multi-image request because of the per-request cap.
    pub skipped_images: Vec<PathBuf>,
}

/// One entry of a batch. A failed entry keeps its slot, with marked content
/// and zero usage.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub path: PathBuf,
    pub result: AnalysisResult,
    pub error: Option<String>,
}

impl BatchItem {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Results of `analyze_image_batch`, in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchAnalysis {
    pub items: Vec<BatchItem>,
}

impl BatchAnalysis {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|i| !i.is_failed())
    }

    pub fn failed(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|i| i.is_failed())
    }

    /// Usage of the successful items only.
    pub fn total_usage(&self) -> TokenUsage {
        self.succeeded().map(|i| i.result.usage).sum()
    }
}

/// A shooting script plus the video analysis it was written from.
#[derive(Debug, Clone)]
pub struct ScriptResult {
    pub script: String,
    pub analysis: String,
    pub analysis_usage: TokenUsage,
    pub generation_usage: TokenUsage,
    /// `analysis_usage + generation_usage`.
    pub usage: TokenUsage,
}

/// Container and stream facts from one probe.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    /// e.g. "mov,mp4,m4a,3gp,3g2,mj2".
    pub container_format: String,
}

impl VideoMetadata {
    pub fn frame_count(&self) -> u64 {
        if self.duration_seconds <= 0.0 || self.frame_rate <= 0.0 {
            return 0;
        }
        (self.duration_seconds * self.frame_rate).floor() as u64
    }
}

/// How sample timestamps are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Uniform,
    Keyframe,
    SceneChange,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uniform => "uniform",
            Self::Keyframe => "keyframe",
            Self::SceneChange => "scene_change",
        };
        f.write_str(s)
    }
}

impl FromStr for Strategy {
    type Err = HunyuanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(Self::Uniform),
            "keyframe" | "key_frame" => Ok(Self::Keyframe),
            "scene_change" | "scene-change" | "scene" => Ok(Self::SceneChange),
            other => Err(HunyuanError::InvalidInput(format!(
                "unknown strategy {other:?} (expected uniform, keyframe or scene_change)"
            ))),
        }
    }
}

/// What to extract from a video.
#[derive(Debug, Clone)]
pub struct FrameRequest {
    pub max_frames: usize,
    pub strategy: Strategy,
    pub output_dir: PathBuf,
    /// JPEG quality, 1-100. Default: 85.
    pub quality: u8,
}

impl FrameRequest {
    /// Uniform sampling into a per-process directory under the system temp dir.
    pub fn new(max_frames: usize) -> Self {
        Self {
            max_frames,
            strategy: Strategy::Uniform,
            output_dir: std::env::temp_dir().join(format!("hunyuan-frames-{}", std::process::id())),
            quality: 85,
        }
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_frames == 0 {
            return Err(HunyuanError::InvalidInput(
                "max_frames must be greater than zero".into(),
            ));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(HunyuanError::InvalidInput(format!(
                "quality must be within 1-100, got {}",
                self.quality
            )));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(HunyuanError::InvalidInput("output_dir must not be empty".into()));
        }
        Ok(())
    }
}

/// A frame written to disk by the extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFrame {
    pub path: PathBuf,
    pub timestamp_seconds: f64,
    /// Position in timestamp order, starting at 0.
    pub index: usize,
}

// ---------------------------------------------------------------------------
// Wire types for the ChatCompletions action (not part of the public API)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
}

/// Text-only calls carry `Content`; vision calls carry `Contents`.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ChatMessage {
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: Some(text.into()),
            contents: Vec::new(),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: "user",
            content: None,
            contents: parts,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "Type")]
pub(crate) enum ContentPart {
    #[serde(rename = "text")]
    Text {
        #[serde(rename = "Text")]
        text: String,
    },
    #[serde(rename = "image_url")]
    ImageUrl {
        #[serde(rename = "ImageUrl")]
        image_url: ImageUrl,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ImageUrl {
    pub url: String,
}

/// Every response is wrapped in `{"Response": {...}}`.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ApiEnvelope {
    pub response: ResponseBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ResponseBody {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<WireUsage>,
    pub error: Option<WireError>,
    pub request_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Choice {
    pub message: WireMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireMessage {
    #[serde(default)]
    pub content: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl From<WireUsage> for TokenUsage {
    fn from(u: WireUsage) -> Self {
        TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireError {
    pub code: String,
    #[serde(default)]
    pub message: String,
}
