//! # hunyuan-video
//!
//! Sample still frames from a video with ffmpeg, describe them with the
//! Tencent Hunyuan vision models, and turn the description into a summary or
//! a shooting script. Requests are signed with TC3-HMAC-SHA256.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use hunyuan_video::{
//!     AnalyzeOptions, ClientBuilder, Ffmpeg, FrameExtractor, ScriptTemplate, VideoAnalyzer,
//! };
//!
//! #[tokio::main]
//! async fn main() -> hunyuan_video::Result<()> {
//!     // Reads TENCENTCLOUD_SECRET_ID / TENCENTCLOUD_SECRET_KEY.
//!     let client = ClientBuilder::new().build()?;
//!     let analyzer = VideoAnalyzer::new(client, FrameExtractor::new(Arc::new(Ffmpeg::default())));
//!
//!     let summary = analyzer
//!         .analyze_video("trip.mp4", "Summarize this video.", &AnalyzeOptions::default())
//!         .await?;
//!     println!("{}", summary.result.content);
//!
//!     let script = analyzer
//!         .generate_script(
//!             "trip.mp4",
//!             &ScriptTemplate::preset("vlog")?,
//!             &AnalyzeOptions::default(),
//!         )
//!         .await?;
//!     println!("{}\n({} tokens)", script.script, script.usage.total_tokens);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Frame timestamps
//!
//! ```
//! use hunyuan_video::{FrameSelector, Strategy};
//!
//! let ts = FrameSelector::default()
//!     .compute_timestamps(10.0, 3, Strategy::Uniform)
//!     .unwrap();
//! assert_eq!(ts, vec![2.5, 5.0, 7.5]);
//! ```

mod analyzer;
mod client;
mod config;
mod decoder;
mod errors;
mod extractor;
mod models;
mod pacing;
mod prompts;
mod redact;
mod selector;
pub mod signing;

pub use analyzer::{AnalyzeOptions, VideoAnalysis, VideoAnalyzer};
pub use client::{
    Client, ClientBuilder, DEFAULT_MAX_IMAGE_BYTES, DEFAULT_TEXT_MODEL, DEFAULT_VISION_MODEL,
    FAILED_ITEM_MARKER,
};
pub use config::{
    Credentials, DEFAULT_ENDPOINT, DEFAULT_REGION, ENV_REGION, ENV_SECRET_ID, ENV_SECRET_KEY,
};
pub use decoder::{Decoder, Ffmpeg};
pub use errors::{
    ErrorCategory, HunyuanError, Result, ToolErrorKind, UpstreamError, UpstreamErrorKind,
};
pub use extractor::{cleanup_frames, CleanupReport, ExtractorConfig, FrameExtractor};
pub use models::{
    AnalysisResult, BatchAnalysis, BatchItem, ExtractedFrame, FrameRequest, ScriptResult,
    Strategy, TokenUsage, VideoMetadata,
};
pub use pacing::{Pacer, RatePolicy, TokioPacer};
pub use prompts::{ScriptTemplate, ANALYSIS_PLACEHOLDER, DEFAULT_VIDEO_PROMPT};
pub use redact::{mask_secret_id, Redacted};
pub use selector::{FrameSelector, FALLBACK_DURATION_SECS};
