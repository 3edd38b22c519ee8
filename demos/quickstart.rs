//! Quick-start walkthrough for hunyuan-video.
//!
//! Run with:
//!   TENCENTCLOUD_SECRET_ID=AKID... TENCENTCLOUD_SECRET_KEY=... \
//!     cargo run --example quickstart -- trip.mp4
//!
//! Set RUST_LOG=hunyuan_video=debug to see each request and capture.

use std::sync::Arc;

use hunyuan_video::{
    AnalyzeOptions, ClientBuilder, Ffmpeg, FrameExtractor, FrameRequest, ScriptTemplate,
    Strategy, VideoAnalyzer,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let video = std::env::args().nth(1).unwrap_or_else(|| "demo.mp4".into());

    if let Err(err) = run(&video).await {
        eprintln!("{}", err.report(&[("video", video.as_str())]));
        std::process::exit(1);
    }
}

async fn run(video: &str) -> hunyuan_video::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Create a client (reads TENCENTCLOUD_SECRET_ID / _KEY from environment)
    // -----------------------------------------------------------------------
    let client = ClientBuilder::new().region("ap-guangzhou").build()?;
    println!("Using credentials {}", client.credentials().masked_id());

    let analyzer = VideoAnalyzer::new(client, FrameExtractor::new(Arc::new(Ffmpeg::default())));

    // -----------------------------------------------------------------------
    // 2. Inspect the video
    // -----------------------------------------------------------------------
    let meta = analyzer.video_info(video).await?;
    println!(
        "{}: {:.1}s, {}x{} @ {:.2} fps (~{} frames)",
        video,
        meta.duration_seconds,
        meta.width,
        meta.height,
        meta.frame_rate,
        meta.frame_count()
    );
    println!();

    // -----------------------------------------------------------------------
    // 3. Summarize it in one vision request
    // -----------------------------------------------------------------------
    let summary = analyzer
        .analyze_video(video, "Summarize what happens in this video.", &AnalyzeOptions::default())
        .await?;
    println!("Summary ({} frames):", summary.frames.len());
    println!("{}", summary.result.content);
    println!("Tokens: {}", summary.result.usage.total_tokens);
    println!();

    // -----------------------------------------------------------------------
    // 4. Write a shooting script
    // -----------------------------------------------------------------------
    println!("Templates: {}", ScriptTemplate::preset_names().join(", "));
    let script = analyzer
        .generate_script(video, &ScriptTemplate::preset("vlog")?, &AnalyzeOptions::default())
        .await?;
    println!("{}", script.script);
    println!(
        "Tokens: {} analysis + {} script = {}",
        script.analysis_usage.total_tokens,
        script.generation_usage.total_tokens,
        script.usage.total_tokens
    );
    println!();

    // -----------------------------------------------------------------------
    // 5. Describe frames one by one
    // -----------------------------------------------------------------------
    let frames = analyzer
        .extract_frames(
            video,
            &FrameRequest::new(3)
                .strategy(Strategy::Uniform)
                .output_dir("quickstart-frames"),
        )
        .await?;
    let paths: Vec<_> = frames.iter().map(|f| f.path.clone()).collect();

    let batch = analyzer
        .analyze_image_batch(&paths, "Describe this frame in one sentence.")
        .await?;
    for (frame, item) in frames.iter().zip(batch.items.iter()) {
        println!("  [{:.1}s] {}", frame.timestamp_seconds, item.result.content);
    }
    println!(
        "{} ok, {} failed, {} tokens",
        batch.succeeded().count(),
        batch.failed().count(),
        batch.total_usage().total_tokens
    );

    let report = analyzer.cleanup_frames(&frames).await;
    println!("Removed {} frame files.", report.removed);

    Ok(())
}
