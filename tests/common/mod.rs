#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hunyuan_video::{
    Client, ClientBuilder, Credentials, Decoder, HunyuanError, Pacer, ToolErrorKind, VideoMetadata,
};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const SECRET_ID: &str = "AKIDz8krbsJ5yKBZQpn74WFkmLPx3abcd";
pub const SECRET_KEY: &str = "Gu5t9xGARNpq86cd98joQYCN3EXAMPLE";

/// Records every pause instead of sleeping.
#[derive(Default)]
pub struct RecordingPacer {
    pub pauses: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, interval: Duration) {
        self.pauses.lock().unwrap().push(interval);
    }
}

pub fn credentials(server: &MockServer) -> Credentials {
    Credentials::new(SECRET_ID, SECRET_KEY).with_endpoint(server.uri())
}

pub fn builder(server: &MockServer, pacer: Arc<RecordingPacer>) -> ClientBuilder {
    ClientBuilder::new()
        .credentials(credentials(server))
        .use_environment(false)
        .pacer(pacer)
}

pub fn client(server: &MockServer) -> (Client, Arc<RecordingPacer>) {
    let pacer = Arc::new(RecordingPacer::default());
    let client = builder(server, pacer.clone()).build().unwrap();
    (client, pacer)
}

pub fn success_body(content: &str, prompt_tokens: u64, completion_tokens: u64) -> Value {
    json!({
        "Response": {
            "Id": "chat-1",
            "Created": 1700000000,
            "Choices": [{
                "Index": 0,
                "FinishReason": "stop",
                "Message": {"Role": "assistant", "Content": content}
            }],
            "Usage": {
                "PromptTokens": prompt_tokens,
                "CompletionTokens": completion_tokens,
                "TotalTokens": prompt_tokens + completion_tokens
            },
            "RequestId": "req-ok"
        }
    })
}

pub fn error_body(code: &str, message: &str) -> Value {
    json!({
        "Response": {
            "Error": {"Code": code, "Message": message},
            "RequestId": "req-err"
        }
    })
}

/// Write a small fake image and return its path.
pub fn write_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]).unwrap();
    path
}

/// What the fake probe reports.
#[derive(Clone, Copy)]
pub enum Probe {
    Duration(f64),
    Corrupt,
}

/// How a fake capture behaves.
#[derive(Clone, Copy, PartialEq)]
pub enum Capture {
    Ok,
    /// Write a partial file, then fail.
    Fail,
    /// Exit successfully without writing anything.
    Empty,
    /// Never finish.
    Hang,
}

/// A [`Decoder`] that never runs ffmpeg.
pub struct FakeDecoder {
    probe: Probe,
    failing: HashSet<usize>,
    failure_mode: Capture,
    pub probes: AtomicUsize,
    pub captures: Mutex<Vec<f64>>,
}

impl FakeDecoder {
    pub fn new(probe: Probe) -> Self {
        Self {
            probe,
            failing: HashSet::new(),
            failure_mode: Capture::Fail,
            probes: AtomicUsize::new(0),
            captures: Mutex::new(Vec::new()),
        }
    }

    /// Make the captures with these call numbers (0-based) misbehave.
    pub fn failing(mut self, calls: &[usize], mode: Capture) -> Self {
        self.failing = calls.iter().copied().collect();
        self.failure_mode = mode;
        self
    }

    pub fn capture_count(&self) -> usize {
        self.captures.lock().unwrap().len()
    }
}

#[async_trait]
impl Decoder for FakeDecoder {
    async fn probe(&self, _video: &Path) -> hunyuan_video::Result<VideoMetadata> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match self.probe {
            Probe::Duration(d) => Ok(VideoMetadata {
                duration_seconds: d,
                width: 1280,
                height: 720,
                frame_rate: 25.0,
                container_format: "mov,mp4,m4a,3gp,3g2,mj2".into(),
            }),
            Probe::Corrupt => Err(HunyuanError::Tool {
                tool: "ffprobe",
                kind: ToolErrorKind::InvalidData,
                message: "Invalid data found when processing input".into(),
            }),
        }
    }

    async fn capture(
        &self,
        _video: &Path,
        timestamp: f64,
        output: &Path,
        _quality: u8,
    ) -> hunyuan_video::Result<()> {
        let call = {
            let mut captures = self.captures.lock().unwrap();
            captures.push(timestamp);
            captures.len() - 1
        };

        let mode = if self.failing.contains(&call) {
            self.failure_mode
        } else {
            Capture::Ok
        };

        match mode {
            Capture::Ok => {
                tokio::fs::write(output, [0xFF, 0xD8, 0xFF, 0xD9]).await?;
                Ok(())
            }
            Capture::Fail => {
                tokio::fs::write(output, [0xFF]).await?;
                Err(HunyuanError::Tool {
                    tool: "ffmpeg",
                    kind: ToolErrorKind::Other,
                    message: "Error while decoding stream #0:0".into(),
                })
            }
            Capture::Empty => Ok(()),
            Capture::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}

/// A file that stands in for the source video.
pub fn fake_video(dir: &Path) -> PathBuf {
    let path = dir.join("clip.mp4");
    std::fs::write(&path, b"not really an mp4").unwrap();
    path
}

pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(_) => Vec::new(),
    }
}
