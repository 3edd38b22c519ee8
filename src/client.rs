use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, HOST};
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::config::Credentials;
use crate::errors::{HunyuanError, Result, UpstreamError};
use crate::models::{
    AnalysisResult, ApiEnvelope, BatchAnalysis, BatchItem, ChatMessage, ChatRequest, ContentPart,
    ImageUrl, ResponseBody,
};
use crate::pacing::{Pacer, RatePolicy, TokioPacer};
use crate::signing::{SignedRequest, CONTENT_TYPE_JSON};

const SERVICE: &str = "hunyuan";
const ACTION: &str = "ChatCompletions";
const API_VERSION: &str = "2023-09-01";

pub const DEFAULT_VISION_MODEL: &str = "hunyuan-vision";
pub const DEFAULT_TEXT_MODEL: &str = "hunyuan-lite";
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Prefix of the content stored for a batch item that failed.
pub const FAILED_ITEM_MARKER: &str = "[analysis failed]";

/// Builder for constructing a [`Client`] with custom configuration.
///
/// # Example
///
/// ```no_run
/// use hunyuan_video::{ClientBuilder, Credentials, RatePolicy};
/// use std::time::Duration;
///
/// # fn example() -> hunyuan_video::Result<()> {
/// let client = ClientBuilder::new()
///     .credentials(Credentials::new("AKID...", "secret"))
///     .region("ap-beijing")
///     .text_model("hunyuan-standard")
///     .rate_policy(RatePolicy { interval: Duration::from_millis(500), ..Default::default() })
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    credentials: Option<Credentials>,
    default_credentials: Option<Credentials>,
    use_environment: bool,
    region: Option<String>,
    endpoint: Option<String>,
    vision_model: String,
    text_model: String,
    timeout: Duration,
    rate_policy: RatePolicy,
    pacer: Arc<dyn Pacer>,
    max_image_bytes: u64,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            credentials: None,
            default_credentials: None,
            use_environment: true,
            region: None,
            endpoint: None,
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            rate_policy: RatePolicy::default(),
            pacer: Arc::new(TokioPacer),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    /// Credentials supplied for this call site.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Credentials configured at process startup, used when nothing else is set.
    pub fn default_credentials(mut self, credentials: Credentials) -> Self {
        self.default_credentials = Some(credentials);
        self
    }

    /// Whether `TENCENTCLOUD_SECRET_ID` / `TENCENTCLOUD_SECRET_KEY` take
    /// precedence over explicit credentials (defaults to `true`).
    pub fn use_environment(mut self, enabled: bool) -> Self {
        self.use_environment = enabled;
        self
    }

    /// Region sent in `X-TC-Region` (defaults to `ap-guangzhou`).
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Override the endpoint (defaults to `https://hunyuan.tencentcloudapi.com`).
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Model for image calls (defaults to `hunyuan-vision`).
    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = model.into();
        self
    }

    /// Model used by script generation (defaults to `hunyuan-lite`).
    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    /// Set the HTTP request timeout (defaults to 60 seconds).
    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = d;
        self
    }

    /// Spacing and size limits for multi-image work.
    pub fn rate_policy(mut self, policy: RatePolicy) -> Self {
        self.rate_policy = policy;
        self
    }

    /// Replace the timer used between batch calls.
    pub fn pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    /// Largest image accepted for upload (defaults to 5 MiB).
    pub fn max_image_bytes(mut self, bytes: u64) -> Self {
        self.max_image_bytes = bytes;
        self
    }

    /// Build the [`Client`].
    ///
    /// Credentials are taken from the environment first, then from
    /// [`credentials`](Self::credentials), then from
    /// [`default_credentials`](Self::default_credentials).
    ///
    /// Returns [`HunyuanError::InvalidInput`] if no credentials are available
    /// or the endpoint is not an http(s) URL.
    pub fn build(self) -> Result<Client> {
        let mut credentials = if self.use_environment {
            Credentials::resolve(self.credentials, self.default_credentials)?
        } else {
            Credentials::resolve_with(|_| None, self.credentials, self.default_credentials)?
        };
        if let Some(region) = self.region {
            credentials = credentials.with_region(region);
        }
        if let Some(endpoint) = self.endpoint {
            credentials = credentials.with_endpoint(endpoint);
        }

        let (url, host) = parse_endpoint(credentials.endpoint())?;

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(HunyuanError::Http)?;

        Ok(Client {
            credentials,
            url,
            host,
            http,
            vision_model: self.vision_model,
            text_model: self.text_model,
            rate_policy: self.rate_policy,
            pacer: self.pacer,
            max_image_bytes: self.max_image_bytes,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for the Hunyuan `ChatCompletions` action.
///
/// Every call is signed with TC3-HMAC-SHA256 and sent once; nothing is
/// retried. Credentials are fixed for the lifetime of a value: use
/// [`with_credentials`](Self::with_credentials) to get a client with
/// different ones.
///
/// # Example
///
/// ```no_run
/// use hunyuan_video::{Client, Credentials};
///
/// # async fn example() -> hunyuan_video::Result<()> {
/// let client = Client::new(Credentials::new("AKID...", "secret"))?;
/// let result = client.analyze_image("photo.jpg", "What is in this picture?").await?;
/// println!("{} ({} tokens)", result.content, result.usage.total_tokens);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    credentials: Credentials,
    url: Url,
    host: String,
    http: reqwest::Client,
    vision_model: String,
    text_model: String,
    rate_policy: RatePolicy,
    pacer: Arc<dyn Pacer>,
    max_image_bytes: u64,
}

impl Client {
    /// Create a client from explicit credentials and default settings.
    ///
    /// Unlike [`ClientBuilder::build`], the environment is not consulted.
    pub fn new(credentials: Credentials) -> Result<Self> {
        ClientBuilder::new()
            .credentials(credentials)
            .use_environment(false)
            .build()
    }

    /// A copy of this client that signs with other credentials. `self` is
    /// left untouched.
    ///
    /// Returns [`HunyuanError::InvalidInput`] if the secret id or key is empty
    /// or the endpoint is not a usable URL.
    pub fn with_credentials(&self, credentials: Credentials) -> Result<Self> {
        credentials.validate()?;
        let (url, host) = parse_endpoint(credentials.endpoint())?;
        Ok(Self {
            credentials,
            url,
            host,
            ..self.clone()
        })
    }

    /// The credentials every request is signed with.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Model used for text-only calls such as script generation.
    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    /// Model used for image calls.
    pub fn vision_model(&self) -> &str {
        &self.vision_model
    }

    /// The pacing and size limits in effect.
    pub fn rate_policy(&self) -> &RatePolicy {
        &self.rate_policy
    }

    /// Describe one image.
    ///
    /// # Errors
    ///
    /// - [`HunyuanError::NotFound`] if the image does not exist.
    /// - [`HunyuanError::SizeLimitExceeded`] if it is over the size cap; no
    ///   request is sent.
    /// - [`HunyuanError::Upstream`] for an error envelope from the API.
    pub async fn analyze_image(
        &self,
        path: impl AsRef<Path>,
        prompt: &str,
    ) -> Result<AnalysisResult> {
        require_prompt(prompt)?;
        let image = self.encode_image(path.as_ref()).await?;
        let parts = vec![image_part(image), text_part(prompt)];
        self.send(&self.vision_model, ChatMessage::user_parts(parts)).await
    }

    /// Describe each image with its own call, one after another, pausing
    /// [`RatePolicy::interval`] between calls.
    ///
    /// A failing image does not stop the batch: its item carries the error,
    /// content starting with [`FAILED_ITEM_MARKER`] and zero usage. Items are
    /// in input order. Only invalid input fails the whole call.
    pub async fn analyze_image_batch<P: AsRef<Path>>(
        &self,
        paths: &[P],
        prompt: &str,
    ) -> Result<BatchAnalysis> {
        require_prompt(prompt)?;
        if paths.is_empty() {
            return Err(HunyuanError::InvalidInput("at least one image path is required".into()));
        }
        if paths.len() > self.rate_policy.max_batch_size {
            return Err(HunyuanError::InvalidInput(format!(
                "batch of {} images exceeds the limit of {}",
                paths.len(),
                self.rate_policy.max_batch_size
            )));
        }

        let mut items = Vec::with_capacity(paths.len());
        for (i, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            if i > 0 {
                self.pacer.pause(self.rate_policy.interval).await;
            }

            let item = match self.analyze_image(path, prompt).await {
                Ok(result) => BatchItem {
                    path: path.to_path_buf(),
                    result,
                    error: None,
                },
                Err(e) => {
                    warn!(
                        index = i,
                        path = %path.display(),
                        error = %e,
                        "image analysis failed, continuing batch"
                    );
                    BatchItem {
                        path: path.to_path_buf(),
                        result: AnalysisResult {
                            content: format!("{FAILED_ITEM_MARKER} {e}"),
                            ..Default::default()
                        },
                        error: Some(e.to_string()),
                    }
                }
            };
            items.push(item);
        }

        let batch = BatchAnalysis { items };
        info!(
            total = batch.len(),
            failed = batch.failed().count(),
            tokens = batch.total_usage().total_tokens,
            "image batch finished"
        );
        Ok(batch)
    }

    /// Describe several images with one call.
    ///
    /// Only the first [`RatePolicy::max_images_per_request`] paths are sent;
    /// the rest are listed in [`AnalysisResult::skipped_images`].
    pub async fn analyze_images_in_single_request<P: AsRef<Path>>(
        &self,
        paths: &[P],
        prompt: &str,
    ) -> Result<AnalysisResult> {
        require_prompt(prompt)?;
        if paths.is_empty() {
            return Err(HunyuanError::InvalidInput("at least one image path is required".into()));
        }

        let limit = self.rate_policy.max_images_per_request.max(1);
        let (sent, skipped) = paths.split_at(paths.len().min(limit));
        let skipped: Vec<PathBuf> = skipped.iter().map(|p| p.as_ref().to_path_buf()).collect();
        if !skipped.is_empty() {
            warn!(
                requested = paths.len(),
                sent = sent.len(),
                "too many images for one request, extra images skipped"
            );
        }

        let mut parts = Vec::with_capacity(sent.len() + 1);
        for path in sent {
            parts.push(image_part(self.encode_image(path.as_ref()).await?));
        }
        parts.push(text_part(prompt));

        let mut result = self
            .send(&self.vision_model, ChatMessage::user_parts(parts))
            .await?;
        result.skipped_images = skipped;
        Ok(result)
    }

    /// Text-only completion with the given model.
    pub async fn generate_text(&self, prompt: &str, model: &str) -> Result<AnalysisResult> {
        require_prompt(prompt)?;
        if model.trim().is_empty() {
            return Err(HunyuanError::InvalidInput("model must not be empty".into()));
        }
        self.send(model, ChatMessage::user_text(prompt)).await
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// Read an image and turn it into a `data:` URI, checking the size cap
    /// before reading.
    async fn encode_image(&self, path: &Path) -> Result<String> {
        if path.as_os_str().is_empty() {
            return Err(HunyuanError::InvalidInput("image path must not be empty".into()));
        }

        let meta = match tokio::fs::metadata(path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => {
                return Err(HunyuanError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HunyuanError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(HunyuanError::Io(e)),
        };

        if meta.len() > self.max_image_bytes {
            return Err(HunyuanError::SizeLimitExceeded {
                path: path.to_path_buf(),
                size: meta.len(),
                limit: self.max_image_bytes,
            });
        }

        let bytes = tokio::fs::read(path).await.map_err(HunyuanError::Io)?;
        Ok(format!("data:{};base64,{}", mime_type(path), STANDARD.encode(bytes)))
    }

    /// Sign and send one `ChatCompletions` call.
    async fn send(&self, model: &str, message: ChatMessage) -> Result<AnalysisResult> {
        let body = ChatRequest {
            model,
            messages: vec![message],
        };
        let payload = serde_json::to_vec(&body)?;

        let timestamp = chrono::Utc::now().timestamp();
        let signed = SignedRequest::new(&self.host, ACTION, API_VERSION, timestamp, payload);
        let authorization = signed.authorization(
            self.credentials.secret_id(),
            self.credentials.secret_key(),
            SERVICE,
        );
        let headers = self.headers(&authorization, timestamp)?;

        debug!(
            model,
            secret_id = %self.credentials.masked_id(),
            region = self.credentials.region(),
            bytes = signed.payload.len(),
            "sending signed request"
        );

        let response = self
            .http
            .post(self.url.clone())
            .headers(headers)
            .body(signed.payload)
            .send()
            .await
            .map_err(HunyuanError::Http)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(HunyuanError::Http)?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            return Err(HunyuanError::Api {
                status_code: status.as_u16(),
                message: self.credentials.scrub(text.trim()),
            });
        }

        let envelope: ApiEnvelope = serde_json::from_slice(&bytes).map_err(|e| {
            HunyuanError::InvalidResponse(format!("response body is not an API envelope: {e}"))
        })?;
        self.parse_response(envelope.response)
    }

    fn headers(&self, authorization: &str, timestamp: i64) -> Result<HeaderMap> {
        let value = |v: &str| {
            HeaderValue::from_str(v).map_err(|_| {
                HunyuanError::InvalidInput(
                    "credentials, region or host contain characters not allowed in HTTP headers"
                        .into(),
                )
            })
        };

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value(authorization)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        headers.insert(HOST, value(&self.host)?);
        headers.insert(HeaderName::from_static("x-tc-action"), HeaderValue::from_static(ACTION));
        headers.insert(
            HeaderName::from_static("x-tc-timestamp"),
            value(&timestamp.to_string())?,
        );
        headers.insert(
            HeaderName::from_static("x-tc-version"),
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(
            HeaderName::from_static("x-tc-region"),
            value(self.credentials.region())?,
        );
        Ok(headers)
    }

    /// Turn a parsed `Response` into a result or a classified upstream error.
    fn parse_response(&self, body: ResponseBody) -> Result<AnalysisResult> {
        if let Some(err) = body.error {
            let err = UpstreamError::new(
                err.code,
                self.credentials.scrub(&err.message),
                body.request_id,
            );
            warn!(
                code = %err.code,
                kind = ?err.kind,
                request_id = err.request_id.as_deref().unwrap_or("-"),
                "API returned an error"
            );
            return Err(err.into());
        }

        let choice = body.choices.into_iter().next().ok_or_else(|| {
            HunyuanError::InvalidResponse("response contained no choices".into())
        })?;

        Ok(AnalysisResult {
            content: choice.message.content,
            usage: body.usage.unwrap_or_default().into(),
            request_id: body.request_id,
            skipped_images: Vec::new(),
        })
    }
}

fn require_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(HunyuanError::InvalidInput("prompt must not be empty".into()));
    }
    Ok(())
}

fn image_part(data_uri: String) -> ContentPart {
    ContentPart::ImageUrl {
        image_url: ImageUrl { url: data_uri },
    }
}

fn text_part(text: &str) -> ContentPart {
    ContentPart::Text {
        text: text.to_string(),
    }
}

/// Split an endpoint into the URL to post to and the `Host` value to sign.
///
/// Only the root path can be used: the canonical request always signs `/`.
fn parse_endpoint(endpoint: &str) -> Result<(Url, String)> {
    let invalid = || HunyuanError::InvalidInput(format!("invalid endpoint URL: {endpoint:?}"));

    let url = Url::parse(endpoint).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    if url.path() != "/" || url.query().is_some() {
        return Err(HunyuanError::InvalidInput(format!(
            "endpoint must not carry a path or query, got {endpoint:?}"
        )));
    }
    let host = url.host_str().ok_or_else(invalid)?;
    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    Ok((url, host))
}

fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        _ => "image/jpeg",
    }
}
