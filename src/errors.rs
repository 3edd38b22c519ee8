use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::redact::sanitize_param;

/// All errors that can occur when sampling frames or calling the Hunyuan API.
#[derive(Error, Debug)]
pub enum HunyuanError {
    /// A required parameter is missing or out of range. Raised before any I/O.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced file does not exist.
    #[error("file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// An image is larger than the configured upload cap.
    #[error("{} is {size} bytes, over the {limit} byte limit", .path.display())]
    SizeLimitExceeded {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    /// The decode/probe subprocess failed.
    #[error("{tool} failed ({kind}): {message}")]
    Tool {
        tool: &'static str,
        kind: ToolErrorKind,
        message: String,
    },

    /// Several captures in a row failed before any frame succeeded.
    #[error("frame extraction aborted after {attempted} consecutive failures, no frame captured")]
    ExtractionAborted {
        attempted: usize,
        failures: Vec<String>,
    },

    /// Every capture failed.
    #[error("no frames could be extracted from {attempted} timestamps")]
    NoFramesExtracted {
        attempted: usize,
        failures: Vec<String>,
    },

    /// A transport-level HTTP error from reqwest.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("HTTP {status_code}: {message}")]
    Api { status_code: u16, message: String },

    /// A 2xx body that is neither a success nor an error envelope.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// An error envelope returned by the API.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// An I/O error, typically from reading a local file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenience alias for `Result<T, HunyuanError>`.
pub type Result<T> = std::result::Result<T, HunyuanError>;

/// Why a decoder subprocess failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    InvalidData,
    Permission,
    NotInstalled,
    Timeout,
    InvalidSeek,
    DiskFull,
    Other,
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidData => "invalid data",
            Self::Permission => "permission denied",
            Self::NotInstalled => "not installed",
            Self::Timeout => "timed out",
            Self::InvalidSeek => "invalid seek position",
            Self::DiskFull => "disk full",
            Self::Other => "failed",
        };
        f.write_str(s)
    }
}

/// Classification of an API error code. Decided once when the envelope is
/// parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    ServiceNotActivated,
    AuthFailure,
    RateLimited,
    InvalidParameter,
    ResourceNotFound,
    Unknown,
}

impl UpstreamErrorKind {
    /// Map a Tencent Cloud error code (`AuthFailure.SignatureFailure`,
    /// `RequestLimitExceeded`, ...) to its kind.
    pub fn from_code(code: &str) -> Self {
        let family = code.split('.').next().unwrap_or(code);
        if code.ends_with("ServiceNotActivated") || code == "FailedOperation.ServiceStop" {
            return Self::ServiceNotActivated;
        }
        match family {
            "AuthFailure" => Self::AuthFailure,
            "RequestLimitExceeded" | "LimitExceeded" => Self::RateLimited,
            "InvalidParameter" | "InvalidParameterValue" | "MissingParameter" => {
                Self::InvalidParameter
            }
            "ResourceNotFound" => Self::ResourceNotFound,
            _ => Self::Unknown,
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            Self::ServiceNotActivated => "Hunyuan service is not activated",
            Self::AuthFailure => "request authentication failed",
            Self::RateLimited => "request rate limit exceeded",
            Self::InvalidParameter => "request parameters were rejected",
            Self::ResourceNotFound => "requested resource does not exist",
            Self::Unknown => "unknown upstream error",
        }
    }

    fn remediation(&self) -> &'static str {
        match self {
            Self::ServiceNotActivated => {
                "Activate the Hunyuan large model service for this account \
                 in the Tencent Cloud console."
            }
            Self::AuthFailure => {
                "Check TENCENTCLOUD_SECRET_ID and TENCENTCLOUD_SECRET_KEY, and make sure the \
                 system clock is accurate: signatures older than five minutes are refused."
            }
            Self::RateLimited => {
                "Lower the request rate: raise the batch interval or retry later."
            }
            Self::InvalidParameter => {
                "Check the model name, prompt length and image formats sent with the request."
            }
            Self::ResourceNotFound => {
                "Check that the model exists and is available in the configured region."
            }
            Self::Unknown => "Quote the request id when contacting Tencent Cloud support.",
        }
    }
}

/// The `Response.Error` envelope of a failed API call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "{} (code {code}, request {}): {message}",
    .kind.summary(),
    .request_id.as_deref().unwrap_or("-")
)]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

impl UpstreamError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        request_id: Option<String>,
    ) -> Self {
        let code = code.into();
        Self {
            kind: UpstreamErrorKind::from_code(&code),
            code,
            message: message.into(),
            request_id,
        }
    }
}

/// Coarse error families, used to choose remediation text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InputValidation,
    ResourceNotFound,
    ExternalTool,
    Transport,
    UpstreamApplication,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InputValidation => "input validation",
            Self::ResourceNotFound => "resource not found",
            Self::ExternalTool => "external tool",
            Self::Transport => "transport",
            Self::UpstreamApplication => "upstream application",
        };
        f.write_str(s)
    }
}

const LIKELY_EXTRACTION_CAUSES: &str = "Likely causes: ffmpeg is misconfigured or too old, \
the source is corrupt or uses an unsupported codec, or the output directory is not writable.";

impl HunyuanError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput(_) | Self::SizeLimitExceeded { .. } => {
                ErrorCategory::InputValidation
            }
            Self::NotFound { .. } | Self::Io(_) => ErrorCategory::ResourceNotFound,
            Self::Tool { .. } | Self::ExtractionAborted { .. } | Self::NoFramesExtracted { .. } => {
                ErrorCategory::ExternalTool
            }
            Self::Http(_) | Self::Api { .. } | Self::InvalidResponse(_) | Self::Json(_) => {
                ErrorCategory::Transport
            }
            Self::Upstream(_) => ErrorCategory::UpstreamApplication,
        }
    }

    /// What the user can do about it.
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => {
                "Frame counts must be positive, quality must lie in 1-100 \
                 and every path must be non-empty."
            }
            Self::SizeLimitExceeded { .. } => {
                "Downscale or recompress the image, or lower the frame quality."
            }
            Self::NotFound { .. } | Self::Io(_) => {
                "Verify the path exists and is readable (and the output directory \
                 writable) by this process."
            }
            Self::Tool { kind, .. } => match kind {
                ToolErrorKind::NotInstalled => {
                    "Install ffmpeg (it ships ffprobe) and make sure both binaries are on PATH."
                }
                ToolErrorKind::InvalidData => {
                    "The container looks corrupt or has no video stream; \
                     re-encode it or try another file."
                }
                ToolErrorKind::Permission => {
                    "Grant read access to the video and write access to the output directory."
                }
                ToolErrorKind::Timeout => {
                    "The decoder did not finish in time; try a local copy or a shorter video."
                }
                ToolErrorKind::InvalidSeek => {
                    "The timestamp is outside the playable range; request fewer frames."
                }
                ToolErrorKind::DiskFull => "Free space in the output directory.",
                ToolErrorKind::Other => "Run the ffmpeg command by hand to see its full output.",
            },
            Self::ExtractionAborted { .. } | Self::NoFramesExtracted { .. } => {
                LIKELY_EXTRACTION_CAUSES
            }
            Self::Http(_) | Self::Api { .. } => {
                "Check network connectivity to the endpoint and any proxy settings, then retry."
            }
            Self::InvalidResponse(_) | Self::Json(_) => {
                "The endpoint returned an unexpected body; check the endpoint URL and API version."
            }
            Self::Upstream(e) => e.kind.remediation(),
        }
    }

    /// The upstream error kind, if this error came from an API envelope.
    pub fn upstream_kind(&self) -> Option<UpstreamErrorKind> {
        match self {
            Self::Upstream(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Build the user-facing failure text: a summary, the sanitized input
    /// parameters and the remediation for this category.
    pub fn report(&self, params: &[(&str, &str)]) -> String {
        let mut out = format!("Error ({}): {}\n", self.category(), self);

        if let Self::ExtractionAborted { failures, .. } | Self::NoFramesExtracted { failures, .. } =
            self
        {
            for failure in failures {
                out.push_str(&format!("  - {failure}\n"));
            }
        }

        if !params.is_empty() {
            out.push_str("Parameters:\n");
            for (name, value) in params {
                out.push_str(&format!("  {name}: {}\n", sanitize_param(name, value)));
            }
        }

        out.push_str("Suggestion: ");
        out.push_str(self.remediation());
        out
    }
}
