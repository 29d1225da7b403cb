//! Transport helpers shared by the reqwest-backed provider adapters.
//!
//! Each adapter converts an [`HttpFailure`] into its own port error, so the
//! status mapping is identical across providers.

use reqwest::StatusCode;
use url::Url;

const PREVIEW_CHAR_LIMIT: usize = 160;

/// Category of an HTTP-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HttpFailureKind {
    /// Connection, TLS, or server-side failure.
    Transport,
    /// Client timeout or a timeout status from the provider.
    Timeout,
    /// Provider throttled the caller.
    RateLimited,
    /// Provider rejected the request itself.
    InvalidRequest,
}

/// Classified failure with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HttpFailure {
    pub(crate) kind: HttpFailureKind,
    pub(crate) message: String,
}

impl HttpFailure {
    pub(crate) fn from_transport(error: &reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            HttpFailureKind::Timeout
        } else {
            HttpFailureKind::Transport
        };
        Self {
            kind,
            message: error.to_string(),
        }
    }

    pub(crate) fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let preview = body_preview(body);
        let message = if preview.is_empty() {
            format!("status {}", status.as_u16())
        } else {
            format!("status {}: {}", status.as_u16(), preview)
        };
        let kind = match status {
            StatusCode::TOO_MANY_REQUESTS => HttpFailureKind::RateLimited,
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => HttpFailureKind::Timeout,
            _ if status.is_client_error() => HttpFailureKind::InvalidRequest,
            _ => HttpFailureKind::Transport,
        };
        Self { kind, message }
    }
}

/// Whitespace-collapsed, length-capped view of a response body.
pub(crate) fn body_preview(body: &[u8]) -> String {
    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

/// Resolve `path` beneath `base`, treating `base` as a directory.
pub(crate) fn endpoint_url(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let directory = format!("{}/", base.path());
        base.set_path(&directory);
    }
    base.join(path)
}
