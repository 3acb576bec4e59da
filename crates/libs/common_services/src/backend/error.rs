use http::StatusCode;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Status codes that mean the request never reached a healthy backend.
const TRANSIENT_STATUSES: [StatusCode; 4] = [
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// What kind of failure the backend reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    NotFound,
    /// Unique, foreign key or check constraint violation.
    Conflict,
    PermissionDenied,
    /// The queried table does not exist.
    UndefinedRelation,
    Other,
}

/// A failure reported by the backend itself. Never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFailure {
    pub kind: BackendErrorKind,
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
}

impl BackendFailure {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: BackendErrorKind::NotFound,
            status: StatusCode::NOT_FOUND.as_u16(),
            code: None,
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self {
            kind: BackendErrorKind::PermissionDenied,
            status: StatusCode::FORBIDDEN.as_u16(),
            code: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{:?} ({}, {code}): {}", self.kind, self.status, self.message),
            None => write!(f, "{:?} ({}): {}", self.kind, self.status, self.message),
        }
    }
}

/// Every failure this layer can produce. Errors are classified once, where they are first observed.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("Network error: {0}")]
    TransientNetwork(String),

    #[error("Backend error: {0}")]
    Backend(BackendFailure),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("{label} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        label: String,
        attempts: u32,
        last: Box<DataError>,
    },
}

impl DataError {
    /// Only network-class failures are worth another attempt.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork(_))
    }

    #[must_use]
    pub fn backend_kind(&self) -> Option<BackendErrorKind> {
        match self {
            Self::Backend(failure) => Some(failure.kind),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.backend_kind() == Some(BackendErrorKind::NotFound)
    }

    /// Classify a failure raised by the HTTP client before a response was read.
    #[must_use]
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Validation(format!("Invalid request: {err}"))
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            // connect, timeout, reset, body and generic request failures
            Self::TransientNetwork(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<url::ParseError> for DataError {
    fn from(err: url::ParseError) -> Self {
        Self::Configuration(format!("Invalid backend URL: {err}"))
    }
}

/// Error body as returned by the REST and storage APIs. Every field is optional, the two
/// APIs disagree on the shape.
#[derive(Debug, Deserialize, Default)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

/// Turn a non-success response into a [`DataError`].
#[must_use]
pub fn classify_response(status: StatusCode, body: &[u8]) -> DataError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.error)
        .or(parsed.details)
        .unwrap_or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                text
            }
        });

    if TRANSIENT_STATUSES.contains(&status) {
        return DataError::TransientNetwork(format!("{status}: {message}"));
    }

    let kind = parsed
        .code
        .as_deref()
        .and_then(kind_from_code)
        .unwrap_or_else(|| kind_from_status(status));

    DataError::Backend(BackendFailure {
        kind,
        status: status.as_u16(),
        code: parsed.code,
        message,
    })
}

fn kind_from_code(code: &str) -> Option<BackendErrorKind> {
    match code {
        "PGRST116" => Some(BackendErrorKind::NotFound),
        "23505" | "23503" | "23514" | "23502" => Some(BackendErrorKind::Conflict),
        "42501" => Some(BackendErrorKind::PermissionDenied),
        "42P01" | "PGRST205" => Some(BackendErrorKind::UndefinedRelation),
        _ => None,
    }
}

fn kind_from_status(status: StatusCode) -> BackendErrorKind {
    match status {
        StatusCode::NOT_FOUND => BackendErrorKind::NotFound,
        StatusCode::CONFLICT => BackendErrorKind::Conflict,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendErrorKind::PermissionDenied,
        _ => BackendErrorKind::Other,
    }
}
