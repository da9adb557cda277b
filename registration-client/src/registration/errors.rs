use super::types::StatusOutcome;
use thiserror::Error;

#[derive(Debug, Error)]
/// Failure taxonomy for one registration or retrieval cycle.
pub enum RegistrationError {
    /// Bad trust-root path or content. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The platform-identity collaborator could not serve the request.
    #[error("platform interface unavailable: {0}")]
    PlatformUnavailable(#[from] PlatformError),
    #[error("connection to {url} failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered HTTP {status}{}", error_code_suffix(.error_code))]
    Rejected {
        url: String,
        status: u16,
        error_code: Option<String>,
    },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Remote registration succeeded but the local completion flag was not persisted.
    #[error("registration accepted but completion could not be persisted: {0}")]
    LocalPersist(#[source] PlatformError),
}

fn error_code_suffix(code: &Option<String>) -> String {
    match code {
        Some(code) => format!(" (error code {code})"),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
/// Opaque diagnostic reported by the platform-identity collaborator, kept verbatim.
pub struct PlatformError(pub String);

impl PlatformError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[derive(Debug, Error)]
#[error("metrics sink: {0}")]
pub struct SinkError(pub String);

#[derive(Debug, Error)]
#[error("{}: {source}", .outcome.status)]
/// A non-success outcome together with the error that produced it.
///
/// Callers must forward `outcome` to the metrics sink even on failure.
pub struct OutcomeError {
    pub outcome: StatusOutcome,
    #[source]
    pub source: RegistrationError,
}

impl OutcomeError {
    pub fn new(outcome: StatusOutcome, source: RegistrationError) -> Self {
        Self { outcome, source }
    }
}
