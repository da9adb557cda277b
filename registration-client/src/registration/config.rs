use std::{path::PathBuf, time::Duration};

/// Intel platform registration endpoint. Registrations never go anywhere else.
pub const INTEL_REGISTRATION_URL: &str =
    "https://api.trustedservices.intel.com/sgx/registration/v1/platform";
/// Intel PCK certificate endpoint, always the last retrieval attempt.
pub const INTEL_PCK_RETRIEVAL_URL: &str =
    "https://api.trustedservices.intel.com/sgx/certification/v4/pckcert";
/// Path appended to every caching-service (PCCS) base URL.
pub const PCCS_RETRIEVAL_PATH: &str = "/sgx/certification/v4/pckcerts";

/// Upper bound for a single HTTP attempt (not for a whole fallback chain).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(90);
pub const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 2;

/// Response header carrying the provider-specific error code.
pub const ERROR_CODE_HEADER: &str = "Error-Code";

#[derive(Debug, Clone, PartialEq, Eq)]
/// The single authoritative service, used for registration and as final PCK fallback.
pub struct AuthoritativeEndpoints {
    pub registration_url: String,
    pub pck_retrieval_url: String,
}

impl Default for AuthoritativeEndpoints {
    fn default() -> Self {
        Self {
            registration_url: INTEL_REGISTRATION_URL.to_string(),
            pck_retrieval_url: INTEL_PCK_RETRIEVAL_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
/// Parameters for building a [`RemoteRegistrationClient`](super::RemoteRegistrationClient).
pub struct ClientConfig {
    /// Caching-service base URLs, already validated as HTTPS and without trailing slash.
    pub caching_service_urls: Vec<String>,
    /// Directory of extra PEM trust roots; `None` means system roots only.
    pub trust_roots_dir: Option<PathBuf>,
    pub authoritative: AuthoritativeEndpoints,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            caching_service_urls: Vec::new(),
            trust_roots_dir: None,
            authoritative: AuthoritativeEndpoints::default(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}
