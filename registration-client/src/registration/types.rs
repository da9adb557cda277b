use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Closed status taxonomy reported to the metrics sink after every cycle.
pub enum StatusCode {
    /// Startup state, before the first cycle completes.
    Pending,
    /// Registration accepted (HTTP 201); the host must reboot.
    RebootNeeded,
    /// PCK certificate retrieved (HTTP 200).
    DirectlyRegistered,
    InvalidRegistrationRequest,
    ServiceRequestFailed,
    /// Registration invalidated upstream (HTTP 404 on retrieval).
    ResetNeeded,
    RetryNeeded,
    ConnectFailed,
    UnknownError,
    PlatformInterfaceUnavailable,
    LocalPersistFailed,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Pending => "Pending",
            StatusCode::RebootNeeded => "RebootNeeded",
            StatusCode::DirectlyRegistered => "DirectlyRegistered",
            StatusCode::InvalidRegistrationRequest => "InvalidRegistrationRequest",
            StatusCode::ServiceRequestFailed => "ServiceRequestFailed",
            StatusCode::ResetNeeded => "ResetNeeded",
            StatusCode::RetryNeeded => "RetryNeeded",
            StatusCode::ConnectFailed => "ConnectFailed",
            StatusCode::UnknownError => "UnknownError",
            StatusCode::PlatformInterfaceUnavailable => "PlatformInterfaceUnavailable",
            StatusCode::LocalPersistFailed => "LocalPersistFailed",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of one attempt. Created fresh per attempt and never mutated.
pub struct StatusOutcome {
    pub status: StatusCode,
    /// Raw HTTP status code as text, absent when no response was obtained.
    pub http_status: Option<String>,
    /// Value of the provider's `Error-Code` header, if any.
    pub provider_error: Option<String>,
}

impl StatusOutcome {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            http_status: None,
            provider_error: None,
        }
    }

    pub fn with_http(status: StatusCode, http_status: u16, provider_error: Option<&str>) -> Self {
        Self {
            status,
            http_status: Some(http_status.to_string()),
            provider_error: provider_error.map(str::to_string),
        }
    }

    pub fn pending() -> Self {
        Self::new(StatusCode::Pending)
    }
}

impl fmt::Display for StatusOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        if let Some(http) = &self.http_status {
            write!(f, " (http {http}")?;
            if let Some(code) = &self.provider_error {
                write!(f, ", error code {code}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

#[derive(Clone, PartialEq, Eq)]
/// Opaque registration manifest produced by the platform. Never inspected here.
pub struct PlatformManifest(Vec<u8>);

impl PlatformManifest {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PlatformManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlatformManifest({} bytes)", self.0.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// Hex-encoded platform identifiers used as PCK lookup keys.
pub struct PlatformIdentity {
    /// Encrypted platform provisioning ID.
    pub encrypted_ppid: String,
    /// Provisioning certification enclave ID.
    pub pce_id: String,
    #[serde(default)]
    pub pce_isv_svn: String,
    #[serde(default)]
    pub qe_id: String,
    #[serde(default)]
    pub cpu_svn: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_display_includes_http_details() {
        let outcome = StatusOutcome::with_http(StatusCode::ResetNeeded, 404, Some("NoCert"));
        assert_eq!(outcome.to_string(), "ResetNeeded (http 404, error code NoCert)");
        assert_eq!(StatusOutcome::pending().to_string(), "Pending");
    }

    #[test]
    fn manifest_debug_hides_payload() {
        let manifest = PlatformManifest::new(vec![0xAA; 32]);
        assert_eq!(format!("{manifest:?}"), "PlatformManifest(32 bytes)");
    }

    #[test]
    fn identity_deserializes_with_optional_fields() {
        let identity: PlatformIdentity =
            serde_json::from_str(r#"{"encrypted_ppid":"abcd","pce_id":"0000"}"#).unwrap();
        assert_eq!(identity.encrypted_ppid, "abcd");
        assert!(identity.qe_id.is_empty());
    }
}
