use super::certs::TrustConfig;
use super::classify::{classify, classify_transport_failure, OperationKind};
use super::config::{
    ClientConfig, ERROR_CODE_HEADER, IDLE_CONNECTION_TIMEOUT, MAX_IDLE_CONNECTIONS_PER_HOST,
};
use super::endpoints::EndpointPlan;
use super::errors::{OutcomeError, RegistrationError};
use super::types::{PlatformIdentity, PlatformManifest, StatusCode, StatusOutcome};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Response, Url};
use tracing::{debug, error, info, warn};

/// Talks to the registration and PCK services over one pooled, trust-configured transport.
pub struct RemoteRegistrationClient {
    http: reqwest::Client,
    endpoints: EndpointPlan,
}

impl RemoteRegistrationClient {
    /// Loads the trust roots named by `cfg` and builds the transport.
    pub fn new(cfg: &ClientConfig) -> Result<Self, RegistrationError> {
        let trust = TrustConfig::load(cfg.trust_roots_dir.as_deref())?;
        Self::with_trust(cfg, &trust)
    }

    pub fn with_trust(cfg: &ClientConfig, trust: &TrustConfig) -> Result<Self, RegistrationError> {
        let http = trust
            .apply(reqwest::Client::builder())
            .timeout(cfg.request_timeout)
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_HOST)
            .pool_idle_timeout(IDLE_CONNECTION_TIMEOUT)
            .build()
            .map_err(|e| {
                RegistrationError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;

        let endpoints = EndpointPlan::resolve(&cfg.caching_service_urls, &cfg.authoritative);
        if endpoints.caching_service_count() > 0 {
            info!(
                count = endpoints.caching_service_count(),
                "configuring PCCS endpoints for PCK retrieval"
            );
        }

        Ok(Self { http, endpoints })
    }

    /// Registers the platform with the authoritative service. Exactly one attempt.
    pub async fn register_platform(
        &self,
        manifest: &PlatformManifest,
    ) -> Result<StatusOutcome, OutcomeError> {
        let url = self.endpoints.registration_url();
        debug!(%url, manifest_len = manifest.len(), "attempting platform registration");

        let result = self.register_to_endpoint(url, manifest).await;
        match &result {
            Ok(_) => info!(%url, "platform registration successful"),
            Err(failure) => error!(
                %url,
                status = %failure.outcome.status,
                error = %failure.source,
                "platform registration failed"
            ),
        }
        result
    }

    async fn register_to_endpoint(
        &self,
        url: &str,
        manifest: &PlatformManifest,
    ) -> Result<StatusOutcome, OutcomeError> {
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(manifest.as_bytes().to_vec())
            .send()
            .await
            .map_err(|e| transport_failure(url, e))?;

        classify_response(OperationKind::Registration, url, &response, StatusCode::RebootNeeded)
    }

    /// Fetches the PCK certificate, trying each retrieval endpoint in order.
    ///
    /// Returns on the first success. When every endpoint fails, the failure of
    /// the last (most authoritative) attempt is returned.
    pub async fn retrieve_pck(
        &self,
        identity: &PlatformIdentity,
    ) -> Result<StatusOutcome, OutcomeError> {
        let endpoints = self.endpoints.retrieval();
        let mut last_failure = None;

        for (idx, endpoint) in endpoints.iter().enumerate() {
            let attempt = idx + 1;
            debug!(
                url = %endpoint.url,
                endpoint_type = %endpoint.kind,
                attempt,
                "attempting PCK retrieval"
            );

            match self.retrieve_from_endpoint(&endpoint.url, identity).await {
                Ok(outcome) => {
                    info!(
                        url = %endpoint.url,
                        endpoint_type = %endpoint.kind,
                        attempt,
                        "PCK retrieval successful"
                    );
                    return Ok(outcome);
                }
                Err(failure) => {
                    if attempt < endpoints.len() {
                        warn!(
                            url = %endpoint.url,
                            endpoint_type = %endpoint.kind,
                            attempt,
                            status = %failure.outcome.status,
                            error = %failure.source,
                            "PCK retrieval failed, trying next endpoint"
                        );
                    }
                    last_failure = Some(failure);
                }
            }
        }

        let failure = last_failure.unwrap_or_else(|| {
            OutcomeError::new(
                StatusOutcome::new(StatusCode::UnknownError),
                RegistrationError::InvalidRequest("no PCK retrieval endpoint configured".into()),
            )
        });
        error!(
            attempts = endpoints.len(),
            status = %failure.outcome.status,
            error = %failure.source,
            "PCK retrieval failed on all endpoints"
        );
        Err(failure)
    }

    async fn retrieve_from_endpoint(
        &self,
        base_url: &str,
        identity: &PlatformIdentity,
    ) -> Result<StatusOutcome, OutcomeError> {
        let url = pck_request_url(base_url, identity).map_err(|source| {
            OutcomeError::new(StatusOutcome::new(StatusCode::UnknownError), source)
        })?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transport_failure(base_url, e))?;

        classify_response(OperationKind::Retrieval, base_url, &response, StatusCode::DirectlyRegistered)
    }
}

/// Appends the platform identifiers to a retrieval base URL.
fn pck_request_url(base_url: &str, identity: &PlatformIdentity) -> Result<Url, RegistrationError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| RegistrationError::InvalidRequest(format!("invalid URL {base_url}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("encrypted_ppid", &identity.encrypted_ppid)
        .append_pair("pceid", &identity.pce_id);
    Ok(url)
}

fn classify_response(
    kind: OperationKind,
    url: &str,
    response: &Response,
    success: StatusCode,
) -> Result<StatusOutcome, OutcomeError> {
    let status = response.status().as_u16();
    let error_code = response
        .headers()
        .get(ERROR_CODE_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let outcome = classify(kind, status, error_code.as_deref());
    if outcome.status == success {
        return Ok(outcome);
    }
    Err(OutcomeError::new(
        outcome,
        RegistrationError::Rejected {
            url: url.to_string(),
            status,
            error_code,
        },
    ))
}

fn transport_failure(url: &str, err: reqwest::Error) -> OutcomeError {
    let outcome = classify_transport_failure(&err);
    let url = url.to_string();
    let source = if err.is_builder() {
        RegistrationError::InvalidRequest(format!("{url}: {err}"))
    } else if outcome.status == StatusCode::ConnectFailed {
        RegistrationError::Connect { url, source: err }
    } else {
        RegistrationError::Transport { url, source: err }
    };
    OutcomeError::new(outcome, source)
}
