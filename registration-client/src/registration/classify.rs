use super::types::{StatusCode, StatusOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Registration,
    Retrieval,
}

/// Maps an HTTP answer to the status taxonomy.
///
/// Registration: 201 succeeds, 4xx is an invalid request, anything else a
/// failed service request. Retrieval: 200 succeeds, 404 means the platform
/// must be reset and registered again, anything else is retried.
pub fn classify(kind: OperationKind, http_status: u16, provider_error: Option<&str>) -> StatusOutcome {
    let status = match kind {
        OperationKind::Registration => match http_status {
            201 => StatusCode::RebootNeeded,
            400..=499 => StatusCode::InvalidRegistrationRequest,
            _ => StatusCode::ServiceRequestFailed,
        },
        OperationKind::Retrieval => match http_status {
            200 => StatusCode::DirectlyRegistered,
            404 => StatusCode::ResetNeeded,
            _ => StatusCode::RetryNeeded,
        },
    };
    let provider_error = provider_error.filter(|code| !code.is_empty());
    StatusOutcome::with_http(status, http_status, provider_error)
}

/// Outcome for an attempt that never produced a response.
pub fn classify_transport_failure(err: &reqwest::Error) -> StatusOutcome {
    if err.is_timeout() || err.is_connect() {
        StatusOutcome::new(StatusCode::ConnectFailed)
    } else {
        StatusOutcome::new(StatusCode::UnknownError)
    }
}
