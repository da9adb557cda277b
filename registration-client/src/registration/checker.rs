use super::client::RemoteRegistrationClient;
use super::errors::{OutcomeError, PlatformError, RegistrationError};
use super::platform::{PlatformProvider, PlatformSession};
use super::types::{StatusCode, StatusOutcome};
use async_trait::async_trait;
use tracing::{debug, info};

/// One registration-status check, as driven by the [`Scheduler`](super::Scheduler).
#[async_trait]
pub trait RegistrationCheck: Send + Sync {
    async fn check(&self) -> Result<StatusOutcome, OutcomeError>;
}

/// Decides between registering the platform and retrieving its PCK certificate.
///
/// Holds no state between cycles: the platform's registration flag is queried
/// fresh every time, so external changes are picked up on the next check.
pub struct RegistrationChecker<P> {
    platform: P,
    client: RemoteRegistrationClient,
}

impl<P: PlatformProvider> RegistrationChecker<P> {
    pub fn new(platform: P, client: RemoteRegistrationClient) -> Self {
        Self { platform, client }
    }

    async fn register(&self, session: &mut P::Session) -> Result<StatusOutcome, OutcomeError> {
        let manifest = session.build_manifest().map_err(platform_unavailable)?;
        debug!(manifest_len = manifest.len(), "platform not registered, submitting manifest");

        let outcome = self.client.register_platform(&manifest).await?;
        if outcome.status == StatusCode::RebootNeeded {
            session.mark_registration_complete().map_err(|e| {
                OutcomeError::new(
                    StatusOutcome::new(StatusCode::LocalPersistFailed),
                    RegistrationError::LocalPersist(e),
                )
            })?;
            info!("registration complete, reboot required to take effect");
        }
        Ok(outcome)
    }

    async fn retrieve(&self, session: &mut P::Session) -> Result<StatusOutcome, OutcomeError> {
        let identity = session.read_identity().map_err(platform_unavailable)?;
        self.client.retrieve_pck(&identity).await
    }
}

#[async_trait]
impl<P: PlatformProvider> RegistrationCheck for RegistrationChecker<P> {
    async fn check(&self) -> Result<StatusOutcome, OutcomeError> {
        let mut session = self.platform.open().map_err(platform_unavailable)?;
        let registered = session.is_registered().map_err(platform_unavailable)?;
        debug!(registered, "queried platform registration state");

        if registered {
            self.retrieve(&mut session).await
        } else {
            self.register(&mut session).await
        }
    }
}

fn platform_unavailable(err: PlatformError) -> OutcomeError {
    OutcomeError::new(
        StatusOutcome::new(StatusCode::PlatformInterfaceUnavailable),
        RegistrationError::PlatformUnavailable(err),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::config::ClientConfig;
    use crate::registration::types::{PlatformIdentity, PlatformManifest};

    struct BrokenPlatform {
        open_error: Option<&'static str>,
    }

    struct BrokenSession;

    impl PlatformProvider for BrokenPlatform {
        type Session = BrokenSession;

        fn open(&self) -> Result<BrokenSession, PlatformError> {
            match self.open_error {
                Some(msg) => Err(PlatformError::new(msg)),
                None => Ok(BrokenSession),
            }
        }
    }

    impl PlatformSession for BrokenSession {
        fn is_registered(&mut self) -> Result<bool, PlatformError> {
            Err(PlatformError::new("SGX API is unavailable"))
        }

        fn build_manifest(&mut self) -> Result<PlatformManifest, PlatformError> {
            unreachable!("state query fails first")
        }

        fn mark_registration_complete(&mut self) -> Result<(), PlatformError> {
            unreachable!("state query fails first")
        }

        fn read_identity(&mut self) -> Result<PlatformIdentity, PlatformError> {
            unreachable!("state query fails first")
        }
    }

    fn checker(open_error: Option<&'static str>) -> RegistrationChecker<BrokenPlatform> {
        let client = RemoteRegistrationClient::new(&ClientConfig::default()).expect("client");
        RegistrationChecker::new(BrokenPlatform { open_error }, client)
    }

    #[tokio::test]
    async fn state_query_failure_short_circuits_with_diagnostic() {
        let failure = checker(None).check().await.unwrap_err();
        assert_eq!(failure.outcome.status, StatusCode::PlatformInterfaceUnavailable);
        assert_eq!(failure.outcome.http_status, None);
        match failure.source {
            RegistrationError::PlatformUnavailable(e) => assert_eq!(e.0, "SGX API is unavailable"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn open_failure_is_platform_unavailable() {
        let failure = checker(Some("The Enclave could not be created"))
            .check()
            .await
            .unwrap_err();
        assert_eq!(failure.outcome.status, StatusCode::PlatformInterfaceUnavailable);
        assert!(failure.to_string().contains("The Enclave could not be created"));
    }
}
