pub mod checker;
pub mod classify;
pub mod config;
pub mod endpoints;
pub mod errors;
pub mod platform;
pub mod scheduler;
pub mod types;

mod certs;
mod client;

pub use certs::TrustConfig;
pub use checker::{RegistrationCheck, RegistrationChecker};
pub use classify::{classify, classify_transport_failure, OperationKind};
pub use client::RemoteRegistrationClient;
pub use config::{AuthoritativeEndpoints, ClientConfig};
pub use endpoints::{EndpointKind, EndpointPlan, RetrievalEndpoint};
pub use errors::{OutcomeError, PlatformError, RegistrationError, SinkError};
pub use platform::{PlatformProvider, PlatformSession};
pub use scheduler::{MetricsSink, Scheduler};
pub use types::{PlatformIdentity, PlatformManifest, StatusCode, StatusOutcome};
