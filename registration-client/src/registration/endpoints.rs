use super::config::{AuthoritativeEndpoints, PCCS_RETRIEVAL_PATH};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// A PCK caching service (PCCS).
    CachingService,
    Authoritative,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::CachingService => "pccs",
            EndpointKind::Authoritative => "intel",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalEndpoint {
    pub url: String,
    pub kind: EndpointKind,
}

/// Where each operation is sent.
///
/// Registration always targets the authoritative service. Retrieval tries the
/// caching services in configured order and then the authoritative service,
/// so the sequence is never empty and always ends with the authoritative URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPlan {
    registration_url: String,
    retrieval: Vec<RetrievalEndpoint>,
}

impl EndpointPlan {
    pub fn resolve(caching_service_urls: &[String], authoritative: &AuthoritativeEndpoints) -> Self {
        let retrieval = caching_service_urls
            .iter()
            .map(|base| RetrievalEndpoint {
                url: format!("{base}{PCCS_RETRIEVAL_PATH}"),
                kind: EndpointKind::CachingService,
            })
            .chain(std::iter::once(RetrievalEndpoint {
                url: authoritative.pck_retrieval_url.clone(),
                kind: EndpointKind::Authoritative,
            }))
            .collect();

        Self {
            registration_url: authoritative.registration_url.clone(),
            retrieval,
        }
    }

    pub fn registration_url(&self) -> &str {
        &self.registration_url
    }

    pub fn retrieval(&self) -> &[RetrievalEndpoint] {
        &self.retrieval
    }

    pub fn caching_service_count(&self) -> usize {
        self.retrieval.len() - 1
    }
}
