use crate::registration::errors::RegistrationError;
use reqwest::tls::Version;
use reqwest::{Certificate, ClientBuilder};
use rustls_pemfile as pemfile;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use x509_parser::prelude::*;

/// File suffixes scanned in a custom trust-root directory.
const CERT_EXTENSIONS: &[&str] = &["crt", "pem"];

/// One operator-supplied root certificate.
#[derive(Clone)]
struct CustomRoot {
    file: PathBuf,
    subject: String,
    cert: Certificate,
}

/// TLS trust for every outbound call: system roots plus optional operator roots.
///
/// Immutable once built. The minimum negotiated protocol version is TLS 1.2.
#[derive(Clone)]
pub struct TrustConfig {
    min_tls_version: Version,
    custom_roots: Vec<CustomRoot>,
}

impl TrustConfig {
    /// Trust the system root store only.
    pub fn system_only() -> Self {
        Self {
            min_tls_version: Version::TLS_1_2,
            custom_roots: Vec::new(),
        }
    }

    /// Builds the trust configuration, failing closed when a custom directory is
    /// configured but yields no usable certificate.
    pub fn load(dir: Option<&Path>) -> Result<Self, RegistrationError> {
        let dir = match dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => {
                debug!("using system CA bundle only (no custom CA configured)");
                return Ok(Self::system_only());
            }
        };

        let meta = fs::metadata(dir).map_err(|e| {
            RegistrationError::Configuration(format!(
                "failed to access CA certificate path {}: {e}",
                dir.display()
            ))
        })?;
        if !meta.is_dir() {
            return Err(RegistrationError::Configuration(format!(
                "CA certificate path must be a directory, got file: {}",
                dir.display()
            )));
        }

        debug!(path = %dir.display(), "loading custom CA certificates from directory");
        let entries = fs::read_dir(dir).map_err(|e| {
            RegistrationError::Configuration(format!(
                "failed to read CA certificate directory {}: {e}",
                dir.display()
            ))
        })?;

        let mut custom_roots = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(error = %e, "failed to read directory entry, skipping");
                    continue;
                }
            };
            if !path.is_file() || !has_cert_extension(&path) {
                continue;
            }
            match load_pem_roots(&path) {
                Ok(mut roots) => custom_roots.append(&mut roots),
                Err(reason) => {
                    warn!(file = %path.display(), %reason, "failed to load CA certificate, skipping")
                }
            }
        }

        if custom_roots.is_empty() {
            return Err(RegistrationError::Configuration(format!(
                "no valid CA certificates found in directory {}",
                dir.display()
            )));
        }

        info!(
            custom_certs = custom_roots.len(),
            "TLS configured with system CA pool + custom CA certificates"
        );
        Ok(Self {
            min_tls_version: Version::TLS_1_2,
            custom_roots,
        })
    }

    pub fn custom_root_count(&self) -> usize {
        self.custom_roots.len()
    }

    /// Subjects of the operator-supplied roots, in load order.
    pub fn custom_root_subjects(&self) -> impl Iterator<Item = &str> {
        self.custom_roots.iter().map(|root| root.subject.as_str())
    }

    /// Installs this trust configuration on a reqwest client builder.
    pub fn apply(&self, builder: ClientBuilder) -> ClientBuilder {
        let mut builder = builder
            .use_rustls_tls()
            .tls_built_in_native_certs(true)
            .min_tls_version(self.min_tls_version);
        for root in &self.custom_roots {
            builder = builder.add_root_certificate(root.cert.clone());
        }
        builder
    }
}

impl fmt::Debug for TrustConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustConfig")
            .field("min_tls_version", &self.min_tls_version)
            .field(
                "custom_roots",
                &self
                    .custom_roots
                    .iter()
                    .map(|root| (root.file.display().to_string(), root.subject.as_str()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn has_cert_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| CERT_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Parses every PEM certificate in `path`. Certificates that fail X.509 parsing
/// are skipped; a file with none left is an error.
fn load_pem_roots(path: &Path) -> Result<Vec<CustomRoot>, String> {
    let bytes = fs::read(path).map_err(|e| format!("read: {e}"))?;
    let mut cursor = Cursor::new(&bytes);
    let ders = pemfile::certs(&mut cursor)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("parse PEM: {e}"))?;

    let mut roots = Vec::with_capacity(ders.len());
    for der in ders {
        let subject = match parse_x509_certificate(der.as_ref()) {
            Ok((_, cert)) => cert.subject().to_string(),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "invalid X.509 certificate in PEM, skipping");
                continue;
            }
        };
        let cert = Certificate::from_der(der.as_ref()).map_err(|e| format!("load certificate: {e}"))?;
        debug!(file = %path.display(), %subject, "loaded custom CA certificate");
        roots.push(CustomRoot {
            file: path.to_path_buf(),
            subject,
            cert,
        });
    }

    if roots.is_empty() {
        return Err("no PEM certificate found".into());
    }
    Ok(roots)
}
