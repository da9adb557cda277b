use anyhow::{bail, Context};
use pck_registration::registration::ClientConfig;
use reqwest::Url;
use serde::{Deserialize, Deserializer};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const ENV_PREFIX: &str = "CC_";
const DEFAULT_INTERVAL_MINUTES: u64 = 60;
/// One week.
const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;
const DEFAULT_SERVICE_PORT: u16 = 8080;

#[derive(Clone, Debug, Deserialize)]
/// Runtime configuration loaded from `CC_*` environment variables.
pub struct Config {
    /// `CC_PCCS_URLS`: comma-separated caching-service base URLs.
    #[serde(default)]
    pub pccs_urls: Option<String>,

    /// `CC_PCCS_CA_CERT_PATH`: directory of extra trust roots.
    #[serde(default)]
    pub pccs_ca_cert_path: Option<PathBuf>,

    /// Blank is treated as unset.
    #[serde(
        default,
        rename = "ipr_registration_interval_minutes",
        deserialize_with = "blank_as_none"
    )]
    registration_interval_minutes: Option<u64>,

    /// Consumed by the metrics server, which runs outside this process.
    #[serde(
        default,
        rename = "ipr_registration_service_port",
        deserialize_with = "blank_as_none"
    )]
    service_port: Option<u16>,

    #[serde(default, rename = "ipr_log_level")]
    pub log_level: Option<String>,

    #[serde(default = "def_platform_state_dir", rename = "ipr_platform_state_dir")]
    pub platform_state_dir: PathBuf,
}

impl Config {
    /// Populates the configuration from environment variables, honoring `.env`.
    pub fn from_env() -> anyhow::Result<Self> {
        tracing::debug!("fetching config");
        let _ = dotenvy::dotenv();
        let cfg: Self = envy::prefixed(ENV_PREFIX)
            .from_env()
            .context("invalid CC_* environment")?;
        cfg.validate()?;
        Ok(cfg)
    }

    #[cfg(test)]
    fn from_pairs(pairs: &[(&str, &str)]) -> anyhow::Result<Self> {
        let cfg: Self = envy::prefixed(ENV_PREFIX).from_iter(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let minutes = self.registration_interval_minutes();
        if minutes == 0 {
            bail!("registration interval must be at least one minute");
        }
        if minutes > MAX_INTERVAL_MINUTES {
            bail!(
                "registration interval of {minutes} minutes exceeds the {MAX_INTERVAL_MINUTES} minute limit"
            );
        }
        self.caching_service_urls()?;
        Ok(())
    }

    /// Parsed `CC_PCCS_URLS`: blanks skipped, HTTPS only, no trailing slash.
    pub fn caching_service_urls(&self) -> anyhow::Result<Vec<String>> {
        let Some(raw) = self.pccs_urls.as_deref() else {
            return Ok(Vec::new());
        };
        raw.split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| {
                let parsed =
                    Url::parse(url).with_context(|| format!("invalid PCCS URL '{url}'"))?;
                if parsed.scheme() != "https" {
                    bail!("PCCS URL must use HTTPS: '{url}'");
                }
                Ok(url.trim_end_matches('/').to_string())
            })
            .collect()
    }

    pub fn trust_roots_dir(&self) -> Option<PathBuf> {
        self.pccs_ca_cert_path
            .clone()
            .filter(|path| !path.as_os_str().is_empty())
    }

    pub fn registration_interval_minutes(&self) -> u64 {
        self.registration_interval_minutes.unwrap_or(DEFAULT_INTERVAL_MINUTES)
    }

    pub fn registration_interval(&self) -> Duration {
        Duration::from_secs(self.registration_interval_minutes().saturating_mul(60))
    }

    pub fn service_port(&self) -> u16 {
        self.service_port.unwrap_or(DEFAULT_SERVICE_PORT)
    }

    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        Ok(ClientConfig {
            caching_service_urls: self.caching_service_urls()?,
            trust_roots_dir: self.trust_roots_dir(),
            ..ClientConfig::default()
        })
    }

    /// Emit the effective configuration via tracing.
    pub fn info(&self) {
        let pccs = self.caching_service_urls().unwrap_or_default();
        tracing::info!(
            pccs_urls = ?pccs,
            custom_ca_dir = ?self.trust_roots_dir(),
            interval_minutes = self.registration_interval_minutes(),
            service_port = self.service_port(),
            platform_state_dir = %self.platform_state_dir.display(),
            "effective config"
        );
        if pccs.is_empty() {
            tracing::info!("no PCCS configured, PCK retrieval goes to Intel directly");
        }
    }
}

/// Parses a numeric variable, mapping an empty value to unset.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(serde::de::Error::custom)
}

fn def_platform_state_dir() -> PathBuf {
    PathBuf::from("/var/lib/cc-intel-platform-registration")
}
