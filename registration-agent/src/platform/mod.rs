//! Host adapter for the platform-identity collaborator.
//!
//! The vendor multi-package tooling exports the registration manifest and the
//! registration status into a state directory; this adapter reads them and
//! persists completion there. With the `sgx` feature the platform identity
//! comes straight from the PCE through `libsgx_platform_info`, otherwise from
//! a JSON export in the same directory.

#[cfg(feature = "sgx")]
mod sgx;

use pck_registration::registration::{
    PlatformError, PlatformIdentity, PlatformManifest, PlatformProvider, PlatformSession,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

const STATUS_FILE: &str = "registration_status";
const MANIFEST_FILE: &str = "platform_manifest.bin";
#[cfg_attr(feature = "sgx", allow(dead_code))]
const IDENTITY_FILE: &str = "platform_identity.json";
const STATUS_COMPLETE: &str = "complete";

#[derive(Clone, Debug)]
pub struct StateDirPlatform {
    dir: PathBuf,
}

impl StateDirPlatform {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PlatformProvider for StateDirPlatform {
    type Session = StateDirSession;

    fn open(&self) -> Result<StateDirSession, PlatformError> {
        let meta = fs::metadata(&self.dir).map_err(|e| {
            PlatformError(format!(
                "platform state directory {} unavailable: {e}",
                self.dir.display()
            ))
        })?;
        if !meta.is_dir() {
            return Err(PlatformError(format!(
                "platform state path {} is not a directory",
                self.dir.display()
            )));
        }
        debug!(dir = %self.dir.display(), "platform session opened");
        Ok(StateDirSession {
            dir: self.dir.clone(),
        })
    }
}

/// Access to the state directory for one cycle.
pub struct StateDirSession {
    dir: PathBuf,
}

impl StateDirSession {
    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl Drop for StateDirSession {
    fn drop(&mut self) {
        debug!(dir = %self.dir.display(), "platform session released");
    }
}

impl PlatformSession for StateDirSession {
    fn is_registered(&mut self) -> Result<bool, PlatformError> {
        match fs::read_to_string(self.path(STATUS_FILE)) {
            Ok(status) => Ok(status.trim() == STATUS_COMPLETE),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PlatformError(format!("read registration status: {e}"))),
        }
    }

    fn build_manifest(&mut self) -> Result<PlatformManifest, PlatformError> {
        let manifest = fs::read(self.path(MANIFEST_FILE))
            .map(PlatformManifest::new)
            .map_err(|e| PlatformError(format!("platform manifest not available: {e}")))?;
        if manifest.is_empty() {
            return Err(PlatformError("platform manifest is empty".into()));
        }
        Ok(manifest)
    }

    fn mark_registration_complete(&mut self) -> Result<(), PlatformError> {
        write_atomically(&self.path(STATUS_FILE), STATUS_COMPLETE.as_bytes())
            .map_err(|e| PlatformError(format!("persist registration status: {e}")))
    }

    #[cfg(not(feature = "sgx"))]
    fn read_identity(&mut self) -> Result<PlatformIdentity, PlatformError> {
        let raw = fs::read(self.path(IDENTITY_FILE))
            .map_err(|e| PlatformError(format!("platform identity not available: {e}")))?;
        serde_json::from_slice(&raw)
            .map_err(|e| PlatformError(format!("malformed platform identity: {e}")))
    }

    #[cfg(feature = "sgx")]
    fn read_identity(&mut self) -> Result<PlatformIdentity, PlatformError> {
        sgx::read_platform_identity()
    }
}

/// Replaces `path` via a sibling temporary file so readers never see a partial write.
fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}
