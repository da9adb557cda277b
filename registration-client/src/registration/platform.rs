//! Narrow view of the trusted-execution platform, consumed by the decision engine.
//!
//! Implementations wrap vendor tooling (UEFI variables, the PCE, ...) that this
//! crate never touches directly. Error strings from that tooling travel back
//! unchanged inside [`PlatformError`].

use super::errors::PlatformError;
use super::types::{PlatformIdentity, PlatformManifest};

/// Acquires a platform session for one decision cycle.
pub trait PlatformProvider: Send + Sync {
    type Session: PlatformSession + Send;

    fn open(&self) -> Result<Self::Session, PlatformError>;
}

/// Platform access held for the duration of one cycle; released on drop.
pub trait PlatformSession {
    fn is_registered(&mut self) -> Result<bool, PlatformError>;

    fn build_manifest(&mut self) -> Result<PlatformManifest, PlatformError>;

    fn mark_registration_complete(&mut self) -> Result<(), PlatformError>;

    fn read_identity(&mut self) -> Result<PlatformIdentity, PlatformError>;
}
