mod common;

use common::*;
use pck_registration::registration::{
    PlatformError, PlatformIdentity, PlatformManifest, PlatformProvider, PlatformSession,
    RegistrationCheck, RegistrationChecker, RegistrationError, StatusCode,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Default)]
struct FakePlatform {
    registered: Arc<AtomicBool>,
    manifest_fails: bool,
    persist_fails: bool,
    manifests_built: Arc<AtomicUsize>,
    completions: Arc<AtomicUsize>,
    identity_reads: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

struct FakeSession(FakePlatform);

impl PlatformProvider for FakePlatform {
    type Session = FakeSession;

    fn open(&self) -> Result<FakeSession, PlatformError> {
        Ok(FakeSession(self.clone()))
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.0.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl PlatformSession for FakeSession {
    fn is_registered(&mut self) -> Result<bool, PlatformError> {
        Ok(self.0.registered.load(Ordering::SeqCst))
    }

    fn build_manifest(&mut self) -> Result<PlatformManifest, PlatformError> {
        if self.0.manifest_fails {
            return Err(PlatformError::new("Not enough memory is available to complete this operation"));
        }
        self.0.manifests_built.fetch_add(1, Ordering::SeqCst);
        Ok(PlatformManifest::new(vec![0xC3; 64]))
    }

    fn mark_registration_complete(&mut self) -> Result<(), PlatformError> {
        self.0.completions.fetch_add(1, Ordering::SeqCst);
        if self.0.persist_fails {
            return Err(PlatformError::new("UEFI variable write failed"));
        }
        self.0.registered.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn read_identity(&mut self) -> Result<PlatformIdentity, PlatformError> {
        self.0.identity_reads.fetch_add(1, Ordering::SeqCst);
        Ok(identity())
    }
}

#[tokio::test]
async fn successful_registration_marks_completion_once() {
    let log = hit_log();
    let intel = spawn_endpoint("intel", Reply::status(201), log.clone()).await;
    let platform = FakePlatform::default();
    let checker = RegistrationChecker::new(platform.clone(), client(Vec::new(), &intel, TIMEOUT));

    let outcome = checker.check().await.unwrap();

    assert_eq!(outcome.status, StatusCode::RebootNeeded);
    assert_eq!(platform.manifests_built.load(Ordering::SeqCst), 1);
    assert_eq!(platform.completions.load(Ordering::SeqCst), 1);
    assert_eq!(platform.identity_reads.load(Ordering::SeqCst), 0);
    assert_eq!(platform.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_registration_never_marks_completion() {
    for status in [400u16, 402, 500, 503] {
        let log = hit_log();
        let intel = spawn_endpoint("intel", Reply::status(status), log.clone()).await;
        let platform = FakePlatform::default();
        let checker =
            RegistrationChecker::new(platform.clone(), client(Vec::new(), &intel, TIMEOUT));

        let failure = checker.check().await.unwrap_err();

        assert_ne!(failure.outcome.status, StatusCode::RebootNeeded);
        assert_eq!(platform.completions.load(Ordering::SeqCst), 0, "status {status}");
        assert!(!platform.registered.load(Ordering::SeqCst));
    }
}

#[tokio::test]
async fn unreachable_registration_service_never_marks_completion() {
    let dead = closed_endpoint().await;
    let platform = FakePlatform::default();
    let checker = RegistrationChecker::new(platform.clone(), client(Vec::new(), &dead, TIMEOUT));

    let failure = checker.check().await.unwrap_err();

    assert_eq!(failure.outcome.status, StatusCode::ConnectFailed);
    assert_eq!(platform.completions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn persist_failure_is_distinct_from_remote_failure() {
    let log = hit_log();
    let intel = spawn_endpoint("intel", Reply::status(201), log.clone()).await;
    let platform = FakePlatform {
        persist_fails: true,
        ..Default::default()
    };
    let checker = RegistrationChecker::new(platform.clone(), client(Vec::new(), &intel, TIMEOUT));

    let failure = checker.check().await.unwrap_err();

    assert_eq!(failure.outcome.status, StatusCode::LocalPersistFailed);
    assert!(matches!(failure.source, RegistrationError::LocalPersist(_)));
    assert_eq!(platform.completions.load(Ordering::SeqCst), 1);
    assert_eq!(endpoints_hit(&log), vec!["intel"]);
}

#[tokio::test]
async fn manifest_failure_skips_remote_call() {
    let log = hit_log();
    let intel = spawn_endpoint("intel", Reply::status(201), log.clone()).await;
    let platform = FakePlatform {
        manifest_fails: true,
        ..Default::default()
    };
    let checker = RegistrationChecker::new(platform.clone(), client(Vec::new(), &intel, TIMEOUT));

    let failure = checker.check().await.unwrap_err();

    assert_eq!(failure.outcome.status, StatusCode::PlatformInterfaceUnavailable);
    assert!(failure
        .to_string()
        .contains("Not enough memory is available to complete this operation"));
    assert!(endpoints_hit(&log).is_empty());
}

#[tokio::test]
async fn registered_platform_retrieves_pck_without_mutating_state() {
    let log = hit_log();
    let pccs = spawn_endpoint("pccs", Reply::status(200), log.clone()).await;
    let intel = spawn_endpoint("intel", Reply::status(200), log.clone()).await;
    let platform = FakePlatform::default();
    platform.registered.store(true, Ordering::SeqCst);
    let checker = RegistrationChecker::new(platform.clone(), client(vec![pccs], &intel, TIMEOUT));

    let outcome = checker.check().await.unwrap();

    assert_eq!(outcome.status, StatusCode::DirectlyRegistered);
    assert_eq!(endpoints_hit(&log), vec!["pccs"]);
    assert_eq!(platform.identity_reads.load(Ordering::SeqCst), 1);
    assert_eq!(platform.manifests_built.load(Ordering::SeqCst), 0);
    assert_eq!(platform.completions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn each_check_requeries_platform_state() {
    let log = hit_log();
    let intel = spawn_endpoint("intel", Reply::status(201), log.clone()).await;
    let platform = FakePlatform::default();
    let checker = RegistrationChecker::new(platform.clone(), client(Vec::new(), &intel, TIMEOUT));

    assert_eq!(checker.check().await.unwrap().status, StatusCode::RebootNeeded);
    // The completion flag flipped the platform to registered; the next cycle
    // retrieves instead of registering again. Intel answers 201 to the GET.
    let failure = checker.check().await.unwrap_err();
    assert_eq!(failure.outcome.status, StatusCode::RetryNeeded);

    let hits = log.lock().unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].method, axum::http::Method::POST);
    assert_eq!(hits[1].method, axum::http::Method::GET);
    assert_eq!(platform.released.load(Ordering::SeqCst), 2);
}
