#![allow(dead_code)]

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use pck_registration::registration::{
    AuthoritativeEndpoints, ClientConfig, PlatformIdentity, RemoteRegistrationClient,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// A request observed by a mock endpoint.
#[derive(Debug, Clone)]
pub struct Hit {
    pub endpoint: &'static str,
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

pub type HitLog = Arc<Mutex<Vec<Hit>>>;

pub fn hit_log() -> HitLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn endpoints_hit(log: &HitLog) -> Vec<&'static str> {
    log.lock().unwrap().iter().map(|hit| hit.endpoint).collect()
}

#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub error_code: Option<&'static str>,
    pub delay: Duration,
}

impl Reply {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            error_code: None,
            delay: Duration::ZERO,
        }
    }

    pub fn with_error_code(mut self, code: &'static str) -> Self {
        self.error_code = Some(code);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Serves `reply` for every request on an ephemeral local port and returns its base URL.
pub async fn spawn_endpoint(name: &'static str, reply: Reply, log: HitLog) -> String {
    let app = Router::new().fallback(
        move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
            let log = log.clone();
            let reply = reply.clone();
            async move {
                log.lock().unwrap().push(Hit {
                    endpoint: name,
                    method,
                    path: uri.path().to_string(),
                    query: uri.query().map(str::to_string),
                    content_type: headers
                        .get(header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string),
                    body,
                });
                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }
                let mut response: Response =
                    StatusCode::from_u16(reply.status).unwrap().into_response();
                if let Some(code) = reply.error_code {
                    response
                        .headers_mut()
                        .insert("Error-Code", HeaderValue::from_static(code));
                }
                response
            }
        },
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Base URL of a local port with nothing listening on it.
pub async fn closed_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn client(
    caching: Vec<String>,
    authoritative_base: &str,
    request_timeout: Duration,
) -> RemoteRegistrationClient {
    let cfg = ClientConfig {
        caching_service_urls: caching,
        trust_roots_dir: None,
        authoritative: AuthoritativeEndpoints {
            registration_url: format!("{authoritative_base}/sgx/registration/v1/platform"),
            pck_retrieval_url: format!("{authoritative_base}/sgx/certification/v4/pckcert"),
        },
        request_timeout,
    };
    RemoteRegistrationClient::new(&cfg).expect("client")
}

pub fn identity() -> PlatformIdentity {
    PlatformIdentity {
        encrypted_ppid: "a1b2c3d4".into(),
        pce_id: "0000".into(),
        pce_isv_svn: "000d".into(),
        qe_id: "00112233445566778899aabbccddeeff".into(),
        cpu_svn: "0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f".into(),
    }
}
