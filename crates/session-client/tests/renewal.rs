//! End-to-end session renewal over real HTTP.
//!
//! The backend keeps a cookie session: `/auth/refresh` trades a valid
//! `refresh` cookie for a fresh `session` cookie, and everything under
//! `/meetings` requires the current session cookie.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use session_client::{ClientConfig, Error, SessionClient, SessionState, SessionStatus};
use tokio::net::TcpListener;
use transport::{HttpTransport, RequestAttempt};

const CURRENT_SESSION: &str = "s-renewed";
const VALID_REFRESH: &str = "r-valid";

#[derive(Clone, Default)]
struct Backend {
    renewals: Arc<AtomicUsize>,
    meeting_calls: Arc<AtomicUsize>,
}

fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
}

async fn refresh(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    backend.renewals.fetch_add(1, Ordering::SeqCst);
    // Hold the renewal open long enough for concurrent callers to pile up
    tokio::time::sleep(Duration::from_millis(100)).await;
    if cookie(&headers, "refresh") == Some(VALID_REFRESH) {
        (
            StatusCode::NO_CONTENT,
            [(
                header::SET_COOKIE,
                format!("session={CURRENT_SESSION}; Path=/"),
            )],
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({"message": "refresh token revoked"})),
        )
            .into_response()
    }
}

async fn meetings(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    backend.meeting_calls.fetch_add(1, Ordering::SeqCst);
    if cookie(&headers, "session") == Some(CURRENT_SESSION) {
        axum::Json(serde_json::json!([{"id": 1, "title": "weekly sync"}])).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({"message": "session expired"})),
        )
            .into_response()
    }
}

async fn start_backend() -> (String, Backend) {
    let backend = Backend::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let app = axum::Router::new()
        .route("/auth/refresh", post(refresh))
        .route("/meetings", get(meetings))
        .with_state(backend.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (url, backend)
}

fn build_client(url: &str, cookies: &[&str]) -> (SessionClient, Arc<SessionState>) {
    let transport = HttpTransport::new(url, Duration::from_secs(5)).unwrap();
    for c in cookies {
        transport.add_cookie(c);
    }
    let session = Arc::new(SessionState::new());
    let client = SessionClient::new(Arc::new(transport), session.clone(), ClientConfig::default());
    (client, session)
}

#[tokio::test]
async fn stale_session_cookie_is_renewed_transparently() {
    let (url, backend) = start_backend().await;
    let (client, session) = build_client(
        &url,
        &["session=s-stale; Path=/", "refresh=r-valid; Path=/"],
    );

    let meetings: serde_json::Value = client.get_json("/meetings").await.unwrap();
    assert_eq!(meetings[0]["title"], "weekly sync");
    assert_eq!(backend.renewals.load(Ordering::SeqCst), 1);
    assert_eq!(backend.meeting_calls.load(Ordering::SeqCst), 2);
    assert_eq!(session.status(), SessionStatus::Active);

    // The renewed cookie sticks: no further renewals
    let _: serde_json::Value = client.get_json("/meetings").await.unwrap();
    assert_eq!(backend.renewals.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_expiries_trigger_one_renewal() {
    let (url, backend) = start_backend().await;
    let (client, _session) = build_client(&url, &["refresh=r-valid; Path=/"]);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client.get_json::<serde_json::Value>("/meetings").await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(backend.renewals.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn revoked_refresh_invalidates_session() {
    let (url, backend) = start_backend().await;
    let (client, session) = build_client(&url, &["refresh=r-revoked; Path=/"]);
    let mut status = session.subscribe();

    let err = client
        .get_json::<serde_json::Value>("/meetings")
        .await
        .unwrap_err();
    assert_eq!(err, Error::Auth("refresh token revoked".into()));
    assert_eq!(backend.renewals.load(Ordering::SeqCst), 1);
    assert_eq!(
        backend.meeting_calls.load(Ordering::SeqCst),
        1,
        "nothing is replayed after a failed renewal"
    );

    status.changed().await.unwrap();
    assert_eq!(*status.borrow(), SessionStatus::Invalidated);
    assert_eq!(session.invalidations(), 1);
}

#[tokio::test]
async fn refresh_endpoint_is_recognized_without_leading_slash() {
    let (url, backend) = start_backend().await;
    let (client, session) = build_client(&url, &["refresh=r-revoked; Path=/"]);

    let err = client
        .execute(RequestAttempt::post("auth/refresh"))
        .await
        .unwrap_err();
    assert_eq!(err, Error::Auth("refresh token revoked".into()));
    assert_eq!(backend.renewals.load(Ordering::SeqCst), 1, "no nested renewal");
    assert_eq!(session.invalidations(), 0);
    assert_eq!(session.status(), SessionStatus::Active);
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (client, session) = build_client(&format!("http://{addr}"), &[]);
    let err = client
        .get_json::<serde_json::Value>("/meetings")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network(_)), "got: {err:?}");
    assert_eq!(session.invalidations(), 0);
}
