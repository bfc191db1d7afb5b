//! Session lifecycle tests against a stub backend.
//!
//! The stub speaks the same four auth endpoints as the real backend and
//! records the `Authorization` header of every request it sees, so the
//! tests can assert what actually went over the wire.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use revline_commerce::api::LoginRequest;
use revline_commerce::storage::{MemoryStorage, StorageExt, keys};
use revline_commerce::{CommerceConfig, CommerceState, SessionStatus};

/// What the stub saw: (path, Authorization header value if any).
type SeenRequests = Arc<Mutex<Vec<(String, Option<String>)>>>;

#[derive(Clone)]
struct StubState {
    seen: SeenRequests,
    /// Make logins for this email resolve slowly.
    slow_email: Option<String>,
    /// Fail the logout endpoint.
    fail_logout: bool,
}

fn record(state: &StubState, path: &str, headers: &HeaderMap) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned);
    state
        .seen
        .lock()
        .expect("seen lock")
        .push((path.to_owned(), auth));
}

fn auth_response(email: &str) -> Value {
    json!({
        "token": format!("tok-{email}"),
        "user": { "id": format!("u-{email}"), "email": email, "role": "customer" }
    })
}

async fn login(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&state, "/auth/login", &headers);

    let email = body["email"].as_str().unwrap_or_default().to_owned();
    if state.slow_email.as_deref() == Some(email.as_str()) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    if body["password"].as_str() == Some("correct-horse") {
        (StatusCode::OK, Json(auth_response(&email)))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid email or password" })),
        )
    }
}

async fn register(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&state, "/auth/register", &headers);

    let email = body["email"].as_str().unwrap_or_default().to_owned();
    if email == "taken@example.com" {
        (
            StatusCode::CONFLICT,
            Json(json!({ "message": "An account with this email already exists" })),
        )
    } else {
        (StatusCode::CREATED, Json(auth_response(&email)))
    }
}

async fn me(State(state): State<StubState>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    record(&state, "/auth/me", &headers);

    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token.and_then(|t| t.strip_prefix("tok-")) {
        Some(email) => (
            StatusCode::OK,
            Json(json!({ "id": format!("u-{email}"), "email": email, "role": "customer" })),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Session expired" })),
        ),
    }
}

async fn logout(State(state): State<StubState>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    record(&state, "/auth/logout", &headers);

    if state.fail_logout {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "logout backend down" })),
        )
    } else {
        (StatusCode::OK, Json(json!({})))
    }
}

/// Spawn the stub backend, returning its base URL and request log.
async fn spawn_stub(slow_email: Option<&str>, fail_logout: bool) -> (String, SeenRequests) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let seen: SeenRequests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        seen: Arc::clone(&seen),
        slow_email: slow_email.map(ToOwned::to_owned),
        fail_logout,
    };

    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });

    (format!("http://{addr}"), seen)
}

fn state_over(base_url: &str, storage: MemoryStorage) -> CommerceState {
    let config = CommerceConfig::new(base_url, "/tmp/unused")
        .with_checkout_latency(Duration::ZERO);
    CommerceState::with_storage(&config, Arc::new(storage)).expect("wire state")
}

fn login_as(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_owned(),
        password: password.to_owned(),
    }
}

#[tokio::test]
async fn test_login_success_authenticates_and_persists_token() {
    let (base_url, _) = spawn_stub(None, false).await;
    let storage = MemoryStorage::new();
    let state = state_over(&base_url, storage.clone());

    let response = state
        .session()
        .login(&login_as("alice@example.com", "correct-horse"))
        .await
        .expect("login");

    assert_eq!(response.token, "tok-alice@example.com");

    let snapshot = state.session().snapshot();
    assert!(snapshot.is_authenticated());
    assert_eq!(
        snapshot.user.expect("user").email.as_str(),
        "alice@example.com"
    );
    assert_eq!(
        storage.load::<String>(keys::TOKEN),
        Some("tok-alice@example.com".to_owned())
    );
}

#[tokio::test]
async fn test_login_failure_surfaces_server_message() {
    let (base_url, _) = spawn_stub(None, false).await;
    let storage = MemoryStorage::new();
    let state = state_over(&base_url, storage.clone());

    let result = state
        .session()
        .login(&login_as("alice@example.com", "wrong"))
        .await;

    assert!(result.is_err());
    let snapshot = state.session().snapshot();
    assert_eq!(
        snapshot.error_message(),
        Some("Invalid email or password")
    );
    assert!(snapshot.user.is_none());
    assert_eq!(storage.load::<String>(keys::TOKEN), None);
}

#[tokio::test]
async fn test_failed_relogin_discards_previous_token() {
    let (base_url, _) = spawn_stub(None, false).await;
    let storage = MemoryStorage::new();
    let state = state_over(&base_url, storage.clone());

    state
        .session()
        .login(&login_as("alice@example.com", "correct-horse"))
        .await
        .expect("first login");
    assert!(storage.load::<String>(keys::TOKEN).is_some());

    let result = state
        .session()
        .login(&login_as("alice@example.com", "wrong"))
        .await;
    assert!(result.is_err());

    // Error means no session: the earlier token must be gone from storage,
    // and no request issued now may still carry it.
    let snapshot = state.session().snapshot();
    assert!(snapshot.error_message().is_some());
    assert!(snapshot.user.is_none());
    assert_eq!(storage.load::<String>(keys::TOKEN), None);
}

#[tokio::test]
async fn test_register_implies_login() {
    let (base_url, _) = spawn_stub(None, false).await;
    let state = state_over(&base_url, MemoryStorage::new());

    state
        .session()
        .register(&revline_commerce::api::RegisterRequest {
            name: "Bob".to_owned(),
            email: "bob@example.com".to_owned(),
            password: "correct-horse".to_owned(),
        })
        .await
        .expect("register");

    assert!(state.session().snapshot().is_authenticated());
}

#[tokio::test]
async fn test_register_conflict_surfaces_message() {
    let (base_url, _) = spawn_stub(None, false).await;
    let state = state_over(&base_url, MemoryStorage::new());

    let result = state
        .session()
        .register(&revline_commerce::api::RegisterRequest {
            name: "Eve".to_owned(),
            email: "taken@example.com".to_owned(),
            password: "correct-horse".to_owned(),
        })
        .await;

    assert!(result.is_err());
    assert_eq!(
        state.session().snapshot().error_message(),
        Some("An account with this email already exists")
    );
}

#[tokio::test]
async fn test_restore_session_with_valid_token() {
    let (base_url, seen) = spawn_stub(None, false).await;
    let storage = MemoryStorage::new();
    storage
        .save(keys::TOKEN, "tok-returning@example.com")
        .expect("seed token");
    let state = state_over(&base_url, storage);

    state.session().restore_session().await;

    let snapshot = state.session().snapshot();
    assert!(snapshot.is_authenticated());
    assert_eq!(
        snapshot.user.expect("user").email.as_str(),
        "returning@example.com"
    );

    // The who-am-I call carried the restored token.
    let seen = seen.lock().expect("seen lock");
    let me_auth = seen
        .iter()
        .find(|(path, _)| path == "/auth/me")
        .and_then(|(_, auth)| auth.clone());
    assert_eq!(me_auth, Some("Bearer tok-returning@example.com".to_owned()));
}

#[tokio::test]
async fn test_restore_failure_discards_token_everywhere() {
    let (base_url, _) = spawn_stub(None, false).await;
    let storage = MemoryStorage::new();
    storage.save(keys::TOKEN, "expired-junk").expect("seed");
    let state = state_over(&base_url, storage.clone());

    state.session().restore_session().await;

    let snapshot = state.session().snapshot();
    assert_eq!(snapshot.error_message(), Some("Session expired"));
    assert!(snapshot.user.is_none());
    assert_eq!(storage.load::<String>(keys::TOKEN), None);
}

#[tokio::test]
async fn test_logout_clears_locally_even_when_server_fails() {
    let (base_url, _) = spawn_stub(None, true).await;
    let storage = MemoryStorage::new();
    let state = state_over(&base_url, storage.clone());

    state
        .session()
        .login(&login_as("alice@example.com", "correct-horse"))
        .await
        .expect("login");

    state.session().logout().await;

    assert_eq!(
        state.session().snapshot().status,
        SessionStatus::Unauthenticated
    );
    assert_eq!(storage.load::<String>(keys::TOKEN), None);
}

#[tokio::test]
async fn test_logout_precedence_no_stale_header_on_the_wire() {
    let (base_url, seen) = spawn_stub(None, false).await;
    let state = state_over(&base_url, MemoryStorage::new());

    state
        .session()
        .login(&login_as("alice@example.com", "correct-horse"))
        .await
        .expect("login");

    state.session().logout().await;

    // The credential is cleared before the logout call is issued, so even
    // the server-side logout request goes out without the old token.
    let seen = seen.lock().expect("seen lock");
    let logout_auth = seen
        .iter()
        .find(|(path, _)| path == "/auth/logout")
        .map(|(_, auth)| auth.clone())
        .expect("logout request seen");
    assert_eq!(logout_auth, None);
}

#[tokio::test]
async fn test_concurrent_logins_last_write_wins() {
    // Overlapping logins are not serialized; the later resolution wins.
    let (base_url, _) = spawn_stub(Some("slow@example.com"), false).await;
    let state = state_over(&base_url, MemoryStorage::new());

    let fast_request = login_as("fast@example.com", "correct-horse");
    let slow_request = login_as("slow@example.com", "correct-horse");

    let (fast_result, slow_result) = tokio::join!(
        state.session().login(&fast_request),
        state.session().login(&slow_request)
    );
    assert!(fast_result.is_ok());
    assert!(slow_result.is_ok());

    let snapshot = state.session().snapshot();
    assert_eq!(
        snapshot.user.expect("user").email.as_str(),
        "slow@example.com"
    );
}
