//! End-to-end tests for `Client` against an in-process fake of the PostZen
//! API.

use std::collections::HashSet;
use std::sync::Mutex;

use futures_util::future::join_all;
use postzen::prelude::*;
use postzen_transport::TransportError;
use serde::Deserialize;
use serde_json::{Value, json};

// =========================================================================
// Fake API
// =========================================================================

#[derive(Default)]
struct FakeState {
    issued: u32,
    access: HashSet<String>,
    refresh: HashSet<String>,
    log: Vec<String>,
}

/// Speaks enough of the PostZen API for the client: login, refresh with
/// rotation, logout and bearer-protected resources.
#[derive(Default)]
struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    fn expire_access_tokens(&self) {
        self.state.lock().unwrap().access.clear();
    }

    fn revoke_everything(&self) {
        let mut state = self.state.lock().unwrap();
        state.access.clear();
        state.refresh.clear();
    }

    fn calls_to(&self, path: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.log.iter().filter(|p| p.as_str() == path).count()
    }

    fn issue(&self) -> Value {
        let mut state = self.state.lock().unwrap();
        state.issued += 1;
        let access = format!("access-{}", state.issued);
        let refresh = format!("refresh-{}", state.issued);
        state.access.insert(access.clone());
        state.refresh.insert(refresh.clone());
        json!({
            "accessToken": access,
            "refreshToken": refresh,
            "expiresIn": 900,
            "tokenType": "Bearer",
            "user": {"id": 1, "username": "ana", "email": "ana@postzen.dev", "role": "ADMIN"}
        })
    }

    fn error(status: u16, message: &str, path: &str) -> ApiResponse {
        let body = json!({
            "status": status,
            "error": "Error",
            "message": message,
            "path": format!("/api{path}"),
        });
        ApiResponse::new(status, body.to_string())
    }

    fn ok(body: Value) -> ApiResponse {
        ApiResponse::new(200, body.to_string())
    }
}

impl HttpTransport for FakeApi {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let path = request.path.clone();
        self.state.lock().unwrap().log.push(path.clone());
        let body: Value = request
            .body
            .as_deref()
            .and_then(|b| serde_json::from_slice(b).ok())
            .unwrap_or(Value::Null);

        let response = match path.as_str() {
            "/auth/login" => {
                if body["password"] == "secret" {
                    Self::ok(self.issue())
                } else {
                    Self::error(401, "Invalid email or password", &path)
                }
            }
            "/auth/refresh" => {
                let token = body["refreshToken"].as_str().unwrap_or_default();
                let known = self.state.lock().unwrap().refresh.remove(token);
                if known {
                    Self::ok(self.issue())
                } else {
                    Self::error(401, "Invalid refresh token", &path)
                }
            }
            "/auth/logout" => {
                let token = body["refreshToken"].as_str().unwrap_or_default();
                self.state.lock().unwrap().refresh.remove(token);
                Self::ok(json!({"message": "Logged out successfully"}))
            }
            "/posts/missing" => Self::error(404, "Post not found", &path),
            _ => {
                let token = request.bearer_token().unwrap_or_default();
                if self.state.lock().unwrap().access.contains(token) {
                    Self::ok(json!({"path": path, "token": token}))
                } else {
                    Self::error(401, "Full authentication is required", &path)
                }
            }
        };
        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
struct Echo {
    path: String,
    token: String,
}

fn client() -> Client<MemoryStorage, FakeApi> {
    ClientBuilder::new().build_with_transport(FakeApi::default())
}

fn api<S: Storage>(client: &Client<S, FakeApi>) -> &FakeApi {
    client.pipeline().transport()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_login_then_request_carries_token() {
    let client = client();

    let user = client.auth().login("ana@postzen.dev", "secret").await.unwrap();
    let path = format!("/posts/author/{}", user.id);
    let echo: Echo = client.get_json(&path).await.unwrap();

    assert!(user.is_admin());
    assert_eq!(echo.path, "/posts/author/1");
    assert_eq!(echo.token, "access-1");
}

#[tokio::test]
async fn test_wrong_password_reports_server_message() {
    let client = client();

    let err = client.auth().login("ana@postzen.dev", "nope").await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("Invalid email or password"));
    assert!(!client.auth().is_authenticated());
}

#[tokio::test]
async fn test_expired_token_concurrent_requests_refresh_once() {
    let client = client();
    client.auth().login("ana@postzen.dev", "secret").await.unwrap();
    api(&client).expire_access_tokens();

    let results: Vec<Result<Echo, PostzenError>> = join_all(
        ["/posts/mine", "/users/me", "/posts/drafts"]
            .into_iter()
            .map(|path| client.get_json(path)),
    )
    .await;

    for result in results {
        assert_eq!(result.unwrap().token, "access-2");
    }
    assert_eq!(api(&client).calls_to("/auth/refresh"), 1);
    assert_eq!(client.auth().access_token().as_deref(), Some("access-2"));
}

#[tokio::test]
async fn test_revoked_session_fails_and_gate_sends_to_login() {
    let client = client();
    client.auth().login("ana@postzen.dev", "secret").await.unwrap();
    api(&client).revoke_everything();

    let err = client.get("/posts/mine").await.unwrap_err();

    assert!(err.is_session_expired());
    assert!(!client.auth().is_authenticated());
    let outcome = client.router().navigate("/write").await.unwrap();
    let at = outcome.location().expect("completed");
    assert_eq!(at.name, "login");
    assert_eq!(at.query_value("redirect"), Some("/write"));
}

#[tokio::test]
async fn test_typed_helper_maps_error_status() {
    let client = client();
    client.auth().login("ana@postzen.dev", "secret").await.unwrap();

    let err = client.get_json::<Value>("/posts/missing").await.unwrap_err();

    match err {
        PostzenError::Status { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Post not found");
        }
        other => panic!("expected Status, got {other:?}"),
    }
    assert!(client.auth().is_authenticated());
}

#[tokio::test]
async fn test_logout_revokes_refresh_token_server_side() {
    let client = client();
    client.auth().login("ana@postzen.dev", "secret").await.unwrap();

    client.auth().logout().await;

    assert!(!client.auth().is_authenticated());
    assert_eq!(api(&client).calls_to("/auth/logout"), 1);
    assert!(api(&client).state.lock().unwrap().refresh.is_empty());
}

#[tokio::test]
async fn test_session_survives_restart_with_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let first = ClientBuilder::new()
        .storage(JsonFileStorage::new(&path))
        .build_with_transport(FakeApi::default());
    first.auth().login("ana@postzen.dev", "secret").await.unwrap();

    let second = ClientBuilder::new()
        .storage(JsonFileStorage::new(&path))
        .build_with_transport(FakeApi::default());
    let outcome = second.router().navigate("/profile").await.unwrap();

    assert_eq!(outcome.location().map(|l| l.name.as_str()), Some("profile"));
    assert_eq!(second.auth().user().map(|u| u.username), Some("ana".into()));
}
