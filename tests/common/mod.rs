//! Shared harness: a wiremock backend and a client wired to an in-memory secret store.

#![allow(dead_code)]

use defectscope_lib::api::ApiClient;
use defectscope_lib::settings::ApiSettings;
use defectscope_lib::state::{
    AuthState, MemorySecretStore, SecretStore, SessionManager, ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REFRESH_PATH: &str = "/api/auth/mobile/refresh";
pub const ME_PATH: &str = "/api/auth/me";

pub struct TestContext {
    pub server: MockServer,
    pub store: Arc<MemorySecretStore>,
    pub api: Arc<ApiClient>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_fallback(false).await
    }

    pub async fn with_fallback(offline_fallback: bool) -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(MemorySecretStore::new());
        let api = client_for(&server.uri(), store.clone(), offline_fallback);
        Self { server, store, api }
    }

    pub fn auth_state(&self, user_fetch_timeout: Duration) -> AuthState {
        AuthState::new(self.api.clone(), user_fetch_timeout)
    }

    pub fn seed(&self, access: &str, refresh: Option<&str>) {
        self.store.set(ACCESS_TOKEN_KEY, access).unwrap();
        if let Some(refresh) = refresh {
            self.store.set(REFRESH_TOKEN_KEY, refresh).unwrap();
        }
    }

    pub fn stored_access(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY).unwrap()
    }

    pub fn stored_refresh(&self) -> Option<String> {
        self.store.get(REFRESH_TOKEN_KEY).unwrap()
    }

    /// Refresh endpoint expecting `refresh_token` and rotating to `access`/`refresh`.
    pub async fn mock_refresh_success(&self, expected: &str, access: &str, refresh: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .and(body_json(json!({ "refresh_token": expected })))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_pair(access, refresh)))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_refresh_status(&self, status: u16, times: u64) {
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({ "detail": "Invalid refresh token" })),
            )
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_me_for_token(&self, token: &str, status: u16, times: u64) {
        let template = if status == 200 {
            ResponseTemplate::new(200).set_body_json(admin_user())
        } else {
            ResponseTemplate::new(status).set_body_json(json!({ "detail": "Could not validate credentials" }))
        };
        Mock::given(method("GET"))
            .and(path(ME_PATH))
            .and(header("Authorization", format!("Bearer {token}").as_str()))
            .respond_with(template)
            .expect(times)
            .mount(&self.server)
            .await;
    }
}

pub fn client_for(base_url: &str, store: Arc<MemorySecretStore>, offline_fallback: bool) -> Arc<ApiClient> {
    let settings = ApiSettings {
        base_url: base_url.to_string(),
        request_timeout_secs: 5,
        offline_fallback,
    };
    let session = SessionManager::new(store, base_url).unwrap();
    Arc::new(ApiClient::new(&settings, session).unwrap())
}

pub fn token_pair(access: &str, refresh: &str) -> Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "expires_in": 900
    })
}

pub fn admin_user() -> Value {
    json!({
        "id": 1,
        "username": "admin",
        "email": "admin@example.com",
        "full_name": "Plant Administrator",
        "role": "admin",
        "is_active": true,
        "created_at": "2025-01-01T00:00:00Z"
    })
}
