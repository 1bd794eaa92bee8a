use crate::api::{ApiClient, ApiError};
use crate::types::User;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// What the presentation layer renders from: the signed-in user and whether a
/// session transition is in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub is_loading: bool,
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self {
            user: None,
            is_loading: true,
        }
    }
}

impl AuthSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Clone)]
pub struct AuthState {
    api: Arc<ApiClient>,
    tx: Arc<watch::Sender<AuthSnapshot>>,
    user_fetch_timeout: Duration,
}

impl AuthState {
    pub fn new(api: Arc<ApiClient>, user_fetch_timeout: Duration) -> Self {
        let (tx, _rx) = watch::channel(AuthSnapshot::default());
        Self {
            api,
            tx: Arc::new(tx),
            user_fetch_timeout,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.tx.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated()
    }

    fn set_loading(&self, is_loading: bool) {
        self.tx.send_modify(|s| s.is_loading = is_loading);
    }

    fn set_user(&self, user: Option<User>) {
        self.tx.send_modify(|s| s.user = user);
    }

    /// Restores a persisted session at startup.
    pub async fn initialize(&self) {
        self.set_loading(true);
        self.refresh_user().await;
        self.set_loading(false);
    }

    /// Reloads the current user. Never fails: without a usable session the user is simply
    /// signed out. Tokens are dropped only when the backend rejected them.
    pub async fn refresh_user(&self) {
        if self.api.session().get_access_token().await.is_none() {
            self.set_user(None);
            return;
        }

        match tokio::time::timeout(self.user_fetch_timeout, self.api.current_user()).await {
            Ok(Ok(user)) => self.set_user(Some(user)),
            Ok(Err(e)) if e.is_auth_failure() => {
                info!("session no longer valid; signing out");
                self.api.session().clear_tokens().await;
                self.set_user(None);
            }
            Ok(Err(e)) => {
                info!(error = %e, "could not load current user");
                self.set_user(None);
            }
            Err(_) => {
                info!(timeout_ms = self.user_fetch_timeout.as_millis() as u64, "current user request timed out");
                self.set_user(None);
            }
        }
    }

    /// Signs in and loads the user. The error is returned for the caller to show next to the form.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        self.set_loading(true);
        let result = self.api.login(username, password).await;
        if result.is_ok() {
            self.refresh_user().await;
        }
        self.set_loading(false);
        result.map(|_| ())
    }

    pub async fn logout(&self) {
        self.set_loading(true);
        self.api.logout().await;
        self.set_user(None);
        self.set_loading(false);
    }
}
