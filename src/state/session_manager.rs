use super::secret_store::{SecretStore, StoreError};
use crate::redact::redact_secrets;
use crate::types::TokenPair;
use reqwest::header::{HeaderValue, ACCEPT};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

pub(crate) const REFRESH_PATH: &str = "/api/auth/mobile/refresh";

#[derive(Debug, Default)]
struct SessionCache {
    access_token: Option<String>,
    // Bumped by every clear and every explicit set; a refresh started under an
    // older generation is stale.
    generation: u64,
}

impl SessionCache {
    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

#[derive(Serialize)]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Owns the access/refresh token pair for the lifetime of the process.
///
/// The access token is cached in memory and mirrored in the secret store. Cache
/// and store are only mutated through [`set_tokens`](Self::set_tokens) and
/// [`clear_tokens`](Self::clear_tokens), both under the cache lock, so no task
/// can observe them disagreeing. Refreshes are serialized: concurrent callers
/// that saw the same rejected token share one network refresh.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SecretStore>,
    cache: Arc<Mutex<SessionCache>>,
    refresh_gate: Arc<Mutex<()>>,
    http: reqwest::Client,
    refresh_url: String,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SecretStore>, base_url: &str) -> Result<Self, reqwest::Error> {
        Ok(Self {
            store,
            cache: Arc::new(Mutex::new(SessionCache::default())),
            refresh_gate: Arc::new(Mutex::new(())),
            http: reqwest::Client::builder().build()?,
            refresh_url: format!("{}{REFRESH_PATH}", base_url.trim_end_matches('/')),
        })
    }

    pub async fn get_access_token(&self) -> Option<String> {
        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.access_token.clone() {
            return Some(token);
        }

        match self.store.get(ACCESS_TOKEN_KEY) {
            Ok(value) => {
                let token = non_empty(value)?;
                cache.access_token = Some(token.clone());
                Some(token)
            }
            Err(e) => {
                debug!(error = %e, "access token read failed; treating as signed out");
                None
            }
        }
    }

    pub async fn set_tokens(&self, access: &str, refresh: Option<&str>) -> Result<(), StoreError> {
        let mut cache = self.cache.lock().await;
        cache.bump();
        self.persist_locked(&mut cache, access, refresh)
    }

    pub async fn clear_tokens(&self) {
        let mut cache = self.cache.lock().await;
        cache.access_token = None;
        cache.bump();

        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.store.delete(key) {
                warn!(key, error = %e, "failed to delete persisted token");
            }
        }
        info!("session cleared");
    }

    /// Exchanges the stored refresh token for a rotated pair. `None` on any failure.
    ///
    /// If the session is cleared or replaced while the request is in flight, the
    /// rotated pair is dropped and the current token (if any) is returned instead.
    pub async fn refresh_access_token(&self) -> Option<String> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Recovery path for a request whose `rejected` token drew a 401.
    ///
    /// If another task rotated the pair while this one waited for the gate, the
    /// current token is returned without a second network refresh.
    pub(crate) async fn refresh_after_rejection(&self, rejected: Option<&str>) -> Option<String> {
        let _gate = self.refresh_gate.lock().await;

        if let Some(current) = self.get_access_token().await {
            if rejected != Some(current.as_str()) {
                debug!("access token already rotated by a concurrent refresh");
                return Some(current);
            }
        }

        self.refresh_locked().await
    }

    fn persist_locked(
        &self,
        cache: &mut SessionCache,
        access: &str,
        refresh: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = self.store.set(ACCESS_TOKEN_KEY, access).and_then(|()| match refresh {
            Some(refresh) => self.store.set(REFRESH_TOKEN_KEY, refresh),
            None => Ok(()),
        });

        match result {
            Ok(()) => {
                cache.access_token = Some(access.to_string());
                Ok(())
            }
            Err(e) => {
                // The store is authoritative; the next read reloads whatever landed.
                cache.access_token = None;
                Err(e)
            }
        }
    }

    async fn refresh_locked(&self) -> Option<String> {
        let generation = self.cache.lock().await.generation;

        let refresh_token = match self.store.get(REFRESH_TOKEN_KEY) {
            Ok(value) => non_empty(value),
            Err(e) => {
                warn!(error = %e, "refresh token read failed");
                None
            }
        };
        let Some(refresh_token) = refresh_token else {
            info!("no refresh token stored");
            return None;
        };

        info!("attempting token refresh");
        let res = self
            .http
            .post(&self.refresh_url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .json(&RefreshBody {
                refresh_token: &refresh_token,
            })
            .send()
            .await;

        let res = match res {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %redact_secrets(&e.to_string()), "token refresh failed");
                return None;
            }
        };

        if !res.status().is_success() {
            warn!(status = res.status().as_u16(), "token refresh rejected");
            return None;
        }

        let pair: TokenPair = match res.json().await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %redact_secrets(&e.to_string()), "token refresh returned an unreadable body");
                return None;
            }
        };

        let mut cache = self.cache.lock().await;
        if cache.generation != generation {
            // Whatever replaced the session wins: a cleared session yields `None`,
            // a newer sign-in yields its own token.
            info!("session replaced during refresh; discarding rotated tokens");
            return cache.access_token.clone();
        }
        if let Err(e) = self.persist_locked(&mut cache, &pair.access_token, Some(&pair.refresh_token)) {
            warn!(error = %e, "failed to persist rotated tokens");
            return None;
        }

        info!("token refresh successful");
        Some(pair.access_token)
    }
}
