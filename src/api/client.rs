use crate::redact::redact_secrets;
use crate::settings::ApiSettings;
use crate::state::{SessionManager, StoreError};
use crate::types::ApiErrorBody;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("session expired; sign in again")]
    SessionExpired,
    #[error("{message} ({status})")]
    Status { status: u16, message: String },
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::SessionExpired => Some(StatusCode::UNAUTHORIZED.as_u16()),
            _ => None,
        }
    }

    /// Dead session or a rejected credential, as opposed to a transport or server fault.
    pub fn is_auth_failure(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED.as_u16())
    }
}

#[derive(Debug, Clone)]
pub(crate) enum RequestBody {
    Empty,
    Json(Value),
    Form(String),
}

/// One logical outbound call. `retried` flips once, after the single refresh.
#[derive(Debug, Clone)]
pub(crate) struct PendingRequest {
    method: Method,
    path: String,
    body: RequestBody,
    retried: bool,
}

impl PendingRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::Empty,
            retried: false,
        }
    }

    pub(crate) fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub(crate) fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub(crate) fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub(crate) fn form(mut self, fields: &[(&str, &str)]) -> Self {
        let encoded = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.body = RequestBody::Form(encoded);
        self
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn is_retried(&self) -> bool {
        self.retried
    }

    fn into_retry(self) -> Self {
        Self {
            retried: true,
            ..self
        }
    }
}

fn error_message(status: u16, body: &str) -> String {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.detail)
        .ok()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("API error ({status})"));
    redact_secrets(&message).into_owned()
}

pub(crate) async fn ensure_success(res: Response) -> Result<Response, ApiError> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status,
        message: error_message(status, &body),
    })
}

pub(crate) async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, ApiError> {
    let text = res.text().await?;
    Ok(serde_json::from_str(&text)?)
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionManager,
    offline_fallback: bool,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings, session: SessionManager) -> Result<Self, ApiError> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(settings.request_timeout())
                .build()?,
            base_url: settings.normalized_base_url(),
            session,
            offline_fallback: settings.offline_fallback,
        })
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub(crate) fn offline_fallback(&self) -> bool {
        self.offline_fallback
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn dispatch(
        &self,
        request: &PendingRequest,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path))
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(encoded) => builder
                .header(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                )
                .body(encoded.clone()),
        };

        Ok(builder.send().await?)
    }

    /// Sends `request` with the session's bearer token and recovers once from a 401.
    ///
    /// A 401 on a fresh request triggers one refresh and one re-issue with the new
    /// token. A 401 on the re-issued request is returned as-is. When no new token can
    /// be obtained the session is cleared and [`ApiError::SessionExpired`] returned.
    /// Transport failures propagate without touching the session.
    pub(crate) async fn execute(&self, mut request: PendingRequest) -> Result<Response, ApiError> {
        let mut token = self.session.get_access_token().await;

        loop {
            let res = self.dispatch(&request, token.as_deref()).await?;
            let status = res.status();

            if status != StatusCode::UNAUTHORIZED || request.is_retried() {
                let outcome = match (status.is_success(), request.is_retried()) {
                    (true, false) => "success",
                    (true, true) => "retried_success",
                    (false, false) => "failed_non_401",
                    (false, true) => "retried_failed",
                };
                debug!(path = request.path(), status = status.as_u16(), outcome, "request finished");
                return ensure_success(res).await;
            }

            request = request.into_retry();
            debug!(path = request.path(), "access token rejected; refreshing");

            match self.session.refresh_after_rejection(token.as_deref()).await {
                Some(fresh) => token = Some(fresh),
                None => {
                    self.session.clear_tokens().await;
                    debug!(path = request.path(), outcome = "session_cleared", "request finished");
                    return Err(ApiError::SessionExpired);
                }
            }
        }
    }

    /// Sends `request` without a bearer token and without 401 recovery.
    pub(crate) async fn send_public(&self, request: &PendingRequest) -> Result<Response, ApiError> {
        let res = self.dispatch(request, None).await?;
        ensure_success(res).await
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let res = self.execute(PendingRequest::get(path)).await?;
        decode(res).await
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let res = self.execute(PendingRequest::post(path).json(body)?).await?;
        decode(res).await
    }
}
