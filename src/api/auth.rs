use super::client::{decode, ApiClient, ApiError, PendingRequest};
use crate::types::{TokenPair, TokenResponse, User};
use tracing::{debug, info, warn};

const LOGIN_PATH: &str = "/api/auth/mobile/login";
const LOGOUT_PATH: &str = "/api/auth/logout";
const CURRENT_USER_PATH: &str = "/api/auth/me";

impl ApiClient {
    /// Form-encoded sign-in. Stores the issued access/refresh pair on success.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        info!(username, "signing in");
        let request =
            PendingRequest::post(LOGIN_PATH).form(&[("username", username), ("password", password)]);

        let res = match self.send_public(&request).await {
            Ok(r) => r,
            Err(e) => {
                warn!(username, error = %e, "login failed");
                return Err(e);
            }
        };

        let pair: TokenPair = decode(res).await?;
        self.session()
            .set_tokens(&pair.access_token, Some(&pair.refresh_token))
            .await?;
        info!(username, "login succeeded; access and refresh tokens stored");

        Ok(TokenResponse::from(&pair))
    }

    /// Best-effort server logout. The local session is cleared whatever the outcome.
    pub async fn logout(&self) {
        if let Err(e) = self.execute(PendingRequest::post(LOGOUT_PATH)).await {
            debug!(error = %e, "logout request failed; clearing local session anyway");
        }
        self.session().clear_tokens().await;
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.get_json(CURRENT_USER_PATH).await
    }
}
