use anyhow::{anyhow, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_SETTINGS_PATH: &str = "settings/defectscope.toml";
const ENV_PREFIX: &str = "DEFECTSCOPE";

pub const KEY_API_BASE_URL: &str = "api.base_url";
pub const KEY_API_REQUEST_TIMEOUT_SECONDS: &str = "api.request_timeout_secs";
pub const KEY_API_OFFLINE_FALLBACK: &str = "api.offline_fallback";
pub const KEY_SESSION_KEYRING_SERVICE: &str = "session.keyring_service";
pub const KEY_SESSION_USER_FETCH_TIMEOUT_SECONDS: &str = "session.user_fetch_timeout_secs";
pub const KEY_LOG_FILTER: &str = "log.filter";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    pub api: ApiSettings,
    pub session: SessionSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub offline_fallback: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
            offline_fallback: true,
        }
    }
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim().trim_end_matches('/').to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub keyring_service: String,
    pub user_fetch_timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            keyring_service: "com.defectscope.mobile".to_string(),
            user_fetch_timeout_secs: 5,
        }
    }
}

impl SessionSettings {
    pub fn user_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.user_fetch_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
    let api = ApiSettings::default();
    let session = SessionSettings::default();
    let log = LogSettings::default();
    builder
        .set_default(KEY_API_BASE_URL, api.base_url)?
        .set_default(KEY_API_REQUEST_TIMEOUT_SECONDS, api.request_timeout_secs)?
        .set_default(KEY_API_OFFLINE_FALLBACK, api.offline_fallback)?
        .set_default(KEY_SESSION_KEYRING_SERVICE, session.keyring_service)?
        .set_default(
            KEY_SESSION_USER_FETCH_TIMEOUT_SECONDS,
            session.user_fetch_timeout_secs,
        )?
        .set_default(KEY_LOG_FILTER, log.filter)
        .map_err(|e| anyhow!(e))
}

/// Defaults, then the optional TOML file, then `DEFECTSCOPE__SECTION__KEY` variables.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(DEFAULT_SETTINGS_PATH);

    let settings: Settings = with_defaults(Config::builder())?
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
