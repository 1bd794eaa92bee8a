mod auth_state;
mod secret_store;
mod session_manager;

pub use auth_state::{AuthSnapshot, AuthState};
pub use secret_store::{
    default_secret_store, KeyringSecretStore, MemorySecretStore, SecretStore, StoreError,
};
pub use session_manager::{SessionManager, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
