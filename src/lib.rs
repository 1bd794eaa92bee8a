pub mod api;
pub mod logging;
mod redact;
pub mod settings;
pub mod state;
pub mod types;

pub use redact::redact_secrets;
