mod auth;
mod chat;
mod client;
mod dashboard;
mod defects;
mod fallback;

pub use client::{ApiClient, ApiError};
pub use dashboard::{DEFAULT_RECENT_DEFECTS, DEFAULT_TREND_DAYS};
