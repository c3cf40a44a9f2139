pub mod attempt;
pub mod auth;
pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod extract;
pub mod flashcard;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod quiz;
pub mod router;
pub mod section;
pub mod state;
pub mod tracing;
pub mod user;
pub mod v1;
pub mod validation;

pub use config::ApiConfig;
pub use state::{ApiState, AuthConfig, CookieConfig};
