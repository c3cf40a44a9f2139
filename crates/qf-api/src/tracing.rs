//! Log output for the QuizForge server.
//!
//! Development prints pretty multi-line events with file and line; every
//! other environment writes one flattened JSON object per event. `RUST_LOG`
//! replaces the default filter, e.g. `RUST_LOG=qf_api=trace,sqlx=info`.

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Environment;

/// Our own crates log at debug while developing; dependencies stay quieter
const DEVELOPMENT_FILTER: &str = "info,qf_api=debug,qf_db=debug,tower_http=debug,sqlx=warn";
const PRODUCTION_FILTER: &str = "info,tower_http=info,tower_governor=warn,sqlx=warn";

fn default_filter(env: &Environment) -> &'static str {
    if env.is_development() {
        DEVELOPMENT_FILTER
    } else {
        PRODUCTION_FILTER
    }
}

fn env_filter(env: &Environment) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(env)))
}

pub fn init_tracing(env: &Environment) {
    let filter = env_filter(env);
    let registry = tracing_subscriber::registry();

    if env.is_development() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .pretty()
                    .with_filter(filter),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .flatten_event(true)
                    .with_target(true)
                    .with_filter(filter),
            )
            .init();
    }

    tracing::info!(
        environment = ?env,
        filter = default_filter(env),
        "QuizForge logging initialized"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters_parse() {
        for filter in [DEVELOPMENT_FILTER, PRODUCTION_FILTER] {
            assert!(EnvFilter::try_new(filter).is_ok(), "{filter} should parse");
        }
    }

    #[test]
    fn test_development_filter_raises_our_crates() {
        let filter = default_filter(&Environment::Development);
        assert!(filter.contains("qf_api=debug"));
        assert!(filter.contains("qf_db=debug"));
        assert!(!default_filter(&Environment::Production).contains("qf_api=debug"));
    }
}
