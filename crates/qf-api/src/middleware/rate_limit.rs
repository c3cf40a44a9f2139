//! Token bucket rate limiting per client IP.
//!
//! Each call to [`make_rate_limit_layer!`](crate::make_rate_limit_layer)
//! builds an independent bucket set, so every route group gets its own
//! budget. Clients are keyed with `SmartIpKeyExtractor`, which honours
//! `X-Forwarded-For`, `X-Real-Ip` and `Forwarded` before the peer address.

use std::time::Duration;

/// Register, login and token refresh: 5 per second, burst of 10
pub const AUTH_REPLENISH_PERIOD: Duration = Duration::from_millis(200);
pub const AUTH_BURST_SIZE: u32 = 10;

/// Password change, account deletion and joining sections: one token every
/// 30 seconds, burst of 3
pub const SENSITIVE_REPLENISH_PERIOD: Duration = Duration::from_secs(30);
pub const SENSITIVE_BURST_SIZE: u32 = 3;

/// Everything else: 10 per second, burst of 20
pub const GENERAL_REPLENISH_PERIOD: Duration = Duration::from_millis(100);
pub const GENERAL_BURST_SIZE: u32 = 20;

/// Build a `GovernorLayer` that replenishes one token per `$period` and
/// allows bursts of `$burst`. Exceeding the bucket answers 429 with
/// `x-ratelimit-*` headers.
#[macro_export]
macro_rules! make_rate_limit_layer {
    ($period:expr, $burst:expr) => {{
        let governor_conf = ::tower_governor::governor::GovernorConfigBuilder::default()
            .period($period)
            .burst_size($burst)
            .key_extractor(::tower_governor::key_extractor::SmartIpKeyExtractor)
            .use_headers()
            .finish()
            .expect("rate limit period and burst size must be non-zero");

        ::tower_governor::GovernorLayer::new(governor_conf)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use tower::ServiceExt;

    fn request(ip: &str) -> Request<Body> {
        Request::builder()
            .uri("/limited")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_burst_then_429() {
        let app = Router::new()
            .route("/limited", get(|| async { "OK" }))
            .layer(crate::make_rate_limit_layer!(
                SENSITIVE_REPLENISH_PERIOD,
                SENSITIVE_BURST_SIZE
            ));

        for _ in 0..SENSITIVE_BURST_SIZE {
            let response = app.clone().oneshot(request("10.0.0.1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.clone().oneshot(request("10.0.0.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        // Buckets are per client
        let response = app.oneshot(request("10.0.0.2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
