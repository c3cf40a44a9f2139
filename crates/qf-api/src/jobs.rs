//! Background jobs for periodic maintenance.

use std::time::Duration;

use qf_db::repositories::{attempt as attempt_repo, token as token_repo};
use sqlx::PgPool;
use tokio::{task::JoinHandle, time::interval};

use crate::{cache::ResponseCache, metrics::record_job_run};

const TOKEN_CLEANUP_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);
const STALE_ATTEMPT_INTERVAL: Duration = Duration::from_secs(15 * 60);
const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// In-progress attempts without a heartbeat for this long are abandoned
pub const STALE_ATTEMPT_HOURS: i32 = 24;

/// Start all background jobs
///
/// Returns the join handles so they can be aborted on shutdown
pub fn start_background_jobs(pool: PgPool, cache: ResponseCache) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(periodic_token_cleanup_job(pool.clone())),
        tokio::spawn(periodic_stale_attempt_job(pool)),
        tokio::spawn(periodic_cache_purge_job(cache)),
    ]
}

/// Delete expired refresh tokens every 6 hours
async fn periodic_token_cleanup_job(pool: PgPool) {
    let mut interval = interval(TOKEN_CLEANUP_INTERVAL);

    loop {
        interval.tick().await;

        match token_repo::cleanup_expired_refresh_tokens(&pool).await {
            Ok(deleted) => {
                record_job_run("token_cleanup", deleted, true);
                if deleted > 0 {
                    tracing::info!(deleted, "Expired refresh tokens cleaned up");
                } else {
                    tracing::debug!("Token cleanup complete: no expired tokens found");
                }
            }
            Err(e) => {
                record_job_run("token_cleanup", 0, false);
                tracing::error!(error = %e, "Failed to clean up expired refresh tokens");
            }
        }
    }
}

/// Mark attempts that stopped sending heartbeats as abandoned
async fn periodic_stale_attempt_job(pool: PgPool) {
    let mut interval = interval(STALE_ATTEMPT_INTERVAL);

    loop {
        interval.tick().await;

        match attempt_repo::abandon_stale(&pool, STALE_ATTEMPT_HOURS).await {
            Ok(abandoned) => {
                record_job_run("stale_attempts", abandoned, true);
                if abandoned > 0 {
                    tracing::info!(abandoned, "Stale quiz attempts abandoned");
                }
            }
            Err(e) => {
                record_job_run("stale_attempts", 0, false);
                tracing::error!(error = %e, "Failed to abandon stale quiz attempts");
            }
        }
    }
}

/// Drop expired cache entries that were never read again
async fn periodic_cache_purge_job(cache: ResponseCache) {
    let mut interval = interval(CACHE_PURGE_INTERVAL);

    loop {
        interval.tick().await;

        let purged = cache.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, remaining = cache.len(), "Expired cache entries purged");
        }
    }
}
