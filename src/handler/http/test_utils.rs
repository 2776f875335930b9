//! Test-only surface: cache stats reporting and a full-state reset
//! (spec.md §4.7 "Reporting", §9 "expose a test-only reset entry point").
//! Always gated behind `config.server.testing`, never reachable in a
//! production deployment.

use actix_web::{HttpResponse, get, post, web};

use crate::errors::{ApiError, Result};

fn require_testing() -> Result<()> {
    if config::get_config().server.testing {
        Ok(())
    } else {
        Err(ApiError::NotFound)
    }
}

#[derive(serde::Serialize)]
struct PoolStats {
    hits: u64,
    misses: u64,
    evictions: u64,
    current_size: usize,
    entry_count: usize,
}

impl From<infra::cache::CacheStats> for PoolStats {
    fn from(s: infra::cache::CacheStats) -> Self {
        Self {
            hits: s.hits,
            misses: s.misses,
            evictions: s.evictions,
            current_size: s.current_size,
            entry_count: s.entry_count,
        }
    }
}

#[get("/test-utils/cache-stats")]
pub async fn cache_stats() -> Result<HttpResponse> {
    require_testing()?;
    let report = infra::cache::pools::report();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "pods": PoolStats::from(report.pods),
        "streams": PoolStats::from(report.streams),
        "singleRecords": PoolStats::from(report.single_records),
        "recordLists": PoolStats::from(report.record_lists),
    })))
}

#[post("/test-utils/reset")]
pub async fn reset(_body: web::Bytes) -> Result<HttpResponse> {
    require_testing()?;
    infra::db::reset_all().await?;
    infra::cache::pools::reset_all();
    Ok(HttpResponse::NoContent().finish())
}
