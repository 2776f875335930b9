//! Backstop for the opportunistic reap done on every counter increment
//! (spec.md §4.9): windows older than two hours are swept periodically so
//! an idle identifier's stale rows don't linger forever.

use std::time::Duration;

const INTERVAL: Duration = Duration::from_secs(600);
const RETENTION_MICROS: i64 = 2 * 3_600_000_000;

pub async fn run() {
    let mut ticker = tokio::time::interval(INTERVAL);
    loop {
        ticker.tick().await;
        let cutoff = config::now_micros() - RETENTION_MICROS;
        match infra::table::rate_limits::reap_older_than(cutoff).await {
            Ok(rows) if rows > 0 => {
                tracing::info!(target: "webpods::job::rate_limit_reaper", rows, "reaped stale rate-limit windows");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(target: "webpods::job::rate_limit_reaper", error = %err, "reap failed");
            }
        }
    }
}
