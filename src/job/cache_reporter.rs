//! Periodically logs the four cache pools' hit/miss/eviction counters
//! (spec.md §4.7 "Reporting") so pool sizing can be tuned from production
//! logs without hitting the test-only HTTP surface.

use std::time::Duration;

const INTERVAL: Duration = Duration::from_secs(60);

pub async fn run() {
    let mut ticker = tokio::time::interval(INTERVAL);
    loop {
        ticker.tick().await;
        let report = infra::cache::pools::report();
        tracing::info!(
            target: "webpods::job::cache_reporter",
            pods.hits = report.pods.hits,
            pods.misses = report.pods.misses,
            streams.hits = report.streams.hits,
            streams.misses = report.streams.misses,
            single_records.hits = report.single_records.hits,
            single_records.misses = report.single_records.misses,
            record_lists.hits = report.record_lists.hits,
            record_lists.misses = report.record_lists.misses,
            "cache pool report"
        );
    }
}
