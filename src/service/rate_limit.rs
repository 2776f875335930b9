//! Sliding-hour-window rate limiting (spec.md §4.9). Failures fail open:
//! a limiter outage must not take the service down (spec.md §7).

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Read,
    Write,
    PodCreate,
    StreamCreate,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::PodCreate => "pod_create",
            Action::StreamCreate => "stream_create",
        }
    }

    fn limit(self, cfg: &config::Config) -> u64 {
        match self {
            Action::Read => cfg.rate_limit.read_per_hour,
            Action::Write => cfg.rate_limit.write_per_hour,
            Action::PodCreate => cfg.rate_limit.pod_create_per_hour,
            Action::StreamCreate => cfg.rate_limit.stream_create_per_hour,
        }
    }
}

pub struct Decision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: i64,
}

/// Aligns to the next hour boundary, atomically increments the counter,
/// and reaps the previous window opportunistically (spec.md §4.9). On any
/// error, allows the request (fail open).
pub async fn check(identifier: &str, action: Action) -> Decision {
    let cfg = config::get_config();
    if !cfg.rate_limit.enabled {
        return Decision {
            allowed: true,
            limit: u64::MAX,
            remaining: u64::MAX,
            reset_at: 0,
        };
    }

    let limit = action.limit(cfg);
    let now_micros = config::now_micros();
    const HOUR_MICROS: i64 = 3_600_000_000;
    let window_start = now_micros - (now_micros % HOUR_MICROS);
    let reset_at = (window_start + HOUR_MICROS) / 1_000_000;

    match infra::table::rate_limits::increment(identifier, action.as_str(), window_start).await {
        Ok(count) => {
            let _ = infra::table::rate_limits::reap_older_than(window_start).await;
            let count = count as u64;
            Decision {
                allowed: count <= limit,
                limit,
                remaining: limit.saturating_sub(count),
                reset_at,
            }
        }
        Err(err) => {
            tracing::error!(target: "webpods::rate_limit", error = %err, "rate limit check failed, failing open");
            Decision {
                allowed: true,
                limit,
                remaining: limit,
                reset_at,
            }
        }
    }
}
