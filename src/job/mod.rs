pub mod cache_reporter;
pub mod rate_limit_reaper;
