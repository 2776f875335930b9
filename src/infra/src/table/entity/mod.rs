pub mod pod;
pub mod rate_limit;
pub mod record;
pub mod stream;
