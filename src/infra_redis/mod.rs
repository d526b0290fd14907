mod cache_log_redis;

pub use cache_log_redis::*;
