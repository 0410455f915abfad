use std::path::PathBuf;
use std::time::Duration;
use crate::compression::compress::CompressionType;
use crate::core::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub analytics_root: PathBuf,
    pub use_rollups: bool,

    // Result cache
    pub cache_capacity: usize,                  // Max memoized results
    pub cache_ttl_secs: u64,                    // Default time-to-live per entry

    // Prewarm pool
    pub prewarm_workers: usize,                 // Worker threads draining the queue
    pub prewarm_queue_size: usize,              // Jobs beyond this are dropped

    // Codec used when writing columnar and rollup segments
    pub compression: CompressionType,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            analytics_root: PathBuf::from("./analytics"),
            use_rollups: true,

            cache_capacity: 2048,
            cache_ttl_secs: 300,

            prewarm_workers: num_cpus::get().clamp(1, 2),
            prewarm_queue_size: 256,

            compression: CompressionType::Lz4,
        }
    }
}

impl Config {
    pub fn with_root(analytics_root: impl Into<PathBuf>) -> Self {
        Config {
            analytics_root: analytics_root.into(),
            ..Config::default()
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(Error::invalid("cache_capacity must be at least 1"));
        }
        if self.cache_ttl_secs == 0 {
            return Err(Error::invalid("cache_ttl_secs must be at least 1"));
        }
        if self.prewarm_workers == 0 {
            return Err(Error::invalid("prewarm_workers must be at least 1"));
        }
        Ok(())
    }
}
