use serde::{Serialize, Deserialize};

/// Result cache counters. Prewarm counters are monotonic for the lifetime
/// of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub size: usize,
    pub capacity: usize,
    pub prewarm_success: u64,
    pub prewarm_failure: u64,
    pub prewarm_dropped: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_handles_empty_cache() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
        let stats = CacheStats { hit_count: 3, miss_count: 1, ..CacheStats::default() };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
