use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters for one worker
#[derive(Debug, Default)]
pub struct WorkerMetrics {
    successful_jobs: AtomicU64,
    failed_jobs: AtomicU64,
    working_time_micros: AtomicU64,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, took: Duration) {
        self.successful_jobs.fetch_add(1, Ordering::Relaxed);
        self.add_working_time(took);
    }

    pub fn record_failure(&self, took: Duration) {
        self.failed_jobs.fetch_add(1, Ordering::Relaxed);
        self.add_working_time(took);
    }

    fn add_working_time(&self, took: Duration) {
        let micros = u64::try_from(took.as_micros()).unwrap_or(u64::MAX);
        self.working_time_micros.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn successful_jobs(&self) -> u64 {
        self.successful_jobs.load(Ordering::Relaxed)
    }

    pub fn failed_jobs(&self) -> u64 {
        self.failed_jobs.load(Ordering::Relaxed)
    }

    pub fn processed_jobs(&self) -> u64 {
        self.successful_jobs() + self.failed_jobs()
    }

    /// Time spent inside job bodies
    pub fn total_working_time(&self) -> Duration {
        Duration::from_micros(self.working_time_micros.load(Ordering::Relaxed))
    }

    /// Calculate success rate as percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.processed_jobs();
        if total == 0 {
            100.0
        } else {
            (self.successful_jobs() as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_time_accumulate() {
        let metrics = WorkerMetrics::new();
        assert_eq!(metrics.success_rate(), 100.0);

        metrics.record_success(Duration::from_millis(3));
        metrics.record_success(Duration::from_millis(2));
        metrics.record_failure(Duration::from_millis(5));

        assert_eq!(metrics.successful_jobs(), 2);
        assert_eq!(metrics.failed_jobs(), 1);
        assert_eq!(metrics.total_working_time(), Duration::from_millis(10));
        assert!((metrics.success_rate() - 66.666).abs() < 0.01);
    }
}
