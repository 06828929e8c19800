//! Progress accounting for a batch of image resolutions.

use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Callback receiving batch progress as a percentage.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Counts settled resolutions against the batch size. Purely observational.
pub struct ProgressTracker {
    total: usize,
    completed: AtomicUsize,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub fn new(total: usize, callback: Option<ProgressCallback>) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            callback,
        }
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Record one settled resolution (success and fallback count the same)
    /// and report the new percentage.
    pub fn settle_one(&self) -> f64 {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        let percent = if self.total == 0 {
            100.0
        } else {
            completed as f64 / self.total as f64 * 100.0
        };
        debug!(
            "Image resolution progress: {}/{} ({:.0}%)",
            completed, self.total, percent
        );
        if let Some(callback) = &self.callback {
            callback(percent);
        }
        percent
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("total", &self.total)
            .field("completed", &self.completed())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_reports_percentages() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let tracker = ProgressTracker::new(4, Some(Arc::new(move |p| sink.lock().unwrap().push(p))));

        for _ in 0..4 {
            tracker.settle_one();
        }
        assert_eq!(*seen.lock().unwrap(), vec![25.0, 50.0, 75.0, 100.0]);
        assert_eq!(tracker.completed(), 4);
    }

    #[test]
    fn test_without_callback() {
        let tracker = ProgressTracker::new(2, None);
        assert_eq!(tracker.settle_one(), 50.0);
        assert_eq!(tracker.completed(), 1);
    }
}
