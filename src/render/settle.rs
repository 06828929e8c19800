//! Render completion detection.
//!
//! The renderer never says when it is done, so completion is inferred: the
//! document counts as settled once no block is mid-processing and at least a
//! settling window has passed since the last block finished.
//!
//! This is a best-effort heuristic. A renderer that pauses for longer than
//! the window and then resumes will be reported as settled too early, and a
//! renderer that never stops emitting blocks stalls the wait indefinitely
//! (there is no absolute timeout).

use super::BlockObserver;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Default idle time after the last finished block.
pub const DEFAULT_SETTLE_WINDOW: Duration = Duration::from_millis(100);

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Timing knobs for [`SettleDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleConfig {
    pub settle_window: Duration,
    pub poll_interval: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            settle_window: DEFAULT_SETTLE_WINDOW,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Tracks block activity reported by a renderer.
#[derive(Debug)]
pub struct SettleDetector {
    config: SettleConfig,
    block_processing: AtomicBool,
    /// `None` until the first block finishes.
    last_block_settled_at: Mutex<Option<Instant>>,
}

impl SettleDetector {
    pub fn new(config: SettleConfig) -> Self {
        Self {
            config,
            block_processing: AtomicBool::new(false),
            last_block_settled_at: Mutex::new(None),
        }
    }

    pub fn is_block_processing(&self) -> bool {
        self.block_processing.load(Ordering::SeqCst)
    }

    pub fn last_block_settled_at(&self) -> Option<Instant> {
        *self
            .last_block_settled_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Decide whether rendering has settled as of `now`.
    ///
    /// An open block always blocks settlement. With no open block, a
    /// document whose blocks never finished (or never started) is settled.
    pub fn is_settled_at(&self, now: Instant) -> bool {
        if self.is_block_processing() {
            return false;
        }
        match self.last_block_settled_at() {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.config.settle_window,
        }
    }

    /// Poll until [`is_settled_at`](Self::is_settled_at) holds.
    pub async fn wait_until_settled(&self) {
        let started = Instant::now();
        let mut polls = 0u32;
        while !self.is_settled_at(Instant::now()) {
            polls += 1;
            sleep(self.config.poll_interval).await;
        }
        debug!(
            "Render settled after {:?} ({} polls)",
            started.elapsed(),
            polls
        );
    }
}

impl Default for SettleDetector {
    fn default() -> Self {
        Self::new(SettleConfig::default())
    }
}

impl BlockObserver for SettleDetector {
    fn block_started(&self) {
        self.block_processing.store(true, Ordering::SeqCst);
    }

    fn block_finished(&self) {
        // Timestamp first so a poll never sees "idle" with a stale timestamp.
        *self
            .last_block_settled_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());
        self.block_processing.store(false, Ordering::SeqCst);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
