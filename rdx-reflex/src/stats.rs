//! Pause-aware click-interval statistics.

use crate::clock::Segment;
use crate::common::Millis;
use crate::error::{ReflexError, Result};
use std::collections::VecDeque;

const CLICK_QUEUE_CAPACITY: usize = 2;

/// Sums the pause windows between consecutive segments that fall inside the
/// click pair `(first, second)`.
///
/// A pause window `(segments[i].end, segments[i + 1].start)` counts, in full,
/// when it begins after `first` and ends before `second`. Windows are never
/// clipped to the pair.
pub fn paused_between(segments: &[Segment], first: Millis, second: Millis) -> Millis {
    segments
        .windows(2)
        .filter_map(|pair| {
            let end = pair[0].end?;
            let resumed = pair[1].start;
            (end > first && resumed < second).then(|| resumed.saturating_sub(end))
        })
        .sum()
}

/// Latency statistics over accepted clicks.
#[derive(Debug, Clone, Default)]
pub struct ClickStats {
    click_times: VecDeque<Millis>,
    intervals: Vec<i64>,
}

impl ClickStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a click time. Once two are queued, records their interval minus
    /// any paused time between them and drops the older one.
    ///
    /// Returns the interval recorded by this click, if any. A click time
    /// earlier than the queued one is rejected without changing anything.
    pub fn record(&mut self, at: Millis, segments: &[Segment]) -> Result<Option<i64>> {
        if let Some(&previous) = self.click_times.back() {
            if at < previous {
                return Err(ReflexError::InvalidSequence {
                    first: previous,
                    second: at,
                });
            }
        }

        self.click_times.push_back(at);
        if self.click_times.len() < CLICK_QUEUE_CAPACITY {
            return Ok(None);
        }

        let (first, second) = (self.click_times[0], self.click_times[1]);
        let raw = (second - first) as i64;
        let interval = raw - paused_between(segments, first, second) as i64;
        self.intervals.push(interval);
        self.click_times.pop_front();
        Ok(Some(interval))
    }

    /// The rounded mean interval in milliseconds, or 0 with no intervals.
    pub fn average(&self) -> i64 {
        if self.intervals.is_empty() {
            return 0;
        }
        let sum: i64 = self.intervals.iter().sum();
        (sum as f64 / self.intervals.len() as f64).round() as i64
    }

    pub fn intervals(&self) -> &[i64] {
        &self.intervals
    }

    /// Number of click times waiting for a partner.
    pub fn pending(&self) -> usize {
        self.click_times.len()
    }

    pub fn reset(&mut self) {
        self.click_times.clear();
        self.intervals.clear();
    }
}
