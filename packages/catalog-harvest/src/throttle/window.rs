//! Monotonic sliding-window counter.

use std::collections::VecDeque;
use tokio::time::{Duration, Instant};

/// Look-back for minute-scale limits.
pub const MINUTE: Duration = Duration::from_secs(60);
/// Look-back for day-scale limits.
pub const DAY: Duration = Duration::from_secs(86_400);

/// Weighted entries accepted within a fixed look-back span.
///
/// Entries are pushed in time order and pruned from the front: after
/// [`prune`](Self::prune) at `now`, every entry satisfies `now - ts <= span`.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    span: Duration,
    entries: VecDeque<(Instant, u64)>,
}

impl SlidingWindow {
    /// Create an empty window with the given look-back.
    pub fn new(span: Duration) -> Self {
        Self {
            span,
            entries: VecDeque::new(),
        }
    }

    /// Look-back duration.
    pub fn span(&self) -> Duration {
        self.span
    }

    /// Drop entries older than the span.
    pub fn prune(&mut self, now: Instant) {
        while let Some(&(ts, _)) = self.entries.front() {
            if now.saturating_duration_since(ts) > self.span {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record an entry at `at`.
    pub fn push(&mut self, at: Instant, weight: u64) {
        self.entries.push_back((at, weight));
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of weights currently held.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|&(_, w)| w).sum()
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (Instant, u64)> + '_ {
        self.entries.iter().copied()
    }

    /// Timestamp of the `n`-th newest entry (`n = 1` is the newest).
    pub fn nth_newest(&self, n: usize) -> Option<Instant> {
        if n == 0 || n > self.entries.len() {
            return None;
        }
        self.entries.get(self.entries.len() - n).map(|&(ts, _)| ts)
    }

    /// When an entry recorded at `ts` leaves the window.
    pub fn expiry(&self, ts: Instant) -> Instant {
        ts + self.span
    }
}
