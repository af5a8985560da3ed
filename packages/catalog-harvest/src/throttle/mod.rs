//! Windowed request/token throttle for the extraction service.
//!
//! Three windows are tracked: calls per trailing minute, cost (tokens) per
//! trailing minute, and calls per trailing day. The day window is a hard
//! ceiling ([`ThrottleError::QuotaExceeded`]); the minute windows produce
//! waits.
//!
//! The RPM wait targets the `rpm`-th newest call still in the minute window,
//! not the oldest one: under bursts more than `rpm` entries can be in the
//! window and only the `rpm`-th newest decides when a slot frees up.

pub mod window;

pub use window::{SlidingWindow, DAY, MINUTE};

use tokio::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::ThrottleConfig;
use crate::error::ThrottleError;

/// Wait computed by [`Throttle::check`] for a pending call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThrottleDecision {
    /// Wait required by the request-count window
    pub rpm_wait: Duration,

    /// Wait required by the token window
    pub tpm_wait: Duration,

    /// The pending cost alone exceeds the token limit and nothing can be freed
    pub oversized: bool,
}

impl ThrottleDecision {
    /// Effective wait: the larger of the two.
    pub fn wait(&self) -> Duration {
        self.rpm_wait.max(self.tpm_wait)
    }

    /// True when the call may proceed immediately.
    pub fn is_clear(&self) -> bool {
        self.wait().is_zero()
    }
}

/// Per-run rate limiter. Not shared across runs; nothing is persisted.
#[derive(Debug, Clone)]
pub struct Throttle {
    config: ThrottleConfig,
    minute_calls: SlidingWindow,
    minute_tokens: SlidingWindow,
    day_calls: SlidingWindow,
}

impl Throttle {
    /// Create a throttle with empty windows.
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            minute_calls: SlidingWindow::new(MINUTE),
            minute_tokens: SlidingWindow::new(MINUTE),
            day_calls: SlidingWindow::new(DAY),
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    fn prune(&mut self, now: Instant) {
        self.minute_calls.prune(now);
        self.minute_tokens.prune(now);
        self.day_calls.prune(now);
    }

    /// Compute the wait for a call of `cost` at `now` without sleeping.
    pub fn check(&mut self, cost: u64, now: Instant) -> Result<ThrottleDecision, ThrottleError> {
        self.prune(now);

        if self.day_calls.len() >= self.config.rpd as usize {
            return Err(ThrottleError::QuotaExceeded {
                limit: self.config.rpd,
            });
        }

        let mut decision = ThrottleDecision::default();
        let margin = self.config.safety_margin;

        let rpm = self.config.rpm as usize;
        if self.minute_calls.len() >= rpm {
            if let Some(boundary) = self.minute_calls.nth_newest(rpm) {
                let age = now.saturating_duration_since(boundary);
                decision.rpm_wait = self.minute_calls.span().saturating_sub(age) + margin;
            }
        }

        let in_window = self.minute_tokens.total();
        let tpm = self.config.tpm;
        if in_window + cost > tpm {
            let needed = in_window + cost - tpm;
            let mut freed = 0u64;
            let mut release_at = None;
            for (ts, weight) in self.minute_tokens.iter() {
                freed += weight;
                release_at = Some(self.minute_tokens.expiry(ts) + margin);
                if freed >= needed {
                    break;
                }
            }

            match release_at {
                Some(at) if at > now => decision.tpm_wait = at - now,
                _ if cost > tpm => decision.oversized = true,
                _ => {}
            }
        }

        Ok(decision)
    }

    /// Wait until a call of `cost` fits every window, then return the total
    /// time slept.
    ///
    /// Loops check → sleep → check because the windows shift while sleeping.
    /// Does not record the call; pair with [`record`](Self::record).
    pub async fn admit(&mut self, cost: u64) -> Result<Duration, ThrottleError> {
        let mut waited = Duration::ZERO;

        loop {
            let decision = self.check(cost, Instant::now())?;

            if decision.is_clear() {
                if decision.oversized {
                    warn!(
                        cost,
                        tpm_limit = self.config.tpm,
                        "Single request exceeds the TPM limit; proceeding, the API may reject it"
                    );
                }
                return Ok(waited);
            }

            let wait = decision.wait();
            info!(
                wait_secs = wait.as_secs_f64(),
                rpm_wait_secs = decision.rpm_wait.as_secs_f64(),
                tpm_wait_secs = decision.tpm_wait.as_secs_f64(),
                "Throttling: waiting to respect RPM/TPM limits"
            );
            tokio::time::sleep(wait).await;
            waited += wait;
        }
    }

    /// Record an executed call of `cost` now.
    pub fn record(&mut self, cost: u64) {
        self.record_at(cost, Instant::now());
    }

    /// Record an executed call of `cost` at `at`.
    pub fn record_at(&mut self, cost: u64, at: Instant) {
        self.minute_calls.push(at, 1);
        self.day_calls.push(at, 1);
        self.minute_tokens.push(at, cost);
    }

    /// Calls in the minute window as of the last prune.
    pub fn calls_last_minute(&self) -> usize {
        self.minute_calls.len()
    }

    /// Tokens in the minute window as of the last prune.
    pub fn tokens_last_minute(&self) -> u64 {
        self.minute_tokens.total()
    }

    /// Calls in the day window as of the last prune.
    pub fn calls_today(&self) -> usize {
        self.day_calls.len()
    }
}
