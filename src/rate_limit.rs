// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Rolling-window throttle for label writes.
//!
//! Each plugin owns its own limiter, since provider quotas differ per resource type.
//! Callers over the cap are delayed, never rejected.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Allows at most `calls` acquisitions in any rolling `period`.
#[derive(Debug)]
pub struct RateLimiter {
    calls: usize,
    period: Duration,
    /// Start times of the calls still inside the window, oldest first
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter for `calls` per `period`. A zero `calls` is treated as one.
    #[must_use]
    pub fn new(calls: u32, period: Duration) -> Self {
        let calls = usize::try_from(calls).unwrap_or(usize::MAX).max(1);
        Self {
            calls,
            period,
            window: Mutex::new(VecDeque::with_capacity(calls)),
        }
    }

    /// Calls allowed per window.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Window length.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait until a call is allowed, then record it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.window.lock().await;
                let now = Instant::now();
                while window
                    .front()
                    .is_some_and(|start| now.duration_since(*start) >= self.period)
                {
                    window.pop_front();
                }
                if window.len() < self.calls {
                    window.push_back(now);
                    return;
                }
                // Full: the oldest call leaves the window first
                match window.front() {
                    Some(oldest) => (*oldest + self.period).saturating_duration_since(now),
                    None => Duration::ZERO,
                }
            };
            debug!(
                calls = self.calls,
                period = ?self.period,
                wait = ?wait,
                "Rate limit reached, sleeping"
            );
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod rate_limit_tests;
