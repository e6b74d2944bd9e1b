//! Reconnect strategy for watch and log-follow tasks.
//!
//! A [`RetryStrategy`] pairs a retry policy (how many reconnects) with a
//! backoff (how long between them) and an optional jitter factor. The
//! strategy itself is cheap plain data; [`RetryStrategy::schedule`]
//! produces the iterator a single streaming task owns and drains.

use std::time::Duration;

use rand::Rng;

/// Governs how often a streaming task reconnects.
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    /// Delay before the first reconnect
    pub initial_delay: Duration,
    /// Random spread applied to delays from the second attempt on, as a
    /// fraction of the computed delay (`0.2` means ±20%)
    pub jitter: f64,
    /// How many reconnects are attempted
    pub policy: RetryPolicy,
    /// How the delay between reconnects evolves
    pub backoff: Backoff,
}

/// How many reconnect attempts a task makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Reconnect forever
    Always,
    /// Never reconnect
    Never,
    /// Reconnect at most this many times
    MaxAttempts(u32),
}

impl RetryPolicy {
    fn should_retry(&self, attempt: u32) -> bool {
        match self {
            RetryPolicy::Always => true,
            RetryPolicy::Never => false,
            RetryPolicy::MaxAttempts(n) => attempt <= *n,
        }
    }
}

/// How the delay between reconnects evolves.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Reconnect immediately
    None,
    /// Add a fixed amount to the previous delay
    Fixed(Duration),
    /// Multiply the previous delay, clamped at a maximum
    Exponential {
        /// Upper bound for the computed delay
        max_delay: Duration,
        /// Factor applied to the previous delay
        multiplier: f64,
    },
}

impl Backoff {
    fn compute_next(&self, current: Duration) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(step) => current + *step,
            Backoff::Exponential { max_delay, multiplier } => {
                std::cmp::min(current.mul_f64(*multiplier), *max_delay)
            }
        }
    }
}

impl Default for RetryStrategy {
    /// Ten fixed-step reconnects: 1s, 6s, 11s, ... with ±20% jitter
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            jitter: 0.2,
            policy: RetryPolicy::MaxAttempts(10),
            backoff: Backoff::Fixed(Duration::from_secs(5)),
        }
    }
}

impl RetryStrategy {
    /// Reconnect forever with a fixed delay and no jitter
    pub fn forever(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            jitter: 0.0,
            policy: RetryPolicy::Always,
            backoff: Backoff::Fixed(Duration::ZERO),
        }
    }

    /// Never reconnect
    pub fn never() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            jitter: 0.0,
            policy: RetryPolicy::Never,
            backoff: Backoff::None,
        }
    }

    /// The attempt iterator a single streaming task drains
    pub fn schedule(&self) -> RetrySchedule {
        RetrySchedule {
            strategy: self.clone(),
            attempt: 0,
            current_delay: Duration::ZERO,
        }
    }
}

/// One entry of a [`RetrySchedule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based attempt counter
    pub attempt: u32,
    /// How long to sleep before this reconnect
    pub delay: Duration,
}

/// Iterator over reconnect attempts; owned by exactly one task.
#[derive(Debug)]
pub struct RetrySchedule {
    strategy: RetryStrategy,
    attempt: u32,
    current_delay: Duration,
}

impl RetrySchedule {
    /// Attempts handed out so far
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

impl Iterator for RetrySchedule {
    type Item = RetryAttempt;

    fn next(&mut self) -> Option<RetryAttempt> {
        let attempt = self.attempt + 1;
        if !self.strategy.policy.should_retry(attempt) {
            return None;
        }
        self.attempt = attempt;

        let base = if attempt == 1 {
            self.strategy.initial_delay
        } else {
            self.strategy.backoff.compute_next(self.current_delay)
        };
        self.current_delay = base;

        // jitter only spreads the follow-up attempts
        let delay = if attempt >= 2 && self.strategy.jitter > 0.0 {
            let spread = rand::thread_rng().gen_range(-self.strategy.jitter..=self.strategy.jitter);
            base.mul_f64((1.0 + spread).max(0.0))
        } else {
            base
        };

        Some(RetryAttempt { attempt, delay })
    }
}
