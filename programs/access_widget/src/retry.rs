//! Bounded retry with backoff.
//!
//! Waiting for the ledger (a new account becoming visible, a signature reaching
//! a commitment) is expressed as a bounded number of attempts, never as an
//! open-ended loop or a wall-clock deadline.

use std::future::Future;
use std::time::Duration;

use log::debug;

use crate::constants::{account_poll, confirmation_poll};

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failed attempt.
    Fixed(Duration),
    /// No delay for the first `eager_attempts`, then `delay`.
    Stepped { eager_attempts: u32, delay: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

/// Outcome of a single attempt.
pub enum Attempt<T> {
    Ready(T),
    Retry,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    /// Polling a freshly created account.
    pub const fn account_creation() -> Self {
        Self::fixed(account_poll::MAX_ATTEMPTS, account_poll::DELAY)
    }

    /// Polling a signature until it reaches the requested commitment.
    pub const fn confirmation() -> Self {
        Self {
            max_attempts: confirmation_poll::MAX_ATTEMPTS,
            backoff: Backoff::Stepped {
                eager_attempts: confirmation_poll::EAGER_ATTEMPTS,
                delay: confirmation_poll::DELAY,
            },
        }
    }

    /// Delay to wait after failed attempt number `attempt` (zero-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Stepped {
                eager_attempts,
                delay,
            } => {
                if attempt < eager_attempts {
                    Duration::ZERO
                } else {
                    delay
                }
            }
        }
    }

    /// Run `op` until it is ready, fails, or the attempts are exhausted.
    ///
    /// Errors from `op` abort immediately; only [`Attempt::Retry`] is retried.
    /// Returns `Ok(None)` when every attempt asked for a retry.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<Option<T>, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Attempt<T>, E>>,
    {
        for attempt in 0..self.max_attempts {
            if let Attempt::Ready(value) = op(attempt).await? {
                return Ok(Some(value));
            }
            let is_last = attempt + 1 == self.max_attempts;
            if !is_last {
                let delay = self.delay_after(attempt);
                if !delay.is_zero() {
                    debug!("attempt {} not ready, retrying in {:?}", attempt + 1, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Ok(None)
    }
}
