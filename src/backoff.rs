//! Truncated exponential backoff for task status polling.
//!
//! The [`PollPolicy`] decides how long to wait before each status poll and how
//! many polls are allowed before a task is considered timed out.
//!
//! # Delay Calculation
//!
//! ```text
//! delay[0] = initial_delay
//! delay[n] = ceiling          if delay[n-1] > doubling_limit
//!            delay[n-1] * 2   otherwise
//! ```
//!
//! With defaults the schedule is 1s, 2s, 4s, 8s, 16s, 32s, then 60s for every
//! remaining poll, up to 100 polls.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use ilabs_api::PollPolicy;
//!
//! let delays: Vec<Duration> = PollPolicy::default().delays().take(7).collect();
//! assert_eq!(delays[0], Duration::from_secs(1));
//! assert_eq!(delays[6], Duration::from_secs(60));
//! ```

use std::time::Duration;

/// Default maximum number of status polls.
pub const DEFAULT_MAX_POLLS: u32 = 100;

/// Delay before the first poll (1 second).
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Delays above this stop doubling and jump to the ceiling (30 seconds).
const DEFAULT_DOUBLING_LIMIT: Duration = Duration::from_millis(30_000);

/// Delay used once the doubling limit is exceeded (60 seconds).
const DEFAULT_CEILING: Duration = Duration::from_millis(60_000);

/// Polling schedule for [`Client::await_completion`](crate::Client::await_completion).
///
/// # Default Values
///
/// - `initial_delay`: 1 second
/// - `doubling_limit`: 30 seconds
/// - `ceiling`: 60 seconds
/// - `max_polls`: 100
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before the first poll.
    initial_delay: Duration,

    /// Once a delay exceeds this, the next one is pinned to `ceiling`.
    doubling_limit: Duration,

    /// Pinned delay after the doubling limit.
    ceiling: Duration,

    /// Maximum number of polls before timing out.
    max_polls: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            doubling_limit: DEFAULT_DOUBLING_LIMIT,
            ceiling: DEFAULT_CEILING,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }
}

impl PollPolicy {
    /// Creates a polling policy with custom settings.
    ///
    /// # Arguments
    ///
    /// * `initial_delay` - Delay before the first poll
    /// * `doubling_limit` - Delays above this jump straight to `ceiling`
    /// * `ceiling` - Delay used after the doubling limit
    /// * `max_polls` - Maximum polls (must be >= 1)
    #[must_use]
    pub fn new(
        initial_delay: Duration,
        doubling_limit: Duration,
        ceiling: Duration,
        max_polls: u32,
    ) -> Self {
        Self {
            initial_delay,
            doubling_limit,
            ceiling,
            max_polls: max_polls.max(1),
        }
    }

    /// Creates a policy with a custom poll budget, using defaults for the schedule.
    #[must_use]
    pub fn with_max_polls(max_polls: u32) -> Self {
        Self {
            max_polls: max_polls.max(1),
            ..Self::default()
        }
    }

    /// Returns the maximum number of polls configured.
    #[must_use]
    pub fn max_polls(&self) -> u32 {
        self.max_polls
    }

    /// Returns the delay that follows `previous` in the schedule.
    #[must_use]
    pub fn next_delay(&self, previous: Duration) -> Duration {
        if previous > self.doubling_limit {
            self.ceiling
        } else {
            previous.saturating_mul(2)
        }
    }

    /// Iterates over the delays preceding each poll, one per allowed poll.
    pub fn delays(&self) -> PollDelays<'_> {
        PollDelays {
            policy: self,
            next: self.initial_delay,
            remaining: self.max_polls,
        }
    }
}

/// Iterator returned by [`PollPolicy::delays`].
#[derive(Debug, Clone)]
pub struct PollDelays<'a> {
    policy: &'a PollPolicy,
    next: Duration,
    remaining: u32,
}

impl Iterator for PollDelays<'_> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next;
        self.next = self.policy.next_delay(current);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PollDelays<'_> {}
