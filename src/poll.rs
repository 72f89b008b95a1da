use std::fmt::Debug;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{HarnessError, HarnessResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

// Probes run at t=0 and then every `interval`; the last probe is clamped to the
// deadline so a timeout equal to the interval still gets two observations.
// A timeout past what `Instant` can represent never expires.
pub fn poll_until<T, P, F>(
    description: &str,
    policy: PollPolicy,
    mut probe: P,
    mut predicate: F,
) -> HarnessResult<T>
where
    T: Debug,
    P: FnMut() -> HarnessResult<T>,
    F: FnMut(&T) -> bool,
{
    let started = Instant::now();
    let deadline = started.checked_add(policy.timeout);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let last_value = match probe() {
            Ok(value) => {
                if predicate(&value) {
                    debug!(
                        condition = description,
                        attempts,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "poll condition satisfied"
                    );
                    return Ok(value);
                }
                format!("{value:?}")
            }
            Err(error) => format!("error: {error}"),
        };
        debug!(condition = description, attempts, last = %last_value, "poll condition not yet satisfied");

        let now = Instant::now();
        if deadline.is_some_and(|d| now >= d) {
            warn!(
                condition = description,
                attempts,
                timeout_ms = policy.timeout.as_millis() as u64,
                "poll timed out"
            );
            return Err(HarnessError::PollTimeout {
                description: description.to_string(),
                timeout: policy.timeout,
                attempts,
                last_value,
            });
        }
        let remaining = deadline.map_or(policy.interval, |d| d - now);
        thread::sleep(policy.interval.min(remaining));
    }
}
