//! Bounded retry polling.
//!
//! [`poll_until`] drives any async action until a predicate accepts its
//! output or the attempt budget is spent. Errors returned by the action are
//! never retried; they propagate on the attempt that produced them.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Attempt budget and fixed delay between attempts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProbePolicy {
    /// Maximum number of attempts. Zero is treated as one.
    pub max_attempts: usize,
    /// Pause between a failed attempt and the next one.
    pub delay: Duration,
}

impl ProbePolicy {
    /// Policy allowing `max_attempts` attempts spaced `delay` apart.
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1_000),
        }
    }
}

/// Terminal state of a probe run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProbeState {
    /// The predicate accepted an observation.
    Succeeded,
    /// The attempt budget ran out first.
    Exhausted,
}

/// Last observation of a probe run and the attempts it consumed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeResult<T> {
    /// Observation from the final attempt.
    pub last: T,
    /// Attempts consumed, between one and the policy's maximum.
    pub attempts: usize,
    pub state: ProbeState,
}

impl<T> ProbeResult<T> {
    /// `true` when the predicate accepted the last observation.
    pub fn succeeded(&self) -> bool {
        self.state == ProbeState::Succeeded
    }
}

/// Runs `action` until `predicate` accepts its output, at most
/// `policy.max_attempts` times, sleeping `policy.delay` between attempts.
///
/// No sleep follows the final attempt.
pub async fn poll_until<T, E, A, Fut, P>(
    policy: &ProbePolicy,
    mut action: A,
    mut predicate: P,
) -> Result<ProbeResult<T>, E>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&T) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0usize;

    loop {
        let observed = action().await?;
        attempts += 1;

        if predicate(&observed) {
            return Ok(ProbeResult {
                last: observed,
                attempts,
                state: ProbeState::Succeeded,
            });
        }

        if attempts >= max_attempts {
            tracing::debug!(attempts, "probe exhausted");
            return Ok(ProbeResult {
                last: observed,
                attempts,
                state: ProbeState::Exhausted,
            });
        }

        tracing::debug!(
            attempt = attempts,
            max_attempts,
            delay = ?policy.delay,
            "probe retrying"
        );
        sleep(policy.delay).await;
    }
}
