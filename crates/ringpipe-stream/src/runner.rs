//! The cooperative polling driver.
//!
//! A driver operation advances an arbitrary state toward completion using a
//! *ready* predicate, an optional *done* predicate and an *action* function,
//! without ever blocking the caller: a negative poll re-schedules the task
//! instead of spinning, first without delay on the work pool
//! ([`tokio::task::yield_now`]) and then with a linearly growing delay on the
//! timer ([`tokio::time::sleep`]).
//!
//! Three shapes are provided:
//!
//! | Shape | Completes with |
//! |-------|----------------|
//! | [`complete`] | `()` when `ready` first holds |
//! | [`apply`] | the result of `action`, invoked once after `ready` first holds |
//! | [`run_loop`] | the result of the last `action`, issued immediately before `done` first holds |
//!
//! Hook failure is a first-class result: `action` returns `Result` and an
//! error fails the operation immediately; no further polls occur. A deadline,
//! when configured, is checked before every poll pass, so no hook invocation
//! begins after it has elapsed. Suspension happens only between poll passes;
//! within one `action` invocation the state is mutated freely with no await
//! point.

use crate::config::RunnerConfig;
use crate::error::PipeError;
use tokio::time::Instant;

/// Re-poll throttle with a hard deadline.
///
/// The first `immediate_retries` negative polls yield straight back to the
/// work pool; subsequent polls sleep `retries × retry_unit` capped at
/// `retry_cap` (and at the remaining deadline, so expiry is observed
/// promptly). A successful poll resets the ladder.
struct Poller<'a> {
    cfg: &'a RunnerConfig,
    deadline: Option<Instant>,
    retries: u32,
}

impl<'a> Poller<'a> {
    fn new(cfg: &'a RunnerConfig) -> Self {
        Self {
            cfg,
            deadline: cfg.timeout.map(|t| Instant::now() + t),
            retries: 0,
        }
    }

    fn expired(&self) -> bool {
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    fn timeout_error(&self) -> PipeError {
        PipeError::Timeout(self.cfg.timeout.unwrap_or_default())
    }

    fn reset(&mut self) {
        self.retries = 0;
    }

    async fn wait(&mut self) {
        self.retries = self.retries.saturating_add(1);
        if self.retries <= self.cfg.immediate_retries {
            tokio::task::yield_now().await;
            return;
        }
        let mut delay = self
            .cfg
            .retry_unit
            .saturating_mul(self.retries)
            .min(self.cfg.retry_cap);
        if let Some(d) = self.deadline {
            delay = delay.min(d.saturating_duration_since(Instant::now()));
        }
        tracing::trace!(retries = self.retries, ?delay, "throttled re-poll");
        tokio::time::sleep(delay).await;
    }
}

/// Completes once `ready` first returns `true`.
pub async fn complete<S>(
    cfg: &RunnerConfig,
    state: &mut S,
    mut ready: impl FnMut(&mut S) -> bool,
) -> Result<(), PipeError> {
    let mut poller = Poller::new(cfg);
    loop {
        if poller.expired() {
            return Err(poller.timeout_error());
        }
        if ready(state) {
            return Ok(());
        }
        poller.wait().await;
    }
}

/// Invokes `action` exactly once, immediately after `ready` first returns
/// `true`, and completes with its result.
pub async fn apply<S, R>(
    cfg: &RunnerConfig,
    state: &mut S,
    mut ready: impl FnMut(&mut S) -> bool,
    mut action: impl FnMut(&mut S) -> Result<R, PipeError>,
) -> Result<R, PipeError> {
    let mut poller = Poller::new(cfg);
    loop {
        if poller.expired() {
            return Err(poller.timeout_error());
        }
        if ready(state) {
            return action(state);
        }
        poller.wait().await;
    }
}

/// Repeats `action` while `ready` holds and `done` does not, and completes
/// with the result of the last invocation (`None` when `done` held before
/// any action ran).
///
/// While both predicates cooperate (`ready` true, `done` false) the action
/// loop runs tight, with no re-scheduling between iterations; the loop
/// re-enters throttled polling as soon as `ready` drops.
pub async fn run_loop<S, R>(
    cfg: &RunnerConfig,
    state: &mut S,
    mut ready: impl FnMut(&mut S) -> bool,
    mut done: impl FnMut(&mut S) -> bool,
    mut action: impl FnMut(&mut S) -> Result<R, PipeError>,
) -> Result<Option<R>, PipeError> {
    let mut poller = Poller::new(cfg);
    let mut last = None;
    loop {
        if poller.expired() {
            return Err(poller.timeout_error());
        }
        if ready(state) {
            loop {
                if done(state) {
                    return Ok(last);
                }
                last = Some(action(state)?);
                if !ready(state) {
                    break;
                }
            }
            if done(state) {
                return Ok(last);
            }
            poller.reset();
        } else if done(state) {
            return Ok(last);
        } else {
            poller.wait().await;
        }
    }
}
