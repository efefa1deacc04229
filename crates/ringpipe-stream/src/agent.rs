//! The agent base: `ready`/`done`/`action` hooks plus single-operation
//! discipline.
//!
//! An [`Agent`] packages the three driver hooks with whatever state the
//! stage owns (rings, a source or sink, codec scratch). The [`AgentDriver`]
//! wraps it with an atomic mode so at most one driver operation runs at a
//! time: `apply` performs a single action (mode `Once`), `run_to_done` drives
//! the agent until its `done` predicate holds (mode `Loop`). Either way the
//! agent is observably back to `Idle` on every exit path, including a
//! cancelled operation future.

use crate::config::RunnerConfig;
use crate::error::PipeError;
use crate::runner;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// What an agent is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    /// No operation in flight; the only state new operations start from.
    Idle,
    /// A single-action operation is in flight.
    Once,
    /// A run-to-completion operation is in flight.
    Loop,
}

impl AgentMode {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => AgentMode::Once,
            2 => AgentMode::Loop,
            _ => AgentMode::Idle,
        }
    }
}

/// A pipeline stage driven by the cooperative poller.
///
/// `ready` reports whether the next `action` can make progress; `done`
/// reports that the stage will never make progress again (its input is
/// drained and its output latched). `action` performs one non-suspending unit
/// of work. `abort` is invoked when a driver operation fails or times out,
/// and should latch EOS on the stage's output so downstream stages observe a
/// normal end of stream.
pub trait Agent: Send {
    type Output: Send;

    fn ready(&mut self) -> bool;
    fn done(&mut self) -> bool;
    fn action(&mut self) -> Result<Self::Output, PipeError>;

    /// Terminal-failure hook; default does nothing.
    fn abort(&mut self) {}
}

/// Cloneable observer for an agent's mode.
#[derive(Debug, Clone)]
pub struct AgentStatus(Arc<AtomicU8>);

impl AgentStatus {
    pub fn mode(&self) -> AgentMode {
        AgentMode::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn is_idle(&self) -> bool {
        self.mode() == AgentMode::Idle
    }
}

/// Resets the mode to Idle when the operation ends, even if its future is
/// dropped mid-flight.
struct ModeGuard(Arc<AtomicU8>);

impl Drop for ModeGuard {
    fn drop(&mut self) {
        self.0.store(AgentMode::Idle as u8, Ordering::Release);
    }
}

/// Owns an agent and enforces one driver operation at a time.
pub struct AgentDriver<A: Agent> {
    agent: A,
    mode: Arc<AtomicU8>,
}

impl<A: Agent> AgentDriver<A> {
    pub fn new(agent: A) -> Self {
        Self {
            agent,
            mode: Arc::new(AtomicU8::new(AgentMode::Idle as u8)),
        }
    }

    /// A handle other tasks can use to observe this agent's mode.
    pub fn status(&self) -> AgentStatus {
        AgentStatus(Arc::clone(&self.mode))
    }

    pub fn is_idle(&self) -> bool {
        self.mode.load(Ordering::Acquire) == AgentMode::Idle as u8
    }

    /// Borrows the wrapped agent between operations.
    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn into_inner(self) -> A {
        self.agent
    }

    fn enter(&self, target: AgentMode) -> Result<ModeGuard, PipeError> {
        self.mode
            .compare_exchange(
                AgentMode::Idle as u8,
                target as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| PipeError::AlreadyBusy)?;
        Ok(ModeGuard(Arc::clone(&self.mode)))
    }

    /// Waits until the agent is ready, performs one action, returns to Idle.
    pub async fn apply(&mut self, cfg: &RunnerConfig) -> Result<A::Output, PipeError> {
        let _guard = self.enter(AgentMode::Once)?;
        let result = runner::apply(cfg, &mut self.agent, A::ready, A::action).await;
        self.settle(result)
    }

    /// Drives the agent until `done` holds, returning the last action result
    /// (`None` when the agent was already done). Returns to Idle either way.
    pub async fn run_to_done(
        &mut self,
        cfg: &RunnerConfig,
    ) -> Result<Option<A::Output>, PipeError> {
        let _guard = self.enter(AgentMode::Loop)?;
        let result = runner::run_loop(cfg, &mut self.agent, A::ready, A::done, A::action).await;
        self.settle(result)
    }

    /// Routes terminal failures through the agent's abort hook so its output
    /// ring latches EOS before the error surfaces.
    fn settle<R>(&mut self, result: Result<R, PipeError>) -> Result<R, PipeError> {
        if let Err(err) = &result {
            if err.is_terminal() {
                tracing::warn!(%err, "agent operation failed; latching downstream EOS");
                self.agent.abort();
            }
        }
        result
    }
}
