//! Turns fire-and-forget daemon movements into calls that return once the
//! robot stopped moving.
//!
//! Movements with a known duration sleep through it first and then confirm
//! completion with a short poll. Animations and recorded moves have no known
//! length, so they only get a short start grace before a longer poll. In
//! every case the wait is best effort: hitting the ceiling or losing the
//! daemon while polling ends the wait without an error.

use crate::daemon_api::MovementProbe;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Time source for the waiter, swapped out in tests
#[async_trait]
pub trait Clock: Send + Sync {
    /// Monotonic time since an arbitrary origin
    fn now(&self) -> Duration;
    async fn sleep(&self, duration: Duration);
}

pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        TokioClock {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaitPolicy {
    /// Commanded movement length, `None` for animations of unknown length
    pub nominal: Option<Duration>,
    /// Added on top of the nominal duration before polling
    pub settle_buffer: Duration,
    /// Lets the daemon start an animation before the first poll
    pub start_grace: Duration,
    pub poll_interval: Duration,
    /// Upper bound of the poll phase
    pub ceiling: Duration,
    /// Pause after the daemon reports idle
    pub final_settle: Duration,
}

impl WaitPolicy {
    /// Single goto style command
    pub fn goto(duration_secs: f64) -> WaitPolicy {
        WaitPolicy {
            nominal: Some(secs(duration_secs)),
            settle_buffer: Duration::from_millis(200),
            start_grace: Duration::ZERO,
            poll_interval: Duration::from_millis(120),
            ceiling: Duration::from_secs(2),
            final_settle: Duration::from_millis(100),
        }
    }

    /// One step of a preset motion
    pub fn preset_step(duration_secs: f64) -> WaitPolicy {
        WaitPolicy {
            settle_buffer: Duration::from_millis(150),
            ..WaitPolicy::goto(duration_secs)
        }
    }

    /// Wake up and go to sleep animations
    pub fn animation() -> WaitPolicy {
        WaitPolicy {
            nominal: None,
            settle_buffer: Duration::ZERO,
            start_grace: Duration::from_millis(300),
            poll_interval: Duration::from_millis(200),
            ceiling: Duration::from_secs(10),
            final_settle: Duration::from_millis(200),
        }
    }

    /// Moves from a recorded dataset, which can run for a long time
    pub fn recorded_move() -> WaitPolicy {
        WaitPolicy {
            poll_interval: Duration::from_millis(300),
            ceiling: Duration::from_secs(60),
            ..WaitPolicy::animation()
        }
    }

    /// Longest time `await_completion` can spend sleeping under this policy
    pub fn worst_case(&self) -> Duration {
        self.nominal
            .unwrap_or_default()
            .saturating_add(self.settle_buffer)
            .saturating_add(self.start_grace)
            .saturating_add(self.ceiling)
            .saturating_add(self.final_settle)
    }
}

/// Seconds to a `Duration`, saturating at `Duration::MAX` and zero for anything negative or NaN
pub(crate) fn secs(duration_secs: f64) -> Duration {
    if duration_secs > 0.0 {
        Duration::try_from_secs_f64(duration_secs).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPhase {
    Dispatched,
    WaitingGrace,
    Polling,
    Settled,
    TimedOut,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Daemon reported idle
    Settled,
    /// Still running when the ceiling was reached
    TimedOut,
    /// Could not ask the daemon any more
    Aborted,
}

impl WaitPhase {
    fn outcome(self) -> Option<WaitOutcome> {
        match self {
            WaitPhase::Settled => Some(WaitOutcome::Settled),
            WaitPhase::TimedOut => Some(WaitOutcome::TimedOut),
            WaitPhase::Aborted => Some(WaitOutcome::Aborted),
            WaitPhase::Dispatched | WaitPhase::WaitingGrace | WaitPhase::Polling => None,
        }
    }
}

pub struct MotionWaiter {
    clock: std::sync::Arc<dyn Clock>,
}

impl MotionWaiter {
    pub fn new(clock: std::sync::Arc<dyn Clock>) -> Self {
        MotionWaiter { clock }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Block until the daemon reports no running movement or the policy ceiling passes.
    ///
    /// Never returns an error, failures while polling end the wait early.
    pub async fn await_completion<P>(&self, probe: &P, policy: &WaitPolicy) -> WaitOutcome
    where
        P: MovementProbe + ?Sized,
    {
        let mut phase = WaitPhase::Dispatched;
        let mut deadline = Duration::ZERO;
        loop {
            if let Some(outcome) = phase.outcome() {
                return outcome;
            }
            phase = match phase {
                WaitPhase::Dispatched => {
                    if let Some(nominal) = policy.nominal {
                        self.clock
                            .sleep(nominal.saturating_add(policy.settle_buffer))
                            .await;
                    }
                    WaitPhase::WaitingGrace
                }
                WaitPhase::WaitingGrace => {
                    if !policy.start_grace.is_zero() {
                        self.clock.sleep(policy.start_grace).await;
                    }
                    deadline = self.clock.now().saturating_add(policy.ceiling);
                    WaitPhase::Polling
                }
                WaitPhase::Polling => self.poll_once(probe, policy, deadline).await,
                terminal => terminal,
            };
        }
    }

    async fn poll_once<P>(&self, probe: &P, policy: &WaitPolicy, deadline: Duration) -> WaitPhase
    where
        P: MovementProbe + ?Sized,
    {
        if self.clock.now() >= deadline {
            warn!(
                ceiling_ms = policy.ceiling.as_millis() as u64,
                "Movement still running after wait ceiling"
            );
            return WaitPhase::TimedOut;
        }
        match probe.is_movement_running().await {
            Ok(false) => {
                debug!("Movement finished");
                self.clock.sleep(policy.final_settle).await;
                WaitPhase::Settled
            }
            Ok(true) => {
                let remaining = deadline.saturating_sub(self.clock.now());
                self.clock
                    .sleep(policy.poll_interval.min(remaining))
                    .await;
                WaitPhase::Polling
            }
            Err(error) => {
                warn!(%error, "Failed to verify movement completion");
                WaitPhase::Aborted
            }
        }
    }
}
