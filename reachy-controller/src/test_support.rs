//! In-memory daemon and clock for deterministic tests.

use crate::daemon_api::{ApiError, DaemonApi};
use crate::daemon_types::{
    AnyPose, DaemonStatus, FullState, HeadPose, MotorMode, MotorStatus, MoveUuid,
    MovementRequest, StatusResponse,
};
use crate::motion_waiter::Clock;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    WakeUp,
    GotoSleep,
    Goto(MovementRequest),
    Running,
    Stop,
    ListRecorded(String),
    PlayRecorded(String, String),
    FullState,
    HeadPose,
    BodyYaw,
    Antennas,
    MotorStatus,
    SetMotorMode(MotorMode),
    DaemonStatus,
}

struct Inner {
    calls: Vec<Call>,
    running_script: VecDeque<bool>,
    always_running: bool,
    running_failures_after: Option<usize>,
    running_polls: usize,
    fail_dispatch: bool,
    fail_full_state: bool,
    fail_motor_status: bool,
    offline: bool,
    full_state: FullState,
    motor_mode: MotorMode,
    next_uuid: usize,
}

#[derive(Clone)]
pub(crate) struct FakeDaemon {
    inner: Arc<Mutex<Inner>>,
}

impl FakeDaemon {
    pub(crate) fn new() -> Self {
        FakeDaemon {
            inner: Arc::new(Mutex::new(Inner {
                calls: vec![],
                running_script: VecDeque::new(),
                always_running: false,
                running_failures_after: None,
                running_polls: 0,
                fail_dispatch: false,
                fail_full_state: false,
                fail_motor_status: false,
                offline: false,
                full_state: FullState::default(),
                motor_mode: MotorMode::Enabled,
                next_uuid: 0,
            })),
        }
    }

    fn with<T>(&self, action: impl FnOnce(&mut Inner) -> T) -> T {
        let mut inner = self.inner.lock().unwrap();
        action(&mut inner)
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.with(|inner| inner.calls.clone())
    }

    pub(crate) fn gotos(&self) -> Vec<MovementRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Goto(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Calls other than running polls
    pub(crate) fn commands(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| *call != Call::Running)
            .collect()
    }

    pub(crate) fn running_polls(&self) -> usize {
        self.with(|inner| inner.running_polls)
    }

    /// Answers for the next running polls, idle afterwards
    pub(crate) fn script_running(&self, answers: &[bool]) {
        self.with(|inner| inner.running_script.extend(answers.iter().copied()));
    }

    pub(crate) fn set_always_running(&self, running: bool) {
        self.with(|inner| inner.always_running = running);
    }

    /// Running polls after the first `polls` fail
    pub(crate) fn fail_running_after(&self, polls: usize) {
        self.with(|inner| inner.running_failures_after = Some(polls));
    }

    pub(crate) fn fail_dispatch(&self) {
        self.with(|inner| inner.fail_dispatch = true);
    }

    pub(crate) fn fail_full_state(&self, fail: bool) {
        self.with(|inner| inner.fail_full_state = fail);
    }

    pub(crate) fn fail_motor_status(&self) {
        self.with(|inner| inner.fail_motor_status = true);
    }

    /// Every call fails like an unreachable daemon
    pub(crate) fn set_offline(&self) {
        self.with(|inner| inner.offline = true);
    }

    pub(crate) fn set_state(&self, pose: HeadPose, antennas: [f64; 2], body_yaw: f64) {
        self.with(|inner| {
            inner.full_state = FullState {
                head_pose: Some(AnyPose::XyzRpy(pose)),
                antennas_position: Some(antennas.to_vec()),
                body_yaw: Some(body_yaw),
                ..Default::default()
            }
        });
    }

    pub(crate) fn set_motor_mode_state(&self, mode: MotorMode) {
        self.with(|inner| inner.motor_mode = mode);
    }

    fn record(&self, call: Call) -> Result<(), ApiError> {
        self.with(|inner| {
            inner.calls.push(call);
            if inner.offline {
                Err(ApiError::new("Network error: connection refused"))
            } else {
                Ok(())
            }
        })
    }

    fn dispatch(&self, call: Call) -> Result<MoveUuid, ApiError> {
        self.record(call)?;
        self.with(|inner| {
            if inner.fail_dispatch {
                return Err(ApiError::from_status(500));
            }
            inner.next_uuid += 1;
            Ok(MoveUuid {
                uuid: format!("move-{}", inner.next_uuid),
            })
        })
    }
}

#[async_trait]
impl DaemonApi for FakeDaemon {
    async fn wake_up(&self) -> Result<MoveUuid, ApiError> {
        self.dispatch(Call::WakeUp)
    }

    async fn goto_sleep(&self) -> Result<MoveUuid, ApiError> {
        self.dispatch(Call::GotoSleep)
    }

    async fn goto(&self, request: &MovementRequest) -> Result<MoveUuid, ApiError> {
        self.dispatch(Call::Goto(request.clone()))
    }

    async fn running_moves(&self) -> Result<Vec<serde_json::Value>, ApiError> {
        self.record(Call::Running)?;
        self.with(|inner| {
            inner.running_polls += 1;
            if let Some(limit) = inner.running_failures_after {
                if inner.running_polls > limit {
                    return Err(ApiError::new("Request timeout"));
                }
            }
            let running = inner
                .running_script
                .pop_front()
                .unwrap_or(inner.always_running);
            if running {
                Ok(vec![serde_json::json!({"uuid": "running"})])
            } else {
                Ok(vec![])
            }
        })
    }

    async fn stop_movement(&self) -> Result<StatusResponse, ApiError> {
        self.record(Call::Stop)?;
        Ok(StatusResponse {
            status: "stopped".to_owned(),
        })
    }

    async fn list_recorded_moves(&self, dataset: &str) -> Result<Vec<String>, ApiError> {
        self.record(Call::ListRecorded(dataset.to_owned()))?;
        Ok(vec!["simple_nod".to_owned(), "dizzy_spin".to_owned()])
    }

    async fn play_recorded_move(
        &self,
        dataset: &str,
        move_name: &str,
    ) -> Result<MoveUuid, ApiError> {
        self.dispatch(Call::PlayRecorded(dataset.to_owned(), move_name.to_owned()))
    }

    async fn full_state(&self) -> Result<FullState, ApiError> {
        self.record(Call::FullState)?;
        self.with(|inner| {
            if inner.fail_full_state {
                Err(ApiError::from_status(503))
            } else {
                Ok(inner.full_state.clone())
            }
        })
    }

    async fn head_pose(&self) -> Result<HeadPose, ApiError> {
        self.record(Call::HeadPose)?;
        self.with(|inner| {
            Ok(inner
                .full_state
                .head_pose
                .as_ref()
                .and_then(|pose| pose.as_xyz_rpy().copied())
                .unwrap_or_default())
        })
    }

    async fn body_yaw(&self) -> Result<f64, ApiError> {
        self.record(Call::BodyYaw)?;
        self.with(|inner| Ok(inner.full_state.body_yaw.unwrap_or_default()))
    }

    async fn antenna_positions(&self) -> Result<[f64; 2], ApiError> {
        self.record(Call::Antennas)?;
        self.with(|inner| {
            let antennas = inner.full_state.antennas_position.clone().unwrap_or_default();
            Ok([
                antennas.first().copied().unwrap_or_default(),
                antennas.get(1).copied().unwrap_or_default(),
            ])
        })
    }

    async fn motor_status(&self) -> Result<MotorStatus, ApiError> {
        self.record(Call::MotorStatus)?;
        self.with(|inner| {
            if inner.fail_motor_status {
                Err(ApiError::from_status(500))
            } else {
                Ok(MotorStatus {
                    mode: inner.motor_mode,
                })
            }
        })
    }

    async fn set_motor_mode(&self, mode: MotorMode) -> Result<StatusResponse, ApiError> {
        self.record(Call::SetMotorMode(mode))?;
        self.with(|inner| inner.motor_mode = mode);
        Ok(StatusResponse {
            status: "ok".to_owned(),
        })
    }

    async fn daemon_status(&self) -> Result<DaemonStatus, ApiError> {
        self.record(Call::DaemonStatus)?;
        Ok(DaemonStatus {
            state: Some("running".to_owned()),
            ..Default::default()
        })
    }
}

/// Virtual time that only moves when something sleeps
pub(crate) struct ManualClock {
    now: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        ManualClock {
            now: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(vec![]),
        }
    }

    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub(crate) fn total_slept(&self) -> Duration {
        self.sleeps()
            .iter()
            .fold(Duration::ZERO, |total, sleep| total.saturating_add(*sleep))
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        {
            let mut now = self.now.lock().unwrap();
            *now = now.saturating_add(duration);
        }
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}
