//! One async method per block of the Reachy Mini block set.
//!
//! Movement blocks return only after the robot finished moving (or the wait
//! gave up). Reporter blocks never fail, they fall back to `0` or `"unknown"`
//! when the daemon can not be read.

use crate::config::{ClientConfig, ConfigError};
use crate::daemon_api::{ApiError, DaemonApi, HttpDaemonClient};
use crate::daemon_types::{MotorMode, MoveUuid, MovementRequest};
use crate::dispatcher::{self, Animation, HeadDirection};
use crate::motion_waiter::{Clock, MotionWaiter, TokioClock, WaitOutcome, WaitPolicy};
use crate::presets::{self, MotionPresetId};
use crate::recorded_moves::RecordedMoveSelection;
use crate::state_cache::{FieldValue, RobotStateSnapshot, StateCache, StateField};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum BlockError {
    #[error("daemon request failed: {0}")]
    Api(#[from] ApiError),
    #[error("Invalid head direction: {0}")]
    InvalidDirection(String),
    #[error("{argument} is not a valid angle: {degrees}")]
    InvalidAngle { argument: &'static str, degrees: f64 },
    #[error("Invalid preset motion: {0}")]
    InvalidPreset(String),
    #[error("Invalid motor mode: {0}")]
    InvalidMotorMode(String),
}

type Result<T> = std::result::Result<T, BlockError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Disconnected,
    Error,
}

/// Mutable state shared by every block of one robot connection
#[derive(Debug, Default)]
pub struct BlockState {
    connection: ConnectionStatus,
    last_move: Option<MoveUuid>,
    cache: StateCache,
}

impl BlockState {
    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    /// Handle of the most recently dispatched movement
    pub fn last_move(&self) -> Option<&MoveUuid> {
        self.last_move.as_ref()
    }

    pub fn snapshot(&self) -> Option<&RobotStateSnapshot> {
        self.cache.snapshot()
    }

    pub(crate) fn record_dispatch(
        &mut self,
        result: std::result::Result<MoveUuid, ApiError>,
    ) -> std::result::Result<MoveUuid, ApiError> {
        match &result {
            Ok(handle) => {
                self.connection = ConnectionStatus::Connected;
                self.last_move = Some(handle.clone());
            }
            Err(_) => self.connection = ConnectionStatus::Error,
        }
        result
    }

    async fn refresh(&mut self, api: &dyn DaemonApi) -> std::result::Result<RobotStateSnapshot, ApiError> {
        match self.cache.refresh(api).await {
            Ok(snapshot) => {
                let snapshot = snapshot.clone();
                self.connection = ConnectionStatus::Connected;
                Ok(snapshot)
            }
            Err(error) => {
                self.connection = ConnectionStatus::Error;
                Err(error)
            }
        }
    }
}

/// Log a failed block before handing the error back to the host
fn reported<T>(block: &str, result: Result<T>) -> Result<T> {
    if let Err(error) = &result {
        error!(block, %error, "Block failed");
    }
    result
}

pub struct ReachyBlocks {
    api: Box<dyn DaemonApi>,
    waiter: MotionWaiter,
    state: BlockState,
}

/// Serializes block invocations for hosts that run blocks concurrently
pub type SharedBlocks = Arc<tokio::sync::Mutex<ReachyBlocks>>;

impl ReachyBlocks {
    pub fn new(api: Box<dyn DaemonApi>) -> ReachyBlocks {
        ReachyBlocks::with_clock(api, Arc::new(TokioClock::new()))
    }

    pub fn with_clock(api: Box<dyn DaemonApi>, clock: Arc<dyn Clock>) -> ReachyBlocks {
        ReachyBlocks {
            api,
            waiter: MotionWaiter::new(clock),
            state: BlockState::default(),
        }
    }

    /// HTTP client for a loopback daemon
    pub fn connect(config: ClientConfig) -> std::result::Result<ReachyBlocks, ConfigError> {
        let client = HttpDaemonClient::new(config)?;
        Ok(ReachyBlocks::new(Box::new(client)))
    }

    pub fn into_shared(self) -> SharedBlocks {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    pub fn state(&self) -> &BlockState {
        &self.state
    }

    async fn animate(&mut self, animation: Animation) -> Result<WaitOutcome> {
        Ok(dispatcher::animate_and_wait(
            self.api.as_ref(),
            &self.waiter,
            &mut self.state,
            &animation,
        )
        .await?)
    }

    async fn goto(&mut self, request: MovementRequest) -> Result<WaitOutcome> {
        let policy = WaitPolicy::goto(request.duration);
        Ok(dispatcher::goto_and_wait(
            self.api.as_ref(),
            &self.waiter,
            &mut self.state,
            &request,
            &policy,
        )
        .await?)
    }

    pub async fn wake_up(&mut self) -> Result<WaitOutcome> {
        reported("wake_up", self.animate(Animation::WakeUp).await)
    }

    pub async fn goto_sleep(&mut self) -> Result<WaitOutcome> {
        reported("goto_sleep", self.animate(Animation::GotoSleep).await)
    }

    /// `selector` is `dataset||move` or a bare move name from the dances library
    pub async fn play_recorded_move_dataset(&mut self, selector: &str) -> Result<WaitOutcome> {
        let selection = RecordedMoveSelection::decode(Some(selector));
        info!(dataset = %selection.dataset, move_name = %selection.move_name, "Playing recorded move");
        let result = self.animate(Animation::Recorded(selection)).await;
        reported("play_recorded_move_dataset", result)
    }

    /// Validated request, or the validation error, sent as one waited goto
    async fn checked_goto(&mut self, request: Result<MovementRequest>) -> Result<WaitOutcome> {
        self.goto(request?).await
    }

    pub async fn move_head_direction(
        &mut self,
        direction: &str,
        duration_secs: f64,
    ) -> Result<WaitOutcome> {
        let request = direction
            .parse::<HeadDirection>()
            .map(|direction| dispatcher::head_direction_request(direction, duration_secs));
        reported("move_head_direction", self.checked_goto(request).await)
    }

    /// Angles in degrees
    pub async fn move_head_custom(
        &mut self,
        pitch: f64,
        yaw: f64,
        roll: f64,
        duration_secs: f64,
    ) -> Result<WaitOutcome> {
        let request = dispatcher::head_custom_request(pitch, yaw, roll, duration_secs, None);
        reported("move_head_custom", self.checked_goto(request).await)
    }

    async fn run_preset(&mut self, motion: &str, cycles: f64) -> Result<()> {
        let preset = motion.parse::<MotionPresetId>()?.preset();
        presets::run_preset(
            self.api.as_ref(),
            &self.waiter,
            &mut self.state,
            &preset,
            cycles,
        )
        .await
    }

    pub async fn perform_preset_motion(&mut self, motion: &str, cycles: f64) -> Result<()> {
        reported("perform_preset_motion", self.run_preset(motion, cycles).await)
    }

    pub async fn move_antennas(
        &mut self,
        left: f64,
        right: f64,
        duration_secs: f64,
    ) -> Result<WaitOutcome> {
        let request = dispatcher::antennas_request(left, right, duration_secs);
        reported("move_antennas", self.checked_goto(request).await)
    }

    pub async fn move_antennas_both(&mut self, angle: f64, duration_secs: f64) -> Result<WaitOutcome> {
        let request = dispatcher::antennas_request(angle, angle, duration_secs);
        reported("move_antennas_both", self.checked_goto(request).await)
    }

    pub async fn move_body_yaw(&mut self, angle: f64, duration_secs: f64) -> Result<WaitOutcome> {
        let request = dispatcher::body_yaw_request(angle, duration_secs);
        reported("move_body_yaw", self.checked_goto(request).await)
    }

    async fn apply_motor_mode(&mut self, mode: &str) -> Result<()> {
        let mode = mode
            .parse::<MotorMode>()
            .map_err(BlockError::InvalidMotorMode)?;
        self.api.set_motor_mode(mode).await?;
        Ok(())
    }

    pub async fn set_motor_mode(&mut self, mode: &str) -> Result<()> {
        reported("set_motor_mode", self.apply_motor_mode(mode).await)
    }

    /// Cancel everything the daemon is playing
    pub async fn stop_movement(&mut self) -> Result<()> {
        let result = self.api.stop_movement().await.map(|_| ());
        reported("stop_movement", result.map_err(BlockError::from))
    }

    pub async fn recorded_moves(&mut self, dataset: &str) -> Result<Vec<String>> {
        let result = self.api.list_recorded_moves(dataset).await;
        reported("recorded_moves", result.map_err(BlockError::from))
    }

    /// Fetch a fresh snapshot, errors are returned unlike the reporter blocks
    pub async fn refresh_state(&mut self) -> Result<RobotStateSnapshot> {
        let result = self.state.refresh(self.api.as_ref()).await;
        reported("refresh_state", result.map_err(BlockError::from))
    }

    /// Refreshes the state and reads one field, falling back when the daemon is unreachable
    pub async fn get_field(&mut self, field: StateField) -> FieldValue {
        match self.refresh_state().await {
            Ok(snapshot) => snapshot.value(field),
            Err(_) => field.fallback(),
        }
    }

    async fn degrees(&mut self, field: StateField) -> f64 {
        self.get_field(field).await.as_degrees().unwrap_or_default()
    }

    pub async fn head_pitch(&mut self) -> f64 {
        self.degrees(StateField::HeadPitch).await
    }

    pub async fn head_yaw(&mut self) -> f64 {
        self.degrees(StateField::HeadYaw).await
    }

    pub async fn head_roll(&mut self) -> f64 {
        self.degrees(StateField::HeadRoll).await
    }

    pub async fn left_antenna(&mut self) -> f64 {
        self.degrees(StateField::LeftAntenna).await
    }

    pub async fn right_antenna(&mut self) -> f64 {
        self.degrees(StateField::RightAntenna).await
    }

    pub async fn body_yaw(&mut self) -> f64 {
        self.degrees(StateField::BodyYaw).await
    }

    pub async fn motor_mode(&mut self) -> String {
        self.get_field(StateField::MotorMode).await.to_string()
    }

    pub async fn is_daemon_connected(&mut self) -> bool {
        let connected = self.api.ping().await;
        self.state.connection = if connected {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        };
        connected
    }
}
