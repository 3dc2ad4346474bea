use crate::angle::rad_to_deg;
use crate::daemon_api::{ApiError, DaemonApi};
use crate::daemon_types::{FullState, MotorMode};
use std::{fmt, str::FromStr, time::SystemTime};
use tracing::debug;

/// Last robot readout, angles in radians
#[derive(Debug, Clone, PartialEq)]
pub struct RobotStateSnapshot {
    pub head_pitch: f64,
    pub head_yaw: f64,
    pub head_roll: f64,
    pub left_antenna: f64,
    pub right_antenna: f64,
    pub body_yaw: f64,
    pub motor_mode: MotorMode,
    pub captured_at: SystemTime,
}

impl RobotStateSnapshot {
    /// Missing parts of the daemon state read as zero
    pub fn from_daemon(state: &FullState, motor_mode: MotorMode) -> RobotStateSnapshot {
        let pose = state
            .head_pose
            .as_ref()
            .and_then(|pose| pose.as_xyz_rpy().copied())
            .unwrap_or_default();
        let antennas = state.antennas_position.as_deref().unwrap_or_default();
        RobotStateSnapshot {
            head_pitch: pose.pitch,
            head_yaw: pose.yaw,
            head_roll: pose.roll,
            left_antenna: antennas.first().copied().unwrap_or_default(),
            right_antenna: antennas.get(1).copied().unwrap_or_default(),
            body_yaw: state.body_yaw.unwrap_or_default(),
            motor_mode,
            captured_at: SystemTime::now(),
        }
    }

    pub fn value(&self, field: StateField) -> FieldValue {
        let degrees = |radians: f64| FieldValue::Degrees(coalesced_degrees(radians));
        match field {
            StateField::HeadPitch => degrees(self.head_pitch),
            StateField::HeadYaw => degrees(self.head_yaw),
            StateField::HeadRoll => degrees(self.head_roll),
            StateField::LeftAntenna => degrees(self.left_antenna),
            StateField::RightAntenna => degrees(self.right_antenna),
            StateField::BodyYaw => degrees(self.body_yaw),
            StateField::MotorMode => FieldValue::Text(self.motor_mode.as_str().to_owned()),
        }
    }
}

/// Zero and NaN both read as 0 degrees
fn coalesced_degrees(radians: f64) -> f64 {
    if radians == 0.0 || radians.is_nan() {
        0.0
    } else {
        rad_to_deg(radians)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateField {
    HeadPitch,
    HeadYaw,
    HeadRoll,
    LeftAntenna,
    RightAntenna,
    BodyYaw,
    MotorMode,
}

impl StateField {
    pub const ALL: [StateField; 7] = [
        StateField::HeadPitch,
        StateField::HeadYaw,
        StateField::HeadRoll,
        StateField::LeftAntenna,
        StateField::RightAntenna,
        StateField::BodyYaw,
        StateField::MotorMode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateField::HeadPitch => "head_pitch",
            StateField::HeadYaw => "head_yaw",
            StateField::HeadRoll => "head_roll",
            StateField::LeftAntenna => "left_antenna",
            StateField::RightAntenna => "right_antenna",
            StateField::BodyYaw => "body_yaw",
            StateField::MotorMode => "motor_mode",
        }
    }

    /// What a getter reports when the state cannot be read
    pub fn fallback(&self) -> FieldValue {
        match self {
            StateField::MotorMode => FieldValue::Text("unknown".to_owned()),
            _ => FieldValue::Degrees(0.0),
        }
    }
}

impl FromStr for StateField {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let key = text.trim().to_ascii_lowercase().replace('-', "_");
        StateField::ALL
            .iter()
            .find(|field| field.as_str() == key)
            .copied()
            .ok_or_else(|| text.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Degrees(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_degrees(&self) -> Option<f64> {
        match self {
            FieldValue::Degrees(degrees) => Some(*degrees),
            FieldValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Degrees(degrees) => write!(f, "{degrees}"),
            FieldValue::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Default)]
pub struct StateCache {
    snapshot: Option<RobotStateSnapshot>,
}

impl StateCache {
    pub fn snapshot(&self) -> Option<&RobotStateSnapshot> {
        self.snapshot.as_ref()
    }

    /// Fetch full state and motor status, replacing the snapshot only when both succeed.
    pub async fn refresh(
        &mut self,
        api: &dyn DaemonApi,
    ) -> Result<&RobotStateSnapshot, ApiError> {
        let state = api.full_state().await?;
        let motors = api.motor_status().await?;
        let snapshot = RobotStateSnapshot::from_daemon(&state, motors.mode);
        debug!(?snapshot, "Robot state refreshed");
        Ok(self.snapshot.insert(snapshot))
    }
}
