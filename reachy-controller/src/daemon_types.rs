//! JSON models exchanged with the Reachy Mini daemon.
//!
//! Positions are in meters, angles in radians.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Head pose as position plus roll/pitch/yaw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct HeadPose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl HeadPose {
    /// Orientation only, position stays at the neutral origin
    pub fn from_orientation(pitch: f64, yaw: f64, roll: f64) -> HeadPose {
        HeadPose {
            pitch,
            yaw,
            roll,
            ..Default::default()
        }
    }
}

/// The daemon reports poses either as xyz/rpy or as a flattened 4x4 matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnyPose {
    XyzRpy(HeadPose),
    Matrix { m: [f64; 16] },
}

impl AnyPose {
    pub fn as_xyz_rpy(&self) -> Option<&HeadPose> {
        match self {
            AnyPose::XyzRpy(pose) => Some(pose),
            AnyPose::Matrix { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpolationMode {
    #[serde(rename = "linear")]
    Linear,
    #[serde(rename = "minjerk")]
    MinJerk,
    #[serde(rename = "ease")]
    Ease,
    #[serde(rename = "cartoon")]
    Cartoon,
}

impl Default for InterpolationMode {
    fn default() -> Self {
        InterpolationMode::MinJerk
    }
}

impl InterpolationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterpolationMode::Linear => "linear",
            InterpolationMode::MinJerk => "minjerk",
            InterpolationMode::Ease => "ease",
            InterpolationMode::Cartoon => "cartoon",
        }
    }
}

impl FromStr for InterpolationMode {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(InterpolationMode::Linear),
            "minjerk" => Ok(InterpolationMode::MinJerk),
            "ease" => Ok(InterpolationMode::Ease),
            "cartoon" => Ok(InterpolationMode::Cartoon),
            _ => Err(text.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorMode {
    Enabled,
    Disabled,
    GravityCompensation,
}

impl MotorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MotorMode::Enabled => "enabled",
            MotorMode::Disabled => "disabled",
            MotorMode::GravityCompensation => "gravity_compensation",
        }
    }
}

impl fmt::Display for MotorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MotorMode {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().as_str() {
            "enabled" => Ok(MotorMode::Enabled),
            "disabled" => Ok(MotorMode::Disabled),
            "gravity_compensation" => Ok(MotorMode::GravityCompensation),
            _ => Err(text.to_owned()),
        }
    }
}

/// Body of `POST /move/goto`.
///
/// Every field left as `None` is omitted from the JSON so the daemon keeps
/// that part of the robot where it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_pose: Option<HeadPose>,
    /// left, right
    #[serde(skip_serializing_if = "Option::is_none")]
    pub antennas: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_yaw: Option<f64>,
    /// seconds
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpolation: Option<InterpolationMode>,
}

impl MovementRequest {
    pub fn new(duration: f64) -> MovementRequest {
        MovementRequest {
            head_pose: None,
            antennas: None,
            body_yaw: None,
            duration,
            interpolation: None,
        }
    }

    /// A request without any target only makes the daemon wait
    pub fn has_target(&self) -> bool {
        self.head_pose.is_some() || self.antennas.is_some() || self.body_yaw.is_some()
    }
}

/// Handle of a dispatched movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveUuid {
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FullState {
    #[serde(default)]
    pub control_mode: Option<MotorMode>,
    #[serde(default)]
    pub head_pose: Option<AnyPose>,
    #[serde(default)]
    pub head_joints: Option<Vec<f64>>,
    #[serde(default)]
    pub body_yaw: Option<f64>,
    #[serde(default)]
    pub antennas_position: Option<Vec<f64>>,
    /// ISO 8601
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub passive_joints: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorStatus {
    pub mode: MotorMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DaemonStatus {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}
