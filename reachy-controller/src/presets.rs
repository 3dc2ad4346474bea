//! Multi step choreographies built from goto commands.
//!
//! Every step is an absolute target. Head axes a step leaves out snap back to
//! the neutral pose instead of keeping whatever the robot was doing before, so
//! a preset always plays the same way regardless of the previous command.
//! Antennas and body yaw are only sent when a step names them.

use crate::angle::deg_to_rad;
use crate::blocks::{BlockError, BlockState};
use crate::daemon_api::DaemonApi;
use crate::daemon_types::{HeadPose, InterpolationMode, MovementRequest};
use crate::dispatcher::{clamp_duration, goto_and_wait};
use crate::motion_waiter::{secs, MotionWaiter, WaitPolicy};
use std::{fmt, str::FromStr};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionPresetId {
    HeadNod,
    HeadShake,
    AntennaWave,
    BodySway,
}

impl MotionPresetId {
    pub const ALL: [MotionPresetId; 4] = [
        MotionPresetId::HeadNod,
        MotionPresetId::HeadShake,
        MotionPresetId::AntennaWave,
        MotionPresetId::BodySway,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MotionPresetId::HeadNod => "HEAD_NOD",
            MotionPresetId::HeadShake => "HEAD_SHAKE",
            MotionPresetId::AntennaWave => "ANTENNA_WAVE",
            MotionPresetId::BodySway => "BODY_SWAY",
        }
    }

    pub fn preset(&self) -> MotionPreset {
        let head_pitch = |degrees: f64, duration| PresetStep {
            head: Some(HeadOverrides {
                pitch: Some(deg_to_rad(degrees)),
                ..Default::default()
            }),
            ..PresetStep::pause(duration)
        };
        let head_yaw = |degrees: f64, duration| PresetStep {
            head: Some(HeadOverrides {
                yaw: Some(deg_to_rad(degrees)),
                ..Default::default()
            }),
            ..PresetStep::pause(duration)
        };
        let antennas = |left: f64, right: f64, duration| PresetStep {
            antennas: Some([deg_to_rad(left), deg_to_rad(right)]),
            ..PresetStep::pause(duration)
        };
        let sway = |head: f64, body: f64, duration| PresetStep {
            body_yaw: Some(deg_to_rad(body)),
            ..head_yaw(head, duration)
        };

        match self {
            MotionPresetId::HeadNod => MotionPreset {
                interpolation: InterpolationMode::Ease,
                steps: vec![
                    head_pitch(-12.0, 0.35),
                    head_pitch(12.0, 0.35),
                    head_pitch(0.0, 0.3),
                ],
            },
            MotionPresetId::HeadShake => MotionPreset {
                interpolation: InterpolationMode::Ease,
                steps: vec![
                    head_yaw(15.0, 0.35),
                    head_yaw(-15.0, 0.35),
                    head_yaw(0.0, 0.3),
                ],
            },
            MotionPresetId::AntennaWave => MotionPreset {
                interpolation: InterpolationMode::MinJerk,
                steps: vec![
                    antennas(18.0, -18.0, 0.4),
                    antennas(-18.0, 18.0, 0.4),
                    antennas(0.0, 0.0, 0.3),
                ],
            },
            MotionPresetId::BodySway => MotionPreset {
                interpolation: InterpolationMode::Cartoon,
                steps: vec![
                    sway(5.0, 8.0, 0.45),
                    sway(-5.0, -8.0, 0.45),
                    sway(0.0, 0.0, 0.3),
                ],
            },
        }
    }
}

impl fmt::Display for MotionPresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MotionPresetId {
    type Err = BlockError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let key = text.trim().to_ascii_uppercase();
        MotionPresetId::ALL
            .iter()
            .find(|preset| preset.as_str() == key)
            .copied()
            .ok_or_else(|| BlockError::InvalidPreset(text.to_owned()))
    }
}

/// Head axes a step sets, the rest come from the neutral pose
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeadOverrides {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub roll: Option<f64>,
    pub pitch: Option<f64>,
    pub yaw: Option<f64>,
}

impl HeadOverrides {
    pub fn merged_onto(&self, base: &HeadPose) -> HeadPose {
        HeadPose {
            x: self.x.unwrap_or(base.x),
            y: self.y.unwrap_or(base.y),
            z: self.z.unwrap_or(base.z),
            roll: self.roll.unwrap_or(base.roll),
            pitch: self.pitch.unwrap_or(base.pitch),
            yaw: self.yaw.unwrap_or(base.yaw),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresetStep {
    pub head: Option<HeadOverrides>,
    /// left, right in radians
    pub antennas: Option<[f64; 2]>,
    pub body_yaw: Option<f64>,
    /// seconds
    pub duration: f64,
}

impl PresetStep {
    /// Step without any target, only waits
    pub fn pause(duration: f64) -> PresetStep {
        PresetStep {
            head: None,
            antennas: None,
            body_yaw: None,
            duration,
        }
    }

    /// `None` when the step has nothing to send
    pub fn to_request(&self, interpolation: InterpolationMode) -> Option<MovementRequest> {
        let request = MovementRequest {
            head_pose: self
                .head
                .map(|head| head.merged_onto(&HeadPose::default())),
            antennas: self.antennas,
            body_yaw: self.body_yaw,
            duration: clamp_duration(self.duration),
            interpolation: Some(interpolation),
        };
        request.has_target().then_some(request)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionPreset {
    pub interpolation: InterpolationMode,
    pub steps: Vec<PresetStep>,
}

/// Whole number of repetitions, at least one
pub fn normalize_cycles(cycles: f64) -> u32 {
    if cycles.is_finite() {
        cycles.floor().clamp(1.0, u32::MAX as f64) as u32
    } else {
        1
    }
}

/// Play `preset` `cycles` times, waiting for every step to finish.
///
/// A failed dispatch stops the sequence and is returned. Wait timeouts are
/// tolerated and the next step is sent anyway.
pub(crate) async fn run_preset(
    api: &dyn DaemonApi,
    waiter: &MotionWaiter,
    state: &mut BlockState,
    preset: &MotionPreset,
    cycles: f64,
) -> Result<(), BlockError> {
    let cycles = normalize_cycles(cycles);
    info!(cycles, steps = preset.steps.len(), "Running preset motion");
    for cycle in 0..cycles {
        for (index, step) in preset.steps.iter().enumerate() {
            match step.to_request(preset.interpolation) {
                Some(request) => {
                    let policy = WaitPolicy::preset_step(request.duration);
                    let outcome = goto_and_wait(api, waiter, state, &request, &policy).await?;
                    debug!(cycle, index, ?outcome, "Preset step finished");
                }
                None => {
                    waiter
                        .clock()
                        .sleep(secs(clamp_duration(step.duration)))
                        .await;
                }
            }
        }
    }
    Ok(())
}
