use crate::angle::deg_to_rad;
use crate::blocks::{BlockError, BlockState};
use crate::daemon_api::{ApiError, DaemonApi};
use crate::daemon_types::{HeadPose, InterpolationMode, MoveUuid, MovementRequest};
use crate::motion_waiter::{MotionWaiter, WaitOutcome, WaitPolicy};
use crate::recorded_moves::RecordedMoveSelection;
use std::{fmt, str::FromStr};
use tracing::debug;

/// Shortest movement the daemon gets asked for, in seconds
pub const MIN_DURATION_SECS: f64 = 0.1;

/// Floor requested durations at 0.1 s, anything not finite becomes the floor too
pub fn clamp_duration(duration_secs: f64) -> f64 {
    if duration_secs.is_finite() {
        duration_secs.max(MIN_DURATION_SECS)
    } else {
        MIN_DURATION_SECS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadDirection {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
    Center,
}

impl HeadDirection {
    pub const ALL: [HeadDirection; 9] = [
        HeadDirection::Up,
        HeadDirection::Down,
        HeadDirection::Left,
        HeadDirection::Right,
        HeadDirection::UpLeft,
        HeadDirection::UpRight,
        HeadDirection::DownLeft,
        HeadDirection::DownRight,
        HeadDirection::Center,
    ];

    /// (pitch, yaw, roll) in radians.
    /// Negative pitch looks up, positive yaw looks left.
    pub fn orientation(&self) -> (f64, f64, f64) {
        match self {
            HeadDirection::Up => (-0.3, 0.0, 0.0),
            HeadDirection::Down => (0.3, 0.0, 0.0),
            HeadDirection::Left => (0.0, 0.5, 0.0),
            HeadDirection::Right => (0.0, -0.5, 0.0),
            HeadDirection::UpLeft => (-0.3, 0.5, 0.0),
            HeadDirection::UpRight => (-0.3, -0.5, 0.0),
            HeadDirection::DownLeft => (0.3, 0.5, 0.0),
            HeadDirection::DownRight => (0.3, -0.5, 0.0),
            HeadDirection::Center => (0.0, 0.0, 0.0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HeadDirection::Up => "UP",
            HeadDirection::Down => "DOWN",
            HeadDirection::Left => "LEFT",
            HeadDirection::Right => "RIGHT",
            HeadDirection::UpLeft => "UP_LEFT",
            HeadDirection::UpRight => "UP_RIGHT",
            HeadDirection::DownLeft => "DOWN_LEFT",
            HeadDirection::DownRight => "DOWN_RIGHT",
            HeadDirection::Center => "CENTER",
        }
    }
}

impl fmt::Display for HeadDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeadDirection {
    type Err = BlockError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let key = text.trim().to_ascii_uppercase();
        HeadDirection::ALL
            .iter()
            .find(|direction| direction.as_str() == key)
            .copied()
            .ok_or_else(|| BlockError::InvalidDirection(text.to_owned()))
    }
}

fn radians(argument: &'static str, degrees: f64) -> Result<f64, BlockError> {
    if degrees.is_finite() {
        Ok(deg_to_rad(degrees))
    } else {
        Err(BlockError::InvalidAngle { argument, degrees })
    }
}

/// Head commands pin the body so only the head turns
pub fn head_direction_request(direction: HeadDirection, duration_secs: f64) -> MovementRequest {
    let (pitch, yaw, roll) = direction.orientation();
    MovementRequest {
        head_pose: Some(HeadPose::from_orientation(pitch, yaw, roll)),
        antennas: None,
        body_yaw: Some(0.0),
        duration: clamp_duration(duration_secs),
        interpolation: Some(InterpolationMode::MinJerk),
    }
}

pub fn head_custom_request(
    pitch_degrees: f64,
    yaw_degrees: f64,
    roll_degrees: f64,
    duration_secs: f64,
    interpolation: Option<InterpolationMode>,
) -> Result<MovementRequest, BlockError> {
    let pose = HeadPose::from_orientation(
        radians("PITCH", pitch_degrees)?,
        radians("YAW", yaw_degrees)?,
        radians("ROLL", roll_degrees)?,
    );
    Ok(MovementRequest {
        head_pose: Some(pose),
        antennas: None,
        body_yaw: Some(0.0),
        duration: clamp_duration(duration_secs),
        interpolation: Some(interpolation.unwrap_or_default()),
    })
}

pub fn antennas_request(
    left_degrees: f64,
    right_degrees: f64,
    duration_secs: f64,
) -> Result<MovementRequest, BlockError> {
    Ok(MovementRequest {
        antennas: Some([radians("LEFT", left_degrees)?, radians("RIGHT", right_degrees)?]),
        interpolation: Some(InterpolationMode::MinJerk),
        ..MovementRequest::new(clamp_duration(duration_secs))
    })
}

pub fn body_yaw_request(angle_degrees: f64, duration_secs: f64) -> Result<MovementRequest, BlockError> {
    Ok(MovementRequest {
        body_yaw: Some(radians("ANGLE", angle_degrees)?),
        interpolation: Some(InterpolationMode::MinJerk),
        ..MovementRequest::new(clamp_duration(duration_secs))
    })
}

/// Daemon side animations whose length the client does not know
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Animation {
    WakeUp,
    GotoSleep,
    Recorded(RecordedMoveSelection),
}

impl Animation {
    pub fn wait_policy(&self) -> WaitPolicy {
        match self {
            Animation::WakeUp | Animation::GotoSleep => WaitPolicy::animation(),
            Animation::Recorded(_) => WaitPolicy::recorded_move(),
        }
    }
}

pub(crate) async fn dispatch_goto(
    api: &dyn DaemonApi,
    state: &mut BlockState,
    request: &MovementRequest,
) -> Result<MoveUuid, ApiError> {
    debug!(?request, "Dispatching goto");
    let result = api.goto(request).await;
    state.record_dispatch(result)
}

pub(crate) async fn dispatch_animation(
    api: &dyn DaemonApi,
    state: &mut BlockState,
    animation: &Animation,
) -> Result<MoveUuid, ApiError> {
    debug!(?animation, "Dispatching animation");
    let result = match animation {
        Animation::WakeUp => api.wake_up().await,
        Animation::GotoSleep => api.goto_sleep().await,
        Animation::Recorded(selection) => {
            api.play_recorded_move(&selection.dataset, &selection.move_name)
                .await
        }
    };
    state.record_dispatch(result)
}

/// Send one goto and return once it finished moving
pub(crate) async fn goto_and_wait(
    api: &dyn DaemonApi,
    waiter: &MotionWaiter,
    state: &mut BlockState,
    request: &MovementRequest,
    policy: &WaitPolicy,
) -> Result<WaitOutcome, ApiError> {
    dispatch_goto(api, state, request).await?;
    Ok(waiter.await_completion(api, policy).await)
}

pub(crate) async fn animate_and_wait(
    api: &dyn DaemonApi,
    waiter: &MotionWaiter,
    state: &mut BlockState,
    animation: &Animation,
) -> Result<WaitOutcome, ApiError> {
    dispatch_animation(api, state, animation).await?;
    Ok(waiter.await_completion(api, &animation.wait_policy()).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::ConnectionStatus;
    use crate::test_support::{Call, FakeDaemon, ManualClock};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    #[test]
    fn durations_are_floored() {
        assert_eq!(clamp_duration(0.0), 0.1);
        assert_eq!(clamp_duration(-3.0), 0.1);
        assert_eq!(clamp_duration(0.0999), 0.1);
        assert_eq!(clamp_duration(f64::NAN), 0.1);
        assert_eq!(clamp_duration(f64::INFINITY), 0.1);
        assert_eq!(clamp_duration(2.5), 2.5);
    }

    #[test]
    fn direction_requests_match_table() {
        for direction in HeadDirection::ALL {
            let request = head_direction_request(direction, 1.0);
            let (pitch, yaw, roll) = direction.orientation();
            let pose = request.head_pose.unwrap();
            assert_eq!(pose.pitch, pitch);
            assert_eq!(pose.yaw, yaw);
            assert_eq!(pose.roll, roll);
            assert_eq!((pose.x, pose.y, pose.z), (0.0, 0.0, 0.0));
            assert_eq!(request.body_yaw, Some(0.0));
        }
        let up = head_direction_request(HeadDirection::Up, 1.0).head_pose.unwrap();
        assert_eq!((up.pitch, up.yaw, up.roll), (-0.3, 0.0, 0.0));
    }

    #[test]
    fn direction_parsing() {
        assert_eq!("up_left".parse::<HeadDirection>().unwrap(), HeadDirection::UpLeft);
        assert_eq!(" CENTER ".parse::<HeadDirection>().unwrap(), HeadDirection::Center);
        assert!(matches!(
            "SIDEWAYS".parse::<HeadDirection>(),
            Err(BlockError::InvalidDirection(value)) if value == "SIDEWAYS"
        ));
    }

    #[test]
    fn custom_head_converts_degrees() {
        let request = head_custom_request(10.0, -15.0, 0.0, 0.02, None).unwrap();
        let pose = request.head_pose.unwrap();
        assert_relative_eq!(pose.pitch, 10.0_f64.to_radians());
        assert_relative_eq!(pose.yaw, (-15.0_f64).to_radians());
        assert_eq!(request.duration, 0.1);
        assert_eq!(request.interpolation, Some(InterpolationMode::MinJerk));

        let eased = head_custom_request(0.0, 0.0, 0.0, 1.0, Some(InterpolationMode::Ease)).unwrap();
        assert_eq!(eased.interpolation, Some(InterpolationMode::Ease));
    }

    #[test]
    fn non_finite_angles_are_rejected() {
        assert!(matches!(
            antennas_request(f64::NAN, 0.0, 1.0),
            Err(BlockError::InvalidAngle { argument: "LEFT", .. })
        ));
        assert!(body_yaw_request(f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn antenna_and_body_requests_only_carry_their_target() {
        let antennas = antennas_request(30.0, -30.0, 1.0).unwrap();
        assert!(antennas.head_pose.is_none());
        assert!(antennas.body_yaw.is_none());
        assert_relative_eq!(antennas.antennas.unwrap()[1], (-30.0_f64).to_radians());

        let body = body_yaw_request(45.0, 1.0).unwrap();
        assert!(body.head_pose.is_none());
        assert!(body.antennas.is_none());
        assert_relative_eq!(body.body_yaw.unwrap(), std::f64::consts::FRAC_PI_4);
    }

    #[tokio::test]
    async fn dispatch_records_handle_and_connection() {
        let daemon = FakeDaemon::new();
        let mut state = BlockState::default();
        let handle = dispatch_goto(&daemon, &mut state, &antennas_request(1.0, 1.0, 1.0).unwrap())
            .await
            .unwrap();
        assert_eq!(state.last_move(), Some(&handle));
        assert_eq!(state.connection(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn failed_dispatch_propagates_without_waiting() {
        let daemon = FakeDaemon::new();
        daemon.fail_dispatch();
        let clock = Arc::new(ManualClock::new());
        let waiter = MotionWaiter::new(clock.clone());
        let mut state = BlockState::default();

        let error = animate_and_wait(&daemon, &waiter, &mut state, &Animation::WakeUp)
            .await
            .unwrap_err();

        assert_eq!(error.status_code(), Some(500));
        assert_eq!(state.connection(), ConnectionStatus::Error);
        assert!(state.last_move().is_none());
        assert_eq!(daemon.calls(), vec![Call::WakeUp]);
        assert!(clock.sleeps().is_empty());
    }
}
