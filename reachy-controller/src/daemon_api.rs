use crate::config::{self, ClientConfig, ConfigError, ConfigUpdate};
use crate::daemon_types::{
    DaemonStatus, FullState, HeadPose, MotorMode, MotorStatus, MoveUuid, MovementRequest,
    StatusResponse,
};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, trace};
use url::Url;

/// Failure talking to the daemon, with the HTTP status when one was received
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ApiError {
    message: String,
    status_code: Option<u16>,
    #[source]
    source: Option<reqwest::Error>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> ApiError {
        ApiError {
            message: message.into(),
            status_code: None,
            source: None,
        }
    }

    pub fn from_status(status_code: u16) -> ApiError {
        ApiError {
            message: format!("HTTP error! status: {}", status_code),
            status_code: Some(status_code),
            source: None,
        }
    }

    fn from_reqwest(error: reqwest::Error) -> ApiError {
        let message = if error.is_timeout() {
            "Request timeout".to_owned()
        } else if error.is_decode() {
            format!("Invalid response body: {}", error)
        } else {
            format!("Network error: {}", error)
        };
        ApiError {
            message,
            status_code: error.status().map(|status| status.as_u16()),
            source: Some(error),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn is_timeout(&self) -> bool {
        self.source
            .as_ref()
            .map(|source| source.is_timeout())
            .unwrap_or(false)
    }
}

type Result<T> = std::result::Result<T, ApiError>;

/// REST surface of the Reachy Mini daemon
#[async_trait]
pub trait DaemonApi: Send + Sync {
    /// Pre-programmed wake up animation
    async fn wake_up(&self) -> Result<MoveUuid>;
    /// Pre-programmed go to sleep animation
    async fn goto_sleep(&self) -> Result<MoveUuid>;
    async fn goto(&self, request: &MovementRequest) -> Result<MoveUuid>;
    /// Handles of every movement currently running, empty when idle
    async fn running_moves(&self) -> Result<Vec<serde_json::Value>>;
    async fn stop_movement(&self) -> Result<StatusResponse>;
    async fn list_recorded_moves(&self, dataset: &str) -> Result<Vec<String>>;
    async fn play_recorded_move(&self, dataset: &str, move_name: &str) -> Result<MoveUuid>;
    async fn full_state(&self) -> Result<FullState>;
    async fn head_pose(&self) -> Result<HeadPose>;
    async fn body_yaw(&self) -> Result<f64>;
    /// left, right
    async fn antenna_positions(&self) -> Result<[f64; 2]>;
    async fn motor_status(&self) -> Result<MotorStatus>;
    async fn set_motor_mode(&self, mode: MotorMode) -> Result<StatusResponse>;
    async fn daemon_status(&self) -> Result<DaemonStatus>;

    /// Reachability check, never fails
    async fn ping(&self) -> bool {
        match self.daemon_status().await {
            Ok(_) => true,
            Err(error) => {
                debug!(%error, "Daemon ping failed");
                false
            }
        }
    }
}

/// Answers "is anything still moving" for the motion waiter
#[async_trait]
pub trait MovementProbe: Send + Sync {
    async fn is_movement_running(&self) -> Result<bool>;
}

#[async_trait]
impl<T: DaemonApi + ?Sized> MovementProbe for T {
    async fn is_movement_running(&self) -> Result<bool> {
        Ok(!self.running_moves().await?.is_empty())
    }
}

pub struct HttpDaemonClient {
    client: reqwest::Client,
    config: ClientConfig,
    base_url: Url,
}

impl HttpDaemonClient {
    pub fn new(config: ClientConfig) -> std::result::Result<Self, ConfigError> {
        let base_url = config.validated_base_url()?;
        Ok(HttpDaemonClient {
            client: reqwest::Client::new(),
            config,
            base_url,
        })
    }

    /// Apply a partial config, the previous one stays active if the new base URL is rejected
    pub fn update_config(&mut self, update: &ConfigUpdate) -> std::result::Result<(), ConfigError> {
        let config = self.config.merged(update)?;
        self.base_url = config::sanitize_base_url(&config.base_url)?;
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Endpoint under the base URL, every segment gets percent-encoded
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        trace!(%method, %url, "daemon request");
        self.client
            .request(method, url)
            .timeout(self.config.timeout())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(ApiError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16()));
        }
        response.json::<T>().await.map_err(ApiError::from_reqwest)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        self.send(self.request(Method::GET, segments)).await
    }

    async fn post<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        self.send(self.request(Method::POST, segments)).await
    }
}

#[async_trait]
impl DaemonApi for HttpDaemonClient {
    async fn wake_up(&self) -> Result<MoveUuid> {
        self.post(&["move", "play", "wake_up"]).await
    }

    async fn goto_sleep(&self) -> Result<MoveUuid> {
        self.post(&["move", "play", "goto_sleep"]).await
    }

    async fn goto(&self, request: &MovementRequest) -> Result<MoveUuid> {
        self.send(self.request(Method::POST, &["move", "goto"]).json(request))
            .await
    }

    async fn running_moves(&self) -> Result<Vec<serde_json::Value>> {
        self.get(&["move", "running"]).await
    }

    async fn stop_movement(&self) -> Result<StatusResponse> {
        self.post(&["move", "stop"]).await
    }

    async fn list_recorded_moves(&self, dataset: &str) -> Result<Vec<String>> {
        self.get(&["move", "recorded-move-datasets", "list", dataset])
            .await
    }

    async fn play_recorded_move(&self, dataset: &str, move_name: &str) -> Result<MoveUuid> {
        self.post(&[
            "move",
            "play",
            "recorded-move-dataset",
            dataset,
            move_name,
        ])
        .await
    }

    async fn full_state(&self) -> Result<FullState> {
        self.get(&["state", "full"]).await
    }

    async fn head_pose(&self) -> Result<HeadPose> {
        self.get(&["state", "present_head_pose"]).await
    }

    async fn body_yaw(&self) -> Result<f64> {
        self.get(&["state", "present_body_yaw"]).await
    }

    async fn antenna_positions(&self) -> Result<[f64; 2]> {
        self.get(&["state", "present_antenna_joint_positions"])
            .await
    }

    async fn motor_status(&self) -> Result<MotorStatus> {
        self.get(&["motors", "status"]).await
    }

    async fn set_motor_mode(&self, mode: MotorMode) -> Result<StatusResponse> {
        self.post(&["motors", "set_mode", mode.as_str()]).await
    }

    async fn daemon_status(&self) -> Result<DaemonStatus> {
        self.get(&["daemon", "status"]).await
    }
}
