use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};
use thiserror::Error;
use url::{Host, Url};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
/// Typical request timeout against real hardware
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Simulated movements answer a lot slower
pub const SIMULATOR_TIMEOUT_MS: u64 = 30_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("error while accessing configuration")]
    IoError(#[from] std::io::Error),
    #[error("error while parsing json")]
    JsonError(#[from] serde_json::Error),
    #[error("error while parsing yaml")]
    YamlError(#[from] serde_yaml::Error),
    #[error("invalid base URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("base URL must use http or https (received {0})")]
    UnsupportedScheme(String),
    #[error("base URL must point to localhost (received {0})")]
    NonLoopbackHost(String),
    #[error("unknown configuration format for {0}")]
    UnknownFormat(String),
}

type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Partial change applied on top of an existing configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigUpdate {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl ClientConfig {
    pub fn new(base_url: &str, timeout_ms: u64) -> ClientConfig {
        ClientConfig {
            base_url: base_url.to_owned(),
            timeout_ms,
        }
    }

    /// Defaults for a daemon driving the MuJoCo simulator
    pub fn simulator() -> ClientConfig {
        ClientConfig {
            timeout_ms: SIMULATOR_TIMEOUT_MS,
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed base URL, restricted to loopback hosts and without trailing slashes
    pub fn validated_base_url(&self) -> Result<Url> {
        sanitize_base_url(&self.base_url)
    }

    /// Returns a new config with the update applied.
    ///
    /// The base URL is validated before anything is returned so a rejected
    /// update leaves the caller's config untouched.
    pub fn merged(&self, update: &ConfigUpdate) -> Result<ClientConfig> {
        let next = ClientConfig {
            base_url: update
                .base_url
                .clone()
                .unwrap_or_else(|| self.base_url.clone()),
            timeout_ms: update.timeout_ms.unwrap_or(self.timeout_ms),
        };
        next.validated_base_url()?;
        Ok(next)
    }

    pub fn parse_json(text: &str) -> Result<ClientConfig> {
        let config: ClientConfig = serde_json::from_str(text)?;
        Ok(config)
    }

    pub fn parse_yaml(text: &str) -> Result<ClientConfig> {
        let config: ClientConfig = serde_yaml::from_str(text)?;
        Ok(config)
    }

    pub fn serialize_to_json(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(json)
    }

    pub fn serialize_to_yaml(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(yaml)
    }

    pub fn save_json(&self, path: &str) -> Result<()> {
        fs::write(path, self.serialize_to_json()?)?;
        Ok(())
    }

    pub fn save_yaml(&self, path: &str) -> Result<()> {
        fs::write(path, self.serialize_to_yaml()?)?;
        Ok(())
    }

    pub fn load_json(path: &str) -> Result<ClientConfig> {
        let text = fs::read_to_string(path)?;
        ClientConfig::parse_json(&text)
    }

    pub fn load_yaml(path: &str) -> Result<ClientConfig> {
        let text = fs::read_to_string(path)?;
        ClientConfig::parse_yaml(&text)
    }

    /// Load either format, picked by file extension
    pub fn load(path: &str) -> Result<ClientConfig> {
        let extension = Path::new(path)
            .extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| extension.to_ascii_lowercase());
        match extension.as_deref() {
            Some("json") => ClientConfig::load_json(path),
            Some("yaml") | Some("yml") => ClientConfig::load_yaml(path),
            _ => Err(ConfigError::UnknownFormat(path.to_owned())),
        }
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(address)) => address.is_loopback(),
        Some(Host::Ipv6(address)) => address.is_loopback(),
        None => false,
    }
}

pub(crate) fn sanitize_base_url(raw_url: &str) -> Result<Url> {
    let mut url = Url::parse(raw_url).map_err(|source| ConfigError::InvalidUrl {
        url: raw_url.to_owned(),
        source,
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::UnsupportedScheme(url.scheme().to_owned()));
    }
    if !is_loopback(&url) {
        return Err(ConfigError::NonLoopbackHost(
            url.host_str().unwrap_or_default().to_owned(),
        ));
    }
    let trimmed = url.path().trim_end_matches('/').to_owned();
    url.set_path(&trimmed);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
