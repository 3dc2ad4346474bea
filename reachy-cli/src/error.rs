use reachy_controller::config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("failed to load configuration from {path}")]
    ConfigFile {
        path: String,
        #[source]
        source: ConfigError,
    },
    #[error("invalid client configuration")]
    InvalidConfig(#[from] ConfigError),
    #[error("interrupted, movement stopped")]
    Interrupted,
}
