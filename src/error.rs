use crate::config::CONFIG_KEYS;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration key: {0}; possible configuration keys: {keys}", keys = CONFIG_KEYS.join(", "))]
    InvalidConfigKey(String),

    #[error("missing required argument: {0}")]
    MissingRequiredArgument(&'static str),

    #[error("docker daemon is not running, please start the docker daemon first")]
    DaemonNotRunning,

    #[error("MySQL server is not started (no answer after {attempts} attempts)")]
    DatabaseNotReady { attempts: u32 },

    #[error("the command is not found: {0}")]
    UnknownCommand(String),

    #[error("failed to read {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    ConfigWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read input: {0}")]
    Input(#[source] std::io::Error),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}
