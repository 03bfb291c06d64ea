//! # Game Layer Errors

use thiserror::Error;

use secs_core::EcsError;

/// Errors raised by the game layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GameError {
    /// The underlying registry rejected an operation.
    #[error("registry error: {0}")]
    Registry(#[from] EcsError),

    /// A configuration value is out of range or could not be parsed.
    #[error("invalid game configuration: {0}")]
    InvalidConfig(String),

    /// No registered system has the requested type.
    #[error("no system of type {0} is registered")]
    SystemNotFound(&'static str),
}

impl From<toml::de::Error> for GameError {
    fn from(err: toml::de::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

/// Result type for game layer operations.
pub type GameResult<T> = Result<T, GameError>;
