use thiserror::Error;

use crate::model::error::ErrorResponse;
use crate::model::id::GuildId;

/// Errors surfaced by session operations.
///
/// Expected outcomes (nothing found, already paused, unseekable track) are
/// not errors, see [`Outcome`](crate::session::Outcome) and friends.
#[derive(Debug, Error)]
pub enum Error {
    /// There is no active session for the guild.
    #[error("No active session for guild {0}")]
    NoSession(GuildId),
    /// No backend node could be reached, or it did not answer in time.
    #[error("No backend node available: {0}")]
    BackendUnavailable(String),
    /// The backend refused the operation.
    #[error("Backend rejected the operation: {0}")]
    Rejected(String),
    /// The filter preset is not known.
    #[error("Unknown filter preset `{0}`")]
    UnknownFilter(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Socket(#[from] SocketError)
}

/// Flat classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BackendUnavailable,
    OperationRejected,
    InvalidArgument
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoSession(_) => ErrorKind::NotFound,
            Self::BackendUnavailable(_) | Self::Http(_) | Self::Socket(_) => ErrorKind::BackendUnavailable,
            Self::Rejected(_) | Self::Json(_) => ErrorKind::OperationRejected,
            Self::UnknownFilter(_) | Self::InvalidArgument(_) => ErrorKind::InvalidArgument
        }
    }
}

impl From<ErrorResponse> for Error {
    fn from(value: ErrorResponse) -> Self {
        Self::Rejected(value.to_string())
    }
}

#[derive(Debug, Error)]
#[error(transparent)]
pub enum SocketError {
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
    Deserialize(#[from] serde_json::Error),
    Header(#[from] tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue)
}

/// Failure of the settings store. Never fatal, callers fall back to defaults.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Could not access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Settings file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error)
}
