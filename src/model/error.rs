use serde::Deserialize;
use thiserror::Error;

/// Error body returned by the node's REST routes.
#[derive(Deserialize, Debug, Error)]
#[error("Node responded with {status} {error}: {message}")]
pub struct ErrorResponse {
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String
}
