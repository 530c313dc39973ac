use serde::Deserialize;

/// The ready event, fired when a new connection is established
/// with the node.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ready {
    /// Whether if the session was resumed or not.
    pub resumed: bool,
    /// The session id, needed by every player route.
    pub session_id: String
}
