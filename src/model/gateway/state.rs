use serde::Deserialize;

use crate::model::id::GuildId;

/// Periodic player position report.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    pub guild_id: GuildId,
    pub state: PlayerState
}

#[derive(Debug, Deserialize)]
pub struct PlayerState {
    /// Unix timestamp of the report in milliseconds.
    pub time: u64,
    /// Position in the current track in milliseconds.
    #[serde(default)]
    pub position: u64,
    /// Whether the node is connected to the voice gateway.
    pub connected: bool,
    /// Voice gateway ping in milliseconds, -1 when not connected.
    pub ping: i64
}
