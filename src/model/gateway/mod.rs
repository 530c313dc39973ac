pub mod event;
pub mod ready;
pub mod state;

use serde::Deserialize;

use crate::model::id::GuildId;
use crate::model::info::Stats;

/// Payloads that can be received from a node's websocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum IncomingPayload {
    Ready(ready::Ready),
    PlayerUpdate(state::PlayerUpdate),
    Stats(Stats),
    Event(EventPayload)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub guild_id: GuildId,
    #[serde(flatten)]
    pub event: event::Event
}
