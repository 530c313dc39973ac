use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::id::{ChannelId, GuildId, UserId};

/// Connection information the node needs to join a voice channel.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    /// Token of the connection.
    pub token: String,
    /// Endpoint to connect to.
    pub endpoint: String,
    /// Session id of the connection.
    pub session_id: String,
    /// Channel id the connection belongs to.
    #[serde(skip)]
    pub channel_id: Option<ChannelId>
}

/// Voice information collected from the gateway, which arrives in two
/// separate dispatches in no particular order.
#[derive(Default, Debug, Clone)]
pub(crate) struct PartialConnectionInfo {
    pub channel_id: Option<ChannelId>,
    pub endpoint: Option<String>,
    pub session_id: Option<String>,
    pub token: Option<String>
}

impl PartialConnectionInfo {
    pub fn complete(&self) -> bool {
        self.endpoint.is_some()
            && self.session_id.is_some()
            && self.token.is_some()
    }

    pub fn to_info(&self) -> Option<ConnectionInfo> {
        Some(ConnectionInfo {
            token: self.token.clone()?,
            endpoint: self.endpoint.clone()?,
            session_id: self.session_id.clone()?,
            channel_id: self.channel_id
        })
    }

    pub fn apply(&mut self, update: &VoiceUpdate) {
        match update {
            VoiceUpdate::Server(server) => {
                self.endpoint = server.endpoint.clone();
                self.token = Some(server.token.clone());
            },
            VoiceUpdate::State(state) => {
                self.channel_id = state.channel_id;
                self.session_id = Some(state.session_id.clone());
            }
        }
    }
}

/// `VOICE_SERVER_UPDATE` dispatch data.
#[derive(Deserialize, Debug, Clone)]
pub struct VoiceServer {
    pub guild_id: GuildId,
    pub token: String,
    pub endpoint: Option<String>
}

/// `VOICE_STATE_UPDATE` dispatch data, reduced to what the relay needs.
#[derive(Deserialize, Debug, Clone)]
pub struct VoiceState {
    pub guild_id: Option<GuildId>,
    pub channel_id: Option<ChannelId>,
    pub user_id: UserId,
    pub session_id: String
}

/// A voice related gateway dispatch relayed to the node pool.
#[derive(Debug, Clone)]
pub enum VoiceUpdate {
    Server(VoiceServer),
    State(VoiceState)
}

impl VoiceUpdate {
    pub fn guild_id(&self) -> Option<GuildId> {
        match self {
            Self::Server(s) => Some(s.guild_id),
            Self::State(s) => s.guild_id
        }
    }

    /// Extracts a voice update from a raw gateway payload, ignoring
    /// everything else.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let data = raw.get("d")?.clone();

        match raw.get("t")?.as_str()? {
            "VOICE_SERVER_UPDATE" => serde_json::from_value(data).ok().map(Self::Server),
            "VOICE_STATE_UPDATE" => serde_json::from_value(data).ok().map(Self::State),
            _ => None
        }
    }
}

#[cfg(feature = "twilight")]
mod twilight {
    use twilight_model::gateway::payload::incoming::{VoiceServerUpdate, VoiceStateUpdate};

    use super::*;

    impl From<&VoiceServerUpdate> for VoiceUpdate {
        fn from(value: &VoiceServerUpdate) -> Self {
            Self::Server(VoiceServer {
                guild_id: GuildId(value.guild_id.get()),
                token: value.token.clone(),
                endpoint: value.endpoint.clone()
            })
        }
    }

    impl From<&VoiceStateUpdate> for VoiceUpdate {
        fn from(value: &VoiceStateUpdate) -> Self {
            Self::State(VoiceState {
                guild_id: value.0.guild_id.map(|id| GuildId(id.get())),
                channel_id: value.0.channel_id.map(|id| ChannelId(id.get())),
                user_id: UserId(value.0.user_id.get()),
                session_id: value.0.session_id.clone()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn collects_both_halves() {
        let server = VoiceUpdate::from_raw(&json!({
            "op": 0,
            "t": "VOICE_SERVER_UPDATE",
            "d": { "guild_id": "10", "token": "tok", "endpoint": "eu.discord.media:443" }
        })).unwrap();
        let state = VoiceUpdate::from_raw(&json!({
            "op": 0,
            "t": "VOICE_STATE_UPDATE",
            "d": {
                "guild_id": "10", "channel_id": "20", "user_id": "30",
                "session_id": "sess", "deaf": false, "mute": false
            }
        })).unwrap();

        let mut partial = PartialConnectionInfo::default();
        partial.apply(&server);
        assert!(!partial.complete());
        partial.apply(&state);

        let info = partial.to_info().unwrap();
        assert_eq!(info.channel_id, Some(ChannelId(20)));
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({ "token": "tok", "endpoint": "eu.discord.media:443", "sessionId": "sess" })
        );
    }

    #[test]
    fn ignores_unrelated_dispatches() {
        assert!(VoiceUpdate::from_raw(&json!({ "t": "MESSAGE_CREATE", "d": {} })).is_none());
        assert!(VoiceUpdate::from_raw(&json!({ "op": 11 })).is_none());
    }
}
