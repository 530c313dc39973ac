use serde_json::{json, Value};

use crate::model::id::{ChannelId, GuildId};
use crate::Result;

/// Sends voice state updates (gateway opcode 4) on the shard that owns a
/// guild.
pub trait GatewaySender: Send + Sync {
    /// Joins `channel`, or leaves voice when `None`.
    fn update_voice_state(&self, guild: GuildId, channel: Option<ChannelId>) -> Result<()>;
}

/// Raw opcode 4 payload, for gateway libraries that take plain json.
pub fn voice_state_payload(guild: GuildId, channel: Option<ChannelId>) -> Value {
    json!({
        "op": 4,
        "d": {
            "guild_id": guild,
            "channel_id": channel,
            "self_mute": false,
            "self_deaf": true
        }
    })
}

#[inline]
pub fn shard_id(guild: GuildId, shard_count: u64) -> u64 {
    (guild.get() >> 22) % shard_count.max(1)
}

#[cfg(feature = "twilight")]
pub use self::twilight::ShardStorage;

#[cfg(feature = "twilight")]
mod twilight {
    use std::collections::HashMap;

    use twilight_gateway::MessageSender;
    use twilight_model::gateway::payload::outgoing::UpdateVoiceState;
    use twilight_model::id::marker::{ChannelMarker, GuildMarker};
    use twilight_model::id::Id;

    use super::*;
    use crate::error::Error;

    /// Message senders of every shard, keyed by shard id.
    pub struct ShardStorage {
        pub shards: HashMap<u64, MessageSender>
    }

    impl ShardStorage {
        pub fn new(shards: HashMap<u64, MessageSender>) -> Self {
            Self {
                shards
            }
        }

        pub fn for_guild(&self, guild: GuildId) -> Option<&MessageSender> {
            self.shards.get(&shard_id(guild, self.shards.len() as _))
        }
    }

    impl GatewaySender for ShardStorage {
        fn update_voice_state(&self, guild: GuildId, channel: Option<ChannelId>) -> Result<()> {
            let sender = self.for_guild(guild)
                .ok_or_else(|| Error::InvalidArgument(format!("no shard for guild {guild}")))?;

            let guild_id: Id<GuildMarker> = Id::new_checked(guild.get())
                .ok_or_else(|| Error::InvalidArgument("guild id must not be zero".to_string()))?;
            let channel_id: Option<Id<ChannelMarker>> = channel.and_then(|c| Id::new_checked(c.get()));

            sender.command(&UpdateVoiceState::new(guild_id, channel_id, true, false))
                .map_err(|e| Error::BackendUnavailable(format!("shard channel closed: {e}")))
        }
    }
}
