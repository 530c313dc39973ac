use std::time::Duration;

use async_trait::async_trait;

use crate::model::filter::Filters;
use crate::model::id::{ChannelId, GuildId};
use crate::model::search::{LoadResult, SearchSource};
use crate::model::track::Track;
use crate::Result;

/// Primitives the session manager needs from the audio backend.
///
/// Every call may fail with [`Error::BackendUnavailable`](crate::Error::BackendUnavailable)
/// when no node can be reached. Events flow back separately as
/// [`BackendEvent`](crate::events::BackendEvent)s.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Joins the voice channel and prepares a player for the guild.
    async fn connect(&self, guild: GuildId, channel: ChannelId) -> Result<()>;

    async fn search(&self, query: &str, source: SearchSource) -> Result<LoadResult>;

    /// Starts `track` at `position`, replacing whatever was playing.
    async fn play(&self, guild: GuildId, track: &Track, position: Duration, paused: bool) -> Result<()>;

    /// Stops playback without leaving the channel.
    async fn stop(&self, guild: GuildId) -> Result<()>;

    async fn set_paused(&self, guild: GuildId, paused: bool) -> Result<()>;

    async fn seek(&self, guild: GuildId, position: Duration) -> Result<()>;

    async fn set_volume(&self, guild: GuildId, volume: u8) -> Result<()>;

    async fn set_filters(&self, guild: GuildId, filters: &Filters) -> Result<()>;

    /// Destroys the player and leaves the voice channel.
    async fn disconnect(&self, guild: GuildId) -> Result<()>;

    /// Node currently serving the guild, if the backend tracks bindings.
    fn bound_node(&self, _guild: GuildId) -> Option<String> {
        None
    }
}
