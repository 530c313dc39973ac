use std::time::Duration;

use crate::model::gateway::event::TrackEndReason;
use crate::model::id::{ChannelId, GuildId};
use crate::model::track::Track;

/// Events emitted by the audio backend, consumed by the session manager.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    TrackStart {
        guild: GuildId,
        track: Track
    },
    TrackEnd {
        guild: GuildId,
        track: Track,
        reason: TrackEndReason
    },
    TrackException {
        guild: GuildId,
        track: Track,
        message: String
    },
    TrackStuck {
        guild: GuildId,
        track: Track,
        threshold: Duration
    },
    PlayerUpdate {
        guild: GuildId,
        position: Duration,
        connected: bool
    },
    /// The voice connection was closed. `code` is the voice gateway close
    /// code, absent when the bot was removed from the channel.
    VoiceClosed {
        guild: GuildId,
        code: Option<u16>,
        by_remote: bool
    },
    NodeConnected {
        node: String,
        resumed: bool
    },
    NodeDisconnected {
        node: String
    },
    NodeError {
        node: String,
        message: String
    }
}

impl BackendEvent {
    pub fn guild(&self) -> Option<GuildId> {
        match self {
            Self::TrackStart { guild, .. }
            | Self::TrackEnd { guild, .. }
            | Self::TrackException { guild, .. }
            | Self::TrackStuck { guild, .. }
            | Self::PlayerUpdate { guild, .. }
            | Self::VoiceClosed { guild, .. } => Some(*guild),
            _ => None
        }
    }
}

/// Why a session went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyReason {
    /// Explicit stop command.
    Stopped,
    /// Nothing played for the configured idle duration.
    Idle,
    /// The bot was removed from the voice channel.
    Disconnected
}

/// Notifications for the presentation layer, so displayed panels can follow
/// state changes that no command caused.
#[derive(Debug, Clone)]
pub enum Notification {
    TrackStarted {
        guild: GuildId,
        text_channel: ChannelId,
        track: Track
    },
    TrackErrored {
        guild: GuildId,
        text_channel: ChannelId,
        track: Track,
        message: String
    },
    QueueEnded {
        guild: GuildId,
        text_channel: ChannelId
    },
    SessionDestroyed {
        guild: GuildId,
        text_channel: ChannelId,
        reason: DestroyReason
    },
    NodeConnected {
        node: String
    },
    NodeDisconnected {
        node: String
    },
    NodeError {
        node: String,
        message: String
    }
}
