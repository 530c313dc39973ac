use serde::Deserialize;

use crate::model::search::LoadException;
use crate::model::track::Track;

/// Track and voice related events received from a node.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A track has started playing.
    TrackStartEvent { track: Track },
    /// A track ended playing, either by skipping or naturally finished.
    TrackEndEvent(TrackEnd),
    /// A track threw an exception while playing.
    TrackExceptionEvent {
        track: Track,
        exception: LoadException
    },
    /// A track did not produce audio for longer than the threshold.
    #[serde(rename_all = "camelCase")]
    TrackStuckEvent {
        track: Track,
        threshold_ms: u64
    },
    /// The voice websocket between the node and discord was closed.
    #[serde(rename_all = "camelCase")]
    WebSocketClosedEvent {
        code: u16,
        reason: String,
        by_remote: bool
    }
}

/// Event fired when a track finishes its playback.
#[derive(Debug, Deserialize)]
pub struct TrackEnd {
    /// The track itself.
    pub track: Track,
    /// Why the track ended.
    pub reason: TrackEndReason
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackEndReason {
    Finished,
    LoadFailed,
    Stopped,
    Replaced,
    Cleanup
}

impl TrackEndReason {
    /// Whether the queue should move on by itself.
    pub fn may_start_next(self) -> bool {
        matches!(self, Self::Finished | Self::LoadFailed)
    }
}
