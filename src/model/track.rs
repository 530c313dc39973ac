use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A playable track as returned by the backend node.
///
/// Immutable once enqueued, apart from the requester which is stamped when
/// the track is added to a queue.
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct Track {
    /// Opaque handle the node uses to play the track.
    pub encoded: String,
    /// Descriptive information.
    pub info: TrackInfo,
    /// Display label of whoever queued the track.
    #[serde(default, skip_serializing)]
    pub requester: Option<String>
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub identifier: String,
    pub title: String,
    pub author: String,
    /// Length of the track, zero for live streams.
    #[serde(
        rename = "length",
        deserialize_with = "duration_from_millis",
        serialize_with = "duration_to_millis"
    )]
    pub duration: Duration,
    pub is_seekable: bool,
    pub is_stream: bool,
    pub uri: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub source_name: Option<String>
}

impl Track {
    pub fn title(&self) -> &str {
        &self.info.title
    }

    pub fn duration(&self) -> Duration {
        self.info.duration
    }

    /// Whether a seek can be issued against this track.
    pub fn can_seek(&self) -> bool {
        self.info.is_seekable && !self.info.is_stream
    }

    pub(crate) fn with_requester(mut self, requester: &str) -> Self {
        self.requester = Some(requester.to_string());
        self
    }
}

fn duration_from_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>
{
    Ok(Duration::from_millis(<u64 as Deserialize>::deserialize(deserializer)?))
}

fn duration_to_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer
{
    serializer.serialize_u64(duration.as_millis() as u64)
}
