use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::model::track::Track;

/// Search conventions understood by the backend node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SearchSource {
    Youtube,
    YoutubeMusic,
    SoundCloud,
    Spotify,
    AppleMusic,
    Deezer
}

impl SearchSource {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Youtube => "ytsearch",
            Self::YoutubeMusic => "ytmsearch",
            Self::SoundCloud => "scsearch",
            Self::Spotify => "spsearch",
            Self::AppleMusic => "amsearch",
            Self::Deezer => "dzsearch"
        }
    }

    /// The interchangeable convention to retry with when a search comes back
    /// empty. Many nodes only serve one of the two youtube flavours.
    // TODO: replace with per-node source capabilities read from the node's info route.
    pub fn alternate(self) -> Option<Self> {
        match self {
            Self::Youtube => Some(Self::YoutubeMusic),
            Self::YoutubeMusic => Some(Self::Youtube),
            _ => None
        }
    }

    /// Builds the load identifier for a query. Links are passed through verbatim.
    pub fn identifier(self, query: &str) -> String {
        let query = query.trim();

        if is_link(query) {
            query.to_string()
        } else {
            format!("{}:{query}", self.prefix())
        }
    }
}

impl Default for SearchSource {
    fn default() -> Self {
        Self::Youtube
    }
}

impl fmt::Display for SearchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for SearchSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ytsearch" => Self::Youtube,
            "ytmsearch" => Self::YoutubeMusic,
            "scsearch" => Self::SoundCloud,
            "spsearch" => Self::Spotify,
            "amsearch" => Self::AppleMusic,
            "dzsearch" => Self::Deezer,
            other => return Err(format!("unknown search source `{other}`"))
        })
    }
}

pub(crate) fn is_link(query: &str) -> bool {
    query.starts_with("https://") || query.starts_with("http://")
}

/// Outcome of a search, reduced to what a queue needs.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadResult {
    /// A direct match or the best search hit.
    Track(Track),
    /// A playlist, in its original order.
    Playlist {
        title: String,
        tracks: Vec<Track>
    },
    /// Nothing matched.
    Empty
}

impl LoadResult {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Track(_) => false,
            Self::Playlist { tracks, .. } => tracks.is_empty(),
            Self::Empty => true
        }
    }
}

/// Raw body of the node's load route.
#[derive(Debug, Deserialize)]
#[serde(tag = "loadType", content = "data", rename_all = "lowercase")]
pub(crate) enum LoadResponse {
    Track(Track),
    Playlist(PlaylistData),
    Search(Vec<Track>),
    Empty(Option<Value>),
    Error(LoadException)
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistData {
    pub info: PlaylistInfo,
    pub tracks: Vec<Track>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistInfo {
    pub name: String
}

/// Error reported by the node for a failed load or a failed track.
#[derive(Debug, Deserialize, Clone)]
pub struct LoadException {
    pub message: Option<String>,
    pub severity: String,
    #[serde(default)]
    pub cause: Option<String>
}

impl From<LoadResponse> for LoadResult {
    fn from(value: LoadResponse) -> Self {
        match value {
            LoadResponse::Track(track) => Self::Track(track),
            LoadResponse::Playlist(p) if !p.tracks.is_empty() => Self::Playlist {
                title: p.info.name,
                tracks: p.tracks
            },
            LoadResponse::Search(mut tracks) if !tracks.is_empty() => Self::Track(tracks.remove(0)),
            LoadResponse::Error(e) => {
                tracing::warn!(severity = %e.severity, "Node failed to load tracks: {:?}", e.message);
                Self::Empty
            },
            _ => Self::Empty
        }
    }
}
