//! Guild scoped music playback coordination.
//!
//! A [`MusicManager`] owns one [`PlaybackSession`] per guild and drives an
//! audio [`Backend`], usually a [`NodePool`] of audio nodes. Commands go
//! through the manager, backend events come back through
//! [`MusicManager::listen`], and the presentation layer renders
//! [`SessionSnapshot`]s and [`Panel`]s and follows [`Notification`]s.

pub mod backend;
pub mod config;
mod error;
pub mod events;
mod idle;
mod manager;
pub mod model;
mod node;
pub mod panel;
mod pool;
pub mod queue;
mod rest;
pub mod session;
pub mod settings;
pub mod shard;
pub mod snapshot;
mod socket;
mod stream;
pub mod time;

pub use backend::Backend;
pub use config::{Config, NodeDescriptor, PoolConfig};
pub use error::{Error, ErrorKind, SettingsError, SocketError};
pub use events::{BackendEvent, DestroyReason, Notification};
pub use manager::{MusicManager, SessionRef};
pub use panel::{PanelAction, PanelUpdate};
pub use pool::NodePool;
pub use session::{LoopMode, Outcome, PlayResult, PlaybackSession, SeekOutcome, SkipOutcome};
pub use settings::{GuildSettings, JsonSettingsStore, MemorySettingsStore, SettingsStore};
pub use snapshot::{Panel, PanelButtons, PanelView, QueueSnapshot, SessionSnapshot};
pub use stream::NotificationStream;

pub type Result<T, E = Error> = std::result::Result<T, E>;
