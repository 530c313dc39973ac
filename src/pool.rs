use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::config::PoolConfig;
use crate::error::Error;
use crate::events::BackendEvent;
use crate::model::connection::{ConnectionInfo, PartialConnectionInfo, VoiceUpdate};
use crate::model::filter::Filters;
use crate::model::id::{ChannelId, GuildId};
use crate::model::info::Stats;
use crate::model::player::{UpdatePlayer, UpdateTrack};
use crate::model::search::{LoadResult, SearchSource};
use crate::model::track::Track;
use crate::node::Node;
use crate::shard::GatewaySender;
use crate::Result;

/// Voice information of a guild, built from the gateway dispatches.
#[derive(Default)]
struct VoiceSlot {
    partial: PartialConnectionInfo,
    waiter: Option<oneshot::Sender<ConnectionInfo>>,
    connected: bool
}

/// Ordered set of audio nodes implementing [`Backend`].
///
/// Guilds stick to the node they were first served by. When that node is
/// gone the next available one in configuration order takes over, and the
/// voice connection is replayed to it.
#[derive(Clone)]
pub struct NodePool {
    inner: Arc<PoolInner>
}

struct PoolInner {
    config: PoolConfig,
    nodes: Vec<Arc<Node>>,
    bindings: DashMap<GuildId, usize>,
    voice: DashMap<GuildId, VoiceSlot>,
    gateway: Arc<dyn GatewaySender>,
    events: mpsc::UnboundedSender<BackendEvent>,
    tasks: Mutex<Vec<JoinHandle<()>>>
}

impl NodePool {
    /// Creates the pool and the receiver its events are delivered on, to be
    /// handed to [`MusicManager::listen`](crate::MusicManager::listen).
    pub fn new(
        config: PoolConfig,
        request_timeout: Duration,
        gateway: Arc<dyn GatewaySender>
    ) -> Result<(Self, mpsc::UnboundedReceiver<BackendEvent>)> {
        if config.nodes.is_empty() {
            return Err(Error::InvalidArgument("at least one node is required".to_string()));
        }

        let nodes = config.nodes
            .iter()
            .map(|d| Node::new(d.clone(), request_timeout).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        let (events, receiver) = mpsc::unbounded_channel();

        let pool = Self {
            inner: Arc::new(PoolInner {
                config,
                nodes,
                bindings: DashMap::new(),
                voice: DashMap::new(),
                gateway,
                events,
                tasks: Mutex::new(Vec::new())
            })
        };

        Ok((pool, receiver))
    }

    /// Spawns the websocket task of every node.
    pub fn start(&self) {
        let mut tasks = self.inner.tasks.lock();
        if !tasks.is_empty() {
            return;
        }

        for node in &self.inner.nodes {
            info!(node = %node.id(), host = %node.descriptor.host, "Starting node");

            tasks.push(tokio::spawn(Arc::clone(node).run(
                self.inner.config.user_id,
                self.inner.config.client_name.clone(),
                self.inner.events.clone()
            )));
        }
    }

    /// Aborts every node task.
    pub fn shutdown(&self) {
        for task in self.inner.tasks.lock().drain(..) {
            task.abort();
        }
    }

    /// Latest statistics of each node, in configuration order.
    pub fn stats(&self) -> Vec<(String, Option<Stats>)> {
        self.inner.nodes.iter().map(|n| (n.id().to_string(), n.stats())).collect()
    }

    /// Feeds a raw gateway dispatch. Everything but voice updates is ignored.
    pub fn relay_raw(&self, raw: &Value) {
        if let Some(update) = VoiceUpdate::from_raw(raw) {
            self.relay(update);
        }
    }

    /// Feeds a voice update received from the gateway.
    pub fn relay(&self, update: VoiceUpdate) {
        let Some(guild) = update.guild_id() else { return };

        if let VoiceUpdate::State(state) = &update {
            if state.user_id != self.inner.config.user_id {
                return;
            }

            if state.channel_id.is_none() {
                // Our own leave removes the slot before asking the gateway.
                if self.inner.voice.remove(&guild).is_some() {
                    debug!(%guild, "Removed from voice channel");
                    let _ = self.inner.events.send(BackendEvent::VoiceClosed { guild, code: None, by_remote: true });
                }
                return;
            }
        }

        let mut slot = self.inner.voice.entry(guild).or_default();
        slot.partial.apply(&update);

        if !slot.partial.complete() {
            return;
        }

        let Some(info) = slot.partial.to_info() else { return };

        if let Some(waiter) = slot.waiter.take() {
            let _ = waiter.send(info);
            return;
        }

        if slot.connected {
            drop(slot);
            // Endpoint moved or the channel changed, the node has to follow.
            let pool = self.clone();
            tokio::spawn(async move {
                let update = UpdatePlayer { voice: Some(info), ..Default::default() };
                if let Err(e) = pool.update(guild, update).await {
                    warn!(%guild, "Could not forward voice update: {e}");
                }
            });
        }
    }

    fn voice_info(&self, guild: GuildId) -> Option<ConnectionInfo> {
        self.inner.voice.get(&guild).and_then(|s| s.partial.to_info())
    }

    /// Node serving the guild, failing over in configuration order. Returns
    /// the index and whether the guild moved.
    fn select(&self, guild: GuildId) -> Result<(usize, bool)> {
        let bound = self.inner.bindings.get(&guild).map(|b| *b);

        if let Some(index) = bound {
            if self.inner.nodes[index].is_available() {
                return Ok((index, false));
            }
        }

        let index = self.inner.nodes
            .iter()
            .position(|n| n.is_available())
            .ok_or_else(|| Error::BackendUnavailable("no node is connected".to_string()))?;

        if let Some(previous) = bound {
            info!(%guild, from = %self.inner.nodes[previous].id(), to = %self.inner.nodes[index].id(), "Moving guild to another node");
        }

        Ok((index, bound.is_some()))
    }

    async fn update(&self, guild: GuildId, mut update: UpdatePlayer) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }

        let (index, moved) = self.select(guild)?;
        let node = &self.inner.nodes[index];
        let session = node.session().ok_or_else(|| Error::BackendUnavailable(format!("node {} lost its session", node.id())))?;

        if moved && update.voice.is_none() {
            update.voice = self.voice_info(guild);
        }

        node.rest.update_player(&session, guild, &update).await?;
        self.inner.bindings.insert(guild, index);

        Ok(())
    }
}

#[async_trait]
impl Backend for NodePool {
    async fn connect(&self, guild: GuildId, channel: ChannelId) -> Result<()> {
        let (tx, rx) = oneshot::channel();

        {
            let mut slot = self.inner.voice.entry(guild).or_default();
            slot.waiter = Some(tx);
            slot.connected = false;
        }

        self.inner.gateway.update_voice_state(guild, Some(channel))?;

        let info = match timeout(self.inner.config.voice_timeout, rx).await {
            Ok(Ok(info)) => info,
            _ => {
                self.inner.voice.remove(&guild);
                return Err(Error::BackendUnavailable("voice connection was not established in time".to_string()));
            }
        };

        debug!(%guild, %channel, "Voice information collected");
        self.update(guild, UpdatePlayer { voice: Some(info), ..Default::default() }).await?;

        if let Some(mut slot) = self.inner.voice.get_mut(&guild) {
            slot.connected = true;
        }

        Ok(())
    }

    async fn search(&self, query: &str, source: SearchSource) -> Result<LoadResult> {
        let identifier = source.identifier(query);
        let mut last = None;

        for node in self.inner.nodes.iter().filter(|n| n.is_available()) {
            match node.rest.load_tracks(&identifier).await {
                Ok(result) => return Ok(result),
                Err(e) if e.kind() == crate::ErrorKind::BackendUnavailable => {
                    warn!(node = %node.id(), "Search failed, trying next node: {e}");
                    last = Some(e);
                },
                Err(e) => return Err(e)
            }
        }

        Err(last.unwrap_or_else(|| Error::BackendUnavailable("no node is connected".to_string())))
    }

    async fn play(&self, guild: GuildId, track: &Track, position: Duration, paused: bool) -> Result<()> {
        self.update(guild, UpdatePlayer {
            track: Some(UpdateTrack { encoded: Some(track.encoded.clone()) }),
            position: Some(position.as_millis() as u64),
            paused: Some(paused),
            ..Default::default()
        }).await
    }

    async fn stop(&self, guild: GuildId) -> Result<()> {
        self.update(guild, UpdatePlayer {
            track: Some(UpdateTrack { encoded: None }),
            ..Default::default()
        }).await
    }

    async fn set_paused(&self, guild: GuildId, paused: bool) -> Result<()> {
        self.update(guild, UpdatePlayer { paused: Some(paused), ..Default::default() }).await
    }

    async fn seek(&self, guild: GuildId, position: Duration) -> Result<()> {
        self.update(guild, UpdatePlayer { position: Some(position.as_millis() as u64), ..Default::default() }).await
    }

    async fn set_volume(&self, guild: GuildId, volume: u8) -> Result<()> {
        self.update(guild, UpdatePlayer { volume: Some(u16::from(volume)), ..Default::default() }).await
    }

    async fn set_filters(&self, guild: GuildId, filters: &Filters) -> Result<()> {
        self.update(guild, UpdatePlayer { filters: Some(filters.clone()), ..Default::default() }).await
    }

    async fn disconnect(&self, guild: GuildId) -> Result<()> {
        self.inner.voice.remove(&guild);
        let bound = self.inner.bindings.remove(&guild).map(|(_, index)| index);

        let left = self.inner.gateway.update_voice_state(guild, None);

        if let Some(node) = bound.map(|i| &self.inner.nodes[i]) {
            if let Some(session) = node.session() {
                node.rest.destroy_player(&session, guild).await?;
            }
        }

        left
    }

    fn bound_node(&self, guild: GuildId) -> Option<String> {
        self.inner.bindings.get(&guild).map(|i| self.inner.nodes[*i].id().to_string())
    }
}
