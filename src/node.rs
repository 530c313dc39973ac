use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::config::NodeDescriptor;
use crate::error::SocketError;
use crate::events::BackendEvent;
use crate::model::gateway::event::{Event, TrackEnd};
use crate::model::gateway::{EventPayload, IncomingPayload};
use crate::model::id::UserId;
use crate::model::info::Stats;
use crate::rest::RestClient;
use crate::socket::Socket;
use crate::Result;

/// One audio node: its REST client plus what its websocket told us.
pub(crate) struct Node {
    pub descriptor: NodeDescriptor,
    pub rest: RestClient,
    /// Set while the websocket is up, required by every player route.
    session: RwLock<Option<String>>,
    stats: RwLock<Option<Stats>>
}

impl Node {
    pub fn new(descriptor: NodeDescriptor, request_timeout: Duration) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(&descriptor, request_timeout)?,
            descriptor,
            session: RwLock::new(None),
            stats: RwLock::new(None)
        })
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn session(&self) -> Option<String> {
        self.session.read().clone()
    }

    pub fn is_available(&self) -> bool {
        self.session.read().is_some()
    }

    pub fn stats(&self) -> Option<Stats> {
        self.stats.read().clone()
    }

    /// Keeps the websocket connected until the retry budget runs out.
    pub async fn run(self: Arc<Self>, user_id: UserId, client_name: String, events: UnboundedSender<BackendEvent>) {
        let mut failures = 0;
        let mut resume: Option<String> = None;

        loop {
            let mut socket = Socket::new(self.descriptor.password.clone(), user_id, client_name.clone());

            match socket.connect(&self.descriptor.socket_url(), resume.as_deref()).await {
                Ok(()) => {
                    failures = 0;
                    debug!(node = %self.id(), "Websocket connected");

                    while let Some(payload) = socket.next().await {
                        match payload {
                            Ok(payload) => self.handle(payload, &events),
                            Err(SocketError::Deserialize(e)) => warn!(node = %self.id(), "Unknown payload: {e}"),
                            Err(e) => {
                                let _ = events.send(BackendEvent::NodeError {
                                    node: self.id().to_string(),
                                    message: e.to_string()
                                });
                                break;
                            }
                        }
                    }

                    resume = self.session.write().take();
                    let _ = events.send(BackendEvent::NodeDisconnected { node: self.id().to_string() });
                },
                Err(e) => {
                    warn!(node = %self.id(), "Could not connect: {e}");
                    resume = None;
                    let _ = events.send(BackendEvent::NodeError {
                        node: self.id().to_string(),
                        message: e.to_string()
                    });
                }
            }

            failures += 1;
            if failures > self.descriptor.retry_attempts {
                error!(node = %self.id(), attempts = failures - 1, "Giving up on node");
                return;
            }

            if events.is_closed() {
                return;
            }

            tokio::time::sleep(self.descriptor.retry_delay).await;
        }
    }

    fn handle(&self, payload: IncomingPayload, events: &UnboundedSender<BackendEvent>) {
        let event = match payload {
            IncomingPayload::Ready(ready) => {
                info!(node = %self.id(), resumed = ready.resumed, "Node ready");
                *self.session.write() = Some(ready.session_id);

                BackendEvent::NodeConnected { node: self.id().to_string(), resumed: ready.resumed }
            },
            IncomingPayload::Stats(stats) => {
                *self.stats.write() = Some(stats);
                return;
            },
            IncomingPayload::PlayerUpdate(update) => BackendEvent::PlayerUpdate {
                guild: update.guild_id,
                position: Duration::from_millis(update.state.position),
                connected: update.state.connected
            },
            IncomingPayload::Event(payload) => translate(payload)
        };

        let _ = events.send(event);
    }
}

fn translate(EventPayload { guild_id: guild, event }: EventPayload) -> BackendEvent {
    match event {
        Event::TrackStartEvent { track } => BackendEvent::TrackStart { guild, track },
        Event::TrackEndEvent(TrackEnd { track, reason }) => BackendEvent::TrackEnd { guild, track, reason },
        Event::TrackExceptionEvent { track, exception } => BackendEvent::TrackException {
            guild,
            track,
            message: exception.message.unwrap_or(exception.severity)
        },
        Event::TrackStuckEvent { track, threshold_ms } => BackendEvent::TrackStuck {
            guild,
            track,
            threshold: Duration::from_millis(threshold_ms)
        },
        Event::WebSocketClosedEvent { code, reason, by_remote } => {
            debug!(%guild, code, %reason, "Voice websocket closed");
            BackendEvent::VoiceClosed { guild, code: Some(code), by_remote }
        }
    }
}
