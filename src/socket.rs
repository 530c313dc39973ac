use std::{pin::Pin, task::{Context, Poll}};

use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::{client::IntoClientRequest, http::HeaderValue, Message}, MaybeTlsStream, WebSocketStream};
use futures::{ready, Stream};
use tracing::{debug, warn};

use crate::{error::SocketError, model::gateway::IncomingPayload, model::id::UserId};

/// A websocket client to a node.
pub(crate) struct Socket {
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    password: String,
    user_id: UserId,
    client_name: String
}

impl Socket {
    pub fn new(password: String, user_id: UserId, client_name: String) -> Self {
        Self {
            stream: None,
            password,
            user_id,
            client_name
        }
    }

    /// Connects to `url`, resuming `session` when given.
    pub async fn connect(&mut self, url: &str, session: Option<&str>) -> Result<(), SocketError> {
        let mut req = url.into_client_request()?;
        let headers = req.headers_mut();

        headers.insert("Authorization", HeaderValue::from_str(&self.password)?);
        headers.insert("User-Id", HeaderValue::from_str(&self.user_id.to_string())?);
        headers.insert("Client-Name", HeaderValue::from_str(&self.client_name)?);

        if let Some(session) = session {
            headers.insert("Session-Id", HeaderValue::from_str(session)?);
        }

        let (connection, _) = connect_async(req).await?;

        self.stream = Some(connection);

        Ok(())
    }
}

impl Stream for Socket {
    type Item = Result<IncomingPayload, SocketError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            let Some(socket) = this.stream.as_mut() else { return Poll::Ready(None) };

            let msg = match ready!(Pin::new(socket).poll_next(cx)) {
                None => {
                    this.stream = None;
                    return Poll::Ready(None);
                },
                Some(Err(e)) => {
                    warn!("Disconnected from node, error: {e}");
                    this.stream = None;
                    return Poll::Ready(Some(Err(From::from(e))));
                },
                Some(Ok(msg)) => msg
            };

            let data = match msg {
                Message::Text(t) => t,
                Message::Close(frame) => {
                    debug!(?frame, "Node closed the connection");
                    this.stream = None;
                    return Poll::Ready(None);
                },
                // Pings are answered by tungstenite itself.
                _ => continue
            };

            return Poll::Ready(Some(serde_json::from_str(&data).map_err(From::from)));
        }
    }
}
