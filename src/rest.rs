use std::time::Duration;

use reqwest::{Client, Response};
use tracing::debug;

use crate::config::NodeDescriptor;
use crate::error::Error;
use crate::model::error::ErrorResponse;
use crate::model::id::GuildId;
use crate::model::player::UpdatePlayer;
use crate::model::search::{LoadResponse, LoadResult};
use crate::Result;

/// REST client of a single node.
pub(crate) struct RestClient {
    http: Client,
    base: String,
    password: String
}

impl RestClient {
    pub fn new(node: &NodeDescriptor, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base: node.rest_url(),
            password: node.password.clone()
        })
    }

    /// Resolves an identifier, either a link or a prefixed search query.
    pub async fn load_tracks(&self, identifier: &str) -> Result<LoadResult> {
        let url = format!("{}/loadtracks?identifier={}", self.base, urlencoding::encode(identifier));
        debug!(%identifier, "Loading tracks");

        let response = self.http.get(url)
            .header("Authorization", &self.password)
            .send()
            .await
            .map_err(unreachable)?;

        let loaded = check(response).await?.json::<LoadResponse>().await?;

        Ok(loaded.into())
    }

    pub async fn update_player(&self, session: &str, guild: GuildId, update: &UpdatePlayer) -> Result<()> {
        let url = format!("{}/sessions/{session}/players/{guild}?noReplace=false", self.base);

        let response = self.http.patch(url)
            .header("Authorization", &self.password)
            .json(update)
            .send()
            .await
            .map_err(unreachable)?;

        check(response).await.map(drop)
    }

    pub async fn destroy_player(&self, session: &str, guild: GuildId) -> Result<()> {
        let url = format!("{}/sessions/{session}/players/{guild}", self.base);

        let response = self.http.delete(url)
            .header("Authorization", &self.password)
            .send()
            .await
            .map_err(unreachable)?;

        check(response).await.map(drop)
    }
}

fn unreachable(e: reqwest::Error) -> Error {
    if e.is_connect() || e.is_timeout() {
        Error::BackendUnavailable(e.to_string())
    } else {
        Error::Http(e)
    }
}

/// Turns non success responses into errors, using the node's error body
/// when it sent one.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(error) if status.is_server_error() => Err(Error::BackendUnavailable(error.to_string())),
        Ok(error) => Err(error.into()),
        Err(_) if status.is_server_error() => Err(Error::BackendUnavailable(format!("Node responded with {status}"))),
        Err(_) => Err(Error::Rejected(format!("Node responded with {status}: {body}")))
    }
}
