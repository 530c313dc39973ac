use std::path::PathBuf;
use std::time::Duration;

use crate::model::id::UserId;
use crate::model::search::SearchSource;

/// Behaviour of the session manager.
#[derive(Clone, Debug)]
pub struct Config {
    /// How long a session may sit with nothing to play before it is destroyed.
    pub idle_timeout: Duration,
    /// Volume of a new session when the guild has nothing saved.
    pub default_volume: u8,
    /// Source used by `play` when the caller does not pick one.
    pub default_source: SearchSource,
    /// Depth of the previously played stack.
    pub history_depth: usize,
    /// Upper bound for any single backend call.
    pub request_timeout: Duration,
    /// How long skip and previous wait for the node to report the new track.
    pub track_start_timeout: Duration,
    /// Volume change applied by the panel buttons.
    pub volume_step: u8,
    /// Location of the persisted per-guild settings.
    pub settings_path: PathBuf
}

impl Default for Config {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(60),
            default_volume: 100,
            default_source: SearchSource::Youtube,
            history_depth: 25,
            request_timeout: Duration::from_secs(10),
            track_start_timeout: Duration::from_secs(3),
            volume_step: 10,
            settings_path: PathBuf::from("data/guildSettings.json")
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from a variable lookup, leaving defaults in
    /// place for anything missing or malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(ms) = parse::<u64>(&lookup, "LAVALINK_IDLE_DESTROY_MS") {
            config.idle_timeout = Duration::from_millis(ms.max(1000));
        }
        if let Some(source) = lookup("DEFAULT_SEARCH_SOURCE").and_then(|s| s.parse().ok()) {
            config.default_source = source;
        }
        if let Some(volume) = parse::<u8>(&lookup, "DEFAULT_VOLUME") {
            config.default_volume = volume.min(100);
        }
        if let Some(path) = lookup("SETTINGS_PATH") {
            config.settings_path = PathBuf::from(path);
        }

        config
    }
}

/// Static description of a backend node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeDescriptor {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub password: String,
    pub secure: bool,
    /// Delay between reconnect attempts.
    pub retry_delay: Duration,
    /// Attempts before the node is given up on.
    pub retry_attempts: u32
}

impl NodeDescriptor {
    pub fn new(id: impl Into<String>, host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
            password: password.into(),
            secure: false,
            retry_delay: Duration::from_secs(10),
            retry_attempts: 5
        }
    }

    pub fn rest_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}:{}/v4", self.host, self.port)
    }

    pub fn socket_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{scheme}://{}:{}/v4/websocket", self.host, self.port)
    }
}

/// Configuration of the node pool.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// The bot's own user id, used in the node handshake and to pick our
    /// voice state updates out of the gateway stream.
    pub user_id: UserId,
    pub client_name: String,
    /// Nodes in failover order, primary first.
    pub nodes: Vec<NodeDescriptor>,
    /// How long to wait for the gateway to relay voice information.
    pub voice_timeout: Duration
}

impl PoolConfig {
    pub fn new(user_id: UserId, nodes: Vec<NodeDescriptor>) -> Self {
        Self {
            user_id,
            client_name: format!("music-coordinator/{}", env!("CARGO_PKG_VERSION")),
            nodes,
            voice_timeout: Duration::from_secs(10)
        }
    }

    pub fn from_env(user_id: UserId) -> Self {
        Self::from_lookup(user_id, |key| std::env::var(key).ok())
    }

    /// Reads the node list. `LAVALINK_MODE=local` selects a single local node,
    /// anything else a remote primary plus a public fallback unless
    /// `LAVALINK_USE_FALLBACK=false`.
    pub fn from_lookup(user_id: UserId, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let local = lookup("LAVALINK_MODE")
            .map(|m| m.eq_ignore_ascii_case("local"))
            .unwrap_or(false);

        let retry_delay = Duration::from_millis(
            parse::<u64>(&lookup, "LAVALINK_RETRY_DELAY_MS").unwrap_or(60_000).max(5000)
        );
        let retry_attempts = parse::<u32>(&lookup, "LAVALINK_RETRY_AMOUNT").unwrap_or(100).clamp(10, 1000);

        let password = |prefix: &str| {
            lookup(&format!("{prefix}_PASSWORD"))
                .or_else(|| lookup(&format!("{prefix}_AUTHORIZATION")))
                .unwrap_or_else(|| "youshallnotpass".to_string())
        };

        let nodes = if local {
            let mut node = NodeDescriptor::new(
                "main",
                lookup("LAVALINK_LOCAL_HOST").unwrap_or_else(|| "localhost".to_string()),
                parse(&lookup, "LAVALINK_LOCAL_PORT").unwrap_or(2333),
                password("LAVALINK_LOCAL")
            );
            node.secure = lookup("LAVALINK_LOCAL_SECURE").as_deref() == Some("true");
            vec![node]
        } else {
            let mut primary = NodeDescriptor::new(
                "main",
                lookup("LAVALINK_HOST").unwrap_or_else(|| "lavalink.rive.wtf".to_string()),
                parse(&lookup, "LAVALINK_PORT").unwrap_or(443),
                password("LAVALINK")
            );
            primary.secure = lookup("LAVALINK_SECURE").as_deref() != Some("false");
            primary.retry_delay = retry_delay;
            primary.retry_attempts = retry_attempts;

            let mut nodes = vec![primary];

            if lookup("LAVALINK_USE_FALLBACK").as_deref() != Some("false") {
                let mut fallback = NodeDescriptor::new("fallback", "lavalink.jirayu.net", 443, "youshallnotpass");
                fallback.secure = true;
                fallback.retry_delay = retry_delay;
                fallback.retry_attempts = retry_attempts;
                nodes.push(fallback);
            }

            nodes
        };

        Self::new(user_id, nodes)
    }
}

fn parse<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        move |key| map.get(key).cloned()
    }

    #[test]
    fn local_mode_uses_single_plain_node() {
        let cfg = PoolConfig::from_lookup(UserId(1), env(&[
            ("LAVALINK_MODE", "local"),
            ("LAVALINK_LOCAL_PORT", "2444"),
            ("LAVALINK_LOCAL_PASSWORD", "secret")
        ]));

        assert_eq!(cfg.nodes.len(), 1);
        assert_eq!(cfg.nodes[0].port, 2444);
        assert_eq!(cfg.nodes[0].password, "secret");
        assert_eq!(cfg.nodes[0].rest_url(), "http://localhost:2444/v4");
    }

    #[test]
    fn server_mode_appends_fallback_and_clamps_retries() {
        let cfg = PoolConfig::from_lookup(UserId(1), env(&[
            ("LAVALINK_HOST", "music.example.org"),
            ("LAVALINK_RETRY_DELAY_MS", "100"),
            ("LAVALINK_RETRY_AMOUNT", "5000")
        ]));

        let ids: Vec<_> = cfg.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["main", "fallback"]);
        assert!(cfg.nodes[0].secure);
        assert_eq!(cfg.nodes[0].socket_url(), "wss://music.example.org:443/v4/websocket");
        assert_eq!(cfg.nodes[0].retry_delay, Duration::from_millis(5000));
        assert_eq!(cfg.nodes[0].retry_attempts, 1000);
    }

    #[test]
    fn fallback_can_be_disabled() {
        let cfg = PoolConfig::from_lookup(UserId(1), env(&[("LAVALINK_USE_FALLBACK", "false")]));
        assert_eq!(cfg.nodes.len(), 1);
    }

    #[test]
    fn manager_config_clamps_idle_timeout() {
        let cfg = Config::from_lookup(env(&[
            ("LAVALINK_IDLE_DESTROY_MS", "10"),
            ("DEFAULT_SEARCH_SOURCE", "ytmsearch")
        ]));

        assert_eq!(cfg.idle_timeout, Duration::from_secs(1));
        assert_eq!(cfg.default_source, SearchSource::YoutubeMusic);

        let garbage = Config::from_lookup(env(&[("LAVALINK_IDLE_DESTROY_MS", "soon")]));
        assert_eq!(garbage.idle_timeout, Duration::from_secs(60));
    }
}
