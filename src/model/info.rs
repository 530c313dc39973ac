use serde::Deserialize;

/// Statistics pushed by a node every minute.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Number of existing players.
    pub players: u64,
    /// Number of players currently playing.
    pub playing_players: u64,
    /// Node uptime in milliseconds.
    pub uptime: u64,
    /// Memory information.
    pub memory: MemoryInfo,
    /// Cpu information.
    pub cpu: CpuInfo
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryInfo {
    pub free: u64,
    pub used: u64,
    pub allocated: u64,
    pub reservable: u64
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuInfo {
    /// Number of cores available to the node.
    pub cores: u32,
    /// Total system load.
    pub system_load: f64,
    /// Load caused by the node process.
    pub lavalink_load: f64
}
