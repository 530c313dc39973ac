//! Durable per-guild preferences.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SettingsError;
use crate::model::id::GuildId;
use crate::session::LoopMode;

/// Saved preferences of a guild. Absent fields mean "use the default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GuildSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u8>,
    #[serde(default, rename = "loop", skip_serializing_if = "Option::is_none")]
    pub loop_mode: Option<LoopMode>
}

impl GuildSettings {
    fn merge(&mut self, update: GuildSettings) {
        if update.volume.is_some() {
            self.volume = update.volume;
        }
        if update.loop_mode.is_some() {
            self.loop_mode = update.loop_mode;
        }
    }
}

/// Load/save contract for guild preferences.
pub trait SettingsStore: Send + Sync {
    fn load(&self, guild: GuildId) -> Result<GuildSettings, SettingsError>;

    /// Merges the present fields of `update` into the guild's record.
    fn update(&self, guild: GuildId, update: GuildSettings) -> Result<(), SettingsError>;
}

/// Store backed by a single JSON file holding every guild.
///
/// The whole map is cached in memory; writes rewrite the file. A missing or
/// corrupt file starts out empty.
pub struct JsonSettingsStore {
    path: PathBuf,
    cache: Mutex<HashMap<GuildId, GuildSettings>>
}

impl JsonSettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = match read_file(&path) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %path.display(), "Could not load settings file: {e}");
                HashMap::new()
            }
        };

        Self {
            path,
            cache: Mutex::new(cache)
        }
    }

    fn persist(&self, map: &HashMap<GuildId, GuildSettings>) -> Result<(), SettingsError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        // Written beside the target and renamed over it so a crash mid-write
        // leaves the previous file intact.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(map)?)?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}

fn read_file(path: &Path) -> Result<HashMap<GuildId, GuildSettings>, SettingsError> {
    match fs::read(path) {
        Ok(raw) => Ok(serde_json::from_slice(&raw)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(e.into())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self, guild: GuildId) -> Result<GuildSettings, SettingsError> {
        Ok(self.cache.lock().get(&guild).copied().unwrap_or_default())
    }

    fn update(&self, guild: GuildId, update: GuildSettings) -> Result<(), SettingsError> {
        // The lock is held through the write so concurrent updates land in
        // the file in the same order they land in the cache.
        let mut cache = self.cache.lock();
        cache.entry(guild).or_default().merge(update);
        self.persist(&cache)
    }
}

/// Volatile store, used when persistence is not wanted and in tests.
#[derive(Default)]
pub struct MemorySettingsStore {
    map: Mutex<HashMap<GuildId, GuildSettings>>
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self, guild: GuildId) -> Result<GuildSettings, SettingsError> {
        Ok(self.map.lock().get(&guild).copied().unwrap_or_default())
    }

    fn update(&self, guild: GuildId, update: GuildSettings) -> Result<(), SettingsError> {
        self.map.lock().entry(guild).or_default().merge(update);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("guildSettings.json");

        let store = JsonSettingsStore::open(&path);
        store.update(GuildId(1), GuildSettings { volume: Some(42), loop_mode: None }).unwrap();
        store.update(GuildId(1), GuildSettings { volume: None, loop_mode: Some(LoopMode::Queue) }).unwrap();

        let reopened = JsonSettingsStore::open(&path);
        assert_eq!(
            reopened.load(GuildId(1)).unwrap(),
            GuildSettings { volume: Some(42), loop_mode: Some(LoopMode::Queue) }
        );
        assert_eq!(reopened.load(GuildId(2)).unwrap(), GuildSettings::default());

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["1"]["loop"], "queue");
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guildSettings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonSettingsStore::open(&path);
        assert_eq!(store.load(GuildId(5)).unwrap(), GuildSettings::default());

        store.update(GuildId(5), GuildSettings { volume: Some(7), loop_mode: None }).unwrap();
        assert_eq!(JsonSettingsStore::open(&path).load(GuildId(5)).unwrap().volume, Some(7));
    }

    #[test]
    fn reads_records_written_by_older_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guildSettings.json");
        fs::write(&path, r#"{ "99": { "volume": 30, "loop": "track" }, "100": {} }"#).unwrap();

        let store = JsonSettingsStore::open(&path);
        assert_eq!(store.load(GuildId(99)).unwrap().loop_mode, Some(LoopMode::Track));
        assert_eq!(store.load(GuildId(100)).unwrap(), GuildSettings::default());
    }
}
