//! Client configuration: relay set, channel identity, and lookup windows.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::Storage;

/// Relays the channel lives on (all public, externally operated)
pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://relay.nostr.band",
    "wss://nos.lol",
    "wss://relay.snort.social",
];

/// `t` tag identifying the channel across relays
pub const DEFAULT_CHANNEL_TAG: &str = "ottobrunner-hofflohmarkt-2025";

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Relay URLs every event is published to and read from
    pub relays: Vec<String>,
    /// Tag used to find (or create) the channel
    pub channel_tag: String,
    /// Metadata published if the channel has to be created
    pub channel: ChannelMetadata,
    /// How far back to ask relays for stored messages, in hours
    pub history_hours: u64,
    /// Bound on the kind-40 channel lookup, in seconds
    pub lookup_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMetadata {
    pub name: String,
    pub about: String,
    pub picture: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relays: DEFAULT_RELAYS.iter().map(|s| s.to_string()).collect(),
            channel_tag: DEFAULT_CHANNEL_TAG.to_string(),
            channel: ChannelMetadata::default(),
            history_hours: 24,
            lookup_timeout_secs: 5,
        }
    }
}

impl Default for ChannelMetadata {
    fn default() -> Self {
        Self {
            name: "Ottobrunner Hofflohmarkt Chat".to_string(),
            about: "Chat für den Ottobrunner Hofflohmarkt".to_string(),
            picture: "https://ottofloh.de/images/logo.png".to_string(),
        }
    }
}

impl Config {
    /// Load the config from storage, falling back to defaults when absent
    pub fn load(storage: &dyn Storage) -> Result<Self> {
        if !storage.exists(CONFIG_FILE) {
            return Ok(Self::default());
        }
        let data = storage.read(CONFIG_FILE)?;
        serde_json::from_slice(&data).context("invalid config file")
    }

    /// Load the config from an explicit path (`--config`)
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        serde_json::from_slice(&data).context("invalid config file")
    }

    pub fn save(&self, storage: &dyn Storage) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        storage.write(CONFIG_FILE, &data)
    }

    /// Write the config file only if none exists yet. Returns whether a
    /// file was written, so callers can tell a fresh seed from a no-op.
    pub fn ensure_saved(&self, storage: &dyn Storage) -> Result<bool> {
        if storage.exists(CONFIG_FILE) {
            return Ok(false);
        }
        self.save(storage)?;
        Ok(true)
    }

    /// Apply CLI overrides on top of the loaded config
    pub fn apply_overrides(&mut self, relays: &[String], channel_tag: Option<&str>) {
        if !relays.is_empty() {
            self.relays = relays.to_vec();
        }
        if let Some(tag) = channel_tag {
            self.channel_tag = tag.to_string();
        }
    }
}

/// Data directory for key material and config
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("flohchat"))
        .unwrap_or_else(|| PathBuf::from(".flohchat"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn defaults_when_no_file() {
        let storage = MemoryStorage::new();
        let config = Config::load(&storage).unwrap();
        assert_eq!(config.relays.len(), 4);
        assert_eq!(config.channel_tag, DEFAULT_CHANNEL_TAG);
        assert_eq!(config.history_hours, 24);
    }

    #[test]
    fn save_load_roundtrip() {
        let storage = MemoryStorage::new();
        let mut config = Config::default();
        config.relays = vec!["wss://example.com".to_string()];
        config.history_hours = 48;
        config.save(&storage).unwrap();

        let loaded = Config::load(&storage).unwrap();
        assert_eq!(loaded.relays, vec!["wss://example.com".to_string()]);
        assert_eq!(loaded.history_hours, 48);
    }

    #[test]
    fn ensure_saved_never_clobbers_an_existing_file() {
        let storage = MemoryStorage::new();
        assert!(Config::default().ensure_saved(&storage).unwrap());

        let mut edited = Config::load(&storage).unwrap();
        edited.channel_tag = "edited-by-hand".to_string();
        edited.save(&storage).unwrap();

        assert!(!Config::default().ensure_saved(&storage).unwrap());
        let loaded = Config::load(&storage).unwrap();
        assert_eq!(loaded.channel_tag, "edited-by-hand");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let storage = MemoryStorage::new();
        storage
            .write(CONFIG_FILE, br#"{"channel_tag":"other-market"}"#)
            .unwrap();
        let config = Config::load(&storage).unwrap();
        assert_eq!(config.channel_tag, "other-market");
        assert_eq!(config.relays.len(), 4);
    }

    #[test]
    fn cli_overrides_win() {
        let mut config = Config::default();
        config.apply_overrides(&["wss://a".to_string()], Some("custom"));
        assert_eq!(config.relays, vec!["wss://a".to_string()]);
        assert_eq!(config.channel_tag, "custom");

        // empty override list keeps the configured relays
        let mut config = Config::default();
        config.apply_overrides(&[], None);
        assert_eq!(config.relays.len(), 4);
    }
}
