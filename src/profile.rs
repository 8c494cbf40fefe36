//! Kind-0 profile metadata cache and display-name resolution.

use std::collections::HashMap;

use nostr_sdk::prelude::*;
use tracing::debug;

/// Cache of the latest profile metadata per author
#[derive(Default)]
pub struct ProfileCache {
    profiles: HashMap<PublicKey, Metadata>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a kind-0 event into the cache. Returns true if the cache changed.
    /// Non-metadata events and unparseable content are ignored.
    pub fn update_from_event(&mut self, event: &Event) -> bool {
        if event.kind != Kind::Metadata {
            return false;
        }
        match Metadata::from_json(&event.content) {
            Ok(metadata) => {
                self.profiles.insert(event.pubkey, metadata);
                true
            }
            Err(e) => {
                debug!(author = %event.pubkey, error = %e, "dropping unparseable profile");
                false
            }
        }
    }

    pub fn contains(&self, pubkey: &PublicKey) -> bool {
        self.profiles.contains_key(pubkey)
    }

    /// Name shown next to a message: nip05, then display_name, then name,
    /// then a pubkey prefix.
    pub fn display_name(&self, pubkey: &PublicKey) -> String {
        self.profiles
            .get(pubkey)
            .and_then(best_name)
            .unwrap_or_else(|| short_pubkey(pubkey))
    }
}

fn best_name(metadata: &Metadata) -> Option<String> {
    [
        metadata.nip05.as_deref(),
        metadata.display_name.as_deref(),
        metadata.name.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|name| !name.is_empty())
    .map(str::to_string)
}

/// First 8 hex chars of the pubkey, the fallback identity label
pub fn short_pubkey(pubkey: &PublicKey) -> String {
    let hex = pubkey.to_string();
    hex[..8.min(hex.len())].to_string()
}
