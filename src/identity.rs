//! User identity: key generation, import, persistence, and the signing seam.
//!
//! Signing is a capability the feed asks for, not something it owns. The
//! browser original delegated it to a NIP-07 extension; here the seam is the
//! [`Signer`] trait with a local-keys implementation.

use anyhow::{bail, Context, Result};
use nostr_sdk::prelude::*;
use tracing::warn;

use crate::storage::Storage;

const KEY_FILE: &str = "identity.key";

/// Event signing capability
pub trait Signer {
    fn public_key(&self) -> PublicKey;
    fn sign(&self, builder: EventBuilder) -> Result<Event>;
}

/// Signer backed by a locally stored keypair
#[derive(Clone)]
pub struct LocalSigner {
    keys: Keys,
}

impl LocalSigner {
    pub fn new(keys: Keys) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &Keys {
        &self.keys
    }
}

impl Signer for LocalSigner {
    fn public_key(&self) -> PublicKey {
        self.keys.public_key()
    }

    fn sign(&self, builder: EventBuilder) -> Result<Event> {
        Ok(builder.sign_with_keys(&self.keys)?)
    }
}

/// Generate a new keypair and persist it
pub fn generate(storage: &dyn Storage) -> Result<Keys> {
    if storage.exists(KEY_FILE) {
        bail!("an identity already exists; run `flohchat reset` first");
    }
    let keys = Keys::generate();
    save(storage, &keys)?;
    Ok(keys)
}

/// Import a secret key given as `nsec1...` bech32 or 64-char hex
pub fn import(storage: &dyn Storage, input: &str) -> Result<Keys> {
    let keys = parse_secret(input)?;
    save(storage, &keys)?;
    Ok(keys)
}

/// Load the stored identity, if any. An unreadable or malformed key file is
/// deleted rather than used.
pub fn load(storage: &dyn Storage) -> Result<Option<Keys>> {
    if !storage.exists(KEY_FILE) {
        return Ok(None);
    }
    let data = storage.read(KEY_FILE)?;
    let text = String::from_utf8_lossy(&data);
    match parse_secret(text.trim()) {
        Ok(keys) => Ok(Some(keys)),
        Err(e) => {
            warn!(error = %e, "stored key is invalid, removing it");
            storage.remove(KEY_FILE)?;
            Ok(None)
        }
    }
}

/// Delete the stored identity. Returns whether one existed.
pub fn reset(storage: &dyn Storage) -> Result<bool> {
    let existed = storage.exists(KEY_FILE);
    storage.remove(KEY_FILE)?;
    Ok(existed)
}

fn save(storage: &dyn Storage, keys: &Keys) -> Result<()> {
    let secret_hex = keys.secret_key().to_secret_hex();
    storage.write(KEY_FILE, secret_hex.as_bytes())
}

fn parse_secret(input: &str) -> Result<Keys> {
    let input = input.trim();
    let secret = if input.starts_with("nsec1") {
        SecretKey::from_bech32(input).context("invalid nsec key")?
    } else {
        let bytes = hex::decode(input).context("secret key is neither nsec nor hex")?;
        if bytes.len() != 32 {
            bail!("hex secret key must be 32 bytes");
        }
        SecretKey::from_slice(&bytes)?
    };
    Ok(Keys::new(secret))
}
