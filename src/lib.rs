//! Terminal chat client for a Nostr public channel (NIP-28).
//!
//! Relay networking, event signing, and wire formats are delegated to
//! `nostr-sdk`; this crate owns the local semantics: a deduplicated ordered
//! feed with optimistic local echo, channel discovery with fallback, profile
//! display names, and the terminal frontends around them.

pub mod channel;
pub mod client;
pub mod config;
pub mod feed;
pub mod identity;
pub mod profile;
pub mod session;
pub mod storage;
pub mod tui;
