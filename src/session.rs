//! Chat session: wires identity, relay pool, channel, feed, and profiles.

use std::collections::HashSet;

use anyhow::{bail, Result};
use nostr_sdk::prelude::*;
use tokio::sync::mpsc;
use tracing::debug;

use crate::channel::{self, ChannelId};
use crate::client::{PublishReport, RelayClient};
use crate::config::Config;
use crate::feed::{ChannelMessage, Feed, Ingest};
use crate::identity::Signer;
use crate::profile::ProfileCache;

/// What changed after applying one inbound event
#[derive(Debug, Clone)]
pub enum FeedUpdate {
    /// A new message entered the timeline
    Message(ChannelMessage),
    /// A pending local echo was confirmed by a relay
    Confirmed(EventId),
    /// Profile metadata for this author changed
    Profile(PublicKey),
}

/// Tracks which authors still need a profile subscription. Every author is
/// requested at most once per session, no matter how many of their messages
/// arrive or how the first one entered the feed.
#[derive(Default)]
struct ProfileRequests {
    requested: HashSet<PublicKey>,
    pending: Vec<PublicKey>,
}

impl ProfileRequests {
    /// Queue an author unless already queued or requested
    fn note(&mut self, author: PublicKey) {
        if !self.requested.contains(&author) && !self.pending.contains(&author) {
            self.pending.push(author);
        }
    }

    fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drain the queue, marking everything in it as requested
    fn take(&mut self) -> Vec<PublicKey> {
        let authors: Vec<PublicKey> = self.pending.drain(..).collect();
        self.requested.extend(authors.iter().copied());
        authors
    }
}

/// A connected chat session on one channel
pub struct ChatSession<S: Signer> {
    config: Config,
    signer: S,
    client: RelayClient,
    channel: ChannelId,
    feed: Feed,
    profiles: ProfileCache,
    events: mpsc::Receiver<Event>,
    profile_requests: ProfileRequests,
}

impl<S: Signer> ChatSession<S> {
    /// Connect to the relays, resolve the channel, and subscribe to its
    /// messages.
    pub async fn connect(config: Config, relay_keys: Keys, signer: S) -> Result<Self> {
        let client = RelayClient::connect(relay_keys, &config.relays).await?;
        let channel = channel::find_or_create(&client, &signer, &config).await;

        client
            .subscribe(channel::message_filter(&channel, config.history_hours))
            .await?;

        let (tx, rx) = mpsc::channel(256);
        client.spawn_event_pump(tx);

        Ok(Self {
            config,
            signer,
            client,
            channel,
            feed: Feed::new(),
            profiles: ProfileCache::new(),
            events: rx,
            profile_requests: ProfileRequests::default(),
        })
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn public_key(&self) -> PublicKey {
        self.signer.public_key()
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn profiles(&self) -> &ProfileCache {
        &self.profiles
    }

    pub fn relay_count(&self) -> usize {
        self.config.relays.len()
    }

    /// Wait for the next inbound event that changes visible state
    pub async fn recv(&mut self) -> Option<FeedUpdate> {
        while let Some(event) = self.events.recv().await {
            if let Some(update) = self.apply(event) {
                return Some(update);
            }
        }
        None
    }

    /// Drain one inbound event without blocking (TUI tick)
    pub fn try_recv(&mut self) -> Option<FeedUpdate> {
        while let Ok(event) = self.events.try_recv() {
            if let Some(update) = self.apply(event) {
                return Some(update);
            }
        }
        None
    }

    /// Route one raw relay event: kind 0 feeds the profile cache, kind 42
    /// goes through the acceptance gate into the feed. Anything else is
    /// dropped silently.
    fn apply(&mut self, event: Event) -> Option<FeedUpdate> {
        if self.profiles.update_from_event(&event) {
            return Some(FeedUpdate::Profile(event.pubkey));
        }
        let msg = channel::accept_message(&event)?;
        let author = msg.author;
        match self.feed.ingest(msg.clone()) {
            Ingest::Inserted(_) => {
                self.profile_requests.note(author);
                Some(FeedUpdate::Message(msg))
            }
            Ingest::Confirmed(_) => {
                self.profile_requests.note(author);
                Some(FeedUpdate::Confirmed(msg.id))
            }
            Ingest::Duplicate => None,
        }
    }

    /// Subscribe to profile metadata for authors that appeared since the
    /// last flush
    pub async fn flush_profile_requests(&mut self) -> Result<()> {
        if !self.profile_requests.has_pending() {
            return Ok(());
        }
        let authors = self.profile_requests.take();
        debug!(authors = authors.len(), "requesting profile metadata");
        self.client
            .subscribe(channel::profile_filter(authors))
            .await
    }

    pub fn has_pending_profile_requests(&self) -> bool {
        self.profile_requests.has_pending()
    }

    /// Sign a message and echo it into the feed immediately, before any
    /// relay has acknowledged it. Signer failure aborts here and nothing
    /// becomes visible.
    pub fn prepare(&mut self, content: &str) -> Result<Event> {
        let content = content.trim();
        if content.is_empty() {
            bail!("refusing to send an empty message");
        }
        let builder = channel::build_message(&self.channel, &self.config.channel_tag, content);
        let event = self.signer.sign(builder)?;
        self.feed.ingest(ChannelMessage::pending(&event));
        self.profile_requests.note(event.pubkey);
        Ok(event)
    }

    /// Publish a message: local echo first, then broadcast. Transport
    /// failure leaves the echo in place and surfaces to the caller.
    pub async fn publish(&mut self, content: &str) -> Result<PublishReport> {
        let event = self.prepare(content)?;
        self.client.publish(event).await
    }

    /// Clone of the relay handle, for publishing off the UI thread
    pub fn client_handle(&self) -> RelayClient {
        self.client.clone()
    }

    pub async fn disconnect(&self) {
        self.client.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_author_is_requested_once_across_send_and_confirm() {
        let author = Keys::generate().public_key();
        let mut requests = ProfileRequests::default();

        // noted when the message is signed, again when the relay echoes it
        requests.note(author);
        requests.note(author);

        assert!(requests.has_pending());
        assert_eq!(requests.take(), vec![author]);
        assert!(!requests.has_pending());
    }

    #[test]
    fn requested_author_is_never_queued_again() {
        let author = Keys::generate().public_key();
        let mut requests = ProfileRequests::default();

        requests.note(author);
        requests.take();
        requests.note(author);

        assert!(!requests.has_pending());
        assert!(requests.take().is_empty());
    }

    #[test]
    fn distinct_authors_queue_in_arrival_order() {
        let a = Keys::generate().public_key();
        let b = Keys::generate().public_key();
        let mut requests = ProfileRequests::default();

        requests.note(a);
        requests.note(b);
        requests.note(a);

        assert_eq!(requests.take(), vec![a, b]);
    }
}
