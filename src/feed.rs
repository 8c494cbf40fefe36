//! Deduplicated, chronologically ordered message feed.
//!
//! Every event passes through here exactly once: the seen-set makes `ingest`
//! idempotent under repeated relay delivery, and the timeline stays sorted by
//! `created_at` (ties keep arrival order). Messages we publish ourselves are
//! echoed into the feed immediately and flip to confirmed when the relay
//! returns the same id.

use std::collections::HashSet;

use nostr_sdk::prelude::*;

/// How a message got into the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Received from a relay
    Relay,
    /// Local echo of our own message, not yet seen back from any relay
    Pending,
    /// Local echo that a relay has since returned
    Confirmed,
}

/// One visible chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub id: EventId,
    pub author: PublicKey,
    pub created_at: Timestamp,
    pub content: String,
    pub delivery: Delivery,
}

impl ChannelMessage {
    /// Message received from a relay
    pub fn relay(event: &Event) -> Self {
        Self::from_event(event, Delivery::Relay)
    }

    /// Local echo of an event we just signed
    pub fn pending(event: &Event) -> Self {
        Self::from_event(event, Delivery::Pending)
    }

    fn from_event(event: &Event, delivery: Delivery) -> Self {
        Self {
            id: event.id,
            author: event.pubkey,
            created_at: event.created_at,
            content: event.content.clone(),
            delivery,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.delivery, Delivery::Pending | Delivery::Confirmed)
    }
}

/// Outcome of feeding one message in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    /// New message, inserted at this timeline position
    Inserted(usize),
    /// Relay echo of a pending local message; the echo is now confirmed
    Confirmed(usize),
    /// Already seen, dropped
    Duplicate,
}

/// Ordered timeline plus the set of already-processed event ids
#[derive(Default)]
pub struct Feed {
    seen: HashSet<EventId>,
    messages: Vec<ChannelMessage>,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message, keeping the timeline sorted. Duplicate ids are
    /// dropped; a relay copy of a pending local echo confirms it instead.
    pub fn ingest(&mut self, msg: ChannelMessage) -> Ingest {
        if !self.seen.insert(msg.id) {
            if msg.delivery == Delivery::Relay {
                if let Some(pos) = self.messages.iter().position(|m| m.id == msg.id) {
                    if self.messages[pos].delivery == Delivery::Pending {
                        self.messages[pos].delivery = Delivery::Confirmed;
                        return Ingest::Confirmed(pos);
                    }
                }
            }
            return Ingest::Duplicate;
        }
        // Equal timestamps insert after existing entries: arrival order wins.
        let pos = self
            .messages
            .partition_point(|m| m.created_at <= msg.created_at);
        self.messages.insert(pos, msg);
        Ingest::Inserted(pos)
    }

    pub fn messages(&self) -> &[ChannelMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(keys: &Keys, content: &str, created_at: u64) -> (Event, ChannelMessage) {
        let event = EventBuilder::new(Kind::ChannelMessage, content)
            .custom_created_at(Timestamp::from(created_at))
            .sign_with_keys(keys)
            .unwrap();
        let msg = ChannelMessage::relay(&event);
        (event, msg)
    }

    fn assert_sorted(feed: &Feed) {
        let stamps: Vec<u64> = feed.messages().iter().map(|m| m.created_at.as_u64()).collect();
        let mut sorted = stamps.clone();
        sorted.sort();
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn ingest_is_idempotent() {
        let keys = Keys::generate();
        let (_, msg) = message(&keys, "hallo", 100);
        let mut feed = Feed::new();

        assert_eq!(feed.ingest(msg.clone()), Ingest::Inserted(0));
        assert_eq!(feed.ingest(msg.clone()), Ingest::Duplicate);
        assert_eq!(feed.ingest(msg), Ingest::Duplicate);
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn timeline_stays_sorted_under_out_of_order_delivery() {
        let keys = Keys::generate();
        let mut feed = Feed::new();
        for ts in [500u64, 100, 300, 200, 400, 250] {
            let (_, msg) = message(&keys, &format!("m{ts}"), ts);
            feed.ingest(msg);
            assert_sorted(&feed);
        }
        assert_eq!(feed.len(), 6);
        assert_eq!(feed.messages()[0].content, "m100");
        assert_eq!(feed.messages()[5].content, "m500");
    }

    #[test]
    fn equal_timestamps_keep_arrival_order() {
        let keys = Keys::generate();
        let mut feed = Feed::new();
        let (_, first) = message(&keys, "first", 100);
        let (_, second) = message(&keys, "second", 100);
        let (_, third) = message(&keys, "third", 100);
        feed.ingest(first);
        feed.ingest(second);
        feed.ingest(third);

        let contents: Vec<&str> = feed.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
    }

    #[test]
    fn relay_echo_confirms_pending_local_message() {
        let keys = Keys::generate();
        let (event, _) = message(&keys, "meins", 100);
        let mut feed = Feed::new();

        // local echo first, then the authoritative copy comes back
        assert_eq!(feed.ingest(ChannelMessage::pending(&event)), Ingest::Inserted(0));
        assert_eq!(feed.ingest(ChannelMessage::relay(&event)), Ingest::Confirmed(0));

        assert_eq!(feed.len(), 1);
        assert_eq!(feed.messages()[0].delivery, Delivery::Confirmed);

        // further relay copies are plain duplicates
        assert_eq!(feed.ingest(ChannelMessage::relay(&event)), Ingest::Duplicate);
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn pending_duplicate_does_not_confirm() {
        let keys = Keys::generate();
        let (event, _) = message(&keys, "doppelt", 100);
        let mut feed = Feed::new();
        feed.ingest(ChannelMessage::pending(&event));
        assert_eq!(feed.ingest(ChannelMessage::pending(&event)), Ingest::Duplicate);
        assert_eq!(feed.messages()[0].delivery, Delivery::Pending);
    }
}
