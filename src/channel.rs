//! NIP-28 channel discovery and message construction.
//!
//! The channel is identified across relays by a `t` tag. Discovery looks for
//! an existing kind-40 channel-creation event carrying that tag; failing
//! that, it publishes one; failing that too, the tag string itself serves as
//! the channel id so the client never hangs on a silent relay.

use std::time::Duration;

use anyhow::Result;
use nostr_sdk::prelude::*;
use tracing::{debug, info, warn};

use crate::client::RelayClient;
use crate::config::Config;
use crate::feed::ChannelMessage;
use crate::identity::Signer;

/// Resolved channel identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelId {
    /// Id of the kind-40 creation event (the normal case)
    Event(EventId),
    /// Fallback: no creation event reachable, address by tag alone
    Tag(String),
}

impl ChannelId {
    /// Value placed in the root `e` tag of outgoing messages
    pub fn as_tag_value(&self) -> String {
        match self {
            ChannelId::Event(id) => id.to_hex(),
            ChannelId::Tag(tag) => tag.clone(),
        }
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelId::Event(id) => write!(f, "{}", id.to_hex()),
            ChannelId::Tag(tag) => write!(f, "{tag}"),
        }
    }
}

/// Find the channel on the relays, creating it if nobody has yet.
pub async fn find_or_create(
    client: &RelayClient,
    signer: &dyn Signer,
    config: &Config,
) -> ChannelId {
    let tag = &config.channel_tag;
    let timeout = Duration::from_secs(config.lookup_timeout_secs);

    let filter = Filter::new()
        .kind(Kind::ChannelCreation)
        .custom_tag(SingleLetterTag::lowercase(Alphabet::T), vec![tag.clone()])
        .limit(1);

    match client.inner().fetch_events(vec![filter], Some(timeout)).await {
        Ok(events) => {
            if let Some(event) = events.first() {
                info!(channel = %event.id, "found existing channel");
                return ChannelId::Event(event.id);
            }
            debug!(tag = %tag, "no channel creation event on any relay");
        }
        Err(e) => warn!(error = %e, "channel lookup failed"),
    }

    match create(client, signer, config).await {
        Ok(id) => ChannelId::Event(id),
        Err(e) => {
            // Addressing by tag still lets reads and writes line up.
            warn!(error = %e, "channel creation failed, falling back to tag id");
            ChannelId::Tag(tag.clone())
        }
    }
}

async fn create(client: &RelayClient, signer: &dyn Signer, config: &Config) -> Result<EventId> {
    let metadata = channel_metadata(config);
    let builder = EventBuilder::new(Kind::ChannelCreation, metadata.as_json())
        .tags(vec![Tag::hashtag(config.channel_tag.clone())]);
    let event = signer.sign(builder)?;
    let report = client.publish(event).await?;
    if report.accepted.is_empty() {
        anyhow::bail!("no relay accepted the channel creation event");
    }
    info!(channel = %report.event_id, "created channel");
    Ok(report.event_id)
}

/// Kind-40 content: the channel metadata from the config
pub fn channel_metadata(config: &Config) -> Metadata {
    let mut metadata = Metadata::new()
        .name(&config.channel.name)
        .about(&config.channel.about);
    if let Ok(url) = Url::parse(&config.channel.picture) {
        metadata = metadata.picture(url);
    }
    metadata
}

/// Build an unsigned kind-42 channel message: `e` root tag pointing at the
/// channel, plus the `t` tag for backwards compatibility with tag-addressed
/// readers.
pub fn build_message(channel: &ChannelId, channel_tag: &str, content: &str) -> EventBuilder {
    EventBuilder::new(Kind::ChannelMessage, content).tags(vec![
        Tag::custom(
            TagKind::SingleLetter(SingleLetterTag::lowercase(Alphabet::E)),
            vec![
                channel.as_tag_value(),
                String::new(),
                "root".to_string(),
            ],
        ),
        Tag::hashtag(channel_tag),
    ])
}

/// Subscription filter for channel messages within the history window
pub fn message_filter(channel: &ChannelId, history_hours: u64) -> Filter {
    let since = Timestamp::now() - history_hours * 3600;
    let filter = Filter::new().kind(Kind::ChannelMessage).since(since);
    match channel {
        ChannelId::Event(id) => filter.event(*id),
        ChannelId::Tag(tag) => {
            filter.custom_tag(SingleLetterTag::lowercase(Alphabet::T), vec![tag.clone()])
        }
    }
}

/// Filter for the profile metadata of the given authors
pub fn profile_filter(authors: Vec<PublicKey>) -> Filter {
    Filter::new().kind(Kind::Metadata).authors(authors)
}

/// Inbound gate: only verifiable, non-empty kind-42 events become visible.
/// Everything else is dropped without surfacing an error.
pub fn accept_message(event: &Event) -> Option<ChannelMessage> {
    if event.kind != Kind::ChannelMessage {
        return None;
    }
    if event.content.trim().is_empty() {
        debug!(id = %event.id, "dropping empty channel message");
        return None;
    }
    if let Err(e) = event.verify() {
        debug!(id = %event.id, error = %e, "dropping event with bad signature");
        return None;
    }
    Some(ChannelMessage::relay(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::LocalSigner;

    fn tags_of(event: &Event) -> Vec<Vec<String>> {
        let value: serde_json::Value = serde_json::from_str(&event.as_json()).unwrap();
        serde_json::from_value(value["tags"].clone()).unwrap()
    }

    #[test]
    fn message_carries_root_and_tag() {
        let keys = Keys::generate();
        let signer = LocalSigner::new(keys);
        let channel_event = signer
            .sign(EventBuilder::new(Kind::ChannelCreation, "{}"))
            .unwrap();
        let channel = ChannelId::Event(channel_event.id);

        let event = signer
            .sign(build_message(&channel, "ottobrunner-hofflohmarkt-2025", "hallo"))
            .unwrap();

        assert_eq!(event.kind, Kind::ChannelMessage);
        let tags = tags_of(&event);
        assert!(tags.contains(&vec![
            "e".to_string(),
            channel_event.id.to_hex(),
            String::new(),
            "root".to_string(),
        ]));
        assert!(tags.contains(&vec![
            "t".to_string(),
            "ottobrunner-hofflohmarkt-2025".to_string(),
        ]));
    }

    #[test]
    fn tag_fallback_addresses_by_tag() {
        let channel = ChannelId::Tag("some-market".to_string());
        assert_eq!(channel.as_tag_value(), "some-market");

        let keys = Keys::generate();
        let signer = LocalSigner::new(keys);
        let event = signer
            .sign(build_message(&channel, "some-market", "hi"))
            .unwrap();
        let tags = tags_of(&event);
        assert!(tags.contains(&vec![
            "e".to_string(),
            "some-market".to_string(),
            String::new(),
            "root".to_string(),
        ]));
    }

    #[test]
    fn accept_takes_valid_channel_messages() {
        let keys = Keys::generate();
        let event = EventBuilder::new(Kind::ChannelMessage, "hallo zusammen")
            .sign_with_keys(&keys)
            .unwrap();
        let msg = accept_message(&event).unwrap();
        assert_eq!(msg.content, "hallo zusammen");
        assert_eq!(msg.author, keys.public_key());
        assert!(!msg.is_local());
    }

    #[test]
    fn accept_drops_wrong_kind_and_empty_content() {
        let keys = Keys::generate();
        let note = EventBuilder::new(Kind::TextNote, "hallo")
            .sign_with_keys(&keys)
            .unwrap();
        assert!(accept_message(&note).is_none());

        let empty = EventBuilder::new(Kind::ChannelMessage, "   ")
            .sign_with_keys(&keys)
            .unwrap();
        assert!(accept_message(&empty).is_none());
    }

    #[test]
    fn accept_drops_tampered_events() {
        let keys = Keys::generate();
        let event = EventBuilder::new(Kind::ChannelMessage, "original")
            .sign_with_keys(&keys)
            .unwrap();

        let mut value: serde_json::Value = serde_json::from_str(&event.as_json()).unwrap();
        value["content"] = serde_json::Value::String("verfälscht".to_string());
        let tampered = Event::from_json(value.to_string()).unwrap();

        assert!(accept_message(&tampered).is_none());
    }

    #[test]
    fn metadata_mirrors_config() {
        let config = Config::default();
        let metadata = channel_metadata(&config);
        assert_eq!(metadata.name.as_deref(), Some("Ottobrunner Hofflohmarkt Chat"));
        assert!(metadata.picture.is_some());
    }
}
