//! End-to-end feed semantics without a network: sign real events, push them
//! through the acceptance gate and the feed, and simulate relay redelivery.

use nostr_sdk::prelude::*;

use flohchat::channel::{self, ChannelId};
use flohchat::feed::{ChannelMessage, Delivery, Feed, Ingest};
use flohchat::identity::{LocalSigner, Signer};
use flohchat::profile::ProfileCache;

fn channel_id(signer: &LocalSigner) -> ChannelId {
    let creation = signer
        .sign(EventBuilder::new(Kind::ChannelCreation, "{}"))
        .unwrap();
    ChannelId::Event(creation.id)
}

fn signed_message(signer: &LocalSigner, channel: &ChannelId, content: &str, ts: u64) -> Event {
    signer
        .sign(
            channel::build_message(channel, "ottobrunner-hofflohmarkt-2025", content)
                .custom_created_at(Timestamp::from(ts)),
        )
        .unwrap()
}

#[test]
fn publish_then_relay_echo_yields_exactly_one_entry() {
    let signer = LocalSigner::new(Keys::generate());
    let channel = channel_id(&signer);
    let mut feed = Feed::new();

    // publish path: sign, echo locally before any relay answers
    let event = signed_message(&signer, &channel, "verkaufe kinderfahrrad", 1_000);
    assert!(matches!(
        feed.ingest(ChannelMessage::pending(&event)),
        Ingest::Inserted(_)
    ));
    assert_eq!(feed.len(), 1);
    assert_eq!(feed.messages()[0].delivery, Delivery::Pending);

    // the authoritative copy comes back through the inbound gate
    let echoed = channel::accept_message(&event).expect("own event passes the gate");
    assert!(matches!(feed.ingest(echoed), Ingest::Confirmed(_)));

    assert_eq!(feed.len(), 1, "echo must not duplicate the entry");
    assert_eq!(feed.messages()[0].delivery, Delivery::Confirmed);
    assert_eq!(feed.messages()[0].content, "verkaufe kinderfahrrad");

    // a second relay delivering the same event changes nothing
    let again = channel::accept_message(&event).unwrap();
    assert_eq!(feed.ingest(again), Ingest::Duplicate);
    assert_eq!(feed.len(), 1);
}

#[test]
fn multi_author_out_of_order_delivery_stays_sorted() {
    let anna = LocalSigner::new(Keys::generate());
    let ben = LocalSigner::new(Keys::generate());
    let channel = channel_id(&anna);
    let mut feed = Feed::new();

    let events = vec![
        signed_message(&anna, &channel, "a3", 300),
        signed_message(&ben, &channel, "b1", 100),
        signed_message(&anna, &channel, "a5", 500),
        signed_message(&ben, &channel, "b2", 200),
        signed_message(&anna, &channel, "a4", 400),
    ];

    for event in &events {
        let msg = channel::accept_message(event).unwrap();
        feed.ingest(msg);
    }

    let contents: Vec<&str> = feed.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["b1", "b2", "a3", "a4", "a5"]);

    // redeliver everything, twice, in reverse
    for event in events.iter().rev().chain(events.iter().rev()) {
        let msg = channel::accept_message(event).unwrap();
        assert_eq!(feed.ingest(msg), Ingest::Duplicate);
    }
    assert_eq!(feed.len(), 5);
}

#[test]
fn inbound_gate_keeps_junk_out_of_the_feed() {
    let signer = LocalSigner::new(Keys::generate());
    let mut feed = Feed::new();

    // wrong kind
    let note = signer
        .sign(EventBuilder::new(Kind::TextNote, "kein kanal"))
        .unwrap();
    assert!(channel::accept_message(&note).is_none());

    // empty payload
    let empty = signer
        .sign(EventBuilder::new(Kind::ChannelMessage, "  \n "))
        .unwrap();
    assert!(channel::accept_message(&empty).is_none());

    // tampered content fails verification
    let event = signer
        .sign(EventBuilder::new(Kind::ChannelMessage, "echt"))
        .unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&event.as_json()).unwrap();
    value["content"] = serde_json::Value::String("gefälscht".into());
    let tampered = Event::from_json(value.to_string()).unwrap();
    assert!(channel::accept_message(&tampered).is_none());

    assert!(feed.is_empty());
    // the genuine one still goes through
    feed.ingest(channel::accept_message(&event).unwrap());
    assert_eq!(feed.len(), 1);
}

#[test]
fn display_names_resolve_as_profiles_arrive() {
    let keys = Keys::generate();
    let signer = LocalSigner::new(keys.clone());
    let channel = channel_id(&signer);
    let mut feed = Feed::new();
    let mut profiles = ProfileCache::new();

    let event = signed_message(&signer, &channel, "hallo", 100);
    feed.ingest(channel::accept_message(&event).unwrap());

    // before any kind-0 arrives: pubkey prefix
    let fallback = profiles.display_name(&keys.public_key());
    assert!(keys.public_key().to_string().starts_with(&fallback));

    let profile = signer
        .sign(EventBuilder::new(
            Kind::Metadata,
            r#"{"name":"anna","nip05":"anna@ottofloh.de"}"#,
        ))
        .unwrap();
    assert!(profiles.update_from_event(&profile));
    assert_eq!(profiles.display_name(&keys.public_key()), "anna@ottofloh.de");
}
