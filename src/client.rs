//! Relay pool wrapper.
//!
//! Thin layer over `nostr_sdk::Client`: connect to the configured relays,
//! pump notifications into a channel, and publish with per-relay outcome
//! reporting. Relay networking itself is entirely the library's job.

use anyhow::Result;
use nostr_sdk::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Per-relay result of one publish
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub event_id: EventId,
    /// Relays that acknowledged the event
    pub accepted: Vec<String>,
    /// Relays that rejected it, with the relay's reason
    pub rejected: Vec<(String, String)>,
}

impl PublishReport {
    pub fn summary(&self) -> String {
        format!(
            "{} relay(s) accepted, {} rejected",
            self.accepted.len(),
            self.rejected.len()
        )
    }
}

/// Connection to the relay set
#[derive(Clone)]
pub struct RelayClient {
    client: Client,
}

impl RelayClient {
    /// Create the pool and connect to every configured relay
    pub async fn connect(keys: Keys, relays: &[String]) -> Result<Self> {
        let client = Client::new(keys);
        for url in relays {
            client.add_relay(url.clone()).await?;
        }
        client.connect().await;
        info!(relays = relays.len(), "connected to relay pool");
        Ok(Self { client })
    }

    /// The underlying pool client, for bounded queries
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Register a subscription on all relays
    pub async fn subscribe(&self, filter: Filter) -> Result<()> {
        self.client.subscribe(vec![filter], None).await?;
        Ok(())
    }

    /// Forward every incoming event into `tx` until the receiver goes away
    pub fn spawn_event_pump(&self, tx: mpsc::Sender<Event>) {
        let client = self.client.clone();
        tokio::spawn(async move {
            let mut notifications = client.notifications();
            while let Ok(notification) = notifications.recv().await {
                if let RelayPoolNotification::Event { event, .. } = notification {
                    if tx.send(*event).await.is_err() {
                        break;
                    }
                }
            }
        });
    }

    /// Publish an event, reporting the outcome per relay. Failing relays are
    /// logged; the call only errors when no relay took the event at all.
    pub async fn publish(&self, event: Event) -> Result<PublishReport> {
        let output = self.client.send_event(event).await?;
        let report = PublishReport {
            event_id: output.val,
            accepted: output.success.iter().map(|url| url.to_string()).collect(),
            rejected: output
                .failed
                .iter()
                .map(|(url, reason)| (url.to_string(), format!("{reason:?}")))
                .collect(),
        };
        for (url, reason) in &report.rejected {
            warn!(relay = %url, reason = %reason, "relay rejected event");
        }
        debug!(event = %report.event_id, accepted = report.accepted.len(), "published");
        Ok(report)
    }

    pub async fn disconnect(&self) {
        self.client.disconnect().await.ok();
    }
}
