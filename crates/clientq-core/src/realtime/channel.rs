//! In-process insert feed backed by tokio channels.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{InsertFeed, Subscription};
use crate::models::PendingRecord;
use crate::Result;

struct Subscriber {
    key: u64,
    table: String,
    sender: mpsc::UnboundedSender<PendingRecord>,
}

#[derive(Default)]
struct Registry {
    next_key: u64,
    subscribers: Vec<Subscriber>,
}

/// Feed whose events are published by the caller. Redelivery is allowed:
/// publishing the same record twice delivers it twice.
#[derive(Clone, Default)]
pub struct ChannelFeed {
    registry: Arc<Mutex<Registry>>,
}

impl ChannelFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `record` to every live subscriber of `table`; returns how many received it.
    pub fn publish(&self, table: &str, record: &PendingRecord) -> usize {
        let mut registry = self.lock();
        registry
            .subscribers
            .retain(|subscriber| !subscriber.sender.is_closed());
        registry
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.table == table)
            .filter(|subscriber| subscriber.sender.send(record.clone()).is_ok())
            .count()
    }

    /// End every subscription to `table`, as a dropped server connection would.
    pub fn close(&self, table: &str) -> usize {
        let mut registry = self.lock();
        let before = registry.subscribers.len();
        registry
            .subscribers
            .retain(|subscriber| subscriber.table != table);
        before - registry.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl InsertFeed for ChannelFeed {
    async fn subscribe_inserts(&self, table: &str) -> Result<Subscription> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let key = {
            let mut registry = self.lock();
            registry.next_key += 1;
            let key = registry.next_key;
            registry.subscribers.push(Subscriber {
                key,
                table: table.to_string(),
                sender,
            });
            key
        };

        let registry = Arc::clone(&self.registry);
        Ok(Subscription::new(table, receiver, move || {
            registry
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .subscribers
                .retain(|subscriber| subscriber.key != key);
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::ClientId;

    fn record(id: i64) -> PendingRecord {
        PendingRecord {
            id: ClientId::new(id),
            title: format!("client {id}"),
            text: String::new(),
            created_at: Utc::now(),
            created_by: "u1".to_string(),
        }
    }

    #[tokio::test]
    async fn delivers_only_to_matching_table() {
        let feed = ChannelFeed::new();
        let mut pending = feed.subscribe_inserts("clientstemp").await.unwrap();
        let _other = feed.subscribe_inserts("clients").await.unwrap();

        assert_eq!(feed.publish("clientstemp", &record(1)), 1);
        assert_eq!(pending.next().await.map(|r| r.id), Some(ClientId::new(1)));
    }

    #[tokio::test]
    async fn unsubscribe_removes_subscriber() {
        let feed = ChannelFeed::new();
        let subscription = feed.subscribe_inserts("clientstemp").await.unwrap();
        assert_eq!(feed.subscriber_count(), 1);

        subscription.unsubscribe();
        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(feed.publish("clientstemp", &record(1)), 0);
    }

    #[tokio::test]
    async fn close_ends_table_subscriptions() {
        let feed = ChannelFeed::new();
        let mut pending = feed.subscribe_inserts("clientstemp").await.unwrap();
        let _other = feed.subscribe_inserts("clients").await.unwrap();

        assert_eq!(feed.close("clientstemp"), 1);
        assert!(pending.next().await.is_none());
        assert_eq!(feed.subscriber_count(), 1);
    }
}
