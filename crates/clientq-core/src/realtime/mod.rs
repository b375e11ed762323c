//! Live insert feeds.
//!
//! A feed hands out [`Subscription`]s: owned handles that yield rows as they
//! are inserted into a table and release their transport exactly once, either
//! through [`Subscription::unsubscribe`] or on drop.

mod channel;
mod supabase;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::models::PendingRecord;
use crate::Result;

pub use channel::ChannelFeed;
pub use supabase::SupabaseRealtimeFeed;

/// Source of row-insert events for a table.
#[async_trait]
pub trait InsertFeed: Send + Sync + 'static {
    async fn subscribe_inserts(&self, table: &str) -> Result<Subscription>;
}

#[async_trait]
impl<T: InsertFeed + ?Sized> InsertFeed for Arc<T> {
    async fn subscribe_inserts(&self, table: &str) -> Result<Subscription> {
        (**self).subscribe_inserts(table).await
    }
}

type Release = Box<dyn FnOnce() + Send>;

pub struct Subscription {
    table: String,
    receiver: mpsc::UnboundedReceiver<PendingRecord>,
    release: Option<Release>,
}

impl Subscription {
    /// Wrap a receiver; `release` runs once when the handle is given up.
    pub fn new(
        table: impl Into<String>,
        receiver: mpsc::UnboundedReceiver<PendingRecord>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            table: table.into(),
            receiver,
            release: Some(Box::new(release)),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Next inserted row, or `None` once the transport has closed.
    pub async fn next(&mut self) -> Option<PendingRecord> {
        self.receiver.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(release) = self.release.take() {
            tracing::debug!("Releasing insert subscription for {}", self.table);
            self.receiver.close();
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("table", &self.table)
            .field("released", &self.release.is_none())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn release_runs_once_on_unsubscribe() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let (_sender, receiver) = mpsc::unbounded_channel();
        let subscription = Subscription::new("clientstemp", receiver, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        subscription.unsubscribe();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_runs_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let (_sender, receiver) = mpsc::unbounded_channel();
        {
            let subscription = Subscription::new("clientstemp", receiver, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            assert_eq!(subscription.table(), "clientstemp");
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
