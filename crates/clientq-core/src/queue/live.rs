//! Live feed forwarding.

use tokio::task::JoinHandle;

use super::PendingQueue;
use crate::realtime::Subscription;
use crate::store::PendingStore;

/// Running forwarder from an insert subscription into a [`PendingQueue`].
///
/// The subscription lives inside the forwarding task, so it is released
/// exactly once: when the task ends, when [`LiveSync::stop`] is awaited, or
/// when the handle is dropped.
#[derive(Debug)]
pub struct LiveSync {
    task: Option<JoinHandle<()>>,
}

impl LiveSync {
    pub(super) fn spawn<S: PendingStore>(queue: PendingQueue<S>, mut subscription: Subscription) -> Self {
        let task = tokio::spawn(async move {
            while let Some(record) = subscription.next().await {
                queue.on_remote_insert(record);
            }
            tracing::info!("Insert feed for {} ended", subscription.table());
        });
        Self { task: Some(task) }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Resolves once the feed has ended on its own.
    ///
    /// Cancel safe, so it can sit in a `select!` loop.
    pub async fn finished(&mut self) {
        if let Some(task) = self.task.as_mut() {
            let _ = task.await;
            self.task = None;
        }
    }

    /// Stop forwarding and wait until the subscription has been released.
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for LiveSync {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
