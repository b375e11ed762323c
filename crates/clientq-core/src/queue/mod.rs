//! Pending approval queue.
//!
//! [`PendingQueue`] keeps a local, de-duplicated view of the records waiting
//! in the temporary table. It merges a one-shot bulk load with a live stream
//! of insert events and removes records only after the store has confirmed an
//! approval or rejection. It is the only writer of that view; readers take
//! snapshots or subscribe to changes.
//!
//! Ordering rules:
//! - bulk-loaded records are appended at the tail, in fetch order;
//! - streamed records are inserted at the head and raise a notification;
//! - in both paths a record whose id is already queued (or already resolved
//!   by this session) is ignored, so either arrival order converges.

mod live;
mod state;


use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::watch;

use crate::config::ServiceConfig;
use crate::models::{ClientId, Decision, Notification, PendingRecord};
use crate::realtime::InsertFeed;
use crate::store::PendingStore;
use crate::{Error, Result};

pub use live::LiveSync;
pub use state::QueueSnapshot;

use state::{ExpiryTimer, QueueState};

/// Tunables for the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// How long a notification stays up unless held
    pub notification_ttl: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            notification_ttl: Duration::from_secs(crate::config::DEFAULT_NOTIFICATION_TTL_SECS),
        }
    }
}

impl From<&ServiceConfig> for QueueConfig {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            notification_ttl: config.notification_ttl(),
        }
    }
}

/// What a `resolve` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Remote calls succeeded and the record left the queue
    Resolved,
    /// The id was not queued (already resolved or never seen); nothing sent
    NotPending,
    /// Another resolution of the same id is still running; nothing sent
    InFlight,
}

struct Shared<S> {
    store: S,
    config: QueueConfig,
    state: Mutex<QueueState>,
    snapshots: watch::Sender<QueueSnapshot>,
}

impl<S> Shared<S> {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn publish(&self, state: &QueueState) {
        self.snapshots.send_replace(state.snapshot());
    }

    fn expire(&self, id: ClientId, token: u64) {
        let mut state = self.lock();
        if state.timers.get(&id).map(|timer| timer.token) != Some(token) {
            return;
        }
        state.timers.remove(&id);

        let held = state
            .notification_mut(id)
            .is_some_and(|notification| notification.held);
        if held {
            tracing::debug!("Notification {} expired while held; keeping it", id);
            return;
        }
        if state.remove_notification(id) {
            tracing::debug!("Notification {} expired", id);
            self.publish(&state);
        }
    }
}

/// Clears the in-flight mark even if the resolving future is dropped.
struct InFlightGuard<'a, S> {
    shared: &'a Shared<S>,
    id: ClientId,
}

impl<S> Drop for InFlightGuard<'_, S> {
    fn drop(&mut self) {
        self.shared.lock().in_flight.remove(&self.id);
    }
}

/// Cloneable handle to the pending approval queue.
pub struct PendingQueue<S: PendingStore> {
    shared: Arc<Shared<S>>,
}

impl<S: PendingStore> Clone for PendingQueue<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: PendingStore> PendingQueue<S> {
    pub fn new(store: S, config: QueueConfig) -> Self {
        let (snapshots, _) = watch::channel(QueueSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                store,
                config,
                state: Mutex::new(QueueState::default()),
                snapshots,
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.shared.store
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.shared.lock().snapshot()
    }

    /// Receiver that observes every published change.
    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.shared.lock().contains(id)
    }

    /// Queued record with this id, if any.
    pub fn get(&self, id: ClientId) -> Option<PendingRecord> {
        self.shared
            .lock()
            .pending
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch every pending row and tail-append the ones not already queued.
    ///
    /// Returns how many records were appended. A failed fetch is logged and
    /// leaves the queue untouched. A result that lands after [`Self::shutdown`]
    /// is discarded.
    pub async fn load_initial(&self) -> Result<usize> {
        let fetched = match self.shared.store.fetch_pending().await {
            Ok(records) => records,
            Err(error) => {
                tracing::warn!("Failed to load pending clients: {}", error);
                return Err(error);
            }
        };

        let mut state = self.shared.lock();
        if state.closed {
            tracing::debug!("Discarding pending load that finished after shutdown");
            return Ok(0);
        }
        let appended = state.append_missing(fetched);
        if appended > 0 {
            self.shared.publish(&state);
        }
        tracing::info!("Loaded {} pending clients", appended);
        Ok(appended)
    }

    /// Apply one row-insert event from the live feed.
    ///
    /// New records go to the head of the queue and raise a notification;
    /// redeliveries and records already loaded are ignored.
    pub fn on_remote_insert(&self, record: PendingRecord) {
        let id = record.id;
        let mut state = self.shared.lock();
        if state.closed {
            return;
        }
        if !state.insert_streamed(record) {
            tracing::debug!("Ignoring duplicate insert event for client {}", id);
            return;
        }
        self.arm_expiry(&mut state, id);
        self.shared.publish(&state);
        tracing::info!("New pending client {}", id);
    }

    /// Approve or reject a queued record.
    ///
    /// Approval inserts into the permanent table before deleting the temporary
    /// row; if the insert fails nothing is deleted. The record and its
    /// notification leave the local view only after every remote call has
    /// succeeded. Failures are logged and returned with the queue unchanged.
    /// Once an approval has reached the permanent table, only a further
    /// approve is accepted for that record.
    pub async fn resolve(&self, record: &PendingRecord, decision: Decision) -> Result<ResolveOutcome> {
        let id = record.id;
        let skip_insert = {
            let mut state = self.shared.lock();
            if !state.contains(id) {
                tracing::debug!("Client {} is no longer pending; skipping {}", id, decision.verb());
                return Ok(ResolveOutcome::NotPending);
            }
            let approved = state.approved_unconfirmed.contains(&id);
            if approved && decision == Decision::Reject {
                return Err(Error::InvalidInput(format!(
                    "client {id} is already in the permanent table; approve it again to finish"
                )));
            }
            if !state.in_flight.insert(id) {
                tracing::debug!("Client {} already has a decision in flight", id);
                return Ok(ResolveOutcome::InFlight);
            }
            approved
        };
        let _guard = InFlightGuard {
            shared: &self.shared,
            id,
        };

        if let Err(error) = self.send_decision(record, decision, skip_insert).await {
            tracing::error!("Failed to {} client {}: {}", decision.verb(), id, error);
            return Err(error);
        }

        let mut state = self.shared.lock();
        state.remove_resolved(id);
        self.shared.publish(&state);
        tracing::info!("Client {} {}", id, decision.past_tense());
        Ok(ResolveOutcome::Resolved)
    }

    async fn send_decision(
        &self,
        record: &PendingRecord,
        decision: Decision,
        skip_insert: bool,
    ) -> Result<()> {
        let store = &self.shared.store;
        if decision == Decision::Approve && !skip_insert {
            store.insert_permanent(record).await?;
            self.shared.lock().approved_unconfirmed.insert(record.id);
        }
        store.delete_temporary(record.id).await
    }

    /// Remove a notification without touching the queue.
    pub fn dismiss_notification(&self, id: ClientId) -> bool {
        let mut state = self.shared.lock();
        let removed = state.remove_notification(id);
        if removed {
            self.shared.publish(&state);
        }
        removed
    }

    /// Mark a notification as hovered/focused; expiry is skipped while held.
    pub fn hold_notification(&self, id: ClientId) -> bool {
        self.update_notification(id, |notification| notification.held = true)
    }

    pub fn release_notification(&self, id: ClientId) -> bool {
        self.update_notification(id, |notification| notification.held = false)
    }

    pub fn mark_seen(&self, id: ClientId) -> bool {
        self.update_notification(id, |notification| notification.seen = true)
    }

    fn update_notification(
        &self,
        id: ClientId,
        update: impl FnOnce(&mut Notification),
    ) -> bool {
        let mut state = self.shared.lock();
        let Some(notification) = state.notification_mut(id) else {
            return false;
        };
        update(notification);
        self.shared.publish(&state);
        true
    }

    /// Subscribe to `table` on `feed` and forward its inserts into the queue
    /// until the returned handle is stopped or dropped.
    pub async fn attach<F>(&self, feed: &F, table: &str) -> Result<LiveSync>
    where
        F: InsertFeed + ?Sized,
    {
        let subscription = feed.subscribe_inserts(table).await?;
        Ok(LiveSync::spawn(self.clone(), subscription))
    }

    /// Stop accepting events and cancel every pending expiry timer.
    pub fn shutdown(&self) {
        let mut state = self.shared.lock();
        state.closed = true;
        state.cancel_all_timers();
    }

    #[cfg(test)]
    fn armed_timers(&self) -> usize {
        self.shared.lock().timers.len()
    }

    fn arm_expiry(&self, state: &mut QueueState, id: ClientId) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime; notification {} will not expire", id);
            return;
        };

        state.cancel_timer(id);
        state.next_timer_token += 1;
        let token = state.next_timer_token;
        let ttl = self.shared.config.notification_ttl;
        let shared: Weak<Shared<S>> = Arc::downgrade(&self.shared);
        let task = runtime.spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(shared) = shared.upgrade() {
                shared.expire(id, token);
            }
        });
        state.timers.insert(
            id,
            ExpiryTimer {
                token,
                handle: task.abort_handle(),
            },
        );
    }
}
