//! Queue bookkeeping guarded by the synchronizer's mutex.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tokio::task::AbortHandle;

use crate::models::{ClientId, Notification, PendingRecord};

/// Observable view of the queue published to readers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    /// Newest streamed records first, then bulk-loaded records in fetch order
    pub pending: Vec<PendingRecord>,
    pub notifications: Vec<Notification>,
}

impl QueueSnapshot {
    pub fn contains(&self, id: ClientId) -> bool {
        self.pending.iter().any(|record| record.id == id)
    }

    pub fn notification(&self, id: ClientId) -> Option<&Notification> {
        self.notifications
            .iter()
            .find(|notification| notification.id == id)
    }
}

pub(super) struct ExpiryTimer {
    pub token: u64,
    pub handle: AbortHandle,
}

#[derive(Default)]
pub(super) struct QueueState {
    pub pending: Vec<PendingRecord>,
    pub notifications: Vec<Notification>,
    pub timers: HashMap<ClientId, ExpiryTimer>,
    pub in_flight: HashSet<ClientId>,
    /// Resolved by this session; kept out even if the store still returns them.
    /// Never pruned: ids are not reused, and a store row can outlive its removal here.
    pub resolved: HashSet<ClientId>,
    /// Inserted into the permanent table but not yet deleted from the temporary one
    pub approved_unconfirmed: HashSet<ClientId>,
    pub next_timer_token: u64,
    pub closed: bool,
}

impl QueueState {
    pub fn contains(&self, id: ClientId) -> bool {
        self.pending.iter().any(|record| record.id == id)
    }

    fn admits(&self, id: ClientId) -> bool {
        !self.contains(id) && !self.resolved.contains(&id)
    }

    /// Tail-append every record not already present; first writer wins.
    pub fn append_missing(&mut self, incoming: Vec<PendingRecord>) -> usize {
        let mut appended = 0;
        for record in incoming {
            if self.admits(record.id) {
                self.pending.push(record);
                appended += 1;
            }
        }
        appended
    }

    /// Head-insert a streamed record with its notification unless already present.
    pub fn insert_streamed(&mut self, record: PendingRecord) -> bool {
        if !self.admits(record.id) {
            return false;
        }
        self.notifications
            .insert(0, Notification::for_record(&record));
        self.pending.insert(0, record);
        true
    }

    /// Drop the notification for `id` and cancel its timer.
    pub fn remove_notification(&mut self, id: ClientId) -> bool {
        self.cancel_timer(id);
        let before = self.notifications.len();
        self.notifications
            .retain(|notification| notification.id != id);
        self.notifications.len() != before
    }

    /// Record `id` as resolved and drop it from both collections.
    pub fn remove_resolved(&mut self, id: ClientId) {
        self.resolved.insert(id);
        self.approved_unconfirmed.remove(&id);
        self.pending.retain(|record| record.id != id);
        self.remove_notification(id);
    }

    pub fn notification_mut(&mut self, id: ClientId) -> Option<&mut Notification> {
        self.notifications
            .iter_mut()
            .find(|notification| notification.id == id)
    }

    pub fn cancel_timer(&mut self, id: ClientId) {
        if let Some(timer) = self.timers.remove(&id) {
            timer.handle.abort();
        }
    }

    pub fn cancel_all_timers(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.handle.abort();
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            pending: self.pending.clone(),
            notifications: self.notifications.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(id: i64) -> PendingRecord {
        PendingRecord {
            id: ClientId::new(id),
            title: format!("client {id}"),
            text: String::new(),
            created_at: Utc::now(),
            created_by: "u1".to_string(),
        }
    }

    fn ids(state: &QueueState) -> Vec<i64> {
        state.pending.iter().map(|record| record.id.get()).collect()
    }

    #[test]
    fn append_missing_skips_present_and_repeated_ids() {
        let mut state = QueueState::default();
        assert_eq!(state.append_missing(vec![record(1), record(2), record(1)]), 2);
        assert_eq!(state.append_missing(vec![record(2), record(3)]), 1);
        assert_eq!(ids(&state), vec![1, 2, 3]);
        assert!(state.notifications.is_empty());
    }

    #[test]
    fn insert_streamed_leads_the_queue() {
        let mut state = QueueState::default();
        state.append_missing(vec![record(1), record(2)]);
        assert!(state.insert_streamed(record(3)));
        assert!(!state.insert_streamed(record(3)));
        assert_eq!(ids(&state), vec![3, 1, 2]);
        assert_eq!(state.notifications.len(), 1);
    }

    #[test]
    fn resolved_ids_are_not_readmitted() {
        let mut state = QueueState::default();
        state.insert_streamed(record(4));
        state.remove_resolved(ClientId::new(4));
        assert!(state.pending.is_empty());
        assert!(state.notifications.is_empty());

        assert_eq!(state.append_missing(vec![record(4)]), 0);
        assert!(!state.insert_streamed(record(4)));
    }
}
