//! In-memory store (primarily for tests and offline demos).

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::{ClientStore, PendingStore};
use crate::models::{ClientId, ClientRecord, ClientUpdate, NewClient, PendingRecord};
use crate::{Error, Result};

/// Kind of store operation, used for call logs and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    FetchPending,
    InsertPermanent,
    DeleteTemporary,
    FetchClients,
    Submit,
    UpdateClient,
    DeleteClient,
}

/// One attempted store call, recorded before it succeeds or fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCall {
    pub operation: StoreOperation,
    pub id: Option<ClientId>,
}

#[derive(Debug, Default)]
struct Tables {
    pending: Vec<PendingRecord>,
    clients: Vec<ClientRecord>,
    next_id: i64,
    calls: Vec<StoreCall>,
    failing: HashSet<StoreOperation>,
}

/// Both store traits over two in-memory tables, with a call log.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    latency: Mutex<Option<Duration>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the temporary table.
    #[must_use]
    pub fn with_pending(self, records: impl IntoIterator<Item = PendingRecord>) -> Self {
        {
            let mut tables = self.lock();
            for record in records {
                tables.next_id = tables.next_id.max(record.id.get());
                tables.pending.push(record);
            }
        }
        self
    }

    /// Seed the permanent table.
    #[must_use]
    pub fn with_clients(self, records: impl IntoIterator<Item = ClientRecord>) -> Self {
        {
            let mut tables = self.lock();
            for record in records {
                tables.next_id = tables.next_id.max(record.id.get());
                tables.clients.push(record);
            }
        }
        self
    }

    /// Delay every call by `latency` so concurrent callers interleave.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self
            .latency
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = latency;
    }

    /// Make `operation` fail (or succeed again) until toggled back.
    pub fn set_failing(&self, operation: StoreOperation, failing: bool) {
        let mut tables = self.lock();
        if failing {
            tables.failing.insert(operation);
        } else {
            tables.failing.remove(&operation);
        }
    }

    pub fn push_pending(&self, record: PendingRecord) {
        let mut tables = self.lock();
        tables.next_id = tables.next_id.max(record.id.get());
        tables.pending.push(record);
    }

    pub fn pending(&self) -> Vec<PendingRecord> {
        self.lock().pending.clone()
    }

    pub fn clients(&self) -> Vec<ClientRecord> {
        self.lock().clients.clone()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Number of recorded attempts of `operation`.
    pub fn count(&self, operation: StoreOperation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    async fn enter(&self, operation: StoreOperation, id: Option<ClientId>) -> Result<()> {
        let latency = *self
            .latency
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        self.lock().calls.push(StoreCall { operation, id });
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.lock().failing.contains(&operation) {
            return Err(Error::Api(format!("{operation:?} failed (503)")));
        }
        Ok(())
    }
}

#[async_trait]
impl PendingStore for MemoryStore {
    async fn fetch_pending(&self) -> Result<Vec<PendingRecord>> {
        self.enter(StoreOperation::FetchPending, None).await?;
        Ok(self.pending())
    }

    async fn insert_permanent(&self, record: &PendingRecord) -> Result<()> {
        self.enter(StoreOperation::InsertPermanent, Some(record.id))
            .await?;
        let mut tables = self.lock();
        if tables.clients.iter().any(|client| client.id == record.id) {
            return Err(Error::Api(format!(
                "duplicate key value violates unique constraint for id {} (409)",
                record.id
            )));
        }
        tables.clients.push(record.clone().into());
        Ok(())
    }

    async fn delete_temporary(&self, id: ClientId) -> Result<()> {
        self.enter(StoreOperation::DeleteTemporary, Some(id)).await?;
        self.lock().pending.retain(|record| record.id != id);
        Ok(())
    }
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn fetch_clients(&self) -> Result<Vec<ClientRecord>> {
        self.enter(StoreOperation::FetchClients, None).await?;
        Ok(self.clients())
    }

    async fn submit(&self, client: &NewClient) -> Result<()> {
        self.enter(StoreOperation::Submit, None).await?;
        let mut tables = self.lock();
        tables.next_id += 1;
        let record = PendingRecord {
            id: ClientId::new(tables.next_id),
            title: client.title.clone(),
            text: client.text.clone(),
            created_at: Utc::now(),
            created_by: client.created_by.clone(),
        };
        tables.pending.push(record);
        Ok(())
    }

    async fn update_client(&self, id: ClientId, update: &ClientUpdate) -> Result<()> {
        self.enter(StoreOperation::UpdateClient, Some(id)).await?;
        let mut tables = self.lock();
        if let Some(client) = tables.clients.iter_mut().find(|client| client.id == id) {
            client.title.clone_from(&update.title);
            client.text.clone_from(&update.text);
        }
        Ok(())
    }

    async fn delete_client(&self, id: ClientId) -> Result<()> {
        self.enter(StoreOperation::DeleteClient, Some(id)).await?;
        self.lock().clients.retain(|client| client.id != id);
        Ok(())
    }
}
