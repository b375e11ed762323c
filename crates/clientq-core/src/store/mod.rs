//! Hosted table store contracts.
//!
//! The approval workflow only needs a handful of row operations from the
//! backend; they are split by consumer so the queue never sees the approved
//! list and the directory never sees the temporary table reads.

mod memory;
mod postgrest;

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{ClientId, ClientRecord, ClientUpdate, NewClient, PendingRecord};
use crate::Result;

pub use memory::{MemoryStore, StoreCall, StoreOperation};
pub use postgrest::PostgrestStore;

/// Row operations the pending queue depends on.
#[async_trait]
pub trait PendingStore: Send + Sync + 'static {
    /// Read every row of the temporary table.
    async fn fetch_pending(&self) -> Result<Vec<PendingRecord>>;

    /// Insert the record's fields into the permanent table.
    async fn insert_permanent(&self, record: &PendingRecord) -> Result<()>;

    /// Delete a row from the temporary table. Deleting a missing row succeeds.
    async fn delete_temporary(&self, id: ClientId) -> Result<()>;
}

/// Row operations behind the approved-clients list and the submission form.
#[async_trait]
pub trait ClientStore: Send + Sync + 'static {
    async fn fetch_clients(&self) -> Result<Vec<ClientRecord>>;

    /// Submit a record into the temporary table for review.
    async fn submit(&self, client: &NewClient) -> Result<()>;

    async fn update_client(&self, id: ClientId, update: &ClientUpdate) -> Result<()>;

    async fn delete_client(&self, id: ClientId) -> Result<()>;
}

#[async_trait]
impl<T: PendingStore + ?Sized> PendingStore for Arc<T> {
    async fn fetch_pending(&self) -> Result<Vec<PendingRecord>> {
        (**self).fetch_pending().await
    }

    async fn insert_permanent(&self, record: &PendingRecord) -> Result<()> {
        (**self).insert_permanent(record).await
    }

    async fn delete_temporary(&self, id: ClientId) -> Result<()> {
        (**self).delete_temporary(id).await
    }
}

#[async_trait]
impl<T: ClientStore + ?Sized> ClientStore for Arc<T> {
    async fn fetch_clients(&self) -> Result<Vec<ClientRecord>> {
        (**self).fetch_clients().await
    }

    async fn submit(&self, client: &NewClient) -> Result<()> {
        (**self).submit(client).await
    }

    async fn update_client(&self, id: ClientId, update: &ClientUpdate) -> Result<()> {
        (**self).update_client(id, update).await
    }

    async fn delete_client(&self, id: ClientId) -> Result<()> {
        (**self).delete_client(id).await
    }
}
