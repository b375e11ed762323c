//! Approved-clients directory.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::auth::AuthUser;
use crate::models::{ClientId, ClientRecord, ClientUpdate, NewClient};
use crate::store::ClientStore;
use crate::{Error, Result};

/// Cached view of the permanent table plus the submission form.
///
/// Edits and deletions are restricted to the record's creator and are
/// checked against the cached list, so call [`ClientDirectory::refresh`]
/// before acting on ids the cache has not seen.
pub struct ClientDirectory<S: ClientStore> {
    store: Arc<S>,
    clients: Arc<Mutex<Vec<ClientRecord>>>,
}

impl<S: ClientStore> Clone for ClientDirectory<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clients: Arc::clone(&self.clients),
        }
    }
}

impl<S: ClientStore> ClientDirectory<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            clients: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reload the approved list from the store.
    pub async fn refresh(&self) -> Result<usize> {
        let fetched = self.store.fetch_clients().await?;
        let count = fetched.len();
        *self.clients.lock().await = fetched;
        tracing::debug!("Loaded {} approved clients", count);
        Ok(count)
    }

    pub async fn clients(&self) -> Vec<ClientRecord> {
        self.clients.lock().await.clone()
    }

    pub async fn get(&self, id: ClientId) -> Option<ClientRecord> {
        self.clients
            .lock()
            .await
            .iter()
            .find(|client| client.id == id)
            .cloned()
    }

    /// Send a new record to the review queue on behalf of `user`.
    pub async fn submit(&self, title: &str, text: &str, user: &AuthUser) -> Result<NewClient> {
        let client = NewClient::new(title, text, user.id.as_str())?;
        self.store.submit(&client).await?;
        tracing::info!("Submitted client '{}' for review", client.title);
        Ok(client)
    }

    pub async fn edit(&self, id: ClientId, update: &ClientUpdate, user: &AuthUser) -> Result<()> {
        self.ensure_owner(id, user).await?;
        self.store.update_client(id, update).await?;
        tracing::info!("Updated client {}", id);
        self.refresh().await?;
        Ok(())
    }

    pub async fn remove(&self, id: ClientId, user: &AuthUser) -> Result<()> {
        self.ensure_owner(id, user).await?;
        self.store.delete_client(id).await?;
        tracing::info!("Deleted client {}", id);
        self.refresh().await?;
        Ok(())
    }

    async fn ensure_owner(&self, id: ClientId, user: &AuthUser) -> Result<()> {
        let Some(client) = self.get(id).await else {
            return Err(Error::NotFound(id));
        };
        if client.is_created_by(&user.id) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "client {id} was created by another user"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::Role;
    use crate::store::{MemoryStore, StoreOperation};

    fn user(id: &str) -> AuthUser {
        AuthUser {
            id: id.to_string(),
            email: Some(format!("{id}@example.com")),
            role: Role::User,
        }
    }

    fn approved(id: i64, owner: &str) -> ClientRecord {
        ClientRecord {
            id: ClientId::new(id),
            title: format!("Client {id}"),
            text: "details".to_string(),
            created_at: Utc::now(),
            created_by: owner.to_string(),
        }
    }

    async fn directory(
        clients: impl IntoIterator<Item = ClientRecord>,
    ) -> ClientDirectory<MemoryStore> {
        let directory = ClientDirectory::new(MemoryStore::new().with_clients(clients));
        directory.refresh().await.unwrap();
        directory
    }

    #[tokio::test]
    async fn refresh_caches_the_approved_list() {
        let directory = directory([approved(1, "alice"), approved(2, "bob")]).await;
        let ids: Vec<i64> = directory
            .clients()
            .await
            .iter()
            .map(|client| client.id.get())
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn submit_goes_to_the_temporary_table() {
        let directory = directory(Vec::<ClientRecord>::new()).await;
        let submitted = directory
            .submit("  Acme  ", "New customer", &user("alice"))
            .await
            .unwrap();

        assert_eq!(submitted.title, "Acme");
        let pending = directory.store().pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].created_by, "alice");
        assert!(directory.store().clients().is_empty());
    }

    #[tokio::test]
    async fn submit_rejects_blank_fields_without_calling_store() {
        let directory = directory(Vec::<ClientRecord>::new()).await;
        let error = directory.submit("   ", "text", &user("alice")).await;
        assert!(matches!(error, Err(Error::InvalidInput(_))));
        assert_eq!(directory.store().count(StoreOperation::Submit), 0);
    }

    #[tokio::test]
    async fn creator_can_edit_and_list_refreshes() {
        let directory = directory([approved(1, "alice")]).await;
        let update = ClientUpdate::new("Renamed", "updated").unwrap();

        directory
            .edit(ClientId::new(1), &update, &user("alice"))
            .await
            .unwrap();

        let client = directory.get(ClientId::new(1)).await.unwrap();
        assert_eq!(client.title, "Renamed");
        assert_eq!(client.text, "updated");
    }

    #[tokio::test]
    async fn other_users_cannot_edit_or_remove() {
        let directory = directory([approved(1, "alice")]).await;
        let update = ClientUpdate::new("Renamed", "updated").unwrap();

        let edit = directory.edit(ClientId::new(1), &update, &user("bob")).await;
        let remove = directory.remove(ClientId::new(1), &user("bob")).await;

        assert!(matches!(edit, Err(Error::Forbidden(_))));
        assert!(matches!(remove, Err(Error::Forbidden(_))));
        assert_eq!(directory.store().count(StoreOperation::UpdateClient), 0);
        assert_eq!(directory.store().count(StoreOperation::DeleteClient), 0);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let directory = directory([approved(1, "alice")]).await;
        let result = directory.remove(ClientId::new(9), &user("alice")).await;
        assert!(matches!(result, Err(Error::NotFound(id)) if id == ClientId::new(9)));
    }

    #[tokio::test]
    async fn creator_can_remove() {
        let directory = directory([approved(1, "alice"), approved(2, "bob")]).await;
        directory
            .remove(ClientId::new(1), &user("alice"))
            .await
            .unwrap();

        assert!(directory.get(ClientId::new(1)).await.is_none());
        assert_eq!(directory.clients().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_delete_keeps_cache() {
        let directory = directory([approved(1, "alice")]).await;
        directory
            .store()
            .set_failing(StoreOperation::DeleteClient, true);

        assert!(directory.remove(ClientId::new(1), &user("alice")).await.is_err());
        assert_eq!(directory.clients().await.len(), 1);
    }
}
