//! Supabase PostgREST implementation of the store traits.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{ClientStore, PendingStore};
use crate::auth::parse_api_error;
use crate::config::ServiceConfig;
use crate::models::{ClientId, ClientRecord, ClientUpdate, NewClient, PendingRecord};
use crate::{Error, Result};

#[derive(Clone)]
pub struct PostgrestStore {
    rest_url: String,
    anon_key: String,
    access_token: Option<String>,
    clients_table: String,
    pending_table: String,
    client: Client,
}

impl PostgrestStore {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        Ok(Self {
            rest_url: config.rest_url(),
            anon_key: config.supabase_anon_key.clone(),
            access_token: None,
            clients_table: config.clients_table.clone(),
            pending_table: config.pending_table.clone(),
            client: Client::builder().build()?,
        })
    }

    /// Act as a signed-in user instead of the anonymous role.
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(self.access_token.as_deref().unwrap_or(&self.anon_key))
    }

    async fn select<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let request = self
            .client
            .get(self.table_url(table))
            .header("Accept", "application/json")
            .query(&[("select", "*"), ("order", "created_at.asc")]);
        let response = check_status(self.authorize(request).send().await?).await?;
        Ok(response.json::<Vec<T>>().await?)
    }

    async fn insert<T: Serialize + Sync>(&self, table: &str, row: &T) -> Result<()> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(&[row]);
        check_status(self.authorize(request).send().await?).await?;
        Ok(())
    }

    async fn delete_by_id(&self, table: &str, id: ClientId) -> Result<()> {
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))]);
        check_status(self.authorize(request).send().await?).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Api(parse_api_error(status, &body)))
}

#[async_trait]
impl PendingStore for PostgrestStore {
    async fn fetch_pending(&self) -> Result<Vec<PendingRecord>> {
        self.select(&self.pending_table).await
    }

    async fn insert_permanent(&self, record: &PendingRecord) -> Result<()> {
        self.insert(&self.clients_table, record).await
    }

    async fn delete_temporary(&self, id: ClientId) -> Result<()> {
        self.delete_by_id(&self.pending_table, id).await
    }
}

#[async_trait]
impl ClientStore for PostgrestStore {
    async fn fetch_clients(&self) -> Result<Vec<ClientRecord>> {
        self.select(&self.clients_table).await
    }

    async fn submit(&self, client: &NewClient) -> Result<()> {
        self.insert(&self.pending_table, client).await
    }

    async fn update_client(&self, id: ClientId, update: &ClientUpdate) -> Result<()> {
        let request = self
            .client
            .patch(self.table_url(&self.clients_table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=minimal")
            .json(update);
        check_status(self.authorize(request).send().await?).await?;
        Ok(())
    }

    async fn delete_client(&self, id: ClientId) -> Result<()> {
        self.delete_by_id(&self.clients_table, id).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn store_for(server: &MockServer) -> PostgrestStore {
        let config = ServiceConfig::new(server.uri(), "anon").unwrap();
        PostgrestStore::new(&config).unwrap()
    }

    #[tokio::test]
    async fn fetch_pending_reads_temporary_table() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/clientstemp"))
            .and(query_param("select", "*"))
            .and(header("apikey", "anon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "id": 1,
                    "title": "A",
                    "text": "first",
                    "created_at": "2024-05-01T10:00:00+00:00",
                    "created_by": "u1"
                }
            ])))
            .mount(&server)
            .await;

        let records = store_for(&server).fetch_pending().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, ClientId::new(1));
        assert_eq!(records[0].title, "A");
    }

    #[tokio::test]
    async fn insert_permanent_posts_full_record_with_user_token() {
        let server = MockServer::start().await;
        let record = PendingRecord {
            id: ClientId::new(9),
            title: "Acme".to_string(),
            text: "text".to_string(),
            created_at: Utc::now(),
            created_by: "u1".to_string(),
        };
        Mock::given(method("POST"))
            .and(path("/rest/v1/clients"))
            .and(header("authorization", "Bearer user-token"))
            .and(body_json(serde_json::json!([record])))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        store_for(&server)
            .with_access_token("user-token")
            .insert_permanent(&record)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_temporary_filters_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/clientstemp"))
            .and(query_param("id", "eq.4"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        store_for(&server)
            .delete_temporary(ClientId::new(4))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn api_errors_carry_store_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/clientstemp"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "code": "42501",
                "message": "new row violates row-level security policy"
            })))
            .mount(&server)
            .await;

        let client = NewClient::new("Acme", "text", "u1").unwrap();
        let error = store_for(&server).submit(&client).await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "Store API error: new row violates row-level security policy (401)"
        );
    }

    #[tokio::test]
    async fn update_client_patches_permanent_row() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/clients"))
            .and(query_param("id", "eq.2"))
            .and(body_json(serde_json::json!({ "title": "New", "text": "Body" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let update = ClientUpdate::new("New", "Body").unwrap();
        store_for(&server)
            .update_client(ClientId::new(2), &update)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn queue_loads_rows_without_creator() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/clientstemp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "id": 1,
                    "title": "A",
                    "text": "first",
                    "created_at": "2024-05-01T10:00:00+00:00",
                    "created_by": null
                },
                {
                    "id": 2,
                    "title": "B",
                    "text": "second",
                    "created_at": "2024-05-01T10:05:00+00:00",
                    "created_by": "u2"
                }
            ])))
            .mount(&server)
            .await;

        let queue = crate::queue::PendingQueue::new(
            store_for(&server),
            crate::queue::QueueConfig::default(),
        );
        assert_eq!(queue.load_initial().await.unwrap(), 2);
        let snapshot = queue.snapshot();
        assert!(snapshot.pending[0].created_by.is_empty());
        assert_eq!(snapshot.pending[1].created_by, "u2");
    }
}
