// Clients store.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use estimo_core::filters::{ClientFilter, EstimateFilter, LogFilter, ToQuery};
use estimo_core::models::{Client, EntityId, Estimate, Page, PageMeta};

use crate::client::ApiClient;
use crate::error::ApiError;

/// A client together with one page of its estimates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientWithEstimates {
    pub client: Client,
    pub estimates: Vec<Estimate>,
    pub pagination: PageMeta,
}

pub struct ClientsStore {
    api: Arc<ApiClient>,
    pub clients: Vec<Client>,
    pub pagination: PageMeta,
}

impl ClientsStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            clients: Vec::new(),
            pagination: PageMeta::default(),
        }
    }

    pub async fn fetch_clients(&mut self, filter: &ClientFilter) -> Result<(), ApiError> {
        let page: Page<Client> = self.api.get_with("/clients/", filter.to_query()).await?;
        debug!(count = page.items.len(), total = page.meta.total, "clients loaded");
        self.clients = page.items;
        self.pagination = page.meta;
        Ok(())
    }

    async fn refresh(&mut self) {
        if let Err(e) = self.fetch_clients(&ClientFilter::default()).await {
            warn!("failed to refresh clients: {e}");
        }
    }

    pub async fn get_client_by_id(&self, id: EntityId) -> Result<Client, ApiError> {
        self.api.get(&format!("/clients/{id}")).await
    }

    /// Load the client, then its estimates. The estimate query is scoped to
    /// the id the server reports for the client unless `filter` already
    /// names one.
    pub async fn get_client_with_estimates(
        &self,
        id: EntityId,
        filter: &EstimateFilter,
    ) -> Result<ClientWithEstimates, ApiError> {
        let client = self.get_client_by_id(id).await?;
        let client_id = client.get("id").and_then(Value::as_i64).unwrap_or(id);

        let mut filter = filter.clone();
        filter.client.get_or_insert(client_id);
        let page: Page<Estimate> = self.api.get_with("/estimates/", filter.to_query()).await?;

        Ok(ClientWithEstimates {
            client,
            estimates: page.items,
            pagination: page.meta,
        })
    }

    pub async fn create_client(&mut self, data: &Value) -> Result<Client, ApiError> {
        let created: Client = self.api.post("/clients/", data).await?;
        self.refresh().await;
        Ok(created)
    }

    pub async fn update_client(&mut self, id: EntityId, data: &Value) -> Result<Client, ApiError> {
        let updated: Client = self.api.put(&format!("/clients/{id}"), data).await?;
        self.refresh().await;
        Ok(updated)
    }

    pub async fn delete_client(&mut self, id: EntityId) -> Result<(), ApiError> {
        self.api.delete(&format!("/clients/{id}")).await?;
        self.refresh().await;
        Ok(())
    }

    pub async fn get_client_logs(
        &self,
        id: EntityId,
        filter: &LogFilter,
    ) -> Result<Page<Value>, ApiError> {
        self.api
            .get_with(&format!("/clients/{id}/logs"), filter.to_query())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use serde_json::json;

    fn setup() -> (Arc<MockTransport>, ClientsStore) {
        let mock = Arc::new(MockTransport::new());
        let api = Arc::new(ApiClient::new(mock.clone()));
        (mock, ClientsStore::new(api))
    }

    #[tokio::test]
    async fn fetch_uses_flat_envelope() {
        let (mock, mut store) = setup();
        mock.push_ok(json!({
            "items": [{"id": 1, "name": "Acme"}],
            "total": 31,
            "limit": 1,
            "offset": 30
        }));

        let filter = ClientFilter {
            company: Some("Acme".into()),
            ..Default::default()
        };
        store.fetch_clients(&filter).await.unwrap();

        assert_eq!(store.clients[0]["name"], "Acme");
        assert_eq!(
            store.pagination,
            PageMeta {
                total: 31,
                limit: 1,
                offset: 30
            }
        );
        assert_eq!(mock.requests()[0].query_value("company"), Some("Acme"));
    }

    #[tokio::test]
    async fn client_with_estimates_scopes_query_to_client() {
        let (mock, store) = setup();
        mock.push_ok(json!({"id": 12, "name": "Acme"}))
            .push_ok(json!({"items": [{"id": 100}], "meta": {"total": 1, "limit": 20, "offset": 0}}));

        let result = store
            .get_client_with_estimates(12, &EstimateFilter::default())
            .await
            .unwrap();

        assert_eq!(result.client["name"], "Acme");
        assert_eq!(result.estimates.len(), 1);
        assert_eq!(result.pagination.total, 1);
        assert_eq!(mock.calls(), vec!["GET /clients/12", "GET /estimates/"]);
        assert_eq!(mock.requests()[1].query_value("client"), Some("12"));
    }

    #[tokio::test]
    async fn explicit_client_filter_is_kept() {
        let (mock, store) = setup();
        mock.push_ok(json!({"id": 12})).push_ok(json!([]));

        let filter = EstimateFilter {
            client: Some(7),
            ..Default::default()
        };
        store.get_client_with_estimates(12, &filter).await.unwrap();
        assert_eq!(mock.requests()[1].query_value("client"), Some("7"));
    }

    #[tokio::test]
    async fn missing_client_skips_estimate_query() {
        let (mock, store) = setup();
        mock.push_json(404, json!({"detail": "Client not found"}));

        let err = store
            .get_client_with_estimates(5, &EstimateFilter::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(mock.calls(), vec!["GET /clients/5"]);
    }

    #[tokio::test]
    async fn mutations_refresh_list() {
        let (mock, mut store) = setup();
        mock.push_ok(json!({"id": 1}))
            .push_ok(json!([{"id": 1}]))
            .push_ok(json!({"id": 1, "name": "Renamed"}))
            .push_ok(json!([{"id": 1, "name": "Renamed"}]))
            .push_no_content()
            .push_ok(json!([]));

        store.create_client(&json!({"name": "New"})).await.unwrap();
        assert_eq!(store.clients.len(), 1);
        store
            .update_client(1, &json!({"name": "Renamed"}))
            .await
            .unwrap();
        assert_eq!(store.clients[0]["name"], "Renamed");
        store.delete_client(1).await.unwrap();
        assert!(store.clients.is_empty());

        assert_eq!(
            mock.calls(),
            vec![
                "POST /clients/",
                "GET /clients/",
                "PUT /clients/1",
                "GET /clients/",
                "DELETE /clients/1",
                "GET /clients/",
            ]
        );
    }

    #[tokio::test]
    async fn logs_come_back_as_page() {
        let (mock, store) = setup();
        mock.push_ok(json!({"items": [{"action": "create"}], "total": 1, "limit": 20, "offset": 0}));

        let logs = store.get_client_logs(3, &LogFilter::default()).await.unwrap();
        assert_eq!(logs.meta.total, 1);
        assert_eq!(mock.calls(), vec!["GET /clients/3/logs"]);
    }
}
