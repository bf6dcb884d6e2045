// Analytics store: global and per-client aggregates plus file export.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use estimo_core::filters::{AnalyticsFilter, ToQuery};
use estimo_core::models::{EntityId, ExportFormat, ExportedFile};

use crate::client::ApiClient;
use crate::error::ApiError;

pub struct AnalyticsStore {
    api: Arc<ApiClient>,
    /// Last global analytics payload.
    pub global: Option<Value>,
    /// Last per-client analytics payload.
    pub client: Option<Value>,
}

impl AnalyticsStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            global: None,
            client: None,
        }
    }

    pub async fn fetch_global(&mut self, filter: &AnalyticsFilter) -> Result<Value, ApiError> {
        let data: Value = self.api.get_with("/analytics/", filter.to_query()).await?;
        self.global = Some(data.clone());
        Ok(data)
    }

    pub async fn fetch_client(
        &mut self,
        client_id: EntityId,
        filter: &AnalyticsFilter,
    ) -> Result<Value, ApiError> {
        let data: Value = self
            .api
            .get_with(&format!("/analytics/clients/{client_id}"), filter.to_query())
            .await?;
        self.client = Some(data.clone());
        Ok(data)
    }

    /// Export analytics, scoped to one client when `client_id` is given.
    pub async fn download_analytics(
        &self,
        client_id: Option<EntityId>,
        filter: &AnalyticsFilter,
        format: ExportFormat,
    ) -> Result<ExportedFile, ApiError> {
        let mut query = filter.to_query();
        query.push(("format".into(), format.as_query().into()));
        if let Some(id) = client_id {
            query.push(("client_id".into(), id.to_string()));
        }

        let download = self.api.download("/analytics/export", query).await?;
        debug!(format = format.as_query(), bytes = download.bytes.len(), "analytics exported");
        Ok(ExportedFile {
            file_name: format!("analytics.{}", format.extension()),
            content_type: download.content_type,
            bytes: download.bytes,
        })
    }
}
