// Estimates store: list cache, CRUD, versions, logs, favorites, exports and
// the copy/import scratch slots.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use estimo_core::filters::{EstimateFilter, LogFilter, ToQuery, VersionFilter};
use estimo_core::models::{export_file_name, EntityId, Estimate, ExportedFile, Page, PageMeta};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::transport::{ApiRequest, Method};

pub struct EstimatesStore {
    api: Arc<ApiClient>,
    pub estimates: Vec<Estimate>,
    pub pagination: PageMeta,
    /// Estimate picked for duplication, consumed by the create flow.
    pub copied_estimate: Option<Estimate>,
    /// Parsed contents of an imported estimate file.
    pub imported_estimate: Option<Value>,
}

impl EstimatesStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            estimates: Vec::new(),
            pagination: PageMeta::default(),
            copied_estimate: None,
            imported_estimate: None,
        }
    }

    pub async fn fetch_estimates(&mut self, filter: &EstimateFilter) -> Result<(), ApiError> {
        let page: Page<Estimate> = self.api.get_with("/estimates/", filter.to_query()).await?;
        debug!(count = page.items.len(), total = page.meta.total, "estimates loaded");
        self.estimates = page.items;
        self.pagination = page.meta;
        Ok(())
    }

    /// Re-fetch the unfiltered list after a mutation. The mutation already
    /// succeeded, so a failed refresh is only logged.
    async fn refresh(&mut self) {
        if let Err(e) = self.fetch_estimates(&EstimateFilter::default()).await {
            warn!("failed to refresh estimates: {e}");
        }
    }

    pub async fn create_estimate(&mut self, data: &Value) -> Result<Estimate, ApiError> {
        let created: Estimate = self.api.post("/estimates/", data).await?;
        self.refresh().await;
        Ok(created)
    }

    pub async fn get_estimate_by_id(&self, id: EntityId) -> Result<Estimate, ApiError> {
        self.api.get(&format!("/estimates/{id}")).await
    }

    pub async fn update_estimate(&mut self, id: EntityId, data: &Value) -> Result<Estimate, ApiError> {
        let updated: Estimate = self.api.put(&format!("/estimates/{id}"), data).await?;
        self.refresh().await;
        Ok(updated)
    }

    pub async fn delete_estimate(&mut self, id: EntityId) -> Result<(), ApiError> {
        self.api.delete(&format!("/estimates/{id}")).await?;
        self.refresh().await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Versions
    // ------------------------------------------------------------------

    pub async fn get_estimate_versions(
        &self,
        estimate_id: EntityId,
        filter: &VersionFilter,
    ) -> Result<Page<Value>, ApiError> {
        let request = ApiRequest::new(Method::Get, "/versions/")
            .param("estimate_id", estimate_id)
            .query(filter.to_query());
        self.api.send_json(request).await
    }

    pub async fn get_estimate_version(
        &self,
        version_id: EntityId,
        estimate_id: EntityId,
    ) -> Result<Value, ApiError> {
        let request = ApiRequest::new(Method::Get, format!("/versions/{version_id}"))
            .param("estimate_id", estimate_id);
        self.api.send_json(request).await
    }

    pub async fn restore_version(
        &self,
        version_id: EntityId,
        estimate_id: EntityId,
    ) -> Result<(), ApiError> {
        let request = ApiRequest::new(Method::Post, format!("/versions/{version_id}/restore/"))
            .param("estimate_id", estimate_id);
        self.api.send_unit(request).await
    }

    pub async fn delete_version(
        &self,
        version_id: EntityId,
        estimate_id: EntityId,
    ) -> Result<(), ApiError> {
        let request = ApiRequest::new(Method::Delete, format!("/versions/{version_id}/"))
            .param("estimate_id", estimate_id);
        self.api.send_unit(request).await
    }

    // ------------------------------------------------------------------
    // Exports
    // ------------------------------------------------------------------

    /// The estimate as pretty-printed JSON, named after the estimate.
    pub async fn export_estimate(&self, id: EntityId) -> Result<ExportedFile, ApiError> {
        let estimate = self.get_estimate_by_id(id).await?;
        json_export(&estimate, "estimate")
    }

    pub async fn download_estimate_pdf(&self, id: EntityId) -> Result<ExportedFile, ApiError> {
        self.download(id, "pdf", "pdf").await
    }

    pub async fn download_estimate_excel(&self, id: EntityId) -> Result<ExportedFile, ApiError> {
        self.download(id, "excel", "xlsx").await
    }

    async fn download(
        &self,
        id: EntityId,
        kind: &str,
        extension: &str,
    ) -> Result<ExportedFile, ApiError> {
        let download = self
            .api
            .download(&format!("/estimates/{id}/export/{kind}"), Vec::new())
            .await?;
        Ok(ExportedFile {
            file_name: format!("estimate-{id}.{extension}"),
            content_type: download.content_type,
            bytes: download.bytes,
        })
    }

    // ------------------------------------------------------------------
    // Logs and favorites
    // ------------------------------------------------------------------

    pub async fn get_estimate_logs(
        &self,
        id: EntityId,
        filter: &LogFilter,
    ) -> Result<Page<Value>, ApiError> {
        self.api
            .get_with(&format!("/estimates/{id}/logs"), filter.to_query())
            .await
    }

    pub async fn add_favorite(&mut self, id: EntityId) -> Result<(), ApiError> {
        self.api
            .send_unit(ApiRequest::new(Method::Post, format!("/estimates/{id}/favorite/")))
            .await?;
        self.refresh().await;
        Ok(())
    }

    pub async fn remove_favorite(&mut self, id: EntityId) -> Result<(), ApiError> {
        self.api.delete(&format!("/estimates/{id}/favorite/")).await?;
        self.refresh().await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Local scratch slots
    // ------------------------------------------------------------------

    pub fn set_copied_estimate(&mut self, estimate: Estimate) {
        self.copied_estimate = Some(estimate);
    }

    pub fn clear_copied_estimate(&mut self) {
        self.copied_estimate = None;
    }

    pub fn set_imported_estimate(&mut self, data: Value) {
        self.imported_estimate = Some(data);
    }

    /// Hand the imported estimate to the create flow, emptying the slot.
    pub fn take_imported_estimate(&mut self) -> Option<Value> {
        self.imported_estimate.take()
    }

    /// Drop the cached list (used on logout).
    pub fn clear(&mut self) {
        self.estimates.clear();
        self.pagination = PageMeta::default();
    }
}

/// Serialize an entity for download, naming the file after its `name`.
pub(crate) fn json_export(entity: &Value, fallback: &str) -> Result<ExportedFile, ApiError> {
    let name = entity.get("name").and_then(Value::as_str);
    let bytes = serde_json::to_vec_pretty(entity).map_err(|e| ApiError::Encode(e.to_string()))?;
    Ok(ExportedFile {
        file_name: export_file_name(name, fallback, "json"),
        content_type: Some("application/json".into()),
        bytes,
    })
}
