// Templates store.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use estimo_core::filters::{TemplateFilter, ToQuery};
use estimo_core::models::{EntityId, ExportedFile, Page, Template};

use super::estimates::json_export;
use crate::client::ApiClient;
use crate::error::ApiError;

pub struct TemplatesStore {
    api: Arc<ApiClient>,
    pub templates: Vec<Template>,
    pub imported_template: Option<Value>,
}

impl TemplatesStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            templates: Vec::new(),
            imported_template: None,
        }
    }

    pub async fn fetch_templates(&mut self, filter: &TemplateFilter) -> Result<(), ApiError> {
        let page: Page<Template> = self.api.get_with("/templates/", filter.to_query()).await?;
        self.templates = page.items;
        Ok(())
    }

    async fn refresh(&mut self) {
        if let Err(e) = self.fetch_templates(&TemplateFilter::default()).await {
            warn!("failed to refresh templates: {e}");
        }
    }

    pub async fn create_template(&mut self, data: &Value) -> Result<Template, ApiError> {
        let created: Template = self.api.post("/templates/", data).await?;
        self.refresh().await;
        Ok(created)
    }

    pub async fn get_template_by_id(&self, id: EntityId) -> Result<Template, ApiError> {
        self.api.get(&format!("/templates/{id}")).await
    }

    // Update and delete are registered with a trailing slash server-side.
    pub async fn update_template(&mut self, id: EntityId, data: &Value) -> Result<Template, ApiError> {
        let updated: Template = self.api.put(&format!("/templates/{id}/"), data).await?;
        self.refresh().await;
        Ok(updated)
    }

    pub async fn delete_template(&mut self, id: EntityId) -> Result<(), ApiError> {
        self.api.delete(&format!("/templates/{id}/")).await?;
        self.refresh().await;
        Ok(())
    }

    pub async fn export_template(&self, id: EntityId) -> Result<ExportedFile, ApiError> {
        let template = self.get_template_by_id(id).await?;
        json_export(&template, "template")
    }

    pub fn set_imported_template(&mut self, data: Value) {
        self.imported_template = Some(data);
    }

    pub fn take_imported_template(&mut self) -> Option<Value> {
        self.imported_template.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use serde_json::json;

    fn setup() -> (Arc<MockTransport>, TemplatesStore) {
        let mock = Arc::new(MockTransport::new());
        let api = Arc::new(ApiClient::new(mock.clone()));
        (mock, TemplatesStore::new(api))
    }

    #[tokio::test]
    async fn fetch_accepts_bare_list_and_filters_by_name() {
        let (mock, mut store) = setup();
        mock.push_ok(json!([{"id": 1, "name": "Kitchen"}, {"id": 2, "name": "Kitchen XL"}]));

        store
            .fetch_templates(&TemplateFilter {
                name: Some("Kitchen".into()),
            })
            .await
            .unwrap();

        assert_eq!(store.templates.len(), 2);
        assert_eq!(mock.requests()[0].query_value("name"), Some("Kitchen"));
    }

    #[tokio::test]
    async fn update_and_delete_use_trailing_slash() {
        let (mock, mut store) = setup();
        mock.push_ok(json!({"id": 4, "name": "Bath"}))
            .push_ok(json!([{"id": 4}]))
            .push_no_content()
            .push_ok(json!([]));

        store.update_template(4, &json!({"name": "Bath"})).await.unwrap();
        store.delete_template(4).await.unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                "PUT /templates/4/",
                "GET /templates/",
                "DELETE /templates/4/",
                "GET /templates/",
            ]
        );
        assert!(store.templates.is_empty());
    }

    #[tokio::test]
    async fn create_returns_server_entity() {
        let (mock, mut store) = setup();
        mock.push_ok(json!({"id": 8, "name": "Deck"}))
            .push_ok(json!([{"id": 8, "name": "Deck"}]));

        let created = store.create_template(&json!({"name": "Deck"})).await.unwrap();
        assert_eq!(created["id"], 8);
        assert_eq!(store.templates.len(), 1);
    }

    #[tokio::test]
    async fn export_uses_template_fallback_name() {
        let (mock, store) = setup();
        mock.push_ok(json!({"id": 3, "name": "  "}));

        let file = store.export_template(3).await.unwrap();
        assert_eq!(file.file_name, "template.json");
        assert_eq!(file.content_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn imported_slot_is_taken_once() {
        let (_mock, mut store) = setup();
        store.set_imported_template(json!({"name": "Imported"}));

        assert!(store.take_imported_template().is_some());
        assert!(store.take_imported_template().is_none());
    }
}
