// Application state: configuration, stores and the route table.
//
// `App::navigate` is the headless stand-in for a page load: it resolves a
// path through the router (guard included) and asks the stores for the
// data that page shows.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use estimo_api::stores::ClientWithEstimates;
use estimo_api::transport::{HttpTransport, Transport};
use estimo_api::{ApiClient, ApiError, AuthError, Stores};
use estimo_core::config::Config;
use estimo_core::filters::{AnalyticsFilter, ClientFilter, EstimateFilter, TemplateFilter};
use estimo_core::models::{EntityId, PageMeta, User};
use estimo_core::storage::LocalStorage;

use crate::router::{Page, Params, Resolved, RouteError, Router};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// What a page shows once its data is loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    Estimates {
        estimates: Vec<Value>,
        pagination: PageMeta,
    },
    EstimateCreate {
        copied: Option<Value>,
        imported: Option<Value>,
    },
    Estimate {
        estimate: Value,
    },
    Clients {
        clients: Vec<Value>,
        pagination: PageMeta,
    },
    Client(ClientWithEstimates),
    Templates {
        templates: Vec<Value>,
    },
    Template {
        template: Value,
    },
    Analytics {
        analytics: Value,
    },
    Profile {
        user: Option<User>,
    },
    Login,
    Register,
    Verify {
        email: Option<String>,
    },
    NotFound {
        path: String,
    },
}

pub struct App {
    pub config: Config,
    pub stores: Stores,
    pub router: Router,
}

impl App {
    /// Wire the stores to `transport` and `storage`. Does not touch the
    /// network; see [`App::restore_session`].
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        storage: Arc<LocalStorage>,
    ) -> Result<Self, AppError> {
        let api = Arc::new(ApiClient::new(transport));
        let stores = Stores::new(api, storage)?;
        Ok(Self {
            config,
            stores,
            router: Router::default(),
        })
    }

    /// Startup path of the binary: open local storage, build the HTTP
    /// transport and re-validate any persisted session.
    pub async fn bootstrap(config: Config) -> anyhow::Result<Self> {
        let storage = LocalStorage::open_path(&config.session_db_path)
            .context("failed to open session storage")?;
        info!("Session storage at {}", config.session_db_path.display());

        let transport = HttpTransport::from_config(&config.api)
            .context("failed to build HTTP transport")?;
        info!("API base URL: {}", config.api.base_url);

        let mut app = Self::new(config, Arc::new(transport), Arc::new(storage))?;
        app.restore_session()
            .await
            .context("failed to restore session")?;
        Ok(app)
    }

    pub async fn restore_session(&mut self) -> Result<bool, AppError> {
        Ok(self.stores.restore_session().await?)
    }

    pub fn is_authenticated(&self) -> bool {
        self.stores.is_authenticated()
    }

    /// First page of estimates at the configured page size.
    pub fn estimate_filter(&self) -> EstimateFilter {
        EstimateFilter {
            limit: Some(self.config.default_page_limit),
            ..Default::default()
        }
    }

    pub fn client_filter(&self) -> ClientFilter {
        ClientFilter {
            limit: Some(self.config.default_page_limit),
            ..Default::default()
        }
    }

    /// Resolve `path` and load what the resulting page displays.
    pub async fn navigate(&mut self, path: &str) -> Result<View, AppError> {
        let resolved = self.router.resolve(path, self.is_authenticated())?;
        let (page, params, path) = match resolved {
            Resolved::Page { page, params, path } => (page, params, path),
            Resolved::NotFound { path } => return Ok(View::NotFound { path }),
        };
        debug!(%path, %page, "navigating");

        let view = match page {
            Page::EstimatesList => {
                let filter = self.estimate_filter();
                let store = &mut self.stores.estimates;
                store.fetch_estimates(&filter).await?;
                View::Estimates {
                    estimates: store.estimates.clone(),
                    pagination: store.pagination,
                }
            }
            Page::EstimateCreate => View::EstimateCreate {
                copied: self.stores.estimates.copied_estimate.clone(),
                imported: self.stores.estimates.imported_estimate.clone(),
            },
            Page::EstimateDetail => match id_param(&params) {
                Some(id) => View::Estimate {
                    estimate: self.stores.estimates.get_estimate_by_id(id).await?,
                },
                None => View::NotFound { path },
            },
            Page::ClientsList => {
                let filter = self.client_filter();
                let store = &mut self.stores.clients;
                store.fetch_clients(&filter).await?;
                View::Clients {
                    clients: store.clients.clone(),
                    pagination: store.pagination,
                }
            }
            Page::ClientDetail => match id_param(&params) {
                Some(id) => {
                    let filter = self.estimate_filter();
                    View::Client(
                        self.stores
                            .clients
                            .get_client_with_estimates(id, &filter)
                            .await?,
                    )
                }
                None => View::NotFound { path },
            },
            Page::TemplatesList => {
                let store = &mut self.stores.templates;
                store.fetch_templates(&TemplateFilter::default()).await?;
                View::Templates {
                    templates: store.templates.clone(),
                }
            }
            Page::TemplateDetail => match id_param(&params) {
                Some(id) => View::Template {
                    template: self.stores.templates.get_template_by_id(id).await?,
                },
                None => View::NotFound { path },
            },
            Page::Analytics => View::Analytics {
                analytics: self
                    .stores
                    .analytics
                    .fetch_global(&AnalyticsFilter::default())
                    .await?,
            },
            Page::Profile => {
                if self.stores.auth.user.is_none() {
                    self.stores.auth.fetch_user().await?;
                }
                View::Profile {
                    user: self.stores.auth.user.clone(),
                }
            }
            Page::Login => View::Login,
            Page::Register => View::Register,
            Page::Verify => View::Verify {
                email: self.stores.auth.pending_email.clone(),
            },
        };
        Ok(view)
    }
}

fn id_param(params: &Params) -> Option<EntityId> {
    params.get("id")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use estimo_api::mock::MockTransport;
    use estimo_core::config::ApiConfig;
    use estimo_core::storage::TOKEN_KEY;
    use serde_json::json;
    use std::path::PathBuf;

    fn test_config() -> Config {
        Config {
            api: ApiConfig {
                base_url: "http://api.test".into(),
                timeout_secs: 5,
            },
            session_db_path: PathBuf::from(":memory:"),
            default_page_limit: 10,
            downloads_dir: PathBuf::from("downloads"),
        }
    }

    fn app(token: Option<&str>) -> (Arc<MockTransport>, App) {
        let mock = Arc::new(MockTransport::new());
        let storage = Arc::new(LocalStorage::open(":memory:").unwrap());
        if let Some(t) = token {
            storage.set_item(TOKEN_KEY, t).unwrap();
        }
        let app = App::new(test_config(), mock.clone(), storage).unwrap();
        (mock, app)
    }

    #[tokio::test]
    async fn anonymous_navigation_lands_on_login() {
        let (mock, mut app) = app(None);
        assert_eq!(app.navigate("/estimates").await.unwrap(), View::Login);
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn estimates_list_uses_configured_page_size() {
        let (mock, mut app) = app(Some("jwt"));
        mock.push_ok(json!({"items": [{"id": 1}], "meta": {"total": 1, "limit": 10, "offset": 0}}));

        let view = app.navigate("/").await.unwrap();

        match view {
            View::Estimates { estimates, pagination } => {
                assert_eq!(estimates.len(), 1);
                assert_eq!(pagination.limit, 10);
            }
            other => panic!("unexpected view {other:?}"),
        }
        assert_eq!(mock.requests()[0].query_value("limit"), Some("10"));
    }

    #[tokio::test]
    async fn non_numeric_id_is_not_found() {
        let (mock, mut app) = app(Some("jwt"));
        assert_eq!(
            app.navigate("/estimates/abc").await.unwrap(),
            View::NotFound {
                path: "/estimates/abc".into()
            }
        );
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn create_page_shows_copied_estimate() {
        let (_mock, mut app) = app(Some("jwt"));
        app.stores
            .estimates
            .set_copied_estimate(json!({"name": "copy me"}));

        match app.navigate("/estimates/create").await.unwrap() {
            View::EstimateCreate { copied, imported } => {
                assert_eq!(copied, Some(json!({"name": "copy me"})));
                assert_eq!(imported, None);
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[tokio::test]
    async fn verify_page_shows_pending_email() {
        let (_mock, mut app) = app(None);
        app.stores.auth.pending_email = Some("new@example.com".into());

        assert_eq!(
            app.navigate("/verify").await.unwrap(),
            View::Verify {
                email: Some("new@example.com".into())
            }
        );
    }

    #[tokio::test]
    async fn api_failure_surfaces_as_error() {
        let (mock, mut app) = app(Some("jwt"));
        mock.push_json(500, json!({"detail": "db down"}));

        let err = app.navigate("/analytics").await.unwrap_err();
        assert!(matches!(err, AppError::Api(ApiError::Status { status: 500, .. })));
    }
}
