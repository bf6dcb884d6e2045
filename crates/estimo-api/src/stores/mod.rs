// Stores: thin state containers over the REST API.

pub mod analytics;
pub mod auth;
pub mod clients;
pub mod estimates;
pub mod notes;
pub mod templates;

use std::sync::Arc;

use estimo_core::storage::LocalStorage;

use crate::client::ApiClient;
use crate::error::AuthError;

pub use analytics::AnalyticsStore;
pub use auth::AuthStore;
pub use clients::{ClientWithEstimates, ClientsStore};
pub use estimates::EstimatesStore;
pub use notes::{NoteTarget, NotesStore};
pub use templates::TemplatesStore;

/// All stores, sharing one [`ApiClient`] and its default bearer token.
pub struct Stores {
    pub auth: AuthStore,
    pub estimates: EstimatesStore,
    pub clients: ClientsStore,
    pub templates: TemplatesStore,
    pub notes: NotesStore,
    pub analytics: AnalyticsStore,
}

impl Stores {
    pub fn new(api: Arc<ApiClient>, storage: Arc<LocalStorage>) -> Result<Self, AuthError> {
        Ok(Self {
            auth: AuthStore::new(api.clone(), storage)?,
            estimates: EstimatesStore::new(api.clone()),
            clients: ClientsStore::new(api.clone()),
            templates: TemplatesStore::new(api.clone()),
            notes: NotesStore::new(api.clone()),
            analytics: AnalyticsStore::new(api),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// End the session and drop the cached estimates.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        self.auth.logout()?;
        self.estimates.clear();
        Ok(())
    }

    /// Re-validate a persisted token. A rejected token ends the session.
    pub async fn restore_session(&mut self) -> Result<bool, AuthError> {
        let restored = self.auth.restore_session().await?;
        if !restored {
            self.estimates.clear();
        }
        Ok(restored)
    }
}
