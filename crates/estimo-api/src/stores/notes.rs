// Notes attached to estimates, clients and templates. Nothing is cached.

use std::fmt;
use std::sync::Arc;

use serde_json::json;

use estimo_core::models::{EntityId, Note};

use crate::client::ApiClient;
use crate::error::ApiError;

/// The entity a note thread belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteTarget {
    Estimate(EntityId),
    Client(EntityId),
    Template(EntityId),
}

impl NoteTarget {
    pub fn path(self) -> String {
        match self {
            NoteTarget::Estimate(id) => format!("/notes/estimates/{id}/"),
            NoteTarget::Client(id) => format!("/notes/clients/{id}/"),
            NoteTarget::Template(id) => format!("/notes/templates/{id}/"),
        }
    }
}

impl fmt::Display for NoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteTarget::Estimate(id) => write!(f, "estimate {id}"),
            NoteTarget::Client(id) => write!(f, "client {id}"),
            NoteTarget::Template(id) => write!(f, "template {id}"),
        }
    }
}

pub struct NotesStore {
    api: Arc<ApiClient>,
}

impl NotesStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn fetch_notes(&self, target: NoteTarget) -> Result<Vec<Note>, ApiError> {
        self.api.get(&target.path()).await
    }

    pub async fn add_note(&self, target: NoteTarget, text: &str) -> Result<Note, ApiError> {
        self.api.post(&target.path(), &json!({ "text": text })).await
    }

    pub async fn update_note(&self, note_id: EntityId, text: &str) -> Result<Note, ApiError> {
        self.api
            .put(&format!("/notes/{note_id}"), &json!({ "text": text }))
            .await
    }

    pub async fn delete_note(&self, note_id: EntityId) -> Result<(), ApiError> {
        self.api.delete(&format!("/notes/{note_id}")).await
    }
}
