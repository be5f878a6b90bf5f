//! Trait abstraction for the notes HTTP API

use super::error::Result;
use crate::notes::models::{
    KnowledgeItem, KnowledgePayload, KnowledgeUpdate, ListQuery, NoteId, TagStat,
};
use async_trait::async_trait;

/// One method per endpoint of the notes API.
///
/// Each call issues exactly one request and returns the decoded response.
/// Implementations never retry, cache or validate; errors go straight back
/// to the caller. `Send + Sync` so a store can hold an `Arc<dyn NotesApi>`.
#[async_trait]
pub trait NotesApi: Send + Sync {
    /// `GET /notes` with optional `q` and `tag` query parameters
    async fn list_notes(&self, query: &ListQuery) -> Result<Vec<KnowledgeItem>>;

    /// `GET /notes/{id}`
    async fn get_note(&self, id: NoteId) -> Result<KnowledgeItem>;

    /// `POST /notes`
    async fn create_note(&self, payload: &KnowledgePayload) -> Result<KnowledgeItem>;

    /// `PUT /notes/{id}` with a partial body
    async fn update_note(&self, id: NoteId, update: &KnowledgeUpdate) -> Result<KnowledgeItem>;

    /// `DELETE /notes/{id}`
    async fn delete_note(&self, id: NoteId) -> Result<()>;

    /// `GET /export`
    async fn export_notes(&self) -> Result<Vec<KnowledgeItem>>;

    /// `GET /tags`
    async fn list_tags(&self) -> Result<Vec<TagStat>>;
}
