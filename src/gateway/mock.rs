//! In-memory mock implementation of NotesApi for testing without a server.

use super::error::{ApiError, Result};
use super::traits::NotesApi;
use crate::notes::models::{
    KnowledgeItem, KnowledgePayload, KnowledgeUpdate, ListQuery, NoteId, TagStat,
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};

/// In-memory stand-in for the notes server.
///
/// Reproduces the server's observable behaviour: substring filtering on the
/// list endpoint, newest-first ordering by `updated_at`, 404 for unknown ids,
/// field-by-field merge on update and tag usage statistics. Timestamps come
/// from a logical clock that advances one second per write, so ordering is
/// deterministic.
pub struct MockNotesApi {
    inner: RwLock<MockState>,
    gate: RwLock<Option<Arc<Notify>>>,
}

#[derive(Default)]
struct MockState {
    items: Vec<KnowledgeItem>,
    next_id: NoteId,
    clock: i64,
    fail_with: Option<StatusCode>,
    calls: Vec<String>,
}

impl MockNotesApi {
    /// Create a new empty mock server.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MockState {
                next_id: 1,
                ..Default::default()
            }),
            gate: RwLock::new(None),
        }
    }

    /// Create a mock pre-seeded with items, kept in the given insertion order.
    /// New ids continue after the largest seeded id.
    pub fn with_items(items: Vec<KnowledgeItem>) -> Self {
        let next_id = items.iter().map(|i| i.id).max().unwrap_or(0) + 1;
        Self {
            inner: RwLock::new(MockState {
                items,
                next_id,
                ..Default::default()
            }),
            gate: RwLock::new(None),
        }
    }

    /// Make every following call fail with `status` until cleared with `None`.
    pub async fn fail_with(&self, status: Option<StatusCode>) {
        self.inner.write().await.fail_with = status;
    }

    /// Hold every following call until the returned handle is notified.
    ///
    /// Each `notify_one()` releases one pending (or the next) call.
    pub async fn hold_calls(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.write().await = Some(notify.clone());
        notify
    }

    /// Stop holding calls
    pub async fn release_calls(&self) {
        *self.gate.write().await = None;
    }

    /// Names of the endpoints called so far, e.g. `"GET /notes"`
    pub async fn calls(&self) -> Vec<String> {
        self.inner.read().await.calls.clone()
    }

    /// Current server-side items in insertion order
    pub async fn items(&self) -> Vec<KnowledgeItem> {
        self.inner.read().await.items.clone()
    }

    /// Record the call, wait on the gate if one is set, then apply any
    /// configured failure.
    async fn enter(&self, call: String) -> Result<()> {
        self.inner.write().await.calls.push(call.clone());

        let gate = self.gate.read().await.clone();
        if let Some(notify) = gate {
            notify.notified().await;
        }

        match self.inner.read().await.fail_with {
            Some(status) => Err(ApiError::from_response(status, &call, "mock failure")),
            None => Ok(()),
        }
    }
}

impl Default for MockNotesApi {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

impl MockState {
    fn tick(&mut self) -> String {
        self.clock += 1;
        (epoch() + TimeDelta::seconds(self.clock))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string()
    }

    fn position(&self, id: NoteId) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }
}

fn not_found(id: NoteId) -> ApiError {
    ApiError::NotFound {
        path: format!("/notes/{}", id),
    }
}

/// Trim each tag and drop empty ones; an empty result becomes `None`.
fn clean_tags(tags: Option<&[String]>) -> Option<Vec<String>> {
    let cleaned: Vec<String> = tags?
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn matches_query(item: &KnowledgeItem, query: &ListQuery) -> bool {
    if let Some(q) = query.q.as_deref().filter(|q| !q.is_empty()) {
        let q = q.to_lowercase();
        if !item.title.to_lowercase().contains(&q) && !item.content.to_lowercase().contains(&q) {
            return false;
        }
    }
    if let Some(tag) = query.tag.as_deref().filter(|t| !t.is_empty()) {
        let joined = item.tag_list().join(",").to_lowercase();
        if !joined.contains(&tag.to_lowercase()) {
            return false;
        }
    }
    true
}

// ---------------------------------------------------------------------------
// NotesApi implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl NotesApi for MockNotesApi {
    async fn list_notes(&self, query: &ListQuery) -> Result<Vec<KnowledgeItem>> {
        self.enter("GET /notes".into()).await?;
        let state = self.inner.read().await;
        let mut results: Vec<KnowledgeItem> = state
            .items
            .iter()
            .filter(|i| matches_query(i, query))
            .cloned()
            .collect();
        // Stable sort keeps insertion order among equal timestamps
        results.sort_by(|a, b| b.updated_at_naive().cmp(&a.updated_at_naive()));
        Ok(results)
    }

    async fn get_note(&self, id: NoteId) -> Result<KnowledgeItem> {
        self.enter(format!("GET /notes/{}", id)).await?;
        let state = self.inner.read().await;
        state
            .items
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn create_note(&self, payload: &KnowledgePayload) -> Result<KnowledgeItem> {
        self.enter("POST /notes".into()).await?;
        let mut state = self.inner.write().await;
        let now = state.tick();
        let item = KnowledgeItem {
            id: state.next_id,
            title: payload.title.clone(),
            content: payload.content.clone(),
            tags: clean_tags(payload.tags.as_deref()),
            source: payload.source.clone(),
            difficulty: payload.difficulty,
            created_at: now.clone(),
            updated_at: now,
        };
        state.next_id += 1;
        state.items.push(item.clone());
        Ok(item)
    }

    async fn update_note(&self, id: NoteId, update: &KnowledgeUpdate) -> Result<KnowledgeItem> {
        self.enter(format!("PUT /notes/{}", id)).await?;
        let mut state = self.inner.write().await;
        let idx = state.position(id).ok_or_else(|| not_found(id))?;
        let now = state.tick();

        let item = &mut state.items[idx];
        if let Some(title) = &update.title {
            item.title = title.clone();
        }
        if let Some(content) = &update.content {
            item.content = content.clone();
        }
        if update.tags.is_some() {
            item.tags = clean_tags(update.tags.as_deref());
        }
        if let Some(source) = &update.source {
            item.source = Some(source.clone());
        }
        if let Some(difficulty) = update.difficulty {
            item.difficulty = Some(difficulty);
        }
        item.updated_at = now;
        Ok(item.clone())
    }

    async fn delete_note(&self, id: NoteId) -> Result<()> {
        self.enter(format!("DELETE /notes/{}", id)).await?;
        let mut state = self.inner.write().await;
        let idx = state.position(id).ok_or_else(|| not_found(id))?;
        state.items.remove(idx);
        Ok(())
    }

    async fn export_notes(&self) -> Result<Vec<KnowledgeItem>> {
        self.enter("GET /export".into()).await?;
        Ok(self.inner.read().await.items.clone())
    }

    async fn list_tags(&self) -> Result<Vec<TagStat>> {
        self.enter("GET /tags".into()).await?;
        let state = self.inner.read().await;
        let mut counter: BTreeMap<String, u64> = BTreeMap::new();
        for item in &state.items {
            for tag in item.tag_list() {
                *counter.entry(tag.clone()).or_default() += 1;
            }
        }
        let mut stats: Vec<TagStat> = counter
            .into_iter()
            .map(|(name, count)| TagStat { name, count })
            .collect();
        stats.sort_by_key(|s| s.name.to_lowercase());
        Ok(stats)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(title: &str, content: &str) -> KnowledgePayload {
        KnowledgePayload::new(title, content)
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let api = MockNotesApi::new();
        let a = api.create_note(&payload("A", "x")).await.unwrap();
        let b = api.create_note(&payload("B", "y")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.created_at, a.updated_at);
        assert!(b.updated_at_naive() > a.updated_at_naive());
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let api = MockNotesApi::new();
        api.create_note(&payload("first", "")).await.unwrap();
        api.create_note(&payload("second", "")).await.unwrap();
        api.update_note(
            1,
            &KnowledgeUpdate {
                content: Some("touched".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let ids: Vec<NoteId> = api
            .list_notes(&ListQuery::default())
            .await
            .unwrap()
            .iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_list_filters_by_query_and_tag() {
        let api = MockNotesApi::new();
        api.create_note(&payload("Borrowing", "refs").with_tags(["Rust"]))
            .await
            .unwrap();
        api.create_note(&payload("Lifetimes", "BORROW checker").with_tags(["rust", "advanced"]))
            .await
            .unwrap();
        api.create_note(&payload("Gardening", "soil").with_tags(["home"]))
            .await
            .unwrap();

        let hits = api.list_notes(&ListQuery::new(Some("borrow"), None)).await.unwrap();
        assert_eq!(hits.len(), 2);

        let hits = api.list_notes(&ListQuery::new(None, Some("RUST"))).await.unwrap();
        assert_eq!(hits.len(), 2);

        let hits = api
            .list_notes(&ListQuery::new(Some("borrow"), Some("advanced")))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Lifetimes");
    }

    #[tokio::test]
    async fn test_create_cleans_tags() {
        let api = MockNotesApi::new();
        let item = api
            .create_note(&payload("t", "c").with_tags([" a ", "", "b"]))
            .await
            .unwrap();
        assert_eq!(item.tags, Some(vec!["a".to_string(), "b".to_string()]));

        let item = api
            .create_note(&payload("t", "c").with_tags(["  "]))
            .await
            .unwrap();
        assert!(item.tags.is_none());
    }

    #[tokio::test]
    async fn test_update_merges_supplied_fields_only() {
        let api = MockNotesApi::new();
        let created = api
            .create_note(&payload("title", "body").with_source("book").with_difficulty(1))
            .await
            .unwrap();

        let updated = api
            .update_note(
                created.id,
                &KnowledgeUpdate {
                    title: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.content, "body");
        assert_eq!(updated.source.as_deref(), Some("book"));
        assert_eq!(updated.difficulty, Some(1));
        assert_eq!(updated.created_at, created.created_at);
        assert_ne!(updated.updated_at, created.updated_at);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let api = MockNotesApi::new();
        assert!(api.get_note(9).await.unwrap_err().is_not_found());
        assert!(api
            .update_note(9, &KnowledgeUpdate::default())
            .await
            .unwrap_err()
            .is_not_found());
        assert!(api.delete_note(9).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_repeat_delete_is_not_found() {
        let api = MockNotesApi::new();
        let item = api.create_note(&payload("t", "c")).await.unwrap();
        api.delete_note(item.id).await.unwrap();
        assert!(api.delete_note(item.id).await.unwrap_err().is_not_found());
        assert!(api.items().await.is_empty());
    }

    #[tokio::test]
    async fn test_tag_stats_sorted_case_insensitively() {
        let api = MockNotesApi::new();
        api.create_note(&payload("1", "").with_tags(["beta", "Alpha"]))
            .await
            .unwrap();
        api.create_note(&payload("2", "").with_tags(["beta"]))
            .await
            .unwrap();

        let stats = api.list_tags().await.unwrap();
        assert_eq!(
            stats,
            vec![
                TagStat {
                    name: "Alpha".into(),
                    count: 1
                },
                TagStat {
                    name: "beta".into(),
                    count: 2
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_export_keeps_insertion_order() {
        let api = MockNotesApi::new();
        api.create_note(&payload("1", "")).await.unwrap();
        api.create_note(&payload("2", "")).await.unwrap();
        api.update_note(
            1,
            &KnowledgeUpdate {
                title: Some("one".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let ids: Vec<NoteId> = api.export_notes().await.unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_fail_with_and_call_log() {
        let api = MockNotesApi::new();
        api.fail_with(Some(StatusCode::INTERNAL_SERVER_ERROR)).await;
        let err = api.list_tags().await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

        api.fail_with(None).await;
        api.list_tags().await.unwrap();
        assert_eq!(api.calls().await, vec!["GET /tags", "GET /tags"]);
    }

    #[tokio::test]
    async fn test_with_items_continues_ids() {
        let seeded = api_item(7);
        let api = MockNotesApi::with_items(vec![seeded]);
        let created = api.create_note(&payload("t", "c")).await.unwrap();
        assert_eq!(created.id, 8);
    }

    #[tokio::test]
    async fn test_release_calls_lets_later_calls_through() {
        let api = MockNotesApi::new();
        let gate = api.hold_calls().await;

        gate.notify_one();
        api.list_tags().await.unwrap();

        api.release_calls().await;
        let pending = tokio::time::timeout(std::time::Duration::from_secs(1), async {
            api.list_tags().await.unwrap();
            api.export_notes().await.unwrap();
        })
        .await;

        assert!(pending.is_ok(), "released calls should not wait on the gate");
        assert_eq!(api.calls().await, vec!["GET /tags", "GET /tags", "GET /export"]);
    }

    fn api_item(id: NoteId) -> KnowledgeItem {
        KnowledgeItem {
            id,
            title: format!("note {}", id),
            content: String::new(),
            tags: None,
            source: None,
            difficulty: None,
            created_at: "2023-01-01T00:00:00".into(),
            updated_at: "2023-01-01T00:00:00".into(),
        }
    }
}
