//! End-to-end tests: NotesStore driving the HTTP client against a mock server
//!
//! Run with: cargo test --test store_tests

use knowledge_notes::gateway::HttpNotesApi;
use knowledge_notes::notes::{KnowledgePayload, LoadNotesParams, NoteId, NotesStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn note_json(id: NoteId) -> Value {
    json!({
        "id": id,
        "title": format!("note {}", id),
        "content": "",
        "tags": null,
        "created_at": "2024-03-01T09:00:00",
        "updated_at": "2024-03-01T09:00:00"
    })
}

async fn setup() -> (MockServer, NotesStore) {
    let server = MockServer::start().await;
    let api = HttpNotesApi::new(&server.uri(), Duration::from_secs(5)).unwrap();
    (server, NotesStore::new(Arc::new(api)))
}

async fn mount_list(server: &MockServer, ids: &[NoteId]) {
    let body: Vec<Value> = ids.iter().copied().map(note_json).collect();
    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn ids(store: &NotesStore) -> Vec<NoteId> {
    store.notes().iter().map(|n| n.id).collect()
}

#[tokio::test]
async fn test_create_on_empty_store() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(note_json(1)))
        .mount(&server)
        .await;

    store
        .add_note(KnowledgePayload::new("A", "x"))
        .await
        .unwrap();

    assert_eq!(ids(&store), vec![1]);
    assert_eq!(store.selected_id(), Some(1));
}

#[tokio::test]
async fn test_reload_repairs_selection_then_remove() {
    let (server, store) = setup().await;
    mount_list(&server, &[1, 2]).await;

    store.load_notes(LoadNotesParams::default()).await.unwrap();
    assert_eq!(store.selected_id(), Some(1));
    store.select(2);

    Mock::given(method("DELETE"))
        .and(path("/notes/2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    store.remove_note(2).await.unwrap();

    assert_eq!(ids(&store), vec![1]);
    assert_eq!(store.selected_id(), Some(1));
}

#[tokio::test]
async fn test_load_replaces_stale_selection() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .and(query_param("q", "first"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([note_json(1), note_json(2)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .and(query_param("q", "second"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([note_json(3)])))
        .mount(&server)
        .await;

    store.load_notes(LoadNotesParams::query("first")).await.unwrap();
    assert_eq!(store.selected_id(), Some(1));

    store.load_notes(LoadNotesParams::query("second")).await.unwrap();

    assert_eq!(ids(&store), vec![3]);
    assert_eq!(store.selected_id(), Some(3));
    assert_eq!(store.search_keyword(), "second");
}

#[tokio::test]
async fn test_fetch_uncached_note_prepends_without_selecting() {
    let (server, store) = setup().await;
    mount_list(&server, &[1, 2]).await;
    Mock::given(method("GET"))
        .and(path("/notes/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(note_json(5)))
        .mount(&server)
        .await;

    store.load_notes(LoadNotesParams::default()).await.unwrap();
    store.fetch_note(5).await.unwrap();

    assert_eq!(ids(&store), vec![5, 1, 2]);
    assert_eq!(store.selected_id(), Some(1));
}

#[tokio::test]
async fn test_server_failure_propagates_and_clears_loading() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = store
        .load_notes(LoadNotesParams::tag("rust"))
        .await
        .unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(503));
    assert!(!store.is_loading());
    assert!(store.notes().is_empty());
    assert_eq!(store.tag_filter().as_deref(), Some("rust"));
}
