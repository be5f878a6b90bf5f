//! HTTP implementation of the notes API over `reqwest`

use super::error::{ApiError, Result};
use super::traits::NotesApi;
use crate::notes::models::{
    KnowledgeItem, KnowledgePayload, KnowledgeUpdate, ListQuery, NoteId, TagStat,
};
use crate::Config;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Client for a remote notes API.
///
/// Cheaply cloneable (shares the reqwest connection pool internally).
#[derive(Clone)]
pub struct HttpNotesApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotesApi {
    /// Create a client rooted at `base_url` (e.g. `http://localhost:8000/api`).
    ///
    /// A trailing slash on the base URL is ignored.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Wrap an already configured reqwest client
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build a client from the loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_url, Duration::from_secs(config.timeout_secs))
    }

    /// Base URL every path is appended to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request and turn non-success statuses into [`ApiError`]s.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response> {
        debug!(method = %method, path = %path, "notes API request");

        let request = build(self.client.request(method.clone(), self.url(path)));
        let response = request.send().await.map_err(ApiError::Transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(path = %path, error = %e, "failed to read error response body");
                format!("unreadable response body: {}", e)
            }
        };
        warn!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            "notes API returned an error status"
        );
        Err(ApiError::from_response(status, path, &body))
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<T> {
        self.execute(method, path, build)
            .await?
            .json::<T>()
            .await
            .map_err(ApiError::Decode)
    }
}

fn note_path(id: NoteId) -> String {
    format!("/notes/{}", id)
}

#[async_trait]
impl NotesApi for HttpNotesApi {
    async fn list_notes(&self, query: &ListQuery) -> Result<Vec<KnowledgeItem>> {
        self.fetch_json(Method::GET, "/notes", |req| req.query(query))
            .await
    }

    async fn get_note(&self, id: NoteId) -> Result<KnowledgeItem> {
        self.fetch_json(Method::GET, &note_path(id), |req| req).await
    }

    async fn create_note(&self, payload: &KnowledgePayload) -> Result<KnowledgeItem> {
        self.fetch_json(Method::POST, "/notes", |req| req.json(payload))
            .await
    }

    async fn update_note(&self, id: NoteId, update: &KnowledgeUpdate) -> Result<KnowledgeItem> {
        self.fetch_json(Method::PUT, &note_path(id), |req| req.json(update))
            .await
    }

    async fn delete_note(&self, id: NoteId) -> Result<()> {
        self.execute(Method::DELETE, &note_path(id), |req| req)
            .await?;
        Ok(())
    }

    async fn export_notes(&self) -> Result<Vec<KnowledgeItem>> {
        self.fetch_json(Method::GET, "/export", |req| req).await
    }

    async fn list_tags(&self) -> Result<Vec<TagStat>> {
        self.fetch_json(Method::GET, "/tags", |req| req).await
    }
}
