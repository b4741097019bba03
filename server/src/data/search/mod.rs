//! Search index client.
//!
//! Semantic adapter over the Elasticsearch HTTP API. The index is derived
//! state: event documents are written on event creation and the listing path
//! reads them, but the store remains authoritative. For booking creation the
//! index is the existence authority, matching the deployed system.

mod error;
pub mod query;

pub use error::SearchError;

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::core::config::SearchConfig;
use crate::data::types::EventRow;

/// Retry-worthy statuses (transient index pressure)
const RETRY_STATUSES: [u16; 4] = [429, 502, 503, 504];

pub struct SearchService {
    client: reqwest::Client,
    base_url: String,
    index: String,
    username: Option<String>,
    password: Option<String>,
    max_retries: u32,
}

#[derive(Deserialize)]
struct SearchHits {
    hits: SearchHitsInner,
}

#[derive(Deserialize)]
struct SearchHitsInner {
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "_source")]
    source: EventRow,
}

#[derive(Deserialize)]
struct GetDocResponse {
    found: bool,
    #[serde(rename = "_source")]
    source: Option<EventRow>,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

impl SearchService {
    /// Create the client and make sure the index exists with its mapping
    pub async fn init(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let service = Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            max_retries: config.max_retries,
        };

        service.ensure_index().await?;
        Ok(service)
    }

    async fn ensure_index(&self) -> Result<(), SearchError> {
        let url = format!("{}/{}", self.base_url, self.index);

        let head = self.request(Method::HEAD, &url, None).await?;
        if head.status().is_success() {
            tracing::debug!(index = %self.index, "Search index already exists");
            return Ok(());
        }

        let created = self
            .request(Method::PUT, &url, Some(query::index_mapping()))
            .await?;
        let status = created.status();
        if !status.is_success() {
            let body = created.text().await.unwrap_or_default();
            // Lost a create race with another instance
            if body.contains("resource_already_exists_exception") {
                return Ok(());
            }
            return Err(SearchError::Index {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(index = %self.index, "Created search index");
        Ok(())
    }

    /// Fuzzy multi-field search with optional calendar-day filter
    pub async fn search(
        &self,
        query: &str,
        date: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<EventRow>, SearchError> {
        let url = format!("{}/{}/_search", self.base_url, self.index);
        let body = query::search_body(query, date, page, page_size);

        let response = self.request_with_retry(Method::POST, &url, Some(body)).await?;
        let hits: SearchHits = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        Ok(hits.hits.hits.into_iter().map(|h| h.source).collect())
    }

    /// Point lookup; `None` when the document is absent
    pub async fn get_by_id(&self, id: i64) -> Result<Option<EventRow>, SearchError> {
        let url = format!("{}/{}/_doc/{}", self.base_url, self.index, id);

        let response = self.request_with_retry(Method::GET, &url, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let doc: GetDocResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        Ok(if doc.found { doc.source } else { None })
    }

    /// Index (or reindex) an event document
    pub async fn index_event(&self, event: &EventRow) -> Result<(), SearchError> {
        let url = format!(
            "{}/{}/_doc/{}?refresh=wait_for",
            self.base_url, self.index, event.id
        );
        let body = serde_json::to_value(event)
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        self.request_with_retry(Method::PUT, &url, Some(body))
            .await?;
        Ok(())
    }

    /// Remove an event document
    pub async fn delete_event(&self, id: i64) -> Result<(), SearchError> {
        let url = format!("{}/{}/_doc/{}", self.base_url, self.index, id);
        let response = self.request_with_retry(Method::DELETE, &url, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Ok(())
    }

    /// Number of indexed event documents
    pub async fn count(&self) -> Result<u64, SearchError> {
        let url = format!("{}/{}/_count", self.base_url, self.index);
        let response = self.request_with_retry(Method::GET, &url, None).await?;
        let count: CountResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        Ok(count.count)
    }

    /// Health probe for the readiness endpoint
    pub async fn health_check(&self) -> Result<(), SearchError> {
        let url = format!("{}/_cluster/health", self.base_url);
        let response = self.request(Method::GET, &url, None).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Index {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
    ) -> Result<reqwest::Response, SearchError> {
        let mut builder = self.client.request(method, url);
        if let Some(ref username) = self.username {
            builder = builder.basic_auth(username, self.password.as_deref());
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        Ok(builder.send().await?)
    }

    /// Send with bounded retries on transient statuses
    async fn request_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
    ) -> Result<reqwest::Response, SearchError> {
        let attempts = self.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.request(method.clone(), url, body.clone()).await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if !RETRY_STATUSES.contains(&status) {
                        if response.status().is_server_error() {
                            return Err(SearchError::Index {
                                status,
                                body: response.text().await.unwrap_or_default(),
                            });
                        }
                        return Ok(response);
                    }
                    last_error = format!("status {status}");
                }
                Err(e) => last_error = e.to_string(),
            }

            if attempt < attempts {
                tracing::warn!(
                    url = %url,
                    attempt,
                    error = %last_error,
                    "Search request failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempt - 1))).await;
            }
        }

        Err(SearchError::Unavailable {
            attempts,
            last_error,
        })
    }
}
