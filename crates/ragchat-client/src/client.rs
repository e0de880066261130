use async_trait::async_trait;
use ragchat_types::{
    ChatRequest, ChatResponse, ConversationDetail, ConversationList, ConversationSummary,
    HealthResponse, StatsResponse, ThreadId,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::backend::ChatBackend;
use crate::error::{ApiError, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// HTTP client for the RAG backend
///
/// One request per call; no retries, no caching. Non-2xx answers become
/// `ApiError::NotFound` (404) or `ApiError::Http`.
pub struct RagClient {
    client: Client,
    base_url: Url,
}

impl RagClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = parse_base_url(&config.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Client for `base_url` with default settings
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig::new(base_url))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append percent-encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute(&self, request: RequestBuilder, url: &Url) -> Result<Response> {
        tracing::debug!(url = %url, "Sending backend request");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Backend request failed");
            ApiError::from(e)
        })?;

        self.handle_response(response, url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        let response = self.execute(self.client.get(url.clone()), &url).await?;
        Ok(response.json::<T>().await?)
    }

    /// Map non-2xx responses to errors
    async fn handle_response(&self, response: Response, url: &Url) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            tracing::debug!(url = %url, status = %status, "Backend request successful");
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response body".to_string());

        if status == StatusCode::NOT_FOUND {
            tracing::warn!(url = %url, "Backend resource not found");
            return Err(ApiError::NotFound(url.path().to_string()));
        }

        tracing::error!(
            "Backend request failed: url={}, status={}, body={}",
            url,
            status,
            body
        );

        Err(ApiError::Http { status, body })
    }
}

#[async_trait]
impl ChatBackend for RagClient {
    async fn get_health(&self) -> Result<HealthResponse> {
        self.get_json(&["health"]).await
    }

    async fn get_stats(&self) -> Result<StatsResponse> {
        self.get_json(&["stats"]).await
    }

    async fn get_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let list: ConversationList = self.get_json(&["conversations"]).await?;
        Ok(list.conversations)
    }

    async fn get_conversation(&self, thread_id: &ThreadId) -> Result<ConversationDetail> {
        self.get_json(&["conversations", thread_id.as_str()]).await
    }

    async fn create_or_continue_chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = self.endpoint(&["chat"])?;
        let response = self
            .execute(self.client.post(url.clone()).json(&request), &url)
            .await?;
        Ok(response.json::<ChatResponse>().await?)
    }

    async fn rename_conversation(&self, thread_id: &ThreadId, new_title: &str) -> Result<()> {
        // The backend reads the title from the query string, not the body
        let url = self.endpoint(&["conversations", thread_id.as_str(), "title"])?;
        let request = self.client.put(url.clone()).query(&[("title", new_title)]);
        self.execute(request, &url).await?;
        Ok(())
    }

    async fn delete_conversation(&self, thread_id: &ThreadId) -> Result<()> {
        let url = self.endpoint(&["conversations", thread_id.as_str()])?;
        self.execute(self.client.delete(url.clone()), &url).await?;
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ApiError::InvalidBaseUrl(raw.to_string()));
    }

    Ok(url)
}
