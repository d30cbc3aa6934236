use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use snafu::{ResultExt, ensure};

use crate::error::{
    ApiResult, BuildClientSnafu, CannotBeBaseSnafu, DecodeSnafu, InvalidBaseUrlSnafu,
    RequestSnafu, StatusSnafu,
};
use crate::types::{
    ConversationId, ConversationSummary, ErrorBody, HistoryRecord, NameRequest, SearchHit,
    SendMessageRequest, SendMessageResponse,
};
use crate::{BoxFuture, ChatBackend};

/// Address the reference backend listens on out of the box.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// reqwest-backed client for the conversation backend's JSON API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    http_client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> ApiResult<Self> {
        Self::builder().base_url(base_url).build()
    }

    pub fn builder() -> HttpBackendBuilder {
        HttpBackendBuilder::default()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        {
            let Ok(mut path) = url.path_segments_mut() else {
                return CannotBeBaseSnafu {
                    stage: "build-endpoint",
                    base_url: self.base_url.to_string(),
                }
                .fail();
            };
            // Pushing segments escapes opaque ids instead of splicing them into the path.
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> (RequestBuilder, String) {
        let label = format!("{method} {}", url.path());
        (self.http_client.request(method, url), label)
    }

    async fn send_checked(
        request: RequestBuilder,
        endpoint: &str,
        stage: &'static str,
    ) -> ApiResult<Response> {
        let response = request.send().await.context(RequestSnafu {
            stage,
            endpoint: endpoint.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body, status.canonical_reason());
        tracing::debug!(endpoint, status = status.as_u16(), %message, "backend rejected request");

        StatusSnafu {
            stage,
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        }
        .fail()
    }

    async fn fetch_json<T: DeserializeOwned>(
        request: RequestBuilder,
        endpoint: &str,
        stage: &'static str,
    ) -> ApiResult<T> {
        let response = Self::send_checked(request, endpoint, stage).await?;
        response.json::<T>().await.context(DecodeSnafu {
            stage,
            endpoint: endpoint.to_string(),
        })
    }
}

impl ChatBackend for HttpBackend {
    fn list_conversations<'a>(&'a self) -> BoxFuture<'a, ApiResult<Vec<ConversationSummary>>> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "conversations"])?;
            let (request, endpoint) = self.request(Method::GET, url);
            Self::fetch_json(request, &endpoint, "list-conversations").await
        })
    }

    fn create_conversation<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, ApiResult<ConversationSummary>> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "new_conversation"])?;
            let (request, endpoint) = self.request(Method::POST, url);
            let request = request.json(&NameRequest { name });
            Self::fetch_json(request, &endpoint, "create-conversation").await
        })
    }

    fn send_message<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message: &'a str,
    ) -> BoxFuture<'a, ApiResult<String>> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "message"])?;
            let (request, endpoint) = self.request(Method::POST, url);
            let request = request.json(&SendMessageRequest {
                message,
                conversation_id,
            });
            let response: SendMessageResponse =
                Self::fetch_json(request, &endpoint, "send-message").await?;
            Ok(response.reply)
        })
    }

    fn chat_history<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, ApiResult<Vec<HistoryRecord>>> {
        Box::pin(async move {
            let raw_id = conversation_id.to_string();
            let url = self.endpoint(&["api", "chat_history", &raw_id])?;
            let (request, endpoint) = self.request(Method::GET, url);
            Self::fetch_json(request, &endpoint, "chat-history").await
        })
    }

    fn delete_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, ApiResult<()>> {
        Box::pin(async move {
            let raw_id = conversation_id.to_string();
            let url = self.endpoint(&["api", "delete_conversation", &raw_id])?;
            let (request, endpoint) = self.request(Method::DELETE, url);
            // The acknowledgement body carries nothing the client needs.
            Self::send_checked(request, &endpoint, "delete-conversation").await?;
            Ok(())
        })
    }

    fn rename_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        name: &'a str,
    ) -> BoxFuture<'a, ApiResult<ConversationSummary>> {
        Box::pin(async move {
            let raw_id = conversation_id.to_string();
            let url = self.endpoint(&["api", "rename_conversation", &raw_id])?;
            let (request, endpoint) = self.request(Method::PUT, url);
            let request = request.json(&NameRequest { name });
            Self::fetch_json(request, &endpoint, "rename-conversation").await
        })
    }

    fn search_messages<'a>(&'a self, query: &'a str) -> BoxFuture<'a, ApiResult<Vec<SearchHit>>> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "search_messages"])?;
            let (request, endpoint) = self.request(Method::GET, url);
            let request = request.query(&[("query", query)]);
            Self::fetch_json(request, &endpoint, "search-messages").await
        })
    }
}

#[derive(Debug, Default)]
pub struct HttpBackendBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl HttpBackendBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Requests have no deadline unless one is set here.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> ApiResult<HttpBackend> {
        let raw_base_url = self
            .base_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let base_url = Url::parse(&raw_base_url).map_err(|error| {
            InvalidBaseUrlSnafu {
                stage: "parse-base-url",
                base_url: raw_base_url.clone(),
                details: error.to_string(),
            }
            .build()
        })?;

        ensure!(
            !base_url.cannot_be_a_base(),
            CannotBeBaseSnafu {
                stage: "validate-base-url",
                base_url: raw_base_url,
            }
        );

        let mut client_builder = Client::builder();
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        let http_client = client_builder.build().context(BuildClientSnafu {
            stage: "build-http-client",
        })?;

        Ok(HttpBackend {
            base_url,
            http_client,
        })
    }
}

fn error_message(body: &str, canonical_reason: Option<&str>) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.error;
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    canonical_reason.unwrap_or("request failed").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_escapes_opaque_ids_and_keeps_base_prefix() {
        let backend = HttpBackend::new("http://localhost:5000/chat/").unwrap();

        let url = backend
            .endpoint(&["api", "chat_history", "a b/c"])
            .unwrap();

        assert_eq!(url.path(), "/chat/api/chat_history/a%20b%2Fc");
    }

    #[test]
    fn builder_rejects_urls_without_a_path_base() {
        let error = HttpBackend::new("mailto:someone@example.com").unwrap_err();
        assert!(matches!(error, crate::TransportError::CannotBeBase { .. }));

        let error = HttpBackend::new("not a url").unwrap_err();
        assert!(matches!(error, crate::TransportError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn error_message_prefers_backend_error_field() {
        assert_eq!(
            error_message(r#"{"error": "Invalid request"}"#, Some("Bad Request")),
            "Invalid request"
        );
        assert_eq!(error_message("  upstream down ", None), "upstream down");
        assert_eq!(error_message("", Some("Bad Gateway")), "Bad Gateway");
    }
}
