//! HTTP client for the backend REST API.
//!
//! Response shapes stay opaque: list endpoints return a JSON array of
//! objects, or an object wrapping that array under `data`.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{Map, Value};
use tracing::{debug, info};

use spreadwatch_core::ListRecord;
use spreadwatch_feed::{FeedError, FeedResult, Fetcher};

use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};

/// Row mutations issued by admin tables.
pub trait RowMutations: Send + Sync {
    /// `DELETE {endpoint}/{id}`.
    fn delete_row<'a>(&'a self, endpoint: &'a str, id: &'a str) -> BoxFuture<'a, AppResult<()>>;

    /// `PATCH {endpoint}/{id}` with `{ field: value }`.
    fn set_flag<'a>(
        &'a self,
        endpoint: &'a str,
        id: &'a str,
        field: &'a str,
        value: bool,
    ) -> BoxFuture<'a, AppResult<()>>;
}

/// Client for the backend REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Absolute URL of `endpoint`.
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// `GET` a list endpoint.
    pub async fn fetch_list(&self, endpoint: &str) -> FeedResult<Vec<ListRecord>> {
        let url = self.url(endpoint);
        debug!(url = %url, "Fetching list");

        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(|e| FeedError::Fetch(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FeedError::Payload(format!("Failed to parse response: {e}")))?;
        parse_list(body)
    }

    /// Fetcher polling `endpoint`.
    pub fn list_fetcher(self: &Arc<Self>, endpoint: impl Into<String>) -> Arc<dyn Fetcher<ListRecord>> {
        Arc::new(ListFetcher {
            client: Arc::clone(self),
            endpoint: endpoint.into(),
        })
    }

    async fn send_mutation(&self, builder: RequestBuilder, url: &str) -> AppResult<()> {
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Http {
                status: status.as_u16(),
                body,
            });
        }
        info!(url = %url, status = status.as_u16(), "Mutation accepted");
        Ok(())
    }
}

impl RowMutations for ApiClient {
    fn delete_row<'a>(&'a self, endpoint: &'a str, id: &'a str) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            let url = format!("{}/{}", self.url(endpoint), id);
            self.send_mutation(self.request(Method::DELETE, &url), &url)
                .await
        })
    }

    fn set_flag<'a>(
        &'a self,
        endpoint: &'a str,
        id: &'a str,
        field: &'a str,
        value: bool,
    ) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            let url = format!("{}/{}", self.url(endpoint), id);
            let mut body = Map::new();
            body.insert(field.to_string(), Value::Bool(value));
            let builder = self.request(Method::PATCH, &url).json(&body);
            self.send_mutation(builder, &url).await
        })
    }
}

struct ListFetcher {
    client: Arc<ApiClient>,
    endpoint: String,
}

impl Fetcher<ListRecord> for ListFetcher {
    fn fetch(&self) -> BoxFuture<'_, FeedResult<Vec<ListRecord>>> {
        Box::pin(self.client.fetch_list(&self.endpoint))
    }
}

/// Records from a list response body.
pub fn parse_list(body: Value) -> FeedResult<Vec<ListRecord>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(FeedError::Payload(
                    "expected an array or an object with a data array".into(),
                ))
            }
        },
        other => {
            return Err(FeedError::Payload(format!(
                "expected an array, got {}",
                type_name(&other)
            )))
        }
    };

    items
        .into_iter()
        .map(|item| ListRecord::from_value(item).map_err(FeedError::from))
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_list_shapes() {
        let bare = parse_list(json!([{ "id": 1 }, { "id": 2 }])).unwrap();
        assert_eq!(bare.len(), 2);

        let wrapped = parse_list(json!({ "data": [{ "id": 3 }], "total": 1 })).unwrap();
        assert_eq!(wrapped[0].text("id").as_deref(), Some("3"));

        assert!(matches!(parse_list(json!({ "items": [] })), Err(FeedError::Payload(_))));
        assert!(matches!(parse_list(json!("nope")), Err(FeedError::Payload(_))));
        assert!(matches!(parse_list(json!([1, 2])), Err(FeedError::Record(_))));
    }

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new(&ApiConfig {
            base_url: "https://api.example.com/v1/".into(),
            ..ApiConfig::default()
        })
        .unwrap();
        assert_eq!(client.url("/admin/users"), "https://api.example.com/v1/admin/users");
        assert_eq!(client.url("prices"), "https://api.example.com/v1/prices");
    }
}
