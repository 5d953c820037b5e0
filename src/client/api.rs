use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::error::ClientError;
use super::source::{FeedbackSource, ListPage, RecordSource, TableSource};
use crate::config::config;
use crate::database::Resource;
use crate::filter::OrderSpec;

/// HTTP client for the inventory API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base: &str, token: Option<String>) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http,
            base: Url::parse(base)?,
            token,
        })
    }

    /// Uses `INVENTORY_API_URL` and `INVENTORY_API_TOKEN` via the global config.
    pub fn from_config() -> Result<Self, ClientError> {
        let client = &config().client;
        Self::new(&client.api_url, client.api_token.clone())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ClientError> {
        let url = self.base.join(path)?;
        let mut request = self.http.get(url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"))
                .to_string();
            return Err(ClientError::Status {
                code: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl TableSource for ApiClient {
    async fn list(&self, resource: Resource, page: Option<u64>, order: &OrderSpec) -> Result<ListPage, ClientError> {
        let mut query = vec![("order", order.to_json().to_string())];
        if let Some(page) = page {
            query.push(("page", page.to_string()));
        }
        let mut body = self.get_json(&format!("/api/{}", resource), &query).await?;

        let rows = match body.get_mut(resource.name()).map(Value::take) {
            Some(Value::Array(rows)) => rows,
            _ => return Err(ClientError::Decode(format!("missing '{}' array", resource))),
        };
        let pages = body
            .get("pages")
            .and_then(Value::as_u64)
            .ok_or_else(|| ClientError::Decode("missing 'pages'".to_string()))?;
        Ok(ListPage { rows, pages })
    }
}

#[async_trait]
impl FeedbackSource for ApiClient {
    async fn feedback(&self, endpoint: &str, param: &str, value: &str) -> Result<String, ClientError> {
        let body = self.get_json(endpoint, &[(param, value.to_string())]).await?;
        body.get("feedback")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClientError::Decode("missing 'feedback'".to_string()))
    }
}

#[async_trait]
impl RecordSource for ApiClient {
    async fn record(&self, resource: Resource, id: i64) -> Result<Value, ClientError> {
        let mut body = self.get_json(&format!("/api/{}/{}", resource, id), &[]).await?;
        match body.get_mut(resource.singular()).map(Value::take) {
            Some(record @ Value::Object(_)) => Ok(record),
            _ => Err(ClientError::Decode(format!("missing '{}' object", resource.singular()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_base_url() {
        assert!(matches!(ApiClient::new("not a url", None), Err(ClientError::BadInput(_))));
        let client = ApiClient::new("http://127.0.0.1:3000", Some("t".to_string())).unwrap();
        assert_eq!(client.base_url().join("/api/stocks").unwrap().path(), "/api/stocks");
    }

    #[tokio::test]
    async fn unreachable_server_is_reported_as_such() {
        // Port 9 (discard) is closed on any sane test host
        let client = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        let result = client.feedback("/api/feedbacks/location-name", "name", "Pantry").await;
        assert!(matches!(result, Err(ClientError::Unreachable(_))), "{:?}", result);
    }
}
