//! Collaborators the client talks to. [`super::api::ApiClient`] implements all of
//! them over HTTP; tests substitute in-process fakes.

use async_trait::async_trait;
use serde_json::Value;

use super::error::ClientError;
use crate::database::Resource;
use crate::filter::OrderSpec;

/// One page of a listing as returned by `GET /api/{resource}`
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub rows: Vec<Value>,
    pub pages: u64,
}

#[async_trait]
pub trait TableSource: Send + Sync {
    async fn list(&self, resource: Resource, page: Option<u64>, order: &OrderSpec) -> Result<ListPage, ClientError>;
}

/// Remote field check; the returned text contains `!` when the value is rejected.
#[async_trait]
pub trait FeedbackSource: Send + Sync {
    async fn feedback(&self, endpoint: &str, param: &str, value: &str) -> Result<String, ClientError>;
}

/// Detail view of one record, used for cascades and edit-form prefill
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn record(&self, resource: Resource, id: i64) -> Result<Value, ClientError>;
}
