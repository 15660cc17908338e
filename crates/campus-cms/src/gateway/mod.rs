//! Remote data gateway
//!
//! Uniform access to the backend's query and object-storage APIs. Every
//! other component reaches the store only through [`Gateway`].
//!
//! Implementations never retry: a failed call is reported once, with the
//! store's message preserved, and the caller decides what to do next.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::GatewayError;

pub use memory::MemoryGateway;
pub use rest::RestGateway;

/// A single row as returned by the store.
pub type Record = Map<String, Value>;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Sort instruction for a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: true,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: false,
        }
    }
}

/// Equality filter on a column.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            value: value.into(),
        }
    }
}

/// Options for [`Gateway::query`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, order: Option<Order>) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// Contract every backend transport fulfils.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetch rows of a collection.
    async fn query(&self, collection: &str, query: &Query) -> GatewayResult<Vec<Record>>;

    /// Insert one row and return it as stored, including store-assigned fields.
    async fn insert(&self, collection: &str, record: Value) -> GatewayResult<Record>;

    /// Patch the row with the given identity and return it as stored.
    ///
    /// Fails when no row matched.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> GatewayResult<Record>;

    /// Insert or replace the row whose identity is carried by the record.
    async fn upsert(&self, collection: &str, record: Value) -> GatewayResult<Record>;

    /// Delete the row with the given identity. Deleting a missing row succeeds.
    async fn delete(&self, collection: &str, id: &str) -> GatewayResult<()>;

    /// Exact number of rows in a collection.
    async fn count(&self, collection: &str) -> GatewayResult<u64>;

    /// Store raw bytes under `key` in `bucket` and return the stored path.
    async fn store_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> GatewayResult<String>;

    /// Public URL of a stored object.
    fn public_url(&self, bucket: &str, key: &str) -> String;
}
