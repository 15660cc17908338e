//! HTTP gateway for a PostgREST-style query API with object storage
//!
//! Rows live under `/rest/v1/{collection}` and objects under
//! `/storage/v1/object/{bucket}/{key}`. Requests carry the project key both
//! as `apikey` and as a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, error};

use super::{Gateway, GatewayResult, Query, Record};
use crate::config::BackendConfig;
use crate::error::GatewayError;

const PREFER_RETURN: &str = "return=representation";
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=representation";
const PREFER_COUNT: &str = "count=exact";

/// Gateway backed by the hosted REST and storage endpoints.
pub struct RestGateway {
    client: Client,
    config: BackendConfig,
}

impl RestGateway {
    /// Create a gateway for the given backend.
    pub fn new(config: BackendConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn rest_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url(), collection)
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url(), bucket, key)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    async fn send(&self, builder: RequestBuilder) -> GatewayResult<Response> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        error!("Request failed with status {}: {}", status, message);
        Err(GatewayError::with_status(status.as_u16(), message))
    }

    async fn rows(&self, builder: RequestBuilder) -> GatewayResult<Vec<Record>> {
        let response = self.send(builder).await?;
        Ok(response.json::<Vec<Record>>().await?)
    }

    async fn single_row(&self, builder: RequestBuilder) -> GatewayResult<Record> {
        self.rows(builder)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::new("no rows matched"))
    }
}

#[async_trait]
impl Gateway for RestGateway {
    async fn query(&self, collection: &str, query: &Query) -> GatewayResult<Vec<Record>> {
        let url = self.rest_url(collection);
        debug!("Querying {} with {:?}", url, query);

        self.rows(self.client.get(&url).query(&query_params(query)))
            .await
    }

    async fn insert(&self, collection: &str, record: Value) -> GatewayResult<Record> {
        let url = self.rest_url(collection);
        debug!("Inserting into {}", collection);

        self.single_row(
            self.client
                .post(&url)
                .header("Prefer", PREFER_RETURN)
                .json(&[record]),
        )
        .await
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> GatewayResult<Record> {
        let url = self.rest_url(collection);
        debug!("Updating {} id={}", collection, id);

        self.single_row(
            self.client
                .patch(&url)
                .header("Prefer", PREFER_RETURN)
                .query(&[("id", format!("eq.{}", id))])
                .json(&patch),
        )
        .await
    }

    async fn upsert(&self, collection: &str, record: Value) -> GatewayResult<Record> {
        let url = self.rest_url(collection);
        debug!("Upserting into {}", collection);

        self.single_row(
            self.client
                .post(&url)
                .header("Prefer", PREFER_UPSERT)
                .json(&[record]),
        )
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> GatewayResult<()> {
        let url = self.rest_url(collection);
        debug!("Deleting from {} id={}", collection, id);

        self.send(
            self.client
                .delete(&url)
                .query(&[("id", format!("eq.{}", id))]),
        )
        .await?;
        Ok(())
    }

    async fn count(&self, collection: &str) -> GatewayResult<u64> {
        let url = self.rest_url(collection);

        let response = self
            .send(
                self.client
                    .head(&url)
                    .header("Prefer", PREFER_COUNT)
                    .query(&[("select", "*")]),
            )
            .await?;

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| GatewayError::new("missing row count in response"))
    }

    async fn store_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> GatewayResult<String> {
        let url = self.object_url(bucket, key);
        debug!("Uploading {} bytes to {}", bytes.len(), url);

        let builder = self
            .client
            .post(&url)
            .header(
                "Content-Type",
                content_type.unwrap_or("application/octet-stream"),
            )
            .body(bytes);

        self.send(builder).await?;
        Ok(key.to_string())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url(),
            bucket,
            key
        )
    }
}

/// Translate a [`Query`] into REST query parameters.
fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];

    for filter in &query.filters {
        let value = match &filter.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        params.push((filter.column.clone(), format!("eq.{}", value)));
    }

    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }

    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

/// Total from a `Content-Range` header such as `0-24/25` or `*/0`.
fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

/// Pull the most specific message out of an error body.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) {
        for field in ["message", "error_description", "error", "msg"] {
            if let Some(Value::String(msg)) = obj.get(field)
                && !msg.is_empty()
            {
                return msg.clone();
            }
        }
    }

    if body.trim().is_empty() {
        status.to_string()
    } else {
        body.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Filter, Order};

    fn gateway(url: &str) -> RestGateway {
        RestGateway::new(BackendConfig::new(url, "anon-key")).unwrap()
    }

    #[test]
    fn test_urls() {
        let gw = gateway("https://project.example.co/");
        assert_eq!(
            gw.rest_url("faculty"),
            "https://project.example.co/rest/v1/faculty"
        );
        assert_eq!(
            gw.object_url("faculty-photos", "abc-1.png"),
            "https://project.example.co/storage/v1/object/faculty-photos/abc-1.png"
        );
        assert_eq!(
            gw.public_url("faculty-photos", "abc-1.png"),
            "https://project.example.co/storage/v1/object/public/faculty-photos/abc-1.png"
        );
    }

    #[test]
    fn test_query_params() {
        let query = Query::new()
            .filter(Filter::eq("id", 7))
            .order(Some(Order::desc("created_at")))
            .limit(Some(6));

        let params = query_params(&query);
        assert_eq!(
            params,
            vec![
                ("select".to_string(), "*".to_string()),
                ("id".to_string(), "eq.7".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "6".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-24/25"), Some(25));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-9/*"), None);
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"statusCode":"403","error":"Unauthorized","message":"new row violates row-level security policy"}"#;
        assert_eq!(
            error_message(StatusCode::FORBIDDEN, body),
            "new row violates row-level security policy"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, ""),
            "502 Bad Gateway"
        );
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, "plain failure"),
            "plain failure"
        );
    }
}
