//! In-process gateway
//!
//! Keeps collections and stored objects in memory with the same observable
//! behaviour as the hosted backend: store-assigned identities, creation
//! timestamps, ordering, exact counts, and bucket policies. Every call yields
//! once before touching state so concurrent tasks interleave the way they do
//! at a real network boundary.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use super::{Gateway, GatewayResult, Query, Record};
use crate::error::GatewayError;

const DEFAULT_BASE_URL: &str = "memory://campus-cms";

/// Gateway operations, used for failure injection and call accounting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Query,
    Insert,
    Update,
    Upsert,
    Delete,
    Count,
    StoreObject,
}

pub struct MemoryGateway {
    base_url: String,
    tables: DashMap<String, Vec<Record>>,
    sequences: DashMap<String, u64>,
    objects: DashMap<(String, String), Bytes>,
    denied_buckets: DashMap<String, String>,
    failures: Mutex<HashMap<Operation, VecDeque<GatewayError>>>,
    calls: DashMap<Operation, u64>,
    clock: Mutex<DateTime<Utc>>,
    holds: Mutex<HashMap<Operation, u32>>,
    released: watch::Sender<u64>,
    parked: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        let (released, _) = watch::channel(0);
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            tables: DashMap::new(),
            sequences: DashMap::new(),
            objects: DashMap::new(),
            denied_buckets: DashMap::new(),
            failures: Mutex::new(HashMap::new()),
            calls: DashMap::new(),
            clock: Mutex::new(DateTime::<Utc>::MIN_UTC),
            holds: Mutex::new(HashMap::new()),
            released,
            parked: AtomicUsize::new(0),
        }
    }

    /// Use a different prefix for public object URLs.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Insert rows directly, assigning identities and timestamps where missing.
    pub fn seed(&self, collection: &str, rows: Vec<Value>) {
        for row in rows {
            if let Value::Object(record) = row {
                let record = self.stamp(collection, record);
                self.tables
                    .entry(collection.to_string())
                    .or_default()
                    .push(record);
            }
        }
    }

    /// Make the next call of `op` fail with `message`.
    pub fn fail_next(&self, op: Operation, message: &str) {
        self.failures
            .lock()
            .entry(op)
            .or_default()
            .push_back(GatewayError::new(message));
    }

    /// Reject every upload to `bucket` with a policy error.
    pub fn deny_bucket(&self, bucket: &str) {
        self.denied_buckets.insert(
            bucket.to_string(),
            "new row violates row-level security policy".to_string(),
        );
    }

    /// Park the response of the next call of `op` until
    /// [`MemoryGateway::release`] is called. The response reflects the state
    /// at the time of the call, like a reply still in flight.
    pub fn hold_next(&self, op: Operation) {
        *self.holds.lock().entry(op).or_insert(0) += 1;
    }

    /// Deliver every parked response.
    pub fn release(&self) {
        self.released.send_modify(|epoch| *epoch += 1);
    }

    /// Number of responses currently parked.
    pub fn parked(&self) -> usize {
        self.parked.load(AtomicOrdering::SeqCst)
    }

    /// Number of calls of `op` that reached the gateway.
    pub fn calls(&self, op: Operation) -> u64 {
        self.calls.get(&op).map(|c| *c).unwrap_or(0)
    }

    /// Total number of calls of any kind.
    pub fn total_calls(&self) -> u64 {
        self.calls.iter().map(|e| *e.value()).sum()
    }

    /// Current rows of a collection in insertion order.
    pub fn rows(&self, collection: &str) -> Vec<Record> {
        self.tables
            .get(collection)
            .map(|t| t.clone())
            .unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|b| b.clone())
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Run one gateway call: count it, yield to other tasks, apply any
    /// injected failure, compute the response, then deliver it (possibly
    /// after being parked by [`MemoryGateway::hold_next`]).
    async fn call<T, F>(&self, op: Operation, f: F) -> GatewayResult<T>
    where
        T: Send,
        F: FnOnce() -> GatewayResult<T> + Send,
    {
        *self.calls.entry(op).or_insert(0) += 1;
        tokio::task::yield_now().await;

        let injected = self
            .failures
            .lock()
            .get_mut(&op)
            .and_then(|queue| queue.pop_front());
        if let Some(err) = injected {
            debug!("Injected failure for {:?}: {}", op, err);
            return Err(err);
        }

        let result = f();
        self.settle(op).await;
        result
    }

    async fn settle(&self, op: Operation) {
        let park = {
            let mut holds = self.holds.lock();
            match holds.get_mut(&op) {
                Some(n) if *n > 0 => {
                    *n -= 1;
                    true
                }
                _ => false,
            }
        };
        if !park {
            return;
        }

        let mut released = self.released.subscribe();
        let epoch = *released.borrow();
        self.parked.fetch_add(1, AtomicOrdering::SeqCst);
        // The sender lives as long as self, so this only returns once released.
        let _ = released.wait_for(|v| *v > epoch).await;
        self.parked.fetch_sub(1, AtomicOrdering::SeqCst);
    }

    fn next_timestamp(&self) -> String {
        let mut last = self.clock.lock();
        let now = Utc::now();
        let ts = if now > *last {
            now
        } else {
            *last + TimeDelta::microseconds(1)
        };
        *last = ts;
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn next_id(&self, collection: &str) -> String {
        let mut seq = self.sequences.entry(collection.to_string()).or_insert(0);
        *seq += 1;
        let prefix = collection.chars().next().unwrap_or('r');
        format!("{}{}", prefix, *seq)
    }

    fn stamp(&self, collection: &str, mut record: Record) -> Record {
        if !record.contains_key("id") {
            record.insert("id".to_string(), Value::String(self.next_id(collection)));
        }
        if !record.contains_key("created_at") {
            record.insert(
                "created_at".to_string(),
                Value::String(self.next_timestamp()),
            );
        }
        record
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn id_matches(record: &Record, id: &str) -> bool {
    match record.get("id") {
        Some(Value::String(s)) => s == id,
        Some(Value::Number(n)) => n.to_string() == id,
        _ => false,
    }
}

fn values_equal(a: Option<&Value>, b: &Value) -> bool {
    match (a, b) {
        (Some(Value::Number(x)), Value::String(y)) | (Some(Value::String(y)), Value::Number(x)) => {
            x.to_string() == *y
        }
        (Some(x), y) => x == y,
        (None, _) => false,
    }
}

/// Ascending comparison with nulls last.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn into_record(value: Value) -> GatewayResult<Record> {
    match value {
        Value::Object(record) => Ok(record),
        other => Err(GatewayError::with_status(
            400,
            format!("expected an object, got {}", other),
        )),
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn query(&self, collection: &str, query: &Query) -> GatewayResult<Vec<Record>> {
        self.call(Operation::Query, || {
            let mut rows: Vec<Record> = self
                .rows(collection)
                .into_iter()
                .filter(|row| {
                    query
                        .filters
                        .iter()
                        .all(|f| values_equal(row.get(&f.column), &f.value))
                })
                .collect();

            if let Some(order) = &query.order {
                rows.sort_by(|a, b| {
                    let ord = compare_values(a.get(&order.column), b.get(&order.column));
                    if order.ascending { ord } else { ord.reverse() }
                });
            }

            if let Some(limit) = query.limit {
                rows.truncate(limit);
            }

            Ok(rows)
        })
        .await
    }

    async fn insert(&self, collection: &str, record: Value) -> GatewayResult<Record> {
        self.call(Operation::Insert, || {
            let record = self.stamp(collection, into_record(record)?);
            self.tables
                .entry(collection.to_string())
                .or_default()
                .push(record.clone());
            Ok(record)
        })
        .await
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> GatewayResult<Record> {
        self.call(Operation::Update, || {
            let patch = into_record(patch)?;
            let mut table = self.tables.entry(collection.to_string()).or_default();
            let row = table
                .iter_mut()
                .find(|row| id_matches(row, id))
                .ok_or_else(|| GatewayError::new("no rows matched"))?;

            for (key, value) in patch {
                if key != "id" {
                    row.insert(key, value);
                }
            }
            Ok(row.clone())
        })
        .await
    }

    async fn upsert(&self, collection: &str, record: Value) -> GatewayResult<Record> {
        self.call(Operation::Upsert, || {
            let record = into_record(record)?;
            let id = match record.get("id") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => {
                    return Err(GatewayError::with_status(
                        400,
                        "upsert requires an id column",
                    ));
                }
            };

            let mut table = self.tables.entry(collection.to_string()).or_default();
            if let Some(row) = table.iter_mut().find(|row| id_matches(row, &id)) {
                for (key, value) in record {
                    row.insert(key, value);
                }
                return Ok(row.clone());
            }

            let record = self.stamp(collection, record);
            table.push(record.clone());
            Ok(record)
        })
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> GatewayResult<()> {
        self.call(Operation::Delete, || {
            if let Some(mut table) = self.tables.get_mut(collection) {
                table.retain(|row| !id_matches(row, id));
            }
            Ok(())
        })
        .await
    }

    async fn count(&self, collection: &str) -> GatewayResult<u64> {
        self.call(Operation::Count, || {
            Ok(self.tables.get(collection).map(|t| t.len()).unwrap_or(0) as u64)
        })
        .await
    }

    async fn store_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        _content_type: Option<&str>,
    ) -> GatewayResult<String> {
        self.call(Operation::StoreObject, || {
            if let Some(message) = self.denied_buckets.get(bucket) {
                return Err(GatewayError::with_status(403, message.clone()));
            }

            let slot = (bucket.to_string(), key.to_string());
            if self.objects.contains_key(&slot) {
                return Err(GatewayError::with_status(409, "The resource already exists"));
            }
            self.objects.insert(slot, bytes);
            Ok(key.to_string())
        })
        .await
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, key
        )
    }
}
