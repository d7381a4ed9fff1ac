use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

pub mod tcp;
pub use tcp::Client;

// How values are encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Serializer {
    // Structured encoding: arbitrary value types round trip.
    #[default]
    Json,
    // Pass strings through untouched; reads come back as strings.
    Raw,
}

// Operation surface the adapter delegates to, one method per store primitive.
#[async_trait]
pub trait Api {
    async fn get(&mut self, key: &str) -> Result<Option<Value>>;
    async fn multi_get(&mut self, keys: &[String]) -> Result<HashMap<String, Value>>;
    async fn exists(&mut self, key: &str) -> Result<bool>;
    async fn set(&mut self, key: &str, value: &Value) -> Result<()>;
    async fn multi_set(&mut self, entries: &HashMap<String, Value>) -> Result<()>;
    async fn del(&mut self, key: &str) -> Result<()>;
    async fn multi_del(&mut self, keys: &[String]) -> Result<()>;
    // Returns the value after application.
    async fn incr(&mut self, key: &str, delta: i64) -> Result<i64>;
    // Insert if absent. Returns whether the value was stored.
    async fn setnx(&mut self, key: &str, value: &Value) -> Result<bool>;
    // Atomic swap returning the previous value.
    async fn getset(&mut self, key: &str, value: &Value) -> Result<Option<Value>>;
    async fn flushdb(&mut self) -> Result<()>;
    // Server statistics. Expected to expose at least `limit_maxbytes` and `bytes`.
    async fn stats(&mut self) -> Result<HashMap<String, String>>;

    fn set_serializer(&mut self, serializer: Serializer);
}
