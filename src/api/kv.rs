//! Purpose: Key-value collection passthroughs.
//! Exports: `KeyValue`, `KvPair`.
//! Role: Thin wrapper over the platform's `/kv` endpoints on the current fabric.
#![allow(clippy::result_large_err)]

use super::connection::Connection;
use super::{api_path, unwrap_result};
use crate::core::error::ApiResult;
use crate::core::request::LogicalRequest;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KvPair {
    #[serde(rename = "_key")]
    pub key: String,
    pub value: Value,
    /// Unix seconds; `-1` keeps the pair forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<i64>,
}

impl KvPair {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            expire_at: None,
        }
    }
}

pub struct KeyValue<'a> {
    conn: &'a Connection,
}

impl Connection {
    pub fn key_value(&self) -> KeyValue<'_> {
        KeyValue { conn: self }
    }
}

impl KeyValue<'_> {
    pub fn list_collections(&self) -> ApiResult<Value> {
        Ok(unwrap_result(
            self.conn.call(&LogicalRequest::get(api_path(&["kv"])))?,
        ))
    }

    pub fn create_collection(&self, name: &str, expiration: bool) -> ApiResult<()> {
        let request =
            LogicalRequest::post(api_path(&["kv", name])).with_param("expiration", expiration);
        self.conn.call(&request)?;
        Ok(())
    }

    pub fn put(&self, collection: &str, pairs: &[KvPair]) -> ApiResult<Value> {
        let request =
            LogicalRequest::put(api_path(&["kv", collection, "value"])).with_json(pairs)?;
        self.conn.call(&request)
    }

    pub fn get(&self, collection: &str, key: &str) -> ApiResult<Option<Value>> {
        let response = self
            .conn
            .send(&LogicalRequest::get(api_path(&["kv", collection, "value", key])))?;
        if response.status_code == 404 {
            return Ok(None);
        }
        response.into_result().map(Some)
    }

    pub fn remove(&self, collection: &str, key: &str) -> ApiResult<()> {
        self.conn.call(&LogicalRequest::delete(api_path(&[
            "kv", collection, "value", key,
        ])))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::KvPair;
    use serde_json::json;

    #[test]
    fn pair_serializes_with_platform_field_names() {
        let mut pair = KvPair::new("k1", json!("v1"));
        assert_eq!(
            serde_json::to_value(&pair).expect("json"),
            json!({"_key": "k1", "value": "v1"})
        );
        pair.expire_at = Some(-1);
        assert_eq!(serde_json::to_value(&pair).expect("json")["expireAt"], -1);
    }
}
