//! Purpose: Query execution through server-side cursors.
//! Exports: `Query`, `DEFAULT_BATCH_SIZE`.
//! Role: Opens a cursor, drains it batch by batch, and returns every row.
//! Invariants: Follow-up batches reuse the cursor id until `hasMore` is false.
#![allow(clippy::result_large_err)]

use super::api_path;
use super::connection::Connection;
use crate::core::error::{ApiResult, Error, ErrorKind};
use crate::core::request::LogicalRequest;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_BATCH_SIZE: u32 = 100;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CursorRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Map::is_empty")]
    bind_vars: &'a Map<String, Value>,
    batch_size: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorBatch {
    #[serde(default)]
    result: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    id: Option<String>,
}

#[derive(Serialize)]
struct ExplainRequest<'a> {
    query: &'a str,
}

pub struct Query<'a> {
    conn: &'a Connection,
    batch_size: u32,
}

impl Connection {
    pub fn query(&self) -> Query<'_> {
        Query {
            conn: self,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Query<'_> {
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn execute(&self, query: &str, bind_vars: &Map<String, Value>) -> ApiResult<Vec<Value>> {
        let request = LogicalRequest::post(api_path(&["cursor"])).with_json(&CursorRequest {
            query,
            bind_vars,
            batch_size: self.batch_size,
        })?;
        let mut batch = decode_batch(self.conn.call(&request)?)?;
        let mut rows = std::mem::take(&mut batch.result);
        while batch.has_more {
            let Some(id) = batch.id.take() else {
                return Err(Error::new(ErrorKind::Internal)
                    .with_message("cursor reported more results without an id"));
            };
            batch = decode_batch(
                self.conn
                    .call(&LogicalRequest::put(api_path(&["cursor", &id])))?,
            )?;
            if batch.id.is_none() {
                batch.id = Some(id);
            }
            rows.append(&mut batch.result);
        }
        tracing::debug!(rows = rows.len(), "query drained");
        Ok(rows)
    }

    pub fn explain(&self, query: &str) -> ApiResult<Value> {
        let request = LogicalRequest::post(api_path(&["query", "explain"]))
            .with_json(&ExplainRequest { query })?;
        self.conn.call(&request)
    }
}

fn decode_batch(value: Value) -> ApiResult<CursorBatch> {
    serde_json::from_value(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid cursor response")
            .with_source(err)
    })
}
