//! Purpose: Collection and document passthroughs on the connection's current fabric.
//! Exports: `Collections`, `Documents`, `CollectionType`.
//! Role: Thin wrappers; status interpretation via `Response::into_result`.
//! Invariants: A 404 on existence/lookup calls is data (`false`/`None`), not an error.
#![allow(clippy::result_large_err)]

use super::connection::Connection;
use super::{api_path, unwrap_result};
use crate::core::error::{ApiResult, Error, ErrorKind};
use crate::core::request::LogicalRequest;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CollectionType {
    #[default]
    Document,
    Edge,
}

impl CollectionType {
    fn code(self) -> u8 {
        match self {
            CollectionType::Document => 2,
            CollectionType::Edge => 3,
        }
    }
}

#[derive(Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: u8,
}

pub struct Collections<'a> {
    conn: &'a Connection,
}

pub struct Documents<'a> {
    conn: &'a Connection,
    collection: String,
}

impl Connection {
    pub fn collections(&self) -> Collections<'_> {
        Collections { conn: self }
    }

    pub fn documents(&self, collection: impl Into<String>) -> Documents<'_> {
        Documents {
            conn: self,
            collection: collection.into(),
        }
    }
}

impl Collections<'_> {
    pub fn list(&self, exclude_system: bool) -> ApiResult<Vec<Value>> {
        let request =
            LogicalRequest::get(api_path(&["collection"])).with_param("excludeSystem", exclude_system);
        match unwrap_result(self.conn.call(&request)?) {
            Value::Array(items) => Ok(items),
            _ => Err(Error::new(ErrorKind::Internal).with_message("collection list is not an array")),
        }
    }

    pub fn get(&self, name: &str) -> ApiResult<Value> {
        self.conn
            .call(&LogicalRequest::get(api_path(&["collection", name])))
    }

    pub fn create(&self, name: &str, kind: CollectionType) -> ApiResult<Value> {
        let request = LogicalRequest::post(api_path(&["collection"])).with_json(
            &CreateCollectionRequest {
                name,
                kind: kind.code(),
            },
        )?;
        Ok(unwrap_result(self.conn.call(&request)?))
    }

    pub fn delete(&self, name: &str) -> ApiResult<()> {
        self.conn
            .call(&LogicalRequest::delete(api_path(&["collection", name])))?;
        Ok(())
    }

    pub fn exists(&self, name: &str) -> ApiResult<bool> {
        let response = self
            .conn
            .send(&LogicalRequest::get(api_path(&["collection", name])))?;
        match response.status_code {
            404 => Ok(false),
            _ if response.is_success() => Ok(true),
            _ => Err(response.into_error()),
        }
    }

    pub fn count(&self, name: &str) -> ApiResult<u64> {
        let value = self
            .conn
            .call(&LogicalRequest::get(api_path(&["collection", name, "count"])))?;
        value.get("count").and_then(Value::as_u64).ok_or_else(|| {
            Error::new(ErrorKind::Internal).with_message("count response missing `count`")
        })
    }
}

impl Documents<'_> {
    /// Returns the platform's document handle (`_id`, `_key`, `_rev`).
    pub fn insert(&self, document: &Value) -> ApiResult<Value> {
        let request =
            LogicalRequest::post(api_path(&["document", &self.collection])).with_json(document)?;
        self.conn.call(&request)
    }

    pub fn get(&self, key: &str) -> ApiResult<Option<Value>> {
        let response = self
            .conn
            .send(&LogicalRequest::get(api_path(&["document", &self.collection, key])))?;
        if response.status_code == 404 {
            return Ok(None);
        }
        response.into_result().map(Some)
    }

    pub fn update(&self, key: &str, patch: &Value) -> ApiResult<Value> {
        let request = LogicalRequest::patch(api_path(&["document", &self.collection, key]))
            .with_json(patch)?;
        self.conn.call(&request)
    }

    pub fn remove(&self, key: &str) -> ApiResult<()> {
        self.conn.call(&LogicalRequest::delete(api_path(&[
            "document",
            &self.collection,
            key,
        ])))?;
        Ok(())
    }
}
