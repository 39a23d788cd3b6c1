//! Purpose: Public API of the client: facade, connection, identity resolution, domain wrappers.
//! Exports: `Client`, `ClientConfig`, `Connection`, wrappers, and the core value/error types.
//! Role: The only public path callers need; `core` types are re-exported here.
//! Invariants: Wrappers borrow a `Connection`; none of them own or mutate it.
//! Invariants: Path segments supplied by callers are percent-encoded.

mod client;
mod collections;
mod connection;
mod fabrics;
mod identity;
mod kv;
mod query;
mod streams;

pub use crate::core::credential::{AuthScheme, Authorization, Credential, ResolvedIdentity};
pub use crate::core::endpoint::{Endpoint, Protocol};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{ApiResult, Error, ErrorKind};
pub use crate::core::request::{LogicalRequest, Method, Response};
pub use crate::core::retry::RetryPolicy;
pub use crate::core::transport::{DEFAULT_TIMEOUT, HttpSend, OutboundRequest, Transport};
pub use client::{Client, ClientConfig, TenantScope};
pub use collections::{CollectionType, Collections, Documents};
pub use connection::{Connection, DEFAULT_FABRIC, FABRIC_MARKER};
pub use fabrics::{FabricOptions, Fabrics};
pub use identity::{resolve_identity, whoami};
pub use kv::{KeyValue, KvPair};
pub use query::{DEFAULT_BATCH_SIZE, Query};
pub use streams::{StreamScope, Streams};

use serde_json::Value;
use url::Url;

/// Joins `segments` into an absolute, percent-encoded path (`/a/b%20c`).
pub(crate) fn api_path(segments: &[&str]) -> String {
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return String::new();
    };
    if let Ok(mut path) = url.path_segments_mut() {
        path.clear();
        for segment in segments {
            path.push(segment);
        }
    }
    url.path().to_string()
}

/// Unwraps the platform's `{"result": ...}` envelope, if present.
pub(crate) fn unwrap_result(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("result") {
            Some(result) => result,
            None => Value::Object(map),
        },
        other => other,
    }
}
