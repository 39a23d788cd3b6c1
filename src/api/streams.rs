//! Purpose: Stream administration passthroughs and WebSocket endpoint addressing.
//! Exports: `Streams`, `StreamScope`.
//! Role: REST management of pub/sub streams; producers/consumers connect elsewhere.
//! Invariants: WebSocket URLs are scoped to the connection's tenant and current fabric.
//! Notes: Message framing/acks belong to the platform's streaming protocol, not this crate.
#![allow(clippy::result_large_err)]

use super::connection::Connection;
use super::{api_path, unwrap_result};
use crate::core::error::ApiResult;
use crate::core::request::LogicalRequest;
use serde_json::Value;

/// Whether a stream is replicated to every region or kept in the local one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StreamScope {
    Local,
    Global,
}

impl StreamScope {
    fn is_global(self) -> bool {
        matches!(self, StreamScope::Global)
    }

    fn namespace_prefix(self) -> &'static str {
        match self {
            StreamScope::Local => "c8local",
            StreamScope::Global => "c8global",
        }
    }
}

pub struct Streams<'a> {
    conn: &'a Connection,
    stream_base_url: String,
}

impl Connection {
    /// `stream_base_url` is the `ws(s)://host:port` of the streaming endpoint.
    pub fn streams(&self, stream_base_url: impl Into<String>) -> Streams<'_> {
        Streams {
            conn: self,
            stream_base_url: stream_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Streams<'_> {
    pub fn list(&self, scope: Option<StreamScope>) -> ApiResult<Value> {
        let mut request = LogicalRequest::get(api_path(&["streams"]));
        if let Some(scope) = scope {
            request = request.with_param("global", scope.is_global());
        }
        Ok(unwrap_result(self.conn.call(&request)?))
    }

    pub fn create(&self, name: &str, scope: StreamScope) -> ApiResult<Value> {
        let request = LogicalRequest::post(api_path(&["streams", name]))
            .with_param("global", scope.is_global());
        Ok(unwrap_result(self.conn.call(&request)?))
    }

    pub fn delete(&self, name: &str) -> ApiResult<()> {
        self.conn
            .call(&LogicalRequest::delete(api_path(&["streams", name])))?;
        Ok(())
    }

    pub fn producer_url(&self, stream: &str, scope: StreamScope) -> String {
        format!("{}/{}", self.socket_root("producer", scope), stream)
    }

    pub fn consumer_url(&self, stream: &str, scope: StreamScope, subscription: &str) -> String {
        format!(
            "{}/{}/{}",
            self.socket_root("consumer", scope),
            stream,
            subscription
        )
    }

    fn socket_root(&self, role: &str, scope: StreamScope) -> String {
        format!(
            "{}/_ws/ws/v2/{role}/persistent/{}/{}.{}",
            self.stream_base_url,
            self.conn.tenant(),
            scope.namespace_prefix(),
            self.conn.fabric()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::StreamScope;
    use crate::api::Connection;
    use crate::core::credential::{Authorization, ResolvedIdentity};
    use crate::core::retry::RetryPolicy;
    use crate::core::transport::{DEFAULT_TIMEOUT, Transport};

    fn connection() -> Connection {
        Connection::with_identity(
            Transport::new(DEFAULT_TIMEOUT, RetryPolicy::default()),
            "https://api-demo.example.com:443",
            "geo",
            ResolvedIdentity::new("acme", Authorization::bearer("t")),
        )
    }

    #[test]
    fn socket_urls_are_scoped_to_tenant_and_fabric() {
        let conn = connection();
        let streams = conn.streams("wss://api-demo.example.com:443/");
        assert_eq!(
            streams.producer_url("orders", StreamScope::Local),
            "wss://api-demo.example.com:443/_ws/ws/v2/producer/persistent/acme/c8local.geo/orders"
        );
        assert_eq!(
            streams.consumer_url("orders", StreamScope::Global, "billing"),
            "wss://api-demo.example.com:443/_ws/ws/v2/consumer/persistent/acme/c8global.geo/orders/billing"
        );
    }
}
