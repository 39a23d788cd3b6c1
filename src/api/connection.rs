//! Purpose: Scope logical requests to tenant + fabric and dispatch them through the transport.
//! Exports: `Connection`, `DEFAULT_FABRIC`, `FABRIC_MARKER`.
//! Role: Request dispatcher; owned context object borrowed by every domain wrapper.
//! Invariants: Identity is resolved during `connect` and never re-resolved afterwards.
//! Invariants: Paths starting with `/_fabric/` are spliced onto the base, not the fabric prefix.
//! Invariants: The identity's authorization header replaces any caller-supplied one.
//! Invariants: Non-2xx statuses are returned as `Response` values.
#![allow(clippy::result_large_err)]

use super::identity::resolve_identity;
use crate::core::credential::{Credential, ResolvedIdentity};
use crate::core::error::ApiResult;
use crate::core::request::{LogicalRequest, Response};
use crate::core::transport::Transport;

pub const DEFAULT_FABRIC: &str = "_system";
pub const FABRIC_MARKER: &str = "/_fabric/";

const AUTHORIZATION_HEADER: &str = "Authorization";

#[derive(Clone, Debug)]
pub struct Connection {
    base_url: String,
    fabric: String,
    url_prefix: String,
    identity: ResolvedIdentity,
    transport: Transport,
}

impl Connection {
    /// Resolves `credential` and returns a ready connection; any failure aborts construction.
    pub fn connect(
        transport: Transport,
        base_url: impl Into<String>,
        fabric: impl Into<String>,
        credential: &Credential,
    ) -> ApiResult<Self> {
        let base_url = base_url.into();
        let fabric = fabric.into();
        let identity = resolve_identity(&transport, &base_url, &fabric, credential)?;
        tracing::info!(
            tenant = identity.tenant(),
            fabric = %fabric,
            scheme = identity.authorization().scheme().as_str(),
            "connection established"
        );
        Ok(Self::with_identity(transport, base_url, fabric, identity))
    }

    /// Builds a connection around an already resolved identity (no network call).
    pub fn with_identity(
        transport: Transport,
        base_url: impl Into<String>,
        fabric: impl Into<String>,
        identity: ResolvedIdentity,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let fabric = fabric.into();
        let url_prefix = url_prefix(&base_url, &fabric);
        Self {
            base_url,
            fabric,
            url_prefix,
            identity,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fabric(&self) -> &str {
        &self.fabric
    }

    pub fn tenant(&self) -> &str {
        self.identity.tenant()
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn identity(&self) -> &ResolvedIdentity {
        &self.identity
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Switches the fabric used by subsequent calls; identity is untouched.
    pub fn set_fabric(&mut self, fabric: impl Into<String>) {
        self.fabric = fabric.into();
        self.url_prefix = url_prefix(&self.base_url, &self.fabric);
        tracing::debug!(fabric = %self.fabric, "fabric switched");
    }

    /// An independent copy of this connection scoped to `fabric`.
    pub fn with_fabric(&self, fabric: impl Into<String>) -> Self {
        let mut scoped = self.clone();
        scoped.set_fabric(fabric);
        scoped
    }

    pub fn resolve_url(&self, path: &str) -> String {
        if path.starts_with(FABRIC_MARKER) {
            let root = self
                .url_prefix
                .find(FABRIC_MARKER)
                .map_or(self.base_url.as_str(), |idx| &self.url_prefix[..idx]);
            format!("{root}{path}")
        } else {
            format!("{}{path}", self.url_prefix)
        }
    }

    pub fn send(&self, request: &LogicalRequest) -> ApiResult<Response> {
        let url = self.resolve_url(&request.path);
        let mut headers = request.headers.clone();
        headers.retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION_HEADER));
        headers.insert(
            AUTHORIZATION_HEADER.to_string(),
            self.identity.header_value(),
        );
        self.transport.send(
            request.method,
            &url,
            &request.params,
            request.body.as_deref(),
            &headers,
        )
    }

    /// Dispatches and interprets the status: 2xx decodes to JSON, anything else is an error.
    pub fn call(&self, request: &LogicalRequest) -> ApiResult<serde_json::Value> {
        self.send(request)?.into_result()
    }
}

fn url_prefix(base_url: &str, fabric: &str) -> String {
    format!("{base_url}/_fabric/{fabric}/_api")
}
