//! Purpose: Outward-facing client: configuration, eager connection, tenant/fabric scoping.
//! Exports: `ClientConfig`, `Client`, `TenantScope`.
//! Role: Owns the endpoint and transport; hands out borrowed domain wrappers.
//! Invariants: A supplied credential is resolved in `Client::new`; failure means no client.
//! Invariants: At most one cached connection; scoped connections are independent copies.
#![allow(clippy::result_large_err)]

use super::collections::{Collections, Documents};
use super::connection::{Connection, DEFAULT_FABRIC};
use super::fabrics::Fabrics;
use super::kv::KeyValue;
use super::query::Query;
use super::streams::Streams;
use crate::core::credential::{Authorization, Credential, ResolvedIdentity};
use crate::core::endpoint::{Endpoint, HTTPS_PORT, Protocol};
use crate::core::error::{ApiResult, Error, ErrorKind};
use crate::core::retry::RetryPolicy;
use crate::core::transport::{DEFAULT_TIMEOUT, HttpSend, Transport, UreqSender};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    protocol: Protocol,
    host: String,
    port: u16,
    fabric: String,
    stream_port: Option<u16>,
    credential: Option<Credential>,
    retry: RetryPolicy,
    timeout: Duration,
    tls_ca_file: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::Https,
            host: host.into(),
            port: HTTPS_PORT,
            fabric: DEFAULT_FABRIC.to_string(),
            stream_port: None,
            credential: None,
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            tls_ca_file: None,
        }
    }

    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Ignored for `https`, which always uses 443.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn fabric(mut self, fabric: impl Into<String>) -> Self {
        self.fabric = fabric.into();
        self
    }

    pub fn stream_port(mut self, port: u16) -> Self {
        self.stream_port = Some(port);
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tls_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls_ca_file = Some(path.into());
        self
    }
}

#[derive(Debug)]
pub struct Client {
    endpoint: Endpoint,
    fabric: String,
    transport: Transport,
    connection: Option<Connection>,
}

impl Client {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let sender: Arc<dyn HttpSend> = match &config.tls_ca_file {
            Some(path) => Arc::new(UreqSender::with_ca_file(config.timeout, path)?),
            None => Arc::new(UreqSender::new(config.timeout)),
        };
        let transport = Transport::with_sender(sender, config.retry);
        Self::with_transport(config, transport)
    }

    /// Like [`Client::new`], sending through a caller-built transport.
    pub fn with_transport(config: ClientConfig, transport: Transport) -> ApiResult<Self> {
        let endpoint = Endpoint::new(
            config.protocol,
            &config.host,
            config.port,
            config.stream_port,
        )?;
        let mut client = Self {
            endpoint,
            fabric: config.fabric,
            transport,
            connection: None,
        };
        if let Some(credential) = &config.credential {
            client.login(credential)?;
        }
        Ok(client)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Resolves `credential` and caches the resulting connection, replacing any previous one.
    pub fn login(&mut self, credential: &Credential) -> ApiResult<&Connection> {
        let connection = Connection::connect(
            self.transport.clone(),
            self.endpoint.base_url(),
            self.fabric.clone(),
            credential,
        )?;
        Ok(self.connection.insert(connection))
    }

    pub fn connection(&self) -> ApiResult<&Connection> {
        self.connection.as_ref().ok_or_else(not_connected)
    }

    pub fn use_fabric(&mut self, fabric: impl Into<String>) -> ApiResult<()> {
        let fabric = fabric.into();
        let connection = self.connection.as_mut().ok_or_else(not_connected)?;
        connection.set_fabric(fabric.clone());
        self.fabric = fabric;
        Ok(())
    }

    /// First step of the tenant/fabric handshake; reuses the cached authorization.
    pub fn tenant(&self, tenant: impl Into<String>) -> ApiResult<TenantScope<'_>> {
        let connection = self.connection()?;
        let tenant = tenant.into();
        if tenant.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message("tenant name is empty"));
        }
        Ok(TenantScope {
            client: self,
            own_tenant: tenant == connection.tenant(),
            tenant,
            authorization: connection.identity().authorization().clone(),
        })
    }

    pub fn fabrics(&self) -> ApiResult<Fabrics<'_>> {
        Ok(self.connection()?.fabrics())
    }

    pub fn collections(&self) -> ApiResult<Collections<'_>> {
        Ok(self.connection()?.collections())
    }

    pub fn documents(&self, collection: impl Into<String>) -> ApiResult<Documents<'_>> {
        Ok(self.connection()?.documents(collection))
    }

    pub fn query(&self) -> ApiResult<Query<'_>> {
        Ok(self.connection()?.query())
    }

    pub fn key_value(&self) -> ApiResult<KeyValue<'_>> {
        Ok(self.connection()?.key_value())
    }

    pub fn streams(&self) -> ApiResult<Streams<'_>> {
        Ok(self
            .connection()?
            .streams(self.endpoint.stream_base_url()))
    }
}

/// A tenant chosen for a new connection; finish with [`TenantScope::use_fabric`].
pub struct TenantScope<'a> {
    client: &'a Client,
    tenant: String,
    own_tenant: bool,
    authorization: Authorization,
}

impl TenantScope<'_> {
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Opens an independent connection; the client's cached one is unchanged.
    pub fn use_fabric(&self, fabric: impl Into<String>) -> Connection {
        let base_url = if self.own_tenant {
            self.client.endpoint.base_url()
        } else {
            format!("{}/_tenant/{}", self.client.endpoint.base_url(), self.tenant)
        };
        Connection::with_identity(
            self.client.transport.clone(),
            base_url,
            fabric,
            ResolvedIdentity::new(self.tenant.clone(), self.authorization.clone()),
        )
    }
}

fn not_connected() -> Error {
    Error::new(ErrorKind::Usage)
        .with_message("client has no connection")
        .with_hint("Supply a credential in ClientConfig or call Client::login.")
}

#[cfg(test)]
mod tests {
    use super::{Client, ClientConfig};
    use crate::core::credential::Credential;
    use crate::core::endpoint::Protocol;
    use crate::core::error::{Error, ErrorKind};
    use crate::core::request::Response;
    use crate::core::retry::{Failure, RetryPolicy};
    use crate::core::transport::{HttpSend, OutboundRequest, Transport};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct ApiKeyPlatform {
        calls: AtomicU32,
    }

    impl HttpSend for ApiKeyPlatform {
        fn send_once(&self, request: &OutboundRequest) -> Result<Response, Failure<Error>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let authorized = request.headers.get("Authorization").map(String::as_str)
                == Some("apikey good");
            let (status_code, body) = if authorized {
                (200, r#"{"result":[{"tenant":"acme"}]}"#)
            } else {
                (401, r#"{"error":true,"code":401}"#)
            };
            Ok(Response {
                method: request.method,
                url: request.url.clone(),
                headers: BTreeMap::new(),
                status_code,
                status_text: String::new(),
                body: body.to_string(),
            })
        }
    }

    fn transport() -> (Transport, Arc<ApiKeyPlatform>) {
        let platform = Arc::new(ApiKeyPlatform {
            calls: AtomicU32::new(0),
        });
        (
            Transport::with_sender(platform.clone(), RetryPolicy::default()),
            platform,
        )
    }

    fn config() -> ClientConfig {
        ClientConfig::new("demo.example.com")
            .protocol(Protocol::Http)
            .port(8529)
    }

    #[test]
    fn credential_connects_eagerly() {
        let (transport, platform) = transport();
        let client = Client::with_transport(
            config().credential(Credential::api_key("good")),
            transport,
        )
        .expect("client");
        assert_eq!(platform.calls.load(Ordering::SeqCst), 1);
        let conn = client.connection().expect("connection");
        assert_eq!(conn.tenant(), "acme");
        assert_eq!(conn.url_prefix(), "http://api-demo.example.com:8529/_fabric/_system/_api");
    }

    #[test]
    fn failed_resolution_yields_no_client() {
        let (transport, _) = transport();
        let err = Client::with_transport(config().credential(Credential::api_key("bad")), transport)
            .expect_err("err");
        assert_eq!(err.kind(), ErrorKind::IdentityResolutionFailed);
    }

    #[test]
    fn no_credential_means_no_connection() {
        let (transport, platform) = transport();
        let mut client = Client::with_transport(config(), transport).expect("client");
        assert_eq!(platform.calls.load(Ordering::SeqCst), 0);
        assert_eq!(client.connection().expect_err("err").kind(), ErrorKind::Usage);
        assert_eq!(client.use_fabric("geo").expect_err("err").kind(), ErrorKind::Usage);

        client.login(&Credential::api_key("good")).expect("login");
        client.use_fabric("geo").expect("switch");
        assert_eq!(client.connection().expect("connection").fabric(), "geo");
    }

    #[test]
    fn tenant_scope_opens_independent_connection() {
        let (transport, platform) = transport();
        let client = Client::with_transport(
            config().credential(Credential::api_key("good")),
            transport,
        )
        .expect("client");

        let own = client.tenant("acme").expect("scope").use_fabric("eu");
        assert_eq!(own.url_prefix(), "http://api-demo.example.com:8529/_fabric/eu/_api");
        assert_eq!(own.identity().header_value(), "apikey good");

        let other = client.tenant("globex").expect("scope").use_fabric("us");
        assert_eq!(other.tenant(), "globex");
        assert_eq!(
            other.url_prefix(),
            "http://api-demo.example.com:8529/_tenant/globex/_fabric/us/_api"
        );
        assert_eq!(
            other.resolve_url("/_fabric/_system/_api/database"),
            "http://api-demo.example.com:8529/_tenant/globex/_fabric/_system/_api/database"
        );

        assert_eq!(client.connection().expect("connection").fabric(), "_system");
        assert_eq!(platform.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn https_endpoint_ignores_requested_port() {
        let (transport, _) = transport();
        let client = Client::with_transport(
            ClientConfig::new("demo.example.com").port(8529),
            transport,
        )
        .expect("client");
        assert_eq!(client.endpoint().base_url(), "https://api-demo.example.com:443");
    }
}
