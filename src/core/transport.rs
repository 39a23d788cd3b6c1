//! Purpose: Execute one outbound HTTP request with bounded retry on connection failure.
//! Exports: `Transport`, `HttpSend`, `UreqSender`, `OutboundRequest`, `DEFAULT_TIMEOUT`.
//! Role: Lowest layer of the client; normalizes every reply into `Response`.
//! Invariants: Every request carries `Connection: keep-alive`, replacing caller values.
//! Invariants: Only connection failures (refused/reset/dns) are retried.
//! Invariants: HTTP error statuses are responses, not errors.
//! Invariants: Clones share one agent, hence one connection pool.
#![allow(clippy::result_large_err)]

use crate::core::error::{ApiResult, Error, ErrorKind};
use crate::core::request::{Method, Response};
use crate::core::retry::{Failure, RetryError, RetryPolicy, retry_with};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::io::{self, Cursor};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(260);

const KEEP_ALIVE_HEADER: &str = "Connection";
const KEEP_ALIVE_VALUE: &str = "keep-alive";

/// A fully addressed request, ready for the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub body: Option<String>,
    pub headers: BTreeMap<String, String>,
}

/// Performs a single attempt. Connection failures are `Failure::Transient`.
pub trait HttpSend: Send + Sync {
    fn send_once(&self, request: &OutboundRequest) -> Result<Response, Failure<Error>>;
}

type SleepFn = Arc<dyn Fn(Duration) + Send + Sync>;

#[derive(Clone)]
pub struct Transport {
    sender: Arc<dyn HttpSend>,
    policy: RetryPolicy,
    sleep: SleepFn,
}

impl Transport {
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Self {
        Self::with_sender(Arc::new(UreqSender::new(timeout)), policy)
    }

    pub fn with_sender(sender: Arc<dyn HttpSend>, policy: RetryPolicy) -> Self {
        Self {
            sender,
            policy,
            sleep: Arc::new(std::thread::sleep),
        }
    }

    /// Replaces the inter-attempt sleep (tests record delays instead of waiting).
    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleep = Arc::new(sleep);
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn send(
        &self,
        method: Method,
        url: &str,
        params: &[(String, String)],
        body: Option<&str>,
        headers: &BTreeMap<String, String>,
    ) -> ApiResult<Response> {
        let request = OutboundRequest {
            method,
            url: url.to_string(),
            params: params.to_vec(),
            body: body.map(str::to_string),
            headers: headers.clone(),
        };
        self.send_request(request)
    }

    pub fn send_request(&self, mut request: OutboundRequest) -> ApiResult<Response> {
        request
            .headers
            .retain(|name, _| !name.eq_ignore_ascii_case(KEEP_ALIVE_HEADER));
        request
            .headers
            .insert(KEEP_ALIVE_HEADER.to_string(), KEEP_ALIVE_VALUE.to_string());

        let sleep = &self.sleep;
        let result = retry_with(
            &self.policy,
            |delay| sleep(delay),
            |attempt| {
                self.sender.send_once(&request).inspect_err(|failure| {
                    if let Failure::Transient(err) = failure {
                        tracing::warn!(
                            attempt,
                            max_attempts = self.policy.attempts(),
                            method = %request.method,
                            url = %request.url,
                            error = %err,
                            "connection failed"
                        );
                    }
                })
            },
        );

        match result {
            Ok(response) => {
                tracing::debug!(
                    method = %request.method,
                    url = %request.url,
                    status = response.status_code,
                    "request completed"
                );
                Ok(response)
            }
            Err(RetryError::Permanent(err)) => Err(err),
            Err(RetryError::Exhausted { attempts, last }) => {
                Err(Error::new(ErrorKind::TransportUnavailable)
                    .with_message(format!("connection failed after {attempts} attempts"))
                    .with_hint("Check the host, port and network reachability.")
                    .with_url(request.url)
                    .with_source(last))
            }
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// `HttpSend` over a pooled `ureq` agent.
pub struct UreqSender {
    agent: ureq::Agent,
}

impl UreqSender {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }

    /// Trusts only the certificates in the PEM bundle at `path`.
    pub fn with_ca_file(timeout: Duration, path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let cert_bytes = std::fs::read(path).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!(
                    "failed to read TLS CA/certificate file {}",
                    path.display()
                ))
                .with_source(err)
        })?;
        let mut cert_reader = Cursor::new(cert_bytes);
        let certs = rustls_pemfile::certs(&mut cert_reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!(
                        "failed to parse TLS CA/certificate file {}",
                        path.display()
                    ))
                    .with_source(err)
            })?;
        if certs.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message(format!(
                "TLS CA/certificate file contains no certificates: {}",
                path.display()
            )));
        }

        let mut root_store = ureq::rustls::RootCertStore::empty();
        let (added, _) = root_store.add_parsable_certificates(certs);
        if added == 0 {
            return Err(Error::new(ErrorKind::Usage).with_message(format!(
                "TLS CA/certificate file contains no parsable certificates: {}",
                path.display()
            )));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .tls_config(Arc::new(tls_config_trusting(root_store)))
            .build();
        Ok(Self { agent })
    }
}

/// Client TLS config over `ring`, the provider ureq's rustls is built with.
fn tls_config_trusting(root_store: ureq::rustls::RootCertStore) -> ureq::rustls::ClientConfig {
    let _ = ureq::rustls::crypto::ring::default_provider().install_default();
    ureq::rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}

impl HttpSend for UreqSender {
    fn send_once(&self, request: &OutboundRequest) -> Result<Response, Failure<Error>> {
        let mut call = self.agent.request(request.method.as_str(), &request.url);
        for (key, value) in &request.params {
            call = call.query(key, value);
        }
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }
        let result = match &request.body {
            Some(body) => call.send_string(body),
            None => call.call(),
        };

        match result {
            Ok(resp) | Err(ureq::Error::Status(_, resp)) => {
                read_response(request.method, resp).map_err(Failure::Permanent)
            }
            Err(ureq::Error::Transport(err)) => Err(classify_transport_error(&request.url, err)),
        }
    }
}

fn read_response(method: Method, response: ureq::Response) -> ApiResult<Response> {
    let headers = response
        .headers_names()
        .into_iter()
        .filter_map(|name| {
            let value = response.header(&name)?.to_string();
            Some((name.to_ascii_lowercase(), value))
        })
        .collect();
    let url = response.get_url().to_string();
    let status_code = response.status();
    let status_text = response.status_text().to_string();
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_url(url.clone())
            .with_status(status_code)
            .with_source(err)
    })?;
    Ok(Response {
        method,
        url,
        headers,
        status_code,
        status_text,
        body,
    })
}

fn classify_transport_error(url: &str, err: ureq::Transport) -> Failure<Error> {
    let io_kind = err
        .source()
        .and_then(|source| source.downcast_ref::<io::Error>())
        .map(io::Error::kind);
    match (err.kind(), io_kind) {
        (_, Some(io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)) => Failure::Permanent(
            Error::new(ErrorKind::Timeout)
                .with_message("request timed out")
                .with_url(url)
                .with_source(err),
        ),
        (ureq::ErrorKind::ConnectionFailed | ureq::ErrorKind::Dns, _)
        | (
            ureq::ErrorKind::Io,
            Some(
                io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe,
            ),
        ) => Failure::Transient(
            Error::new(ErrorKind::Io)
                .with_message("connection failed")
                .with_url(url)
                .with_source(err),
        ),
        _ => Failure::Permanent(
            Error::new(ErrorKind::Io)
                .with_message("request failed")
                .with_url(url)
                .with_source(err),
        ),
    }
}
