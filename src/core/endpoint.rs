//! Purpose: Immutable endpoint configuration and base-URL derivation.
//! Exports: `Protocol`, `Endpoint`, `API_HOST_PREFIX`, `HTTPS_PORT`.
//! Role: Normalizes caller-supplied host/port once, at client creation.
//! Invariants: `https` always uses port 443 regardless of the requested port.
//! Invariants: DNS hosts always carry the `api-` subdomain prefix.
//! Invariants: IP literals and `localhost` are never prefixed.
use crate::core::error::{ApiResult, Error, ErrorKind};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use url::Url;

pub const API_HOST_PREFIX: &str = "api-";
pub const HTTPS_PORT: u16 = 443;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    fn websocket_scheme(self) -> &'static str {
        match self {
            Protocol::Http => "ws",
            Protocol::Https => "wss",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            _ => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unsupported transfer protocol: {value}"))
                .with_hint("Use http or https.")),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Endpoint {
    protocol: Protocol,
    host: String,
    port: u16,
    stream_port: Option<u16>,
}

impl Endpoint {
    pub fn new(
        protocol: Protocol,
        host: &str,
        port: u16,
        stream_port: Option<u16>,
    ) -> ApiResult<Self> {
        let host = normalize_host(host)?;
        let port = match protocol {
            Protocol::Https => HTTPS_PORT,
            Protocol::Http => port,
        };
        let endpoint = Self {
            protocol,
            host,
            port,
            stream_port,
        };
        Url::parse(&endpoint.base_url()).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid endpoint url")
                .with_url(endpoint.base_url())
                .with_source(err)
        })?;
        Ok(endpoint)
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Port of the streaming endpoint; the API port unless overridden.
    pub fn stream_port(&self) -> u16 {
        self.stream_port.unwrap_or(self.port)
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    pub fn stream_base_url(&self) -> String {
        format!(
            "{}://{}:{}",
            self.protocol.websocket_scheme(),
            self.host,
            self.stream_port()
        )
    }
}

fn normalize_host(raw: &str) -> ApiResult<String> {
    let trimmed = raw.trim();
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed)
        .trim_end_matches('/');
    if host.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("endpoint host is empty"));
    }
    if host.contains(['/', ':', '?', '#', ' ']) {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("endpoint host must be a bare host name: {raw}"))
            .with_hint("Pass the port and protocol separately."));
    }
    if host
        .get(..API_HOST_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(API_HOST_PREFIX))
        || host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().is_ok()
    {
        return Ok(host.to_string());
    }
    Ok(format!("{API_HOST_PREFIX}{host}"))
}
