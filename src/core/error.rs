//! Purpose: Structured error type shared by the transport, resolver, dispatcher and CLI.
//! Exports: `Error`, `ErrorKind`, `ApiResult`, `to_exit_code`.
//! Role: One error shape for every layer; context is attached with `with_*` builders.
//! Invariants: Kinds are stable; exit codes never change once assigned.
//! Invariants: Credentials never appear in messages (callers pass URLs, not headers).
use std::error::Error as StdError;
use std::fmt;

pub type ApiResult<T> = Result<T, Error>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    Io,
    Timeout,
    TransportUnavailable,
    AuthenticationFailed,
    TenantNotFound,
    TokenNotFound,
    IdentityResolutionFailed,
    NotFound,
    Permission,
    AlreadyExists,
    Remote,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    url: Option<String>,
    status: Option<u16>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            url: None,
            status: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(url) = &self.url {
            write!(f, " (url: {url})")?;
        }
        if let Some(status) = self.status {
            write!(f, " (status: {status})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::AlreadyExists => 4,
        ErrorKind::Permission => 6,
        ErrorKind::Io => 8,
        ErrorKind::Timeout => 9,
        ErrorKind::TransportUnavailable => 10,
        ErrorKind::AuthenticationFailed => 11,
        ErrorKind::TenantNotFound => 12,
        ErrorKind::TokenNotFound => 13,
        ErrorKind::IdentityResolutionFailed => 14,
        ErrorKind::Remote => 15,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_exit_code};

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::NotFound, 3),
            (ErrorKind::AlreadyExists, 4),
            (ErrorKind::Permission, 6),
            (ErrorKind::Io, 8),
            (ErrorKind::Timeout, 9),
            (ErrorKind::TransportUnavailable, 10),
            (ErrorKind::AuthenticationFailed, 11),
            (ErrorKind::TenantNotFound, 12),
            (ErrorKind::TokenNotFound, 13),
            (ErrorKind::IdentityResolutionFailed, 14),
            (ErrorKind::Remote, 15),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn display_includes_url_and_status() {
        let err = Error::new(ErrorKind::NotFound)
            .with_message("collection not found")
            .with_url("https://api-x.example.com:443/_fabric/_system/_api/collection/c")
            .with_status(404);
        assert_eq!(
            err.to_string(),
            "NotFound: collection not found \
             (url: https://api-x.example.com:443/_fabric/_system/_api/collection/c) (status: 404)"
        );
    }
}
