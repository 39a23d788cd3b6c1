//! Purpose: Credential variants and the authorization header they produce.
//! Exports: `Credential`, `AuthScheme`, `Authorization`, `ResolvedIdentity`.
//! Role: Type-level "exactly one credential"; single source of header formatting.
//! Invariants: `Authorization::header_value` is the only place a scheme is rendered.
//! Invariants: Secrets are redacted from `Debug` output.
use crate::core::error::{ApiResult, Error, ErrorKind};
use std::fmt;

#[derive(Clone, Eq, PartialEq)]
pub enum Credential {
    Password { email: String, password: String },
    Token(String),
    ApiKey(String),
}

impl Credential {
    pub fn password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(token.into())
    }

    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey(key.into())
    }

    /// Builds a credential from independently optional configuration fields.
    ///
    /// Empty strings count as absent. More than one credential, or half of an
    /// email/password pair, is a usage error; nothing at all is `Ok(None)`.
    pub fn from_parts(
        email: Option<&str>,
        password: Option<&str>,
        token: Option<&str>,
        api_key: Option<&str>,
    ) -> ApiResult<Option<Self>> {
        fn present(value: Option<&str>) -> Option<&str> {
            value.filter(|value| !value.is_empty())
        }

        let email = present(email);
        let password = present(password);
        let token = present(token);
        let api_key = present(api_key);

        let pair = match (email, password) {
            (Some(email), Some(password)) => Some(Self::password(email, password)),
            (None, None) => None,
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("email and password must be supplied together"));
            }
        };

        let mut supplied = [pair, token.map(Self::token), api_key.map(Self::api_key)]
            .into_iter()
            .flatten();
        let first = supplied.next();
        if supplied.next().is_some() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("more than one credential supplied")
                .with_hint("Use exactly one of email/password, token, or api key."));
        }
        Ok(first)
    }

    pub fn scheme(&self) -> AuthScheme {
        match self {
            Credential::Password { .. } | Credential::Token(_) => AuthScheme::Bearer,
            Credential::ApiKey(_) => AuthScheme::ApiKey,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .field("password", &"<redacted>")
                .finish(),
            Credential::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
            Credential::ApiKey(_) => f.debug_tuple("ApiKey").field(&"<redacted>").finish(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthScheme {
    Bearer,
    ApiKey,
}

impl AuthScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthScheme::Bearer => "Bearer",
            AuthScheme::ApiKey => "apikey",
        }
    }
}

#[derive(Clone, Eq, PartialEq)]
pub struct Authorization {
    scheme: AuthScheme,
    value: String,
}

impl Authorization {
    pub fn new(scheme: AuthScheme, value: impl Into<String>) -> Self {
        Self {
            scheme,
            value: value.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new(AuthScheme::Bearer, token)
    }

    pub fn api_key(key: impl Into<String>) -> Self {
        Self::new(AuthScheme::ApiKey, key)
    }

    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    pub fn header_value(&self) -> String {
        format!("{} {}", self.scheme.as_str(), self.value)
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorization")
            .field("scheme", &self.scheme)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Tenant plus authorization, fixed for the lifetime of a connection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedIdentity {
    tenant: String,
    authorization: Authorization,
}

impl ResolvedIdentity {
    pub fn new(tenant: impl Into<String>, authorization: Authorization) -> Self {
        Self {
            tenant: tenant.into(),
            authorization,
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn authorization(&self) -> &Authorization {
        &self.authorization
    }

    pub fn header_value(&self) -> String {
        self.authorization.header_value()
    }
}
