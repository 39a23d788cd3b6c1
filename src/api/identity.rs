//! Purpose: Resolve a `Credential` into a `ResolvedIdentity` (tenant + authorization).
//! Exports: `resolve_identity`, `whoami`.
//! Role: Runs exactly once per connection; password flow logs in, token/api-key flows look up.
//! Invariants: Login responses must carry non-empty `tenant` (checked first) and `jwt`.
//! Invariants: No further requests are issued after a failed resolution step.
#![allow(clippy::result_large_err)]

use crate::core::credential::{Authorization, Credential, ResolvedIdentity};
use crate::core::error::{ApiResult, Error, ErrorKind};
use crate::core::request::Method;
use crate::core::transport::Transport;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub(crate) const AUTH_PATH: &str = "/_open/auth";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    tenant: Option<String>,
    jwt: Option<String>,
}

#[derive(Deserialize)]
struct UserEnvelope {
    #[serde(default)]
    result: Vec<Value>,
}

pub fn resolve_identity(
    transport: &Transport,
    base_url: &str,
    fabric: &str,
    credential: &Credential,
) -> ApiResult<ResolvedIdentity> {
    match credential {
        Credential::Password { email, password } => login(transport, base_url, email, password),
        Credential::Token(token) => {
            let authorization = Authorization::bearer(token.as_str());
            let tenant = whoami(transport, base_url, fabric, &authorization)?;
            Ok(ResolvedIdentity::new(tenant, authorization))
        }
        Credential::ApiKey(key) => {
            let authorization = Authorization::api_key(key.as_str());
            let tenant = whoami(transport, base_url, fabric, &authorization)?;
            Ok(ResolvedIdentity::new(tenant, authorization))
        }
    }
}

fn login(
    transport: &Transport,
    base_url: &str,
    email: &str,
    password: &str,
) -> ApiResult<ResolvedIdentity> {
    let url = format!("{base_url}{AUTH_PATH}");
    let payload = serde_json::to_string(&LoginRequest { email, password }).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode login request")
            .with_source(err)
    })?;
    let headers = BTreeMap::from([(
        "Content-Type".to_string(),
        "application/json".to_string(),
    )]);
    let response = transport.send(Method::Post, &url, &[], Some(&payload), &headers)?;
    if response.status_code != 200 {
        return Err(Error::new(ErrorKind::AuthenticationFailed)
            .with_message(response.body)
            .with_url(url)
            .with_status(response.status_code));
    }

    let login: LoginResponse = response.json()?;
    let Some(tenant) = login.tenant.filter(|tenant| !tenant.is_empty()) else {
        return Err(Error::new(ErrorKind::TenantNotFound)
            .with_message("login response did not include a tenant")
            .with_url(url));
    };
    let Some(jwt) = login.jwt.filter(|jwt| !jwt.is_empty()) else {
        return Err(Error::new(ErrorKind::TokenNotFound)
            .with_message("login response did not include a jwt")
            .with_url(url));
    };
    Ok(ResolvedIdentity::new(tenant, Authorization::bearer(jwt)))
}

/// Looks up the tenant owning `authorization` via the fabric's `user` endpoint.
pub fn whoami(
    transport: &Transport,
    base_url: &str,
    fabric: &str,
    authorization: &Authorization,
) -> ApiResult<String> {
    let url = format!("{base_url}/_fabric/{fabric}/_api/user");
    let headers = BTreeMap::from([(
        "Authorization".to_string(),
        authorization.header_value(),
    )]);
    let response = transport.send(Method::Get, &url, &[], None, &headers)?;
    if response.status_code != 200 {
        return Err(Error::new(ErrorKind::IdentityResolutionFailed)
            .with_message(response.body)
            .with_url(url)
            .with_status(response.status_code));
    }

    let envelope: UserEnvelope = serde_json::from_str(&response.body).map_err(|err| {
        Error::new(ErrorKind::IdentityResolutionFailed)
            .with_message("user lookup returned malformed json")
            .with_url(url.clone())
            .with_source(err)
    })?;
    envelope
        .result
        .first()
        .and_then(|user| user.get("tenant"))
        .and_then(Value::as_str)
        .filter(|tenant| !tenant.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::new(ErrorKind::IdentityResolutionFailed)
                .with_message("user lookup did not include a tenant")
                .with_url(url)
        })
}
