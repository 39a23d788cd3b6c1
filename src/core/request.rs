//! Purpose: Value types for one API call: the logical request and the normalized response.
//! Exports: `Method`, `LogicalRequest`, `Response`.
//! Role: Built by domain wrappers, consumed once by the dispatcher, then discarded.
//! Invariants: `Response` carries raw body text; JSON decoding is opt-in via helpers.
//! Invariants: Header names in `Response` are lowercase.
use crate::core::error::{ApiResult, Error, ErrorKind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }

    pub fn parse(value: &str) -> ApiResult<Self> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            _ => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unsupported http method: {value}"))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Method, path and payload of one call, before the connection scopes it.
#[derive(Clone, Debug, PartialEq)]
pub struct LogicalRequest {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl LogicalRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> ApiResult<Self> {
        let payload = serde_json::to_string(body).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode request json")
                .with_source(err)
        })?;
        self.body = Some(payload);
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub status_code: u16,
    pub status_text: String,
    pub body: String,
}

/// Error envelope the platform returns with non-2xx statuses.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope {
    error_message: Option<String>,
    error_num: Option<i64>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn json<R: DeserializeOwned>(&self) -> ApiResult<R> {
        serde_json::from_str(&self.body).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("invalid response json")
                .with_url(self.url.clone())
                .with_status(self.status_code)
                .with_source(err)
        })
    }

    /// Decodes a 2xx body (empty body is `Null`); any other status becomes an error.
    pub fn into_result(self) -> ApiResult<Value> {
        if !self.is_success() {
            return Err(self.into_error());
        }
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        self.json()
    }

    pub fn into_error(self) -> Error {
        let kind = error_kind_from_status(self.status_code);
        let message = match serde_json::from_str::<ErrorEnvelope>(&self.body) {
            Ok(ErrorEnvelope {
                error_message: Some(message),
                error_num: Some(num),
            }) => format!("{message} (errorNum {num})"),
            Ok(ErrorEnvelope {
                error_message: Some(message),
                ..
            }) => message,
            _ if self.body.trim().is_empty() => {
                format!("remote error status {} {}", self.status_code, self.status_text)
            }
            _ => self.body.clone(),
        };
        Error::new(kind)
            .with_message(message)
            .with_url(self.url)
            .with_status(self.status_code)
    }
}

fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 413 => ErrorKind::Usage,
        401 | 403 => ErrorKind::Permission,
        404 => ErrorKind::NotFound,
        409 => ErrorKind::AlreadyExists,
        _ => ErrorKind::Remote,
    }
}

#[cfg(test)]
mod tests {
    use super::{LogicalRequest, Method, Response};
    use crate::core::error::ErrorKind;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn response(status_code: u16, body: &str) -> Response {
        Response {
            method: Method::Get,
            url: "http://localhost:8529/_fabric/_system/_api/collection/missing".to_string(),
            headers: BTreeMap::from([("content-type".to_string(), "application/json".to_string())]),
            status_code,
            status_text: "Not Found".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn with_json_sets_body_and_content_type() {
        let request = LogicalRequest::post("/collection")
            .with_json(&json!({"name": "users"}))
            .expect("json");
        assert_eq!(request.body.as_deref(), Some(r#"{"name":"users"}"#));
        assert_eq!(
            request.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(Method::parse("patch").expect("method"), Method::Patch);
        let err = Method::parse("TRACE").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let resp = response(200, "{}");
        assert_eq!(resp.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn into_result_uses_platform_error_message() {
        let body = r#"{"error":true,"code":404,"errorNum":1203,"errorMessage":"collection or view not found"}"#;
        let err = response(404, body).into_result().expect_err("err");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status(), Some(404));
        assert_eq!(
            err.message(),
            Some("collection or view not found (errorNum 1203)")
        );
    }

    #[test]
    fn into_result_maps_statuses() {
        assert_eq!(response(409, "").into_result().expect_err("err").kind(), ErrorKind::AlreadyExists);
        assert_eq!(response(401, "").into_result().expect_err("err").kind(), ErrorKind::Permission);
        assert_eq!(response(503, "busy").into_result().expect_err("err").kind(), ErrorKind::Remote);
    }

    #[test]
    fn into_result_treats_empty_success_as_null() {
        let value = response(204, "").into_result().expect("ok");
        assert!(value.is_null());
    }
}
