//! Purpose: In-process mock of the platform's HTTP API for integration tests.
//! Exports: `MockPlatform`, `Recorded`, credential constants.
//! Role: Answers auth, whoami and a handful of domain routes; records every request.
//! Invariants: Loopback-only; the listener is bound before the server thread starts.
//! Invariants: Any route other than `/_open/auth` requires a known authorization header.
#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method as HttpMethod, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

pub const TENANT: &str = "acme";
pub const EMAIL: &str = "ops@acme.io";
pub const PASSWORD: &str = "secret";
pub const JWT: &str = "jwt-acme";
pub const TOKEN: &str = "tok-acme";
pub const API_KEY: &str = "acme.key";
/// Login succeeds but the response omits `tenant`.
pub const EMAIL_NO_TENANT: &str = "no-tenant@acme.io";
/// Login succeeds but the response omits `jwt`.
pub const EMAIL_NO_JWT: &str = "no-jwt@acme.io";

#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: String,
}

#[derive(Default)]
struct MockState {
    requests: Mutex<Vec<Recorded>>,
}

pub struct MockPlatform {
    pub port: u16,
    state: Arc<MockState>,
}

impl MockPlatform {
    pub fn start() -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.set_nonblocking(true).expect("nonblocking");
        let port = listener.local_addr().expect("addr").port();
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&state));

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("listener");
                axum::serve(listener, app).await.expect("serve");
            });
        });

        Self { port, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().expect("lock").clone()
    }

    pub fn clear(&self) {
        self.state.requests.lock().expect("lock").clear();
    }
}

/// Returns a port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    port
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.requests.lock().expect("lock").push(Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: authorization.clone(),
        body: body.clone(),
    });

    if method == HttpMethod::POST && uri.path() == "/_open/auth" {
        return login(&body);
    }

    let known = [
        format!("Bearer {JWT}"),
        format!("Bearer {TOKEN}"),
        format!("apikey {API_KEY}"),
    ];
    if !authorization.is_some_and(|value| known.contains(&value)) {
        return error(StatusCode::UNAUTHORIZED, 11, "not authorized");
    }

    let segments: Vec<&str> = uri.path().trim_start_matches('/').split('/').collect();
    let route = match segments.as_slice() {
        ["_fabric", fabric, "_api", rest @ ..] => Some((*fabric, rest)),
        ["_tenant", _, "_fabric", fabric, "_api", rest @ ..] => Some((*fabric, rest)),
        _ => None,
    };
    let Some((fabric, rest)) = route else {
        return error(StatusCode::NOT_FOUND, 404, "unknown path");
    };

    match (method.as_str(), rest) {
        ("GET", ["user"]) => ok(json!({
            "error": false,
            "code": 200,
            "result": [{"tenant": TENANT, "user": "root", "active": true}]
        })),
        ("GET", ["database"]) if fabric == "_system" => {
            ok(json!({"error": false, "code": 200, "result": ["_system", "geo"]}))
        }
        ("GET", ["database", "current"]) => ok(json!({
            "error": false,
            "code": 200,
            "result": {"name": fabric, "isSystem": fabric == "_system"}
        })),
        ("GET", ["collection"]) => ok(json!({
            "error": false,
            "code": 200,
            "result": [{"name": "users", "type": 2}, {"name": format!("{fabric}-only"), "type": 2}]
        })),
        ("GET", ["collection", "users"]) => ok(json!({"name": "users", "type": 2})),
        ("GET", ["collection", "users", "count"]) => ok(json!({"name": "users", "count": 42})),
        ("GET", ["collection", _]) => error(
            StatusCode::NOT_FOUND,
            1203,
            "collection or view not found",
        ),
        ("POST", ["cursor"]) => ok(json!({
            "result": [{"n": 1}, {"n": 2}],
            "hasMore": true,
            "id": "c1"
        })),
        ("PUT", ["cursor", "c1"]) => ok(json!({"result": [{"n": 3}], "hasMore": false})),
        ("GET", ["kv", "cache", "value", "k1"]) => ok(json!({"_key": "k1", "value": "v1"})),
        ("GET", ["kv", "cache", "value", _]) => {
            error(StatusCode::NOT_FOUND, 1202, "document not found")
        }
        _ => error(StatusCode::NOT_FOUND, 404, "unknown path"),
    }
}

fn login(body: &str) -> Response {
    let payload: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let email = payload["email"].as_str().unwrap_or_default();
    let password = payload["password"].as_str().unwrap_or_default();
    if password != PASSWORD {
        return error(StatusCode::UNAUTHORIZED, 401, "invalid credentials");
    }
    match email {
        EMAIL_NO_TENANT => ok(json!({"jwt": JWT})),
        EMAIL_NO_JWT => ok(json!({"tenant": TENANT})),
        _ => ok(json!({"tenant": TENANT, "jwt": JWT})),
    }
}

fn ok(value: Value) -> Response {
    json_response(StatusCode::OK, value)
}

fn error(status: StatusCode, error_num: u32, message: &str) -> Response {
    json_response(
        status,
        json!({
            "error": true,
            "code": status.as_u16(),
            "errorNum": error_num,
            "errorMessage": message
        }),
    )
}

fn json_response(status: StatusCode, value: Value) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Body::from(value.to_string()),
    )
        .into_response()
}
