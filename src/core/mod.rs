// Core modules: wire-level request/response values, transport with retry, credentials, errors.
pub mod credential;
pub mod endpoint;
pub mod error;
pub mod request;
pub mod retry;
pub mod transport;
