//! Purpose: Blocking client library for a multi-tenant, geo-distributed data platform.
//! Exports: `api` (client facade, connection, wrappers) and `core` (transport, credentials, errors).
//! Role: Backs the `fabric` CLI; `api` is the supported entry point for callers.
//! Invariants: Every request is scoped to a resolved tenant identity and a fabric.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
