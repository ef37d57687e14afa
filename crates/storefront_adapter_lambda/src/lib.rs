//! Lambda-facing side of the storefront API function.
//!
//! This crate owns runtime integration details (environment configuration,
//! log setup, and the storefront route table served behind the invocation
//! adapter). Protocol translation and single-settlement guarantees live in
//! `storefront_adapter_core`.

pub mod config;
pub mod handlers;
pub mod routes;
pub mod telemetry;
