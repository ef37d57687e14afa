//! Invocation adapter primitives for the storefront API function.
//!
//! This crate turns one serverless invocation event into the request/response
//! object model a middleware chain expects, and guarantees exactly one
//! settlement per invocation. It intentionally excludes Lambda runtime
//! concerns; see `crates/storefront_adapter_lambda` for the deployment binding.

pub mod adapter;
pub mod arbiter;
pub mod chain;
pub mod contract;
pub mod error;
pub mod normalize;
pub mod response;

pub use adapter::{handle_invocation, AdapterConfig};
pub use arbiter::{CompletionArbiter, Settlement, SettlementSource};
pub use chain::{chain_fn, BoxError, ChainFn, ErrorContinuation, MiddlewareChain};
pub use contract::{CanonicalRequest, InvocationEvent, SettlementResult};
pub use error::AdapterError;
pub use response::{ResponseEmulator, SendPayload};
