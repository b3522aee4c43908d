//! Value models for `SafeRequest`.
//!
//! ## Submodules
//!
//! - [`envelope`] - The response envelope returned by engines and the orchestrator
//! - [`cookies`] - Cookie jar with merge semantics
//! - [`proxy`] - Proxy pool and per-attempt selection
//! - [`method`] - HTTP request methods

mod cookies;
mod envelope;
mod method;
mod proxy;

pub use cookies::CookieJar;
pub use envelope::{DEFAULT_STATUS_CODE, MAX_SUCCESS_STATUS, ResponseEnvelope};
pub use method::RequestMethod;
pub use proxy::ProxyPool;
