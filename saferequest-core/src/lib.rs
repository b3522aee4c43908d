// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `SafeRequest` Core
//!
//! Value types shared by every `SafeRequest` crate.
//!
//! Nothing in here performs I/O. The fetch engines produce these types and
//! the consuming domain layer reads them.
//!
//! ## Key Types
//!
//! - [`ResponseEnvelope`] - Uniform result of one fetch, whatever transport produced it
//! - [`CookieJar`] - Cookie state carried across attempts and calls
//! - [`ProxyPool`] - Proxy addresses drawn from per attempt
//! - [`RequestMethod`] - HTTP verbs supported at the boundary

pub mod error;
pub mod models;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    CookieJar, DEFAULT_STATUS_CODE, MAX_SUCCESS_STATUS, ProxyPool, RequestMethod, ResponseEnvelope,
};
