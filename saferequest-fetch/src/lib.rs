// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `SafeRequest` Fetch
//!
//! Request engines and the failover orchestrator.
//!
//! A logical request is tried against a chain of transport strategies
//! until one succeeds. Cookies, headers and proxies live in one
//! [`RequestConfig`] that carries across attempts and across calls.
//!
//! ## Engines
//!
//! The [`engines`] module provides the transports:
//!
//! - [`engines::direct`] - reqwest async client
//! - [`engines::blocking`] - reqwest blocking client on the blocking pool
//! - [`engines::scraper`] - anti-bot interstitial handling
//! - [`engines::browser`] - headless Chromium, plain and stealth
//!
//! ## Orchestration
//!
//! - [`engine::RequestEngine`] - Trait every transport implements
//! - [`config::RequestConfig`] - Session state and fluent setters
//! - [`orchestrator::SafeRequest`] - Runs a request through the chain
//! - [`settings::FetchSettings`] - JSON settings file
//!
//! ## Example
//!
//! ```ignore
//! use saferequest_fetch::{EngineKind, FetchRequest, RequestConfig, SafeRequest};
//!
//! let mut session = SafeRequest::with_config(
//!     RequestConfig::new()
//!         .chain_kinds(&[EngineKind::DirectAsync, EngineKind::StealthHeadlessBrowser])
//!         .proxies_csv("http://10.0.0.1:3128,http://10.0.0.2:3128"),
//! );
//!
//! let envelope = session.execute(FetchRequest::get("https://bus.example.com")).await?;
//! if envelope.has_succeeded() {
//!     println!("{}", envelope.body().unwrap_or_default());
//! }
//! ```

// Core modules
pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod orchestrator;
pub mod settings;
pub mod user_agent;

// Errors
pub use error::{FetchError, TransportError};

// Engines
pub use engine::{EngineKind, EngineRequest, RequestEngine};
pub use engines::{
    AntiBotScraperClient, DirectAsyncClient, HeadlessBrowserClient, StealthHeadlessBrowserClient,
    ThreadPoolSyncClient,
};

// Configuration & Orchestration
pub use config::RequestConfig;
pub use orchestrator::{
    DEFAULT_MAX_TRIES, ErrorLog, FetchAttempt, FetchOutcome, FetchRequest, PostTryHook,
    SafeRequest,
};
pub use settings::FetchSettings;
pub use user_agent::{Platform, UserAgentGenerator};

// Re-export core types callers need alongside the orchestrator
pub use saferequest_core::{CookieJar, ProxyPool, RequestMethod, ResponseEnvelope};
