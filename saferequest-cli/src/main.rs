// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! SafeRequest CLI - resilient one-shot fetches from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Fetch with the default chain
//! saferequest https://bus.example.com/arrivals
//!
//! # Try the plain client first, then a stealth browser
//! saferequest https://bus.example.com --chain direct,stealth
//!
//! # POST a JSON body through a proxy pool, raising on failure
//! saferequest https://api.example.com/search -X POST -d '{"stop":42}' \
//!     --proxies http://10.0.0.1:3128,http://10.0.0.2:3128 --raise
//!
//! # Full envelope as JSON
//! saferequest https://bus.example.com --format json --pretty
//! ```

mod fetch;
mod output;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use saferequest_core::RequestMethod;
use saferequest_fetch::{EngineKind, FetchSettings, SafeRequest};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use output::{JsonFormatter, TextFormatter};

// ============================================================================
// CLI Definition
// ============================================================================

/// SafeRequest CLI - fetch a URL through a failover chain of engines.
#[derive(Parser)]
#[command(name = "saferequest")]
#[command(about = "Resilient multi-engine HTTP fetch")]
#[command(long_about = r#"
SafeRequest tries a chain of transport engines against one URL until one
succeeds, carrying cookies and proxies across attempts.

Engines:
  • direct_async              (direct, async)
  • thread_pool_sync          (blocking, sync)
  • anti_bot_scraper          (scraper)
  • headless_browser          (browser)
  • stealth_headless_browser  (stealth)

Exit codes:
  0  an engine succeeded
  1  error (invalid arguments, settings, or --raise with every engine failing)
  2  every engine failed silently
"#)]
#[command(version)]
pub struct Cli {
    /// URL to fetch.
    pub url: String,

    /// HTTP method.
    #[arg(long, short = 'X', default_value = "GET")]
    pub method: RequestMethod,

    /// JSON request body.
    #[arg(long, short = 'd')]
    pub data: Option<String>,

    /// Engine chain, comma-separated, in order.
    #[arg(long, value_delimiter = ',')]
    pub chain: Vec<EngineKind>,

    /// Add a proxy to the pool (repeatable).
    #[arg(long)]
    pub proxy: Vec<String>,

    /// Replace the proxy pool with a comma-separated list.
    #[arg(long)]
    pub proxies: Option<String>,

    /// Raw cookie string, `k=v; k2=v2` (repeatable).
    #[arg(long, short = 'b')]
    pub cookie: Vec<String>,

    /// Extra header, `Name: value` (repeatable).
    #[arg(long, short = 'H')]
    pub header: Vec<String>,

    /// Bearer token sent as `Authorization`.
    #[arg(long)]
    pub bearer: Option<String>,

    /// Per-attempt timeout in seconds.
    #[arg(long, short)]
    pub timeout: Option<u64>,

    /// Global attempt budget.
    #[arg(long)]
    pub max_tries: Option<usize>,

    /// Fail with the first error when every engine failed.
    #[arg(long)]
    pub raise: bool,

    /// Print the last failed response instead of nothing.
    #[arg(long)]
    pub return_last_failure: bool,

    /// Use a random User-Agent for the given platform.
    #[arg(long, value_name = "PLATFORM")]
    pub random_ua: Option<UaPlatform>,

    /// Use a random Accept-Language.
    #[arg(long)]
    pub random_language: bool,

    /// Skip the pause before each attempt.
    #[arg(long)]
    pub no_jitter: bool,

    /// Settings file (defaults to the user config directory).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text")]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short)]
    pub verbose: bool,

    /// Quiet mode (body only, no logging).
    #[arg(long, short)]
    pub quiet: bool,
}

/// Platform for random User-Agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UaPlatform {
    /// Phones and tablets.
    Mobile,
    /// Desktop browsers.
    Pc,
    /// Either.
    Any,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Response body, with an attempt summary when verbose.
    #[default]
    Text,
    /// Full envelope and attempts as JSON.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// An engine succeeded.
    Success = 0,
    /// General error.
    Error = 1,
    /// Every engine failed and no error was raised.
    SilentFailure = 2,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("saferequest=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("saferequest=warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::Error
        }
    };

    std::process::exit(code as i32);
}

/// Runs one fetch and prints the result.
async fn run(cli: &Cli) -> Result<ExitCode> {
    let settings = match &cli.config {
        Some(path) => FetchSettings::load_from(path)?,
        None => FetchSettings::load()?,
    };

    let config = fetch::build_config(cli, &settings)?;
    let request = fetch::build_request(cli, &settings)?;
    debug!(?config, "Prepared session");

    let mut session = SafeRequest::with_config(config);
    let outcome = session.execute_detailed(request).await;

    let rendered = match cli.format {
        OutputFormat::Json => JsonFormatter::new(cli.pretty).format_outcome(&cli.url, &outcome)?,
        OutputFormat::Text => {
            let formatter = TextFormatter::new();
            if cli.verbose && !cli.quiet {
                eprintln!("{}", formatter.format_attempts(&outcome));
            }
            formatter.format_body(&outcome)
        }
    };

    if !rendered.is_empty() {
        println!("{rendered}");
    }

    let envelope = outcome.result?;
    if envelope.has_succeeded() {
        Ok(ExitCode::Success)
    } else {
        Ok(ExitCode::SilentFailure)
    }
}
