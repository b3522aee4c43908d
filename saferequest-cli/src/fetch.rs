//! Turns command-line arguments into a session config and a request.

use anyhow::{Context, Result, bail};
use saferequest_fetch::{FetchRequest, FetchSettings, RequestConfig};
use std::time::Duration;

use crate::{Cli, UaPlatform};

/// Builds the session config: settings file first, then flags on top.
pub fn build_config(cli: &Cli, settings: &FetchSettings) -> Result<RequestConfig> {
    let mut config = RequestConfig::from_settings(settings);

    if !cli.chain.is_empty() {
        config = config.chain_kinds(&cli.chain);
    }
    if let Some(csv) = &cli.proxies {
        config = config.proxies_csv(csv);
    }
    for proxy in &cli.proxy {
        config = config.proxy(Some(proxy.as_str()));
    }
    for raw in &cli.cookie {
        config = config.cookie_str(raw);
    }
    if let Some(secs) = cli.timeout {
        config = config.timeout(Duration::from_secs(secs));
    }
    if cli.no_jitter {
        config = config.jitter(Duration::ZERO, Duration::ZERO);
    }

    config = match cli.random_ua {
        Some(UaPlatform::Mobile) => config.user_agent_random(true, false),
        Some(UaPlatform::Pc) => config.user_agent_random(false, true),
        Some(UaPlatform::Any) => config.user_agent_random(true, true),
        None => config,
    };
    if cli.random_language {
        config = config.accept_language_random();
    }
    if let Some(token) = &cli.bearer {
        config = config.auth(Some(token.as_str()));
    }

    // Explicit headers win over everything above.
    for raw in &cli.header {
        let (name, value) = parse_header(raw)?;
        config = config.header(name, value);
    }

    Ok(config)
}

/// Builds the request for this invocation.
pub fn build_request(cli: &Cli, settings: &FetchSettings) -> Result<FetchRequest> {
    let mut request = FetchRequest::new(cli.method, &cli.url)
        .raise_errors(cli.raise || settings.raise_errors)
        .max_tries(cli.max_tries.unwrap_or(settings.max_tries))
        .return_last_failure(cli.return_last_failure);

    if let Some(data) = &cli.data {
        let body: serde_json::Value =
            serde_json::from_str(data).context("--data is not valid JSON")?;
        request = request.body(body);
    }

    Ok(request)
}

/// Splits `Name: value`.
fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("Invalid header '{raw}', expected 'Name: value'");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid header '{raw}', name is empty");
    }
    Ok((name, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use saferequest_core::RequestMethod;
    use saferequest_fetch::EngineKind;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["saferequest", "https://bus.example.com/arrivals"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_header("X-Api-Key: abc").unwrap(), ("X-Api-Key", "abc"));
        assert_eq!(parse_header("Referer:https://a.b/c").unwrap(), ("Referer", "https://a.b/c"));
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = FetchSettings {
            proxies: vec!["http://settings:1".to_string()],
            max_tries: 4,
            ..FetchSettings::default()
        };
        let cli = cli(&[
            "--chain",
            "direct,stealth",
            "--proxies",
            "http://a:1,http://b:2",
            "--cookie",
            "sid=abc; lang=ko",
            "-H",
            "User-Agent: bus-tracker/1.0",
            "--timeout",
            "5",
            "--no-jitter",
        ]);

        let config = build_config(&cli, &settings).unwrap();
        let kinds: Vec<EngineKind> = config.engines().iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![EngineKind::DirectAsync, EngineKind::StealthHeadlessBrowser]
        );
        assert_eq!(config.proxy_pool().as_slice(), ["http://a:1", "http://b:2"]);
        assert_eq!(config.cookie_jar().to_header(), "lang=ko; sid=abc");
        assert_eq!(config.get_header("user-agent"), Some("bus-tracker/1.0"));
        assert_eq!(config.default_timeout(), Duration::from_secs(5));
        assert_eq!(config.jitter_range(), (Duration::ZERO, Duration::ZERO));

        let request = build_request(&cli, &settings).unwrap();
        assert_eq!(request.max_tries, 4);
        assert!(!request.raise_errors);
    }

    #[test]
    fn test_request_body_and_method() {
        let cli = cli(&["-X", "post", "-d", r#"{"stop": 42}"#, "--raise", "--max-tries", "2"]);
        let request = build_request(&cli, &FetchSettings::default()).unwrap();
        assert_eq!(request.method, RequestMethod::Post);
        assert_eq!(request.body, Some(serde_json::json!({"stop": 42})));
        assert!(request.raise_errors);
        assert_eq!(request.max_tries, 2);
    }

    #[test]
    fn test_invalid_body_is_rejected() {
        let cli = cli(&["-d", "{oops"]);
        assert!(build_request(&cli, &FetchSettings::default()).is_err());
    }

    #[test]
    fn test_default_chain_when_flag_absent() {
        let config = build_config(&cli(&[]), &FetchSettings::default()).unwrap();
        assert_eq!(config.engines().len(), EngineKind::default_chain().len());
        assert!(config.proxy_pool().is_empty());
    }
}
