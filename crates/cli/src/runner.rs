// runner.rs
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use waffer_common::traits::detect_url;
use waffer_common::{DetectionReport, FetchMethod, FetchOptions, Fingerprinter};
use waffer_fetcher::HttpFetcher;
use waffer_fingerprint::{DetectionEngine, SignatureDatabase};

use crate::args::Cli;
use crate::output::print_report;

pub async fn run_detect(cli: Cli) -> Result<()> {
    let database = load_database(&cli)?;

    if cli.dump_signatures {
        println!("{}", database.to_json_pretty()?);
        return Ok(());
    }

    let url = cli
        .url
        .as_deref()
        .ok_or_else(|| anyhow!("No target URL given"))?;

    if cli.active {
        warn!("Active probing is not available; running passive detection only");
    }

    let options = build_fetch_options(&cli)?;
    let report = detect_target(url, options, database).await?;
    print_report(&report, &cli.output_format)?;
    Ok(())
}

/// Fetch the baseline for `url` and fingerprint it.
pub async fn detect_target(
    url: &str,
    options: FetchOptions,
    database: Arc<SignatureDatabase>,
) -> Result<DetectionReport> {
    info!("Target: {}", url);
    info!(
        "Method: {}, timeout: {:.1}s",
        options.method.as_str(),
        options.timeout.as_secs_f64()
    );

    let fetcher = HttpFetcher::new(options).context("Failed to initialize HTTP fetcher")?;
    let engine = DetectionEngine::new(database);
    info!("Loaded {} signature(s)", engine.signature_count());

    let report = detect_url(&fetcher, &engine, url).await;
    match (report.error, report.top()) {
        (Some(error), _) => warn!("No baseline response from {} ({})", url, error),
        (None, Some(top)) => info!("Best match: {} (score {})", top.waf, top.score),
        (None, None) => info!("No WAF fingerprints matched"),
    }
    Ok(report)
}

fn load_database(cli: &Cli) -> Result<Arc<SignatureDatabase>> {
    match &cli.signatures {
        Some(path) => {
            let db = SignatureDatabase::from_json_file(path)
                .with_context(|| format!("Failed to load signatures from {}", path.display()))?;
            Ok(Arc::new(db))
        }
        None => Ok(SignatureDatabase::builtin()),
    }
}

/// Map command-line flags onto fetch options.
fn build_fetch_options(cli: &Cli) -> Result<FetchOptions> {
    let timeout = Duration::try_from_secs_f64(cli.timeout)
        .ok()
        .filter(|t| !t.is_zero())
        .ok_or_else(|| anyhow!("Invalid timeout: {} (must be a positive number of seconds)", cli.timeout))?;

    let method: FetchMethod = cli.method.parse()?;
    if method == FetchMethod::Head && !cli.params.is_empty() {
        warn!("Query parameters are only sent with --method get; ignoring {}", cli.params.len());
    }

    let mut options = FetchOptions::default()
        .with_timeout(timeout)
        .with_method(method);
    for (key, value) in &cli.params {
        options = options.with_param(key.as_str(), value.as_str());
    }
    if let Some(ua) = &cli.user_agent {
        options = options.with_user_agent(ua.as_str());
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["waffer"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_options_defaults() {
        let options = build_fetch_options(&cli(&["https://example.com"])).unwrap();
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.method, FetchMethod::Head);
        assert!(options.params.is_empty());
    }

    #[test]
    fn test_options_from_flags() {
        let options = build_fetch_options(&cli(&[
            "https://example.com",
            "--timeout",
            "0.5",
            "--method",
            "get",
            "--param",
            "q=1",
            "--user-agent",
            "audit/1.0",
        ]))
        .unwrap();
        assert_eq!(options.timeout, Duration::from_millis(500));
        assert_eq!(options.method, FetchMethod::Get);
        assert_eq!(options.params, vec![("q".to_string(), "1".to_string())]);
        assert_eq!(options.user_agent, "audit/1.0");
    }

    #[test]
    fn test_options_reject_bad_timeout() {
        assert!(build_fetch_options(&cli(&["https://example.com", "--timeout", "0"])).is_err());
        assert!(build_fetch_options(&cli(&["https://example.com", "--timeout", "NaN"])).is_err());
    }

    #[test]
    fn test_load_builtin_and_missing_file() {
        let db = load_database(&cli(&["https://example.com"])).unwrap();
        assert_eq!(db.len(), 5);

        let err = load_database(&cli(&[
            "https://example.com",
            "--signatures",
            "/nonexistent/waffer.json",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("Failed to load signatures"));
    }

    #[tokio::test]
    async fn test_detect_target_modsecurity() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Access denied with code 403"))
            .mount(&mock_server)
            .await;

        let options = FetchOptions::default().with_method(FetchMethod::Get);
        let report = detect_target(&mock_server.uri(), options, SignatureDatabase::builtin())
            .await
            .unwrap();

        assert_eq!(report.baseline_status, Some(403));
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].waf, "ModSecurity");
        assert_eq!(report.candidates[0].score, 50);
    }

    #[tokio::test]
    async fn test_detect_target_unreachable() {
        let report = detect_target(
            "http://127.0.0.1:1/",
            FetchOptions::default().with_timeout(Duration::from_secs(2)),
            SignatureDatabase::builtin(),
        )
        .await
        .unwrap();
        assert_eq!(report.error, Some("no_response"));
        assert!(report.candidates.is_empty());
    }
}
