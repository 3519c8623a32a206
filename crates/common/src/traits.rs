//! Core traits for Waffer components
//!
//! Fetching is async and fallible; fingerprinting is a pure function of its
//! inputs and never fails.

use crate::error::WafferResult;
use crate::types::{DetectionReport, FetchOutcome, HttpResponse};
use async_trait::async_trait;

/// Source of baseline HTTP responses.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a single URL.
    async fn fetch(&self, url: &str) -> WafferResult<HttpResponse>;

    /// Fetch a URL and collapse any failure into `FetchOutcome::NoResponse`.
    async fn fetch_outcome(&self, url: &str) -> FetchOutcome {
        FetchOutcome::from_result(self.fetch(url).await)
    }

    /// Fetcher name/identifier
    fn name(&self) -> &str;
}

/// WAF fingerprinting over one already-fetched outcome.
pub trait Fingerprinter: Send + Sync {
    /// Build the detection report for `url` from its fetch outcome.
    fn identify(&self, url: &str, outcome: &FetchOutcome) -> DetectionReport;

    /// Get number of loaded signatures
    fn signature_count(&self) -> usize {
        0
    }
}

/// Fetch `url` once and fingerprint the result.
pub async fn detect_url<F, P>(fetcher: &F, fingerprinter: &P, url: &str) -> DetectionReport
where
    F: Fetcher + ?Sized,
    P: Fingerprinter + ?Sized,
{
    let outcome = fetcher.fetch_outcome(url).await;
    fingerprinter.identify(url, &outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WafferError;
    use crate::types::{DetectionCandidate, NO_RESPONSE};

    struct MockFetcher {
        fail: bool,
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch(&self, _url: &str) -> WafferResult<HttpResponse> {
            if self.fail {
                Err(WafferError::Network("connection refused".to_string()))
            } else {
                Ok(HttpResponse::new(403).with_header("Server", "mock"))
            }
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    struct MockFingerprinter;

    impl Fingerprinter for MockFingerprinter {
        fn identify(&self, url: &str, outcome: &FetchOutcome) -> DetectionReport {
            match outcome.response() {
                Some(resp) => {
                    let mut report = DetectionReport::from_baseline(url, resp);
                    report
                        .candidates
                        .push(DetectionCandidate::new("Mock", Vec::new(), 30));
                    report
                }
                None => DetectionReport::no_response(url),
            }
        }
    }

    #[tokio::test]
    async fn test_detect_url_success() {
        let fetcher = MockFetcher { fail: false };
        let report = detect_url(&fetcher, &MockFingerprinter, "http://mock").await;
        assert_eq!(report.baseline_status, Some(403));
        assert_eq!(report.top().map(|c| c.waf.as_str()), Some("Mock"));
        assert_eq!(MockFingerprinter.signature_count(), 0);
    }

    #[tokio::test]
    async fn test_detect_url_failure_is_no_response() {
        let fetcher = MockFetcher { fail: true };
        assert_eq!(fetcher.fetch_outcome("http://mock").await, FetchOutcome::NoResponse);

        let report = detect_url(&fetcher, &MockFingerprinter, "http://mock").await;
        assert_eq!(report.error, Some(NO_RESPONSE));
        assert!(report.candidates.is_empty());
    }
}
