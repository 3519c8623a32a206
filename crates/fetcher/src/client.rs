// crates/fetcher/src/client.rs
//! reqwest-backed baseline fetcher

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, Method, RequestBuilder, Url};
use tracing::{debug, instrument};

use waffer_common::{
    FetchMethod, FetchOptions, Fetcher, HeaderList, HttpResponse, WafferError, WafferResult,
};

/// Fetches one baseline response per URL, following redirects.
pub struct HttpFetcher {
    client: Client,
    options: FetchOptions,
}

impl HttpFetcher {
    /// Build a fetcher from options. Fails only if the HTTP client cannot be set up.
    pub fn new(options: FetchOptions) -> WafferResult<Self> {
        let redirect = if options.max_redirects == 0 {
            Policy::none()
        } else {
            Policy::limited(options.max_redirects)
        };

        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.as_str())
            .redirect(redirect)
            .build()
            .map_err(|e| WafferError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, options })
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    fn build_request(&self, url: Url) -> RequestBuilder {
        match self.options.method {
            FetchMethod::Head => self.client.request(Method::HEAD, url),
            FetchMethod::Get => {
                let request = self.client.request(Method::GET, url);
                if self.options.params.is_empty() {
                    request
                } else {
                    request.query(&self.options.params)
                }
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> WafferResult<HttpResponse> {
        let parsed = Url::parse(url)
            .map_err(|e| WafferError::InvalidTarget(format!("{}: {}", url, e)))?;

        let response = self
            .build_request(parsed)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers: HeaderList = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let body = response.text().await.map_err(transport_error)?;
        debug!(
            "{} {} -> {} ({} headers, {} body bytes)",
            self.options.method.as_str(),
            final_url,
            status,
            headers.len(),
            body.len()
        );

        let mut result = HttpResponse::new(status)
            .with_headers(headers)
            .with_final_url(final_url);
        if !body.is_empty() {
            result = result.with_body(body);
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn transport_error(e: reqwest::Error) -> WafferError {
    if e.is_timeout() {
        WafferError::Timeout(e.to_string())
    } else if e.is_builder() {
        WafferError::InvalidTarget(e.to_string())
    } else {
        WafferError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fetcher_creation() {
        let fetcher = HttpFetcher::new(FetchOptions::default().with_timeout(Duration::from_secs(3)))
            .unwrap();
        assert_eq!(fetcher.options().timeout, Duration::from_secs(3));
        assert_eq!(fetcher.name(), "http");
    }

    #[test]
    fn test_head_request_ignores_params() {
        let fetcher = HttpFetcher::new(FetchOptions::default().with_param("q", "1")).unwrap();
        let url = Url::parse("http://example.com/path").unwrap();
        let request = fetcher.build_request(url).build().unwrap();
        assert_eq!(request.method(), &Method::HEAD);
        assert_eq!(request.url().query(), None);
    }

    #[test]
    fn test_get_request_carries_params() {
        let options = FetchOptions::default()
            .with_method(FetchMethod::Get)
            .with_param("id", "1")
            .with_param("q", "a b");
        let fetcher = HttpFetcher::new(options).unwrap();
        let url = Url::parse("http://example.com/search").unwrap();
        let request = fetcher.build_request(url).build().unwrap();
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.url().query(), Some("id=1&q=a+b"));
    }

    #[tokio::test]
    async fn test_invalid_url_is_invalid_target() {
        let fetcher = HttpFetcher::new(FetchOptions::default()).unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, WafferError::InvalidTarget(_)));
        assert!(err.is_transport());
    }
}
