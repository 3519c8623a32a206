//! Core data types for Waffer
//!
//! The report types keep a fixed JSON shape:
//! `url`, `found`, `baseline_status`, `baseline_headers`, `error`.
//! Absent values serialize as `null`.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::error::WafferError;

/// Error code reported when no baseline response could be obtained.
pub const NO_RESPONSE: &str = "no_response";

/// Ordered response headers, one entry per received header line.
///
/// Repeated names are kept as separate entries. When serialized, entries
/// sharing a name (case-insensitively) are merged into one key with their
/// values joined by `", "`, keeping the first-seen spelling of the name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(String, String)>,
}

impl HeaderList {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.entries.push((name.into(), value.into()));
    }

    /// Builder: append one header line.
    #[inline]
    #[must_use]
    pub fn with<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.push(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// First value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lower-cased `"name: value"` lines joined by `\n`.
    ///
    /// Header and cookie signatures are both matched against this text.
    pub fn text_view(&self) -> String {
        self.entries
            .iter()
            .map(|(n, v)| format!("{}: {}", n, v))
            .collect::<Vec<_>>()
            .join("\n")
            .to_lowercase()
    }

    /// Entries merged by case-insensitive name, in first-seen order.
    pub fn merged(&self) -> Vec<(&str, String)> {
        let mut merged: Vec<(&str, String)> = Vec::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            match merged.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                Some((_, existing)) => {
                    existing.push_str(", ");
                    existing.push_str(value);
                }
                None => merged.push((name.as_str(), value.clone())),
            }
        }
        merged
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderList {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

impl Serialize for HeaderList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let merged = self.merged();
        let mut map = serializer.serialize_map(Some(merged.len()))?;
        for (name, value) in &merged {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// One fetched HTTP response, already fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderList,
    pub body: Option<String>,
    /// URL the response was served from after redirects, when known.
    pub final_url: Option<String>,
}

impl HttpResponse {
    #[inline]
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderList::new(),
            body: None,
            final_url: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.push(name, value);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderList) -> Self {
        self.headers = headers;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_body<B: Into<String>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_final_url<U: Into<String>>(mut self, url: U) -> Self {
        self.final_url = Some(url.into());
        self
    }

    /// Body text, empty when the response carried none.
    #[inline]
    #[must_use]
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

/// Result of the fetch step as seen by the detection engine.
///
/// Every transport failure collapses into `NoResponse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Response(HttpResponse),
    NoResponse,
}

impl FetchOutcome {
    /// Collapse a fetch result, logging the discarded error.
    pub fn from_result<E: fmt::Display>(result: Result<HttpResponse, E>) -> Self {
        match result {
            Ok(response) => FetchOutcome::Response(response),
            Err(e) => {
                debug!("Fetch failed, treating as no response: {}", e);
                FetchOutcome::NoResponse
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            FetchOutcome::Response(r) => Some(r),
            FetchOutcome::NoResponse => None,
        }
    }
}

impl From<HttpResponse> for FetchOutcome {
    fn from(response: HttpResponse) -> Self {
        FetchOutcome::Response(response)
    }
}

/// Where in the response a piece of evidence was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceChannel {
    Header,
    Cookie,
    Body,
    StatusCode,
}

impl EvidenceChannel {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            EvidenceChannel::Header => "header",
            EvidenceChannel::Cookie => "cookie",
            EvidenceChannel::Body => "body",
            EvidenceChannel::StatusCode => "status_code",
        }
    }
}

impl fmt::Display for EvidenceChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One matched pattern. `pattern` is the literal signature text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(rename = "type")]
    pub channel: EvidenceChannel,
    pub pattern: String,
}

impl Evidence {
    #[inline]
    #[must_use]
    pub fn new<P: Into<String>>(channel: EvidenceChannel, pattern: P) -> Self {
        Self {
            channel,
            pattern: pattern.into(),
        }
    }
}

/// How a candidate was detected. Only passive analysis exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    #[default]
    Passive,
}

impl DetectionMethod {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::Passive => "passive",
        }
    }
}

/// A vendor with at least one piece of evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionCandidate {
    pub waf: String,
    pub matches: Vec<Evidence>,
    pub score: u8,
    pub method: DetectionMethod,
}

impl DetectionCandidate {
    #[inline]
    #[must_use]
    pub fn new<W: Into<String>>(waf: W, matches: Vec<Evidence>, score: u8) -> Self {
        Self {
            waf: waf.into(),
            matches,
            score,
            method: DetectionMethod::Passive,
        }
    }

    /// Evidence found in one channel, in match order.
    pub fn evidence_in(&self, channel: EvidenceChannel) -> impl Iterator<Item = &Evidence> {
        self.matches.iter().filter(move |e| e.channel == channel)
    }
}

/// Outcome of one detection run against one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionReport {
    pub url: String,
    #[serde(rename = "found")]
    pub candidates: Vec<DetectionCandidate>,
    pub baseline_status: Option<u16>,
    pub baseline_headers: Option<HeaderList>,
    pub error: Option<&'static str>,
}

impl DetectionReport {
    /// Report for a target that produced no response at all.
    #[must_use]
    pub fn no_response<U: Into<String>>(url: U) -> Self {
        Self {
            url: url.into(),
            candidates: Vec::new(),
            baseline_status: None,
            baseline_headers: None,
            error: Some(NO_RESPONSE),
        }
    }

    /// Report seeded with the baseline status and headers, no candidates yet.
    #[must_use]
    pub fn from_baseline<U: Into<String>>(url: U, response: &HttpResponse) -> Self {
        Self {
            url: url.into(),
            candidates: Vec::new(),
            baseline_status: Some(response.status),
            baseline_headers: Some(response.headers.clone()),
            error: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Highest-scoring candidate, if any.
    #[inline]
    #[must_use]
    pub fn top(&self) -> Option<&DetectionCandidate> {
        self.candidates.first()
    }

    pub fn candidate(&self, waf: &str) -> Option<&DetectionCandidate> {
        self.candidates.iter().find(|c| c.waf == waf)
    }
}

/// HTTP method used for the baseline request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    #[default]
    Head,
    Get,
}

impl FetchMethod {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            FetchMethod::Head => "HEAD",
            FetchMethod::Get => "GET",
        }
    }
}

impl FromStr for FetchMethod {
    type Err = WafferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "head" => Ok(FetchMethod::Head),
            "get" => Ok(FetchMethod::Get),
            other => Err(WafferError::Parse(format!("unknown HTTP method '{}'", other))),
        }
    }
}

/// Baseline fetch tuning options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub method: FetchMethod,
    /// Query parameters, sent with GET only.
    pub params: Vec<(String, String)>,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            method: FetchMethod::Head,
            params: Vec::new(),
            user_agent: format!("waffer/{}", crate::VERSION),
            max_redirects: 10,
        }
    }
}

impl FetchOptions {
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_method(mut self, method: FetchMethod) -> Self {
        self.method = method;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    #[inline]
    #[must_use]
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }
}
