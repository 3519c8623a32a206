//! Passive detection engine
//!
//! Matches one baseline response against every signature record and ranks
//! the vendors that produced evidence. Pure and synchronous: no I/O, no
//! shared mutable state.

use std::sync::Arc;
use tracing::{debug, trace};

use waffer_common::{
    DetectionCandidate, DetectionReport, Evidence, EvidenceChannel, FetchOutcome, Fingerprinter,
    HttpResponse,
};

use crate::signatures::{SignatureDatabase, SignaturePattern, SignatureRecord};

/// Base confidence once any evidence is found.
pub const BASE_SCORE: u8 = 30;
/// Score added per piece of evidence.
pub const SCORE_PER_MATCH: u8 = 20;
pub const MAX_SCORE: u8 = 100;

/// Confidence for `evidence_count` matches: `min(100, 30 + 20 * n)`, 0 for none.
pub fn score_for(evidence_count: usize) -> u8 {
    if evidence_count == 0 {
        return 0;
    }
    let raw = (SCORE_PER_MATCH as usize)
        .saturating_mul(evidence_count)
        .saturating_add(BASE_SCORE as usize);
    raw.min(MAX_SCORE as usize) as u8
}

/// Build the detection report for `url` from its fetch outcome.
pub fn detect(url: &str, outcome: &FetchOutcome, database: &SignatureDatabase) -> DetectionReport {
    let response = match outcome {
        FetchOutcome::Response(response) => response,
        FetchOutcome::NoResponse => {
            debug!("No baseline response for {}", url);
            return DetectionReport::no_response(url);
        }
    };

    let mut report = DetectionReport::from_baseline(url, response);
    let header_view = response.headers.text_view();

    for record in database.iter() {
        let matches = match_record(record, response, &header_view);
        if matches.is_empty() {
            continue;
        }
        let score = score_for(matches.len());
        trace!("{} matched {} pattern(s), score {}", record.name(), matches.len(), score);
        report
            .candidates
            .push(DetectionCandidate::new(record.name(), matches, score));
    }

    // Stable: equal scores keep database order.
    report.candidates.sort_by(|a, b| b.score.cmp(&a.score));

    debug!(
        "{} candidate(s) for {} (status {})",
        report.candidates.len(),
        url,
        response.status
    );
    report
}

/// Evidence for one record, in channel order header, cookie, body, status.
fn match_record(record: &SignatureRecord, response: &HttpResponse, header_view: &str) -> Vec<Evidence> {
    let mut matches = Vec::new();
    let body = response.body_text();

    collect_matches(&mut matches, EvidenceChannel::Header, record.header_patterns(), header_view);
    // Cookies are not parsed out of Set-Cookie; their markers are searched
    // for in the same header text.
    collect_matches(&mut matches, EvidenceChannel::Cookie, record.cookie_patterns(), header_view);
    collect_matches(&mut matches, EvidenceChannel::Body, record.body_patterns(), body);

    if record.status_codes().contains(&response.status) {
        matches.push(Evidence::new(
            EvidenceChannel::StatusCode,
            response.status.to_string(),
        ));
    }
    matches
}

fn collect_matches(
    out: &mut Vec<Evidence>,
    channel: EvidenceChannel,
    patterns: &[SignaturePattern],
    haystack: &str,
) {
    out.extend(
        patterns
            .iter()
            .filter(|p| p.is_match(haystack))
            .map(|p| Evidence::new(channel, p.as_str())),
    );
}

/// Fingerprinter backed by a shared signature database.
#[derive(Debug, Clone)]
pub struct DetectionEngine {
    database: Arc<SignatureDatabase>,
}

impl DetectionEngine {
    pub fn new(database: Arc<SignatureDatabase>) -> Self {
        Self { database }
    }

    pub fn database(&self) -> &SignatureDatabase {
        &self.database
    }
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::new(SignatureDatabase::builtin())
    }
}

impl Fingerprinter for DetectionEngine {
    fn identify(&self, url: &str, outcome: &FetchOutcome) -> DetectionReport {
        detect(url, outcome, &self.database)
    }

    fn signature_count(&self) -> usize {
        self.database.len()
    }
}
