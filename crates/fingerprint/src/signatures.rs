//! WAF signature database
//!
//! Records are kept in declaration order. Every pattern is compiled once,
//! case-insensitively, when its record is built; a pattern that fails to
//! compile stays in the record for auditing but never matches.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use waffer_common::{EvidenceChannel, WafferError, WafferResult};

use crate::builtin::BUILTIN_SIGNATURES;

/// One signature pattern: its literal text and compiled form.
#[derive(Debug, Clone)]
pub struct SignaturePattern {
    source: String,
    compiled: Result<Regex, regex::Error>,
}

impl SignaturePattern {
    pub fn new<S: Into<String>>(source: S) -> Self {
        let source = source.into();
        let compiled = RegexBuilder::new(&source).case_insensitive(true).build();
        Self { source, compiled }
    }

    /// Literal pattern text, as declared.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.compiled.is_ok()
    }

    pub fn error(&self) -> Option<&regex::Error> {
        self.compiled.as_ref().err()
    }

    /// Unanchored search. Invalid patterns never match.
    #[inline]
    pub fn is_match(&self, haystack: &str) -> bool {
        match &self.compiled {
            Ok(re) => re.is_match(haystack),
            Err(_) => false,
        }
    }
}

/// Serialized form of a signature record, as found in JSON files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSpec {
    pub name: String,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub cookies: Vec<String>,
    #[serde(default)]
    pub body: Vec<String>,
    #[serde(default)]
    pub status_codes: Vec<u16>,
}

/// Signatures for one WAF vendor.
#[derive(Debug, Clone)]
pub struct SignatureRecord {
    name: String,
    header_patterns: Vec<SignaturePattern>,
    cookie_patterns: Vec<SignaturePattern>,
    body_patterns: Vec<SignaturePattern>,
    status_codes: BTreeSet<u16>,
}

impl SignatureRecord {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            header_patterns: Vec::new(),
            cookie_patterns: Vec::new(),
            body_patterns: Vec::new(),
            status_codes: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_header_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header_patterns
            .extend(patterns.into_iter().map(SignaturePattern::new));
        self
    }

    #[must_use]
    pub fn with_cookie_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cookie_patterns
            .extend(patterns.into_iter().map(SignaturePattern::new));
        self
    }

    #[must_use]
    pub fn with_body_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body_patterns
            .extend(patterns.into_iter().map(SignaturePattern::new));
        self
    }

    #[must_use]
    pub fn with_status_codes<I: IntoIterator<Item = u16>>(mut self, codes: I) -> Self {
        self.status_codes.extend(codes);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn header_patterns(&self) -> &[SignaturePattern] {
        &self.header_patterns
    }

    #[inline]
    pub fn cookie_patterns(&self) -> &[SignaturePattern] {
        &self.cookie_patterns
    }

    #[inline]
    pub fn body_patterns(&self) -> &[SignaturePattern] {
        &self.body_patterns
    }

    #[inline]
    pub fn status_codes(&self) -> &BTreeSet<u16> {
        &self.status_codes
    }

    /// Patterns for a regex channel. `StatusCode` has none.
    pub fn patterns(&self, channel: EvidenceChannel) -> &[SignaturePattern] {
        match channel {
            EvidenceChannel::Header => &self.header_patterns,
            EvidenceChannel::Cookie => &self.cookie_patterns,
            EvidenceChannel::Body => &self.body_patterns,
            EvidenceChannel::StatusCode => &[],
        }
    }

    /// Patterns that failed to compile, with their channel.
    pub fn invalid_patterns(&self) -> impl Iterator<Item = (EvidenceChannel, &SignaturePattern)> {
        [
            EvidenceChannel::Header,
            EvidenceChannel::Cookie,
            EvidenceChannel::Body,
        ]
        .into_iter()
        .flat_map(move |channel| {
            self.patterns(channel)
                .iter()
                .filter(|p| !p.is_valid())
                .map(move |p| (channel, p))
        })
    }

    pub fn to_spec(&self) -> SignatureSpec {
        let sources = |patterns: &[SignaturePattern]| -> Vec<String> {
            patterns.iter().map(|p| p.as_str().to_string()).collect()
        };
        SignatureSpec {
            name: self.name.clone(),
            headers: sources(&self.header_patterns),
            cookies: sources(&self.cookie_patterns),
            body: sources(&self.body_patterns),
            status_codes: self.status_codes.iter().copied().collect(),
        }
    }
}

impl From<SignatureSpec> for SignatureRecord {
    fn from(spec: SignatureSpec) -> Self {
        SignatureRecord::new(spec.name)
            .with_header_patterns(spec.headers)
            .with_cookie_patterns(spec.cookies)
            .with_body_patterns(spec.body)
            .with_status_codes(spec.status_codes)
    }
}

static BUILTIN: Lazy<Arc<SignatureDatabase>> = Lazy::new(|| {
    let records = BUILTIN_SIGNATURES
        .iter()
        .map(|sig| {
            SignatureRecord::new(sig.name)
                .with_header_patterns(sig.headers.iter().copied())
                .with_cookie_patterns(sig.cookies.iter().copied())
                .with_body_patterns(sig.body.iter().copied())
                .with_status_codes(sig.status_codes.iter().copied())
        })
        .collect();
    Arc::new(SignatureDatabase { records })
});

/// Ordered, read-only collection of signature records with unique names.
#[derive(Debug, Clone, Default)]
pub struct SignatureDatabase {
    records: Vec<SignatureRecord>,
}

impl SignatureDatabase {
    /// Build a database, rejecting duplicate vendor names.
    pub fn new(records: Vec<SignatureRecord>) -> WafferResult<Self> {
        {
            let mut seen = HashSet::with_capacity(records.len());
            for record in &records {
                if !seen.insert(record.name()) {
                    return Err(WafferError::Fingerprint(format!(
                        "duplicate signature name '{}'",
                        record.name()
                    )));
                }
                for (channel, pattern) in record.invalid_patterns() {
                    warn!(
                        "Ignoring invalid {} pattern {:?} for {}: {}",
                        channel,
                        pattern.as_str(),
                        record.name(),
                        pattern.error().map(|e| e.to_string()).unwrap_or_default()
                    );
                }
            }
        }
        Ok(Self { records })
    }

    /// The process-wide built-in database.
    pub fn builtin() -> Arc<SignatureDatabase> {
        Arc::clone(&BUILTIN)
    }

    /// Parse a JSON array of signature objects.
    pub fn from_json_str(json: &str) -> WafferResult<Self> {
        let specs: Vec<SignatureSpec> = serde_json::from_str(json)?;
        Self::new(specs.into_iter().map(SignatureRecord::from).collect())
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> WafferResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let db = Self::from_json_str(&content)?;
        debug!("Loaded {} signatures from {}", db.len(), path.display());
        Ok(db)
    }

    pub fn to_json_pretty(&self) -> WafferResult<String> {
        let specs: Vec<SignatureSpec> = self.records.iter().map(SignatureRecord::to_spec).collect();
        Ok(serde_json::to_string_pretty(&specs)?)
    }

    /// Records in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &SignatureRecord> {
        self.records.iter()
    }

    pub fn get(&self, name: &str) -> Option<&SignatureRecord> {
        self.records.iter().find(|r| r.name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(SignatureRecord::name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_order_and_names() {
        let db = SignatureDatabase::builtin();
        let names: Vec<&str> = db.names().collect();
        assert_eq!(
            names,
            vec![
                "Cloudflare",
                "Akamai",
                "AWS WAF / ALB",
                "ModSecurity",
                "F5 BIG-IP ASM"
            ]
        );
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn builtin_patterns_all_compile() {
        let db = SignatureDatabase::builtin();
        for record in db.iter() {
            assert_eq!(record.invalid_patterns().count(), 0, "{}", record.name());
        }
    }

    #[test]
    fn builtin_is_shared() {
        let a = SignatureDatabase::builtin();
        let b = SignatureDatabase::builtin();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn lookup_by_name() {
        let db = SignatureDatabase::builtin();
        let cf = db.get("Cloudflare").unwrap();
        assert_eq!(cf.header_patterns().len(), 3);
        assert_eq!(cf.cookie_patterns()[0].as_str(), "__cfduid");
        assert!(cf.status_codes().is_empty());
        assert!(db.get("cloudflare").is_none());
    }

    #[test]
    fn patterns_are_case_insensitive() {
        let p = SignaturePattern::new("x-f5-");
        assert!(p.is_match("X-F5-Request: 1"));
        assert!(!p.is_match("x-f6-"));
    }

    #[test]
    fn invalid_pattern_is_kept_but_never_matches() {
        let record = SignatureRecord::new("Broken")
            .with_header_patterns(["(unclosed", "x-ok"])
            .with_body_patterns(["[z-a]"]);
        let invalid: Vec<_> = record.invalid_patterns().collect();
        assert_eq!(invalid.len(), 2);
        assert_eq!(invalid[0].0, EvidenceChannel::Header);
        assert_eq!(invalid[1].0, EvidenceChannel::Body);
        assert!(!record.header_patterns()[0].is_match("(unclosed"));
        assert!(record.header_patterns()[1].is_valid());
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = SignatureDatabase::new(vec![
            SignatureRecord::new("A"),
            SignatureRecord::new("A"),
        ])
        .unwrap_err();
        assert!(matches!(err, WafferError::Fingerprint(_)));
    }

    #[test]
    fn json_loading_preserves_order_and_defaults() {
        let json = r#"[
            {"name": "Zeta", "body": ["blocked"]},
            {"name": "Alpha", "headers": ["x-alpha"], "status_codes": [406, 403]}
        ]"#;
        let db = SignatureDatabase::from_json_str(json).unwrap();
        let names: Vec<&str> = db.names().collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);

        let zeta = db.get("Zeta").unwrap();
        assert!(zeta.header_patterns().is_empty());
        assert!(zeta.cookie_patterns().is_empty());

        let alpha = db.get("Alpha").unwrap();
        assert!(alpha.status_codes().contains(&403));
        assert_eq!(alpha.to_spec().status_codes, vec![403, 406]);
    }

    #[test]
    fn json_loading_tolerates_bad_regex() {
        let db = SignatureDatabase::from_json_str(r#"[{"name": "X", "headers": ["(", "ok"]}]"#)
            .unwrap();
        assert_eq!(db.get("X").unwrap().invalid_patterns().count(), 1);
    }

    #[test]
    fn json_loading_errors() {
        assert!(matches!(
            SignatureDatabase::from_json_str("{not json"),
            Err(WafferError::Json(_))
        ));
        assert!(matches!(
            SignatureDatabase::from_json_str(r#"[{"name": "A"}, {"name": "A"}]"#),
            Err(WafferError::Fingerprint(_))
        ));
        assert!(matches!(
            SignatureDatabase::from_json_file("/nonexistent/waffer/signatures.json"),
            Err(WafferError::Io(_))
        ));
    }

    #[test]
    fn builtin_survives_json_export() {
        let db = SignatureDatabase::builtin();
        let json = db.to_json_pretty().unwrap();
        let reloaded = SignatureDatabase::from_json_str(&json).unwrap();
        let specs: Vec<SignatureSpec> = reloaded.iter().map(SignatureRecord::to_spec).collect();
        let original: Vec<SignatureSpec> = db.iter().map(SignatureRecord::to_spec).collect();
        assert_eq!(specs, original);
    }
}
