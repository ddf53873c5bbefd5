//! Core data types shared across the audit pipeline.
//!
//! Records are produced by the crawler and never mutated afterward; the rule
//! engine and scorer only read them.

use serde::Serialize;
use std::collections::BTreeMap;

/// Terminal classification of a failed fetch.
///
/// All failures are encoded as values on [`FetchResult`]; the fetcher itself
/// never returns an error to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FetchErrorKind {
    #[error("request timeout")]
    Timeout,

    #[error("DNS resolution failed")]
    Dns,

    #[error("TLS error")]
    Tls,

    #[error("connection refused")]
    Refused,

    #[error("redirect loop detected")]
    RedirectLoop,

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("network error")]
    Network,
}

impl FetchErrorKind {
    /// Pseudo-status used in the report's status-code distribution.
    pub fn pseudo_status(&self) -> &'static str {
        match self {
            FetchErrorKind::Timeout => "timeout",
            _ => "network_error",
        }
    }

    /// Whether a single retry is worthwhile.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchErrorKind::Timeout | FetchErrorKind::Refused | FetchErrorKind::Network
        )
    }
}

/// One hop in a redirect chain: the requested URL and the status it returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectHop {
    pub url: String,
    pub status: u16,
}

/// Outcome of fetching a single URL, redirects traced hop by hop.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub final_url: String,
    /// Terminal status code; 0 when the request never produced a response.
    pub status_code: u16,
    /// Response headers with lowercased names. Multi-valued headers are
    /// comma-joined.
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub body_truncated: bool,
    pub redirect_chain: Vec<RedirectHop>,
    pub elapsed_ms: u64,
    pub error: Option<FetchErrorKind>,
}

impl FetchResult {
    /// Result shell for a request that failed without a terminal response.
    pub fn failed(url: &str, kind: FetchErrorKind, chain: Vec<RedirectHop>, elapsed_ms: u64) -> Self {
        Self {
            final_url: url.to_string(),
            status_code: 0,
            headers: BTreeMap::new(),
            body: String::new(),
            body_truncated: false,
            redirect_chain: chain,
            elapsed_ms,
            error: Some(kind),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status_code)
    }

    pub fn is_html(&self) -> bool {
        self.headers
            .get("content-type")
            .map(|ct| crate::url_utils::is_html_content_type(ct))
            .unwrap_or(false)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// A single `<img>` occurrence.
#[derive(Debug, Clone)]
pub struct ImageFact {
    pub src: String,
    /// `None` when the attribute is absent, `Some("")` when present but empty.
    pub alt: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub is_svg: bool,
}

/// A single `<a href>` occurrence, resolved to an absolute URL.
#[derive(Debug, Clone)]
pub struct LinkFact {
    pub href_absolute: String,
    pub anchor_text: String,
    pub rel_tokens: Vec<String>,
    pub aria_label: Option<String>,
    pub is_internal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredDataKind {
    JsonLd,
    Microdata,
    Rdfa,
}

/// One structured-data block and its declared type label.
#[derive(Debug, Clone)]
pub struct StructuredDataFact {
    pub kind: StructuredDataKind,
    pub type_label: String,
}

/// Per-level counts of headings with non-empty text, plus the H1 texts.
#[derive(Debug, Clone, Default)]
pub struct HeadingFacts {
    pub counts: [usize; 6],
    pub h1_texts: Vec<String>,
}

impl HeadingFacts {
    pub fn h1_count(&self) -> usize {
        self.counts[0]
    }
}

/// SEO-relevant facts extracted from one HTML response.
#[derive(Debug, Clone, Default)]
pub struct PageFacts {
    /// `None` when the tag is absent, `Some("")` when present but empty.
    pub title: Option<String>,
    pub meta_description: Option<String>,
    /// Absolute canonical URL from `<link rel="canonical">`.
    pub canonical: Option<String>,
    /// Tokens from `<meta name="robots">`; `None` when the tag is absent.
    pub meta_robots: Option<Vec<String>>,
    /// Tokens from the `X-Robots-Tag` header; `None` when absent.
    pub x_robots: Option<Vec<String>>,
    pub headings: HeadingFacts,
    pub images: Vec<ImageFact>,
    pub links: Vec<LinkFact>,
    pub structured_data: Vec<StructuredDataFact>,
    pub viewport_present: bool,
    pub lang_attr: Option<String>,
    pub charset: Option<String>,
    /// Non-HTTPS subresource URLs referenced by an HTTPS page.
    pub mixed_content: Vec<String>,
    pub https: bool,
}

impl PageFacts {
    fn robots_token(&self, token: &str) -> bool {
        let in_set = |set: &Option<Vec<String>>| {
            set.as_ref()
                .map(|t| t.iter().any(|v| v == token))
                .unwrap_or(false)
        };
        in_set(&self.meta_robots) || in_set(&self.x_robots)
    }

    pub fn has_noindex(&self) -> bool {
        self.robots_token("noindex")
    }

    pub fn has_nofollow(&self) -> bool {
        self.robots_token("nofollow")
    }

    pub fn internal_links(&self) -> impl Iterator<Item = &LinkFact> {
        self.links.iter().filter(|l| l.is_internal)
    }
}

/// One crawled URL: fetch outcome plus parsed facts for HTML responses.
#[derive(Debug, Clone)]
pub struct CrawlRecord {
    /// Canonical form of the requested URL.
    pub url: String,
    pub fetch: FetchResult,
    /// Absent for non-HTML responses and failed fetches.
    pub facts: Option<PageFacts>,
}

/// Coarse rank used for sorting and aggregate counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Technical,
    Onpage,
}

/// A single finding against one URL. `weight` is the signed score penalty;
/// reported-only issues carry weight 0.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub url: String,
    pub code: &'static str,
    pub message: String,
    pub severity: Severity,
    #[serde(skip)]
    pub category: IssueCategory,
    #[serde(skip)]
    pub weight: i32,
}

impl Issue {
    pub fn is_scored(&self) -> bool {
        self.weight != 0
    }
}

/// Per-page score derived from the issue list.
#[derive(Debug, Clone, Serialize)]
pub struct PageScore {
    pub url: String,
    pub penalty_total: i32,
    pub score: i32,
}
