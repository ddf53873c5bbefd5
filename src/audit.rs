//! Top-level audit orchestration.
//!
//! Validates inputs, resolves robots and sitemaps, runs the crawl, builds
//! the site context, evaluates the rule catalog, scores, and shapes the
//! report. Per-URL failures never abort the audit; only input validation or
//! client construction can.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use url::Url;

use crate::config::Config;
use crate::crawler::{Crawler, CrawlerConfig};
use crate::models::{CrawlRecord, Issue, PageScore};
use crate::network::HttpClient;
use crate::report::{self, AuditReport};
use crate::robots::RobotsTxt;
use crate::rules;
use crate::scoring;
use crate::site_context::SiteContext;
use crate::{sitemap, url_utils, AuditError};

/// Audit parameters beyond the seed URL.
#[derive(Debug, Clone)]
pub struct AuditOptions {
    pub max_pages: Option<usize>,
    pub respect_robots: bool,
    pub deadline: Option<Duration>,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            max_pages: None,
            respect_robots: false,
            deadline: None,
        }
    }
}

/// Run a full SEO audit of `url`.
pub async fn audit(url: &str, options: AuditOptions) -> Result<AuditReport, AuditError> {
    let start = Instant::now();

    let homepage = validate_url(url)?;
    let max_pages = match options.max_pages {
        Some(0) => return Err(AuditError::InvalidMaxPages(0)),
        Some(n) => n,
        None => Config::DEFAULT_MAX_PAGES,
    };

    let base_host =
        url_utils::extract_host(&homepage).ok_or_else(|| AuditError::InvalidUrl(url.to_string()))?;

    let http = Arc::new(HttpClient::new(Config::USER_AGENT)?);

    tracing::info!(url = %homepage, max_pages, "audit started");

    // Robots and sitemaps come first; they seed the crawl.
    let robots = RobotsTxt::fetch(&http, &homepage).await;
    let resolution = sitemap::resolve(&http, &homepage, &robots.declared_sitemaps).await;

    let llms_txt_exists = match url_utils::llms_txt_url(&homepage) {
        Some(probe) => http.fetch(&probe).await.is_success(),
        None => false,
    };

    let crawler = Crawler::new(
        Arc::clone(&http),
        CrawlerConfig {
            max_pages,
            respect_robots: options.respect_robots,
            user_agent: Config::USER_AGENT.to_string(),
            deadline: options.deadline,
        },
        robots.clone(),
        base_host.clone(),
        homepage.clone(),
    );

    let (mut records, _stats) = crawler.crawl(resolution.urls.iter().cloned()).await;

    // Deterministic order for context building, evaluation, and the report.
    records.sort_by(|a, b| a.url.cmp(&b.url));

    let sitemap_urls: BTreeSet<String> = resolution
        .urls
        .iter()
        .filter_map(|u| url_utils::canonicalize(u))
        .collect();

    let ctx = SiteContext::build(
        &base_host,
        &homepage,
        &records,
        sitemap_urls,
        resolution.sitemaps_found.clone(),
        robots,
        llms_txt_exists,
    );

    let (scores, issues) = evaluate_site(&records, &ctx);
    let aggregates = scoring::aggregate(&records, &scores, &issues);
    let execution_time = start.elapsed().as_secs_f64();

    tracing::info!(
        pages = aggregates.total_pages,
        issues = aggregates.total_issues,
        average_score = aggregates.average_score,
        elapsed_secs = execution_time,
        "audit complete"
    );

    Ok(report::build(
        &homepage,
        &ctx,
        &aggregates,
        &issues,
        execution_time,
    ))
}

/// Evaluate every record against the catalog; also used by tests to drive
/// the pipeline from fixture records.
pub fn evaluate_site(records: &[CrawlRecord], ctx: &SiteContext) -> (Vec<PageScore>, Vec<Issue>) {
    let mut scores = Vec::with_capacity(records.len());
    let mut all_issues = Vec::new();

    for record in records {
        let issues = rules::evaluate(record, ctx);
        scores.push(scoring::score_page(&record.url, &issues));
        all_issues.extend(issues);
    }

    all_issues.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then(a.code.cmp(b.code))
            .then(a.url.cmp(&b.url))
    });

    (scores, all_issues)
}

/// Canonicalized homepage URL, or `invalid_url`.
fn validate_url(url: &str) -> Result<String, AuditError> {
    let parsed = Url::parse(url).map_err(|_| AuditError::InvalidUrl(url.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AuditError::InvalidUrl(url.to_string()));
    }
    if parsed.host_str().is_none() {
        return Err(AuditError::InvalidUrl(url.to_string()));
    }

    url_utils::canonicalize(url).ok_or_else(|| AuditError::InvalidUrl(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/").is_ok());
        assert!(validate_url("http://example.com/page").is_ok());
        assert!(matches!(
            validate_url("ftp://example.com/"),
            Err(AuditError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_url("not a url"),
            Err(AuditError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_url("data:text/plain,hi"),
            Err(AuditError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_max_pages_rejected() {
        let result = audit(
            "https://example.com/",
            AuditOptions {
                max_pages: Some(0),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(AuditError::InvalidMaxPages(0))));
    }
}
