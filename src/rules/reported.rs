//! Reported-only checks. These appear in the issue listings but carry zero
//! penalty weight.

use url::Url;

use super::issue;
use crate::models::{CrawlRecord, Issue, IssueCategory, Severity};
use crate::site_context::SiteContext;

const CAT: IssueCategory = IssueCategory::Technical;
const MAX_URL_LENGTH: usize = 100;
const MAX_PATH_DEPTH: usize = 5;

fn reported(record: &CrawlRecord, code: &'static str, message: String) -> Issue {
    issue(record, code, CAT, Severity::Low, 0, message)
}

/// URL-shape checks run against every record, HTML or not.
pub(super) fn url_shape_checks(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    let mut issues = Vec::new();
    let url = &record.url;

    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default();

    if path.contains('_') {
        issues.push(reported(
            record,
            "urls_contain_underscore",
            "URL path contains underscores".to_string(),
        ));
    }

    if path.chars().any(|c| c.is_ascii_uppercase()) {
        issues.push(reported(
            record,
            "urls_contain_uppercase",
            "URL path contains uppercase characters".to_string(),
        ));
    }

    if url.chars().count() > MAX_URL_LENGTH {
        issues.push(reported(
            record,
            "urls_too_long",
            format!("URL longer than {MAX_URL_LENGTH} characters"),
        ));
    }

    if crate::url_utils::path_depth(url) > MAX_PATH_DEPTH {
        issues.push(reported(
            record,
            "urls_too_deep",
            format!("URL has more than {MAX_PATH_DEPTH} path segments"),
        ));
    }

    if crate::url_utils::path_has_special_characters(url) {
        issues.push(reported(
            record,
            "urls_special_characters",
            "URL path contains characters outside a-z, 0-9, '-', '_', '.', '/'".to_string(),
        ));
    }

    issues
}

/// Header and head-tag presence checks for successful HTML pages.
pub(super) fn page_header_checks(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    let Some(facts) = &record.facts else {
        return Vec::new();
    };
    if !record.fetch.is_success() {
        return Vec::new();
    }

    let mut issues = Vec::new();

    if !facts.viewport_present {
        issues.push(reported(
            record,
            "missing_viewport",
            "Missing viewport meta tag".to_string(),
        ));
    }

    if record.fetch.header("cache-control").is_none() {
        issues.push(reported(
            record,
            "missing_cache_control",
            "Response has no Cache-Control header".to_string(),
        ));
    }

    if record.fetch.header("content-encoding").is_none() {
        issues.push(reported(
            record,
            "missing_content_compression",
            "Response is not compressed".to_string(),
        ));
    }

    issues
}

/// Site-level findings, attached to the homepage record only.
pub(super) fn site_checks(record: &CrawlRecord, ctx: &SiteContext) -> Vec<Issue> {
    if record.url != ctx.homepage_url {
        return Vec::new();
    }

    let mut issues = Vec::new();

    if !ctx.robots.exists {
        issues.push(reported(
            record,
            "missing_robots_txt",
            "No robots.txt found".to_string(),
        ));
    }

    if ctx.sitemaps_found.is_empty() {
        issues.push(reported(
            record,
            "no_sitemaps_found",
            "No sitemaps discovered".to_string(),
        ));
    }

    if !ctx.llms_txt_exists {
        issues.push(reported(
            record,
            "missing_llms_txt",
            "No llms.txt found".to_string(),
        ));
    }

    issues
}

pub(super) fn status_404(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    if record.fetch.status_code == 404 {
        vec![reported(
            record,
            "status_404",
            "Page returns 404".to_string(),
        )]
    } else {
        Vec::new()
    }
}
