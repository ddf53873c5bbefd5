//! Per-page rule evaluation.
//!
//! The catalog is a fixed ordered list of pure check functions
//! `(record, ctx) -> Vec<Issue>`; there is no runtime registration. Each rule
//! emits at most one issue per URL except the image-alt rules, which emit one
//! per offending image up to their penalty caps.

mod onpage;
mod reported;
mod technical;

use crate::models::{CrawlRecord, Issue, IssueCategory, Severity};
use crate::site_context::SiteContext;

type RuleFn = fn(&CrawlRecord, &SiteContext) -> Vec<Issue>;

/// Fixed evaluation order: technical, on-page, then reported-only checks.
const RULES: &[RuleFn] = &[
    technical::noindex_on_indexable,
    technical::redirect_loop,
    technical::not_https,
    technical::canonical_rules,
    technical::server_error_5xx,
    technical::redirect_chain_ends_404,
    technical::mixed_content_js_css,
    technical::meta_robots_conflict,
    technical::redirect_chain_too_long,
    technical::redirect_302,
    technical::nofollow_directive,
    technical::structured_data_rules,
    onpage::title_rules,
    onpage::meta_description_rules,
    onpage::heading_rules,
    onpage::orphan_page,
    onpage::image_alt_rules,
    onpage::internal_link_rules,
    reported::url_shape_checks,
    reported::page_header_checks,
    reported::site_checks,
    reported::status_404,
];

/// Evaluate the full catalog against one crawl record.
///
/// Issues come back sorted by (severity, code) so report output is stable.
pub fn evaluate(record: &CrawlRecord, ctx: &SiteContext) -> Vec<Issue> {
    let mut issues: Vec<Issue> = RULES
        .iter()
        .flat_map(|rule| rule(record, ctx))
        .collect();

    issues.sort_by(|a, b| a.severity.cmp(&b.severity).then(a.code.cmp(b.code)));
    issues
}

pub(crate) fn issue(
    record: &CrawlRecord,
    code: &'static str,
    category: IssueCategory,
    severity: Severity,
    weight: i32,
    message: String,
) -> Issue {
    Issue {
        url: record.url.clone(),
        code,
        message,
        severity,
        category,
        weight,
    }
}
