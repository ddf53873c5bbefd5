//! Technical SEO checks: robots directives, redirects, HTTPS, canonicals,
//! structured data.

use std::collections::BTreeMap;

use super::issue;
use crate::models::{CrawlRecord, Issue, IssueCategory, Severity};
use crate::site_context::SiteContext;

const CAT: IssueCategory = IssueCategory::Technical;

pub(super) fn noindex_on_indexable(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    let Some(facts) = &record.facts else {
        return Vec::new();
    };

    if facts.has_noindex() {
        vec![issue(
            record,
            "noindex_on_indexable",
            CAT,
            Severity::Critical,
            -15,
            "Page carries a noindex directive".to_string(),
        )]
    } else {
        Vec::new()
    }
}

/// A chain loops when a hop URL repeats or the fetcher already classified it.
fn chain_has_loop(record: &CrawlRecord) -> bool {
    let mut seen = std::collections::BTreeSet::new();
    let repeated = record
        .fetch
        .redirect_chain
        .iter()
        .any(|hop| !seen.insert(hop.url.as_str()));
    repeated || record.fetch.error == Some(crate::models::FetchErrorKind::RedirectLoop)
}

pub(super) fn redirect_loop(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    let chain = &record.fetch.redirect_chain;

    if chain_has_loop(record) {
        vec![issue(
            record,
            "redirect_loop",
            CAT,
            Severity::Critical,
            -15,
            format!("Redirect loop detected after {} hop(s)", chain.len()),
        )]
    } else {
        Vec::new()
    }
}

pub(super) fn not_https(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    if record.fetch.final_url.starts_with("http://") {
        vec![issue(
            record,
            "not_https",
            CAT,
            Severity::Critical,
            -15,
            "Page is not served over HTTPS".to_string(),
        )]
    } else {
        Vec::new()
    }
}

/// Canonical checks are mutually exclusive per page: 404 target, homepage
/// target, then the generic different-URL case.
pub(super) fn canonical_rules(record: &CrawlRecord, ctx: &SiteContext) -> Vec<Issue> {
    let Some(facts) = &record.facts else {
        return Vec::new();
    };
    let Some(canonical_raw) = &facts.canonical else {
        return Vec::new();
    };
    let Some(canonical) = crate::url_utils::canonicalize(canonical_raw) else {
        return Vec::new();
    };

    if ctx.crawled_status(&canonical) == Some(404) {
        return vec![issue(
            record,
            "canonical_404",
            CAT,
            Severity::High,
            -12,
            format!("Canonical target returns 404: {canonical}"),
        )];
    }

    if canonical == ctx.homepage_url && record.url != ctx.homepage_url {
        return vec![issue(
            record,
            "canonical_to_homepage",
            CAT,
            Severity::High,
            -12,
            "Canonical points to the homepage instead of the current page".to_string(),
        )];
    }

    if canonical != record.url {
        return vec![issue(
            record,
            "canonical_different_url",
            CAT,
            Severity::Medium,
            -6,
            format!("Canonical points to a different URL: {canonical}"),
        )];
    }

    Vec::new()
}

pub(super) fn server_error_5xx(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    let status = record.fetch.status_code;
    if (500..=599).contains(&status) {
        vec![issue(
            record,
            "server_error_5xx",
            CAT,
            Severity::High,
            -12,
            format!("Server error: {status}"),
        )]
    } else {
        Vec::new()
    }
}

pub(super) fn redirect_chain_ends_404(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    if record.fetch.status_code == 404 && !record.fetch.redirect_chain.is_empty() {
        vec![issue(
            record,
            "redirect_chain_ends_404",
            CAT,
            Severity::High,
            -12,
            format!(
                "Redirect chain of {} hop(s) ends in 404",
                record.fetch.redirect_chain.len()
            ),
        )]
    } else {
        Vec::new()
    }
}

pub(super) fn mixed_content_js_css(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    let Some(facts) = &record.facts else {
        return Vec::new();
    };

    if facts.https && !facts.mixed_content.is_empty() {
        vec![issue(
            record,
            "mixed_content_js_css",
            CAT,
            Severity::High,
            -10,
            format!(
                "{} resource(s) loaded over HTTP from an HTTPS page",
                facts.mixed_content.len()
            ),
        )]
    } else {
        Vec::new()
    }
}

/// Meta robots and X-Robots-Tag disagree on index/noindex while both sources
/// are present.
pub(super) fn meta_robots_conflict(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    let Some(facts) = &record.facts else {
        return Vec::new();
    };

    let (Some(meta), Some(header)) = (&facts.meta_robots, &facts.x_robots) else {
        return Vec::new();
    };

    let meta_noindex = meta.iter().any(|t| t == "noindex");
    let header_noindex = header.iter().any(|t| t == "noindex");

    if meta_noindex != header_noindex {
        vec![issue(
            record,
            "meta_robots_conflict",
            CAT,
            Severity::Medium,
            -6,
            "Meta robots tag and X-Robots-Tag header disagree on noindex".to_string(),
        )]
    } else {
        Vec::new()
    }
}

pub(super) fn redirect_chain_too_long(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    // A looped chain is already flagged critical; length is noise on top.
    if chain_has_loop(record) {
        return Vec::new();
    }

    let hops = record.fetch.redirect_chain.len();
    if hops > 3 {
        vec![issue(
            record,
            "redirect_chain_too_long",
            CAT,
            Severity::Medium,
            -6,
            format!("Redirect chain too long ({hops} hops)"),
        )]
    } else {
        Vec::new()
    }
}

pub(super) fn redirect_302(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    if chain_has_loop(record) {
        return Vec::new();
    }

    if record
        .fetch
        .redirect_chain
        .iter()
        .any(|hop| hop.status == 302)
    {
        vec![issue(
            record,
            "redirect_302",
            CAT,
            Severity::Medium,
            -4,
            "Uses a 302 (temporary) redirect instead of 301".to_string(),
        )]
    } else {
        Vec::new()
    }
}

pub(super) fn nofollow_directive(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    let Some(facts) = &record.facts else {
        return Vec::new();
    };

    if facts.has_nofollow() {
        vec![issue(
            record,
            "nofollow_directive",
            CAT,
            Severity::Low,
            -3,
            "Page carries a nofollow directive".to_string(),
        )]
    } else {
        Vec::new()
    }
}

pub(super) fn structured_data_rules(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    let Some(facts) = &record.facts else {
        return Vec::new();
    };
    if !record.fetch.is_success() {
        return Vec::new();
    }

    if facts.structured_data.is_empty() {
        return vec![issue(
            record,
            "missing_structured_data",
            CAT,
            Severity::Low,
            -2,
            "No structured data found".to_string(),
        )];
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for block in &facts.structured_data {
        *counts.entry(block.type_label.as_str()).or_default() += 1;
    }

    if let Some((label, count)) = counts.iter().find(|(_, count)| **count > 1) {
        return vec![issue(
            record,
            "duplicate_structured_data",
            CAT,
            Severity::Low,
            -2,
            format!("Structured data type '{label}' appears {count} times"),
        )];
    }

    Vec::new()
}
