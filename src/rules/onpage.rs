//! On-page SEO checks: title, meta description, headings, images, links,
//! orphan detection.

use super::issue;
use crate::models::{CrawlRecord, Issue, IssueCategory, Severity};
use crate::site_context::SiteContext;

const CAT: IssueCategory = IssueCategory::Onpage;

/// Title lengths considered acceptable, in characters.
const TITLE_MIN: usize = 30;
const TITLE_MAX: usize = 70;
const DESCRIPTION_MIN: usize = 120;
const DESCRIPTION_MAX: usize = 160;
const MAX_INTERNAL_LINKS: usize = 100;
/// Penalty caps for the per-image rules.
const MISSING_ALT_CAP: usize = 3;
const EMPTY_ALT_CAP: usize = 2;

const TEMPLATE_TITLES: [&str; 4] = ["home", "page", "untitled", "new page"];

pub(super) fn title_rules(record: &CrawlRecord, ctx: &SiteContext) -> Vec<Issue> {
    let Some(facts) = &record.facts else {
        return Vec::new();
    };

    let Some(title) = &facts.title else {
        return vec![issue(
            record,
            "missing_title",
            CAT,
            Severity::High,
            -8,
            "Missing title tag".to_string(),
        )];
    };

    let title = title.trim();
    if title.is_empty() {
        return vec![issue(
            record,
            "title_empty",
            CAT,
            Severity::High,
            -8,
            "Title tag is empty".to_string(),
        )];
    }

    let mut issues = Vec::new();
    let len = title.chars().count();

    if len < TITLE_MIN {
        issues.push(issue(
            record,
            "title_too_short",
            CAT,
            Severity::Medium,
            -4,
            format!("Title too short ({len} chars, recommended {TITLE_MIN}-{TITLE_MAX})"),
        ));
    } else if len > TITLE_MAX {
        issues.push(issue(
            record,
            "title_too_long",
            CAT,
            Severity::Medium,
            -4,
            format!("Title too long ({len} chars, recommended {TITLE_MIN}-{TITLE_MAX})"),
        ));
    }

    let lowered = title.to_lowercase();
    if len < 20 && TEMPLATE_TITLES.iter().any(|t| lowered.contains(t)) {
        issues.push(issue(
            record,
            "title_template_default",
            CAT,
            Severity::Low,
            -3,
            "Title appears to be a template or default value".to_string(),
        ));
    }

    if ctx.has_duplicate_title(title) {
        issues.push(issue(
            record,
            "duplicate_title",
            CAT,
            Severity::Medium,
            -4,
            "Title duplicates another page's title".to_string(),
        ));
    }

    issues
}

pub(super) fn meta_description_rules(record: &CrawlRecord, ctx: &SiteContext) -> Vec<Issue> {
    let Some(facts) = &record.facts else {
        return Vec::new();
    };

    let Some(description) = &facts.meta_description else {
        return vec![issue(
            record,
            "missing_meta_description",
            CAT,
            Severity::High,
            -6,
            "Missing meta description".to_string(),
        )];
    };

    let description = description.trim();
    if description.is_empty() {
        return vec![issue(
            record,
            "meta_description_empty",
            CAT,
            Severity::High,
            -6,
            "Meta description is empty".to_string(),
        )];
    }

    let mut issues = Vec::new();
    let len = description.chars().count();

    if len < DESCRIPTION_MIN {
        issues.push(issue(
            record,
            "meta_description_too_short",
            CAT,
            Severity::Medium,
            -3,
            format!(
                "Meta description too short ({len} chars, recommended {DESCRIPTION_MIN}-{DESCRIPTION_MAX})"
            ),
        ));
    } else if len > DESCRIPTION_MAX {
        issues.push(issue(
            record,
            "meta_description_too_long",
            CAT,
            Severity::Medium,
            -3,
            format!(
                "Meta description too long ({len} chars, recommended {DESCRIPTION_MIN}-{DESCRIPTION_MAX})"
            ),
        ));
    }

    if ctx.has_duplicate_description(description) {
        issues.push(issue(
            record,
            "duplicate_description",
            CAT,
            Severity::Low,
            -2,
            "Meta description duplicates another page's description".to_string(),
        ));
    }

    issues
}

pub(super) fn heading_rules(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    let Some(facts) = &record.facts else {
        return Vec::new();
    };

    let h1_count = facts.headings.h1_count();

    if h1_count == 0 {
        return vec![issue(
            record,
            "no_h1",
            CAT,
            Severity::High,
            -6,
            "No H1 tag found".to_string(),
        )];
    }

    let mut issues = Vec::new();

    let matches_title = |h1: &String| {
        facts
            .title
            .as_deref()
            .map(|title| {
                !title.trim().is_empty()
                    && h1.trim().to_lowercase() == title.trim().to_lowercase()
            })
            .unwrap_or(false)
    };

    if h1_count > 1 {
        issues.push(issue(
            record,
            "multiple_h1",
            CAT,
            Severity::Medium,
            -4,
            format!("Multiple H1 tags found ({h1_count})"),
        ));

        // The identical-to-title case is defined for a single H1 only; with
        // several H1s a title match is an anomaly of its own.
        if facts.headings.h1_texts.iter().any(matches_title) {
            issues.push(issue(
                record,
                "h1_other",
                CAT,
                Severity::Medium,
                -3,
                "One of several H1 tags matches the title".to_string(),
            ));
        }
    }

    if h1_count == 1 {
        if facts.headings.h1_texts.first().is_some_and(matches_title) {
            issues.push(issue(
                record,
                "h1_identical_to_title",
                CAT,
                Severity::Low,
                -2,
                "H1 is identical to the title tag".to_string(),
            ));
        }
    }

    issues
}

pub(super) fn orphan_page(record: &CrawlRecord, ctx: &SiteContext) -> Vec<Issue> {
    if record.url == ctx.homepage_url {
        return Vec::new();
    }
    if !ctx.sitemap_urls.contains(&record.url) {
        return Vec::new();
    }

    if ctx.inbound_count(&record.url) == 0 {
        vec![issue(
            record,
            "orphan_page",
            CAT,
            Severity::High,
            -6,
            "Orphan page: listed in the sitemap but has no internal inbound links".to_string(),
        )]
    } else {
        Vec::new()
    }
}

/// One issue per offending image, capped so the per-page penalty is bounded.
pub(super) fn image_alt_rules(record: &CrawlRecord, _ctx: &SiteContext) -> Vec<Issue> {
    let Some(facts) = &record.facts else {
        return Vec::new();
    };

    let mut issues = Vec::new();

    let missing = facts
        .images
        .iter()
        .filter(|img| !img.is_svg && img.alt.is_none());
    for img in missing.take(MISSING_ALT_CAP) {
        issues.push(issue(
            record,
            "images_missing_alt",
            CAT,
            Severity::Medium,
            -4,
            format!("Image missing alt attribute: {}", img.src),
        ));
    }

    let empty = facts
        .images
        .iter()
        .filter(|img| !img.is_svg && img.alt.as_deref() == Some(""));
    for img in empty.take(EMPTY_ALT_CAP) {
        issues.push(issue(
            record,
            "images_empty_alt",
            CAT,
            Severity::Low,
            -2,
            format!("Image with empty alt attribute: {}", img.src),
        ));
    }

    issues
}

pub(super) fn internal_link_rules(record: &CrawlRecord, ctx: &SiteContext) -> Vec<Issue> {
    let Some(facts) = &record.facts else {
        return Vec::new();
    };

    let mut issues = Vec::new();

    let mut broken = 0usize;
    let mut redirected = 0usize;
    let mut internal_count = 0usize;

    for link in facts.internal_links() {
        internal_count += 1;
        let Some(target) = crate::url_utils::canonicalize(&link.href_absolute) else {
            continue;
        };
        match ctx.crawled_status(&target) {
            Some(status) if status >= 400 => broken += 1,
            Some(status) if (300..400).contains(&status) => redirected += 1,
            _ => {}
        }
    }

    if broken > 0 {
        issues.push(issue(
            record,
            "broken_internal_links",
            CAT,
            Severity::Medium,
            -4,
            format!("{broken} internal link(s) target broken pages"),
        ));
    }

    if internal_count > MAX_INTERNAL_LINKS {
        issues.push(issue(
            record,
            "excessive_internal_links",
            CAT,
            Severity::Low,
            -2,
            format!("Excessive internal links ({internal_count}, recommended under {MAX_INTERNAL_LINKS})"),
        ));
    }

    if facts
        .links
        .iter()
        .any(|l| l.anchor_text.trim().is_empty() && l.aria_label.is_none())
    {
        issues.push(issue(
            record,
            "link_without_anchor_text",
            CAT,
            Severity::Low,
            -2,
            "Link without anchor text or aria-label".to_string(),
        ));
    }

    if redirected > 0 {
        issues.push(issue(
            record,
            "internal_links_other",
            CAT,
            Severity::Low,
            -2,
            format!("{redirected} internal link(s) target redirecting URLs"),
        ));
    }

    issues
}
