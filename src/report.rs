//! Report assembly.
//!
//! Shapes the two-part audit document (`audit_stats` and `audit_issues`)
//! from the aggregated crawl data. All maps are `BTreeMap` and all issue
//! lists are pre-sorted, so two runs against the same fixtures serialize to
//! byte-identical JSON.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Issue, IssueCategory, Severity};
use crate::scoring::SiteAggregates;
use crate::site_context::SiteContext;

#[derive(Debug, Clone, Serialize)]
pub struct SiteOverview {
    pub base_url: String,
    pub total_crawled_pages: usize,
    pub average_seo_score: f64,
    pub total_issues: usize,
    pub critical_issues_count: usize,
    pub high_issues_count: usize,
    pub medium_issues_count: usize,
    pub low_issues_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Crawlability {
    pub robots_txt_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robots_txt_content: Option<String>,
    pub sitemap_exists: bool,
    pub sitemaps_found: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditStats {
    pub site_overview: SiteOverview,
    pub crawlability: Crawlability,
    pub status_code_distribution: BTreeMap<String, usize>,
    pub technical_seo: BTreeMap<&'static str, usize>,
    pub onpage_seo: BTreeMap<&'static str, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuesSummary {
    pub critical: Vec<Issue>,
    pub high: Vec<Issue>,
    pub medium: Vec<Issue>,
    pub low: Vec<Issue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditIssues {
    pub site_overview: SiteOverview,
    pub crawlability: Crawlability,
    pub issues_summary: IssuesSummary,
    pub technical_seo: BTreeMap<&'static str, Vec<Issue>>,
    pub onpage_seo: BTreeMap<&'static str, Vec<Issue>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub audit_stats: AuditStats,
    pub audit_issues: AuditIssues,
    /// Wall-clock seconds from crawl start to aggregation end.
    pub execution_time: f64,
}

/// Build the final report document.
///
/// `issues` must already be globally sorted by (severity, code, url); the
/// caller owns that ordering so the report stays a pure shaping step.
pub fn build(
    base_url: &str,
    ctx: &SiteContext,
    aggregates: &SiteAggregates,
    issues: &[Issue],
    execution_time: f64,
) -> AuditReport {
    let overview = SiteOverview {
        base_url: base_url.to_string(),
        total_crawled_pages: aggregates.total_pages,
        average_seo_score: aggregates.average_score,
        total_issues: aggregates.total_issues,
        critical_issues_count: aggregates.severity_counts[&Severity::Critical],
        high_issues_count: aggregates.severity_counts[&Severity::High],
        medium_issues_count: aggregates.severity_counts[&Severity::Medium],
        low_issues_count: aggregates.severity_counts[&Severity::Low],
    };

    let crawlability = Crawlability {
        robots_txt_exists: ctx.robots.exists,
        robots_txt_content: ctx.robots.raw_text.clone(),
        sitemap_exists: !ctx.sitemaps_found.is_empty(),
        sitemaps_found: ctx.sitemaps_found.clone(),
    };

    let mut technical_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut onpage_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut technical_issues: BTreeMap<&'static str, Vec<Issue>> = BTreeMap::new();
    let mut onpage_issues: BTreeMap<&'static str, Vec<Issue>> = BTreeMap::new();
    let mut summary = IssuesSummary {
        critical: Vec::new(),
        high: Vec::new(),
        medium: Vec::new(),
        low: Vec::new(),
    };

    for issue in issues {
        match issue.category {
            IssueCategory::Technical => {
                *technical_counts.entry(issue.code).or_default() += 1;
                technical_issues
                    .entry(issue.code)
                    .or_default()
                    .push(issue.clone());
            }
            IssueCategory::Onpage => {
                *onpage_counts.entry(issue.code).or_default() += 1;
                onpage_issues
                    .entry(issue.code)
                    .or_default()
                    .push(issue.clone());
            }
        }

        match issue.severity {
            Severity::Critical => summary.critical.push(issue.clone()),
            Severity::High => summary.high.push(issue.clone()),
            Severity::Medium => summary.medium.push(issue.clone()),
            Severity::Low => summary.low.push(issue.clone()),
        }
    }

    AuditReport {
        audit_stats: AuditStats {
            site_overview: overview.clone(),
            crawlability: crawlability.clone(),
            status_code_distribution: aggregates.status_distribution.clone(),
            technical_seo: technical_counts,
            onpage_seo: onpage_counts,
        },
        audit_issues: AuditIssues {
            site_overview: overview,
            crawlability,
            issues_summary: summary,
            technical_seo: technical_issues,
            onpage_seo: onpage_issues,
        },
        execution_time,
    }
}
