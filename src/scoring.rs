//! Scoring and site-wide aggregation.
//!
//! Page scores start at 100 and take each scored issue's weight once (the
//! image rules are pre-capped at emission), with a floor of 20.

use std::collections::BTreeMap;

use crate::models::{CrawlRecord, Issue, PageScore, Severity};

pub const BASE_SCORE: i32 = 100;
pub const MIN_SCORE: i32 = 20;

/// Score one page from its issue list.
pub fn score_page(url: &str, issues: &[Issue]) -> PageScore {
    let penalty_total: i32 = issues.iter().map(|i| i.weight).sum();
    let score = (BASE_SCORE + penalty_total).max(MIN_SCORE);

    PageScore {
        url: url.to_string(),
        penalty_total,
        score,
    }
}

/// Aggregated site metrics for the report.
#[derive(Debug, Clone, Default)]
pub struct SiteAggregates {
    pub total_pages: usize,
    /// Mean of per-page scores, rounded to two decimals. No extra scaling.
    pub average_score: f64,
    pub total_issues: usize,
    pub severity_counts: BTreeMap<Severity, usize>,
    /// Status (or `network_error`/`timeout` pseudo-status) -> page count.
    pub status_distribution: BTreeMap<String, usize>,
}

pub fn aggregate(
    records: &[CrawlRecord],
    scores: &[PageScore],
    issues: &[Issue],
) -> SiteAggregates {
    let average_score = if scores.is_empty() {
        0.0
    } else {
        let sum: i64 = scores.iter().map(|s| s.score as i64).sum();
        let mean = sum as f64 / scores.len() as f64;
        (mean * 100.0).round() / 100.0
    };

    let mut severity_counts: BTreeMap<Severity, usize> = BTreeMap::new();
    for severity in Severity::ALL {
        severity_counts.insert(severity, 0);
    }
    for issue in issues {
        *severity_counts.entry(issue.severity).or_default() += 1;
    }

    let mut status_distribution: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        let key = match record.fetch.error {
            Some(kind) => kind.pseudo_status().to_string(),
            None => record.fetch.status_code.to_string(),
        };
        *status_distribution.entry(key).or_default() += 1;
    }

    SiteAggregates {
        total_pages: records.len(),
        average_score,
        total_issues: issues.len(),
        severity_counts,
        status_distribution,
    }
}
