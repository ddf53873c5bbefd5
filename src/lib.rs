//! Site-Auditor: a website SEO audit engine
//!
//! Crawls a site from a seed URL, evaluates every reachable page against a
//! fixed catalog of technical and on-page SEO rules, and produces a scored,
//! severity-ranked report.

pub mod audit;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod export;
pub mod logging;
pub mod models;
pub mod network;
pub mod parser;
pub mod rate_limit;
pub mod report;
pub mod robots;
pub mod rules;
pub mod scoring;
pub mod sitemap;
pub mod site_context;
pub mod url_utils;

use thiserror::Error;

/// Errors that abort an audit before or during setup. Per-URL fetch failures
/// are not errors; they are recorded on the crawl records.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("invalid_url: {0}")]
    InvalidUrl(String),

    #[error("invalid_max_pages: {0}")]
    InvalidMaxPages(usize),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

// Re-export main types for library usage
pub use audit::{audit, AuditOptions};
pub use crawler::{Crawler, CrawlerConfig, CrawlStats};
pub use models::{CrawlRecord, FetchResult, Issue, PageFacts, PageScore, Severity};
pub use network::HttpClient;
pub use report::AuditReport;
pub use robots::RobotsTxt;
pub use site_context::SiteContext;
