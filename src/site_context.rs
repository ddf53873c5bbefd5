//! Site-wide context built once after the crawl completes.
//!
//! Cross-page joins (duplicate titles/descriptions, inbound-link counts,
//! crawled status by URL) are computed in a single pass here rather than
//! online during the crawl, so rule evaluation stays a pure function.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::CrawlRecord;
use crate::robots::RobotsTxt;

#[derive(Debug, Clone, Default)]
pub struct SiteContext {
    pub base_host: String,
    pub homepage_url: String,
    /// Normalized title -> URLs sharing it (only entries with more than one URL).
    pub duplicate_titles: BTreeMap<String, BTreeSet<String>>,
    /// Normalized description -> URLs sharing it (only entries with more than one URL).
    pub duplicate_descriptions: BTreeMap<String, BTreeSet<String>>,
    /// URL -> count of distinct crawled pages linking to it (internal links only).
    pub inbound_links: BTreeMap<String, usize>,
    /// Terminal status by crawled canonical URL.
    pub status_by_url: BTreeMap<String, u16>,
    /// URLs declared in any discovered sitemap (canonicalized).
    pub sitemap_urls: BTreeSet<String>,
    pub robots: RobotsTxt,
    pub sitemaps_found: Vec<String>,
    /// GET /llms.txt returned 2xx.
    pub llms_txt_exists: bool,
}

/// Case-insensitive, whitespace-collapsed key for duplicate grouping.
pub fn normalize_for_duplicates(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl SiteContext {
    pub fn build(
        base_host: &str,
        homepage_url: &str,
        records: &[CrawlRecord],
        sitemap_urls: BTreeSet<String>,
        sitemaps_found: Vec<String>,
        robots: RobotsTxt,
        llms_txt_exists: bool,
    ) -> Self {
        let mut titles: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut descriptions: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut inbound: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut status_by_url = BTreeMap::new();

        for record in records {
            status_by_url.insert(record.url.clone(), record.fetch.status_code);

            let facts = match &record.facts {
                Some(f) => f,
                None => continue,
            };

            if let Some(title) = facts.title.as_deref().filter(|t| !t.trim().is_empty()) {
                titles
                    .entry(normalize_for_duplicates(title))
                    .or_default()
                    .insert(record.url.clone());
            }

            if let Some(desc) = facts
                .meta_description
                .as_deref()
                .filter(|d| !d.trim().is_empty())
            {
                descriptions
                    .entry(normalize_for_duplicates(desc))
                    .or_default()
                    .insert(record.url.clone());
            }

            for link in facts.internal_links() {
                if let Some(target) = crate::url_utils::canonicalize(&link.href_absolute) {
                    // Self-links do not make a page non-orphan.
                    if target != record.url {
                        inbound.entry(target).or_default().insert(record.url.clone());
                    }
                }
            }
        }

        titles.retain(|_, urls| urls.len() > 1);
        descriptions.retain(|_, urls| urls.len() > 1);

        let inbound_links = inbound
            .into_iter()
            .map(|(url, sources)| (url, sources.len()))
            .collect();

        Self {
            base_host: base_host.to_string(),
            homepage_url: homepage_url.to_string(),
            duplicate_titles: titles,
            duplicate_descriptions: descriptions,
            inbound_links,
            status_by_url,
            sitemap_urls,
            robots,
            sitemaps_found,
            llms_txt_exists,
        }
    }

    pub fn inbound_count(&self, url: &str) -> usize {
        self.inbound_links.get(url).copied().unwrap_or(0)
    }

    pub fn crawled_status(&self, url: &str) -> Option<u16> {
        self.status_by_url.get(url).copied()
    }

    pub fn has_duplicate_title(&self, title: &str) -> bool {
        self.duplicate_titles
            .contains_key(&normalize_for_duplicates(title))
    }

    pub fn has_duplicate_description(&self, description: &str) -> bool {
        self.duplicate_descriptions
            .contains_key(&normalize_for_duplicates(description))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FetchResult, LinkFact, PageFacts};
    use std::collections::BTreeMap as HeaderMap;

    fn record(url: &str, title: Option<&str>, links_to: &[&str]) -> CrawlRecord {
        let facts = PageFacts {
            title: title.map(|t| t.to_string()),
            links: links_to
                .iter()
                .map(|target| LinkFact {
                    href_absolute: target.to_string(),
                    anchor_text: "link".to_string(),
                    rel_tokens: Vec::new(),
                    aria_label: None,
                    is_internal: true,
                })
                .collect(),
            ..Default::default()
        };

        CrawlRecord {
            url: url.to_string(),
            fetch: FetchResult {
                final_url: url.to_string(),
                status_code: 200,
                headers: HeaderMap::new(),
                body: String::new(),
                body_truncated: false,
                redirect_chain: Vec::new(),
                elapsed_ms: 1,
                error: None,
            },
            facts: Some(facts),
        }
    }

    fn build(records: &[CrawlRecord]) -> SiteContext {
        SiteContext::build(
            "a.test",
            "https://a.test/",
            records,
            BTreeSet::new(),
            Vec::new(),
            RobotsTxt::default(),
            false,
        )
    }

    #[test]
    fn test_duplicate_titles_need_two_urls() {
        let records = vec![
            record("https://a.test/", Some("Home"), &[]),
            record("https://a.test/a", Some("  home "), &[]),
            record("https://a.test/b", Some("Unique"), &[]),
        ];
        let ctx = build(&records);

        assert!(ctx.has_duplicate_title("Home"));
        assert!(ctx.has_duplicate_title("HOME"));
        assert!(!ctx.has_duplicate_title("Unique"));
    }

    #[test]
    fn test_inbound_counts_distinct_sources() {
        let records = vec![
            record("https://a.test/", None, &["https://a.test/x", "https://a.test/x"]),
            record("https://a.test/y", None, &["https://a.test/x"]),
            record("https://a.test/x", None, &["https://a.test/x"]),
        ];
        let ctx = build(&records);

        // Two distinct sources; the duplicate link and the self-link do not count.
        assert_eq!(ctx.inbound_count("https://a.test/x"), 2);
        assert_eq!(ctx.inbound_count("https://a.test/unlinked"), 0);
    }

    #[test]
    fn test_status_map() {
        let mut rec = record("https://a.test/gone", None, &[]);
        rec.fetch.status_code = 404;
        let ctx = build(&[rec]);
        assert_eq!(ctx.crawled_status("https://a.test/gone"), Some(404));
        assert_eq!(ctx.crawled_status("https://a.test/other"), None);
    }

    #[test]
    fn test_empty_titles_not_grouped() {
        let records = vec![
            record("https://a.test/", Some(""), &[]),
            record("https://a.test/a", Some(""), &[]),
        ];
        let ctx = build(&records);
        assert!(ctx.duplicate_titles.is_empty());
    }
}
