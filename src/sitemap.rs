//! Sitemap discovery and expansion.
//!
//! Sitemap URLs come from robots.txt declarations plus a fixed list of
//! common locations. Sitemap indexes are expanded recursively with depth and
//! total-URL guards so a hostile index cannot blow up the crawl seed set.

use sitemap::reader::{SiteMapEntity, SiteMapReader};
use std::collections::BTreeSet;
use std::io::Cursor;

use crate::config::Config;
use crate::network::HttpClient;
use crate::url_utils;

/// Outcome of sitemap resolution for a site.
#[derive(Debug, Clone, Default)]
pub struct SitemapResolution {
    /// Sitemap documents that were fetched successfully.
    pub sitemaps_found: Vec<String>,
    /// Every `<loc>` collected from URL-set sitemaps.
    pub urls: BTreeSet<String>,
}

/// Discover and expand all sitemaps for `base_url`.
///
/// `declared` holds the Sitemap directives from robots.txt; the common probe
/// paths are always tried as well, keeping any that return 2xx XML.
pub async fn resolve(http: &HttpClient, base_url: &str, declared: &[String]) -> SitemapResolution {
    let mut candidates: Vec<String> = declared.to_vec();

    for path in Config::SITEMAP_PROBE_PATHS {
        if let Some(probe) = url_utils::join_origin(base_url, path) {
            if !candidates.contains(&probe) {
                candidates.push(probe);
            }
        }
    }

    let mut resolution = SitemapResolution::default();
    let mut visited: BTreeSet<String> = BTreeSet::new();

    for candidate in candidates {
        expand(http, &candidate, 0, &mut visited, &mut resolution).await;
    }

    tracing::info!(
        sitemaps = resolution.sitemaps_found.len(),
        urls = resolution.urls.len(),
        "sitemap resolution complete"
    );

    resolution
}

/// Fetch and parse one sitemap document, recursing into index entries.
async fn expand(
    http: &HttpClient,
    sitemap_url: &str,
    depth: usize,
    visited: &mut BTreeSet<String>,
    resolution: &mut SitemapResolution,
) {
    if depth > Config::SITEMAP_MAX_DEPTH || resolution.urls.len() >= Config::SITEMAP_MAX_URLS {
        return;
    }
    if !visited.insert(sitemap_url.to_string()) {
        return;
    }

    let result = http.fetch(sitemap_url).await;
    if !result.is_success() || result.body.is_empty() {
        return;
    }

    let looks_like_xml = result.body.trim_start().starts_with('<');
    if !looks_like_xml {
        return;
    }

    let (urls, children) = parse_sitemap_xml(result.body.as_bytes());
    if urls.is_empty() && children.is_empty() {
        return;
    }

    resolution.sitemaps_found.push(sitemap_url.to_string());

    for url in urls {
        if resolution.urls.len() >= Config::SITEMAP_MAX_URLS {
            tracing::warn!(
                limit = Config::SITEMAP_MAX_URLS,
                "sitemap URL limit reached, truncating expansion"
            );
            return;
        }
        resolution.urls.insert(url);
    }

    for child in children {
        Box::pin(expand(http, &child, depth + 1, visited, resolution)).await;
    }
}

/// Parse sitemap XML into page URLs and nested sitemap URLs.
///
/// URL-set entries land in the first vector, sitemap-index entries in the
/// second. Invalid XML yields empty output rather than an error.
pub fn parse_sitemap_xml(xml: &[u8]) -> (Vec<String>, Vec<String>) {
    let mut urls = Vec::new();
    let mut children = Vec::new();

    let cursor = Cursor::new(xml);
    for entity in SiteMapReader::new(cursor) {
        match entity {
            SiteMapEntity::Url(url_entry) => {
                if let Some(url) = url_entry.loc.get_url() {
                    urls.push(url.to_string());
                }
            }
            SiteMapEntity::SiteMap(sitemap_entry) => {
                if let Some(url) = sitemap_entry.loc.get_url() {
                    children.push(url.to_string());
                }
            }
            _ => {}
        }
    }

    (urls, children)
}
