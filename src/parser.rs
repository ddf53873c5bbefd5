//! HTML fact extraction.
//!
//! Turns a fetched HTML body into [`PageFacts`]: head tags, headings, images,
//! links, structured data, and mixed-content references. Parsing is lenient;
//! malformed HTML yields best-effort facts and never fails the pipeline.

use scraper::{Html, Selector};
use std::sync::OnceLock;

use crate::models::{
    FetchResult, HeadingFacts, ImageFact, LinkFact, PageFacts, StructuredDataFact,
    StructuredDataKind,
};
use crate::url_utils;

macro_rules! selector {
    ($name:ident, $css:expr) => {{
        static $name: OnceLock<Selector> = OnceLock::new();
        $name.get_or_init(|| Selector::parse($css).expect("valid selector"))
    }};
}

/// Extract facts from an HTML fetch result.
///
/// `base_host` drives internal/external link classification.
pub fn parse(fetch: &FetchResult, base_host: &str) -> PageFacts {
    let document = Html::parse_document(&fetch.body);
    let base_url = &fetch.final_url;
    let https = fetch.final_url.starts_with("https://");

    let mut facts = PageFacts {
        https,
        ..Default::default()
    };

    extract_head(&document, base_url, &mut facts);
    facts.x_robots = fetch
        .header("x-robots-tag")
        .map(|v| split_tokens(v));
    extract_headings(&document, &mut facts.headings);
    facts.images = extract_images(&document, base_url);
    facts.links = extract_links(&document, base_url, base_host);
    facts.structured_data = extract_structured_data(&document);
    if https {
        facts.mixed_content = extract_mixed_content(&document);
    }

    facts
}

fn split_tokens(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn extract_head(document: &Html, base_url: &str, facts: &mut PageFacts) {
    facts.title = document
        .select(selector!(TITLE, "head title"))
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string());

    facts.meta_description = document
        .select(selector!(META_DESC, r#"meta[name="description"]"#))
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string());

    facts.canonical = document
        .select(selector!(CANONICAL, r#"link[rel="canonical"]"#))
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| url_utils::resolve(href, base_url));

    facts.meta_robots = document
        .select(selector!(META_ROBOTS, r#"meta[name="robots"]"#))
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(split_tokens);

    facts.viewport_present = document
        .select(selector!(VIEWPORT, r#"meta[name="viewport"]"#))
        .next()
        .is_some();

    facts.lang_attr = document
        .select(selector!(HTML_EL, "html"))
        .next()
        .and_then(|el| el.value().attr("lang"))
        .map(|s| s.to_string());

    facts.charset = document
        .select(selector!(META_CHARSET, "meta[charset]"))
        .next()
        .and_then(|el| el.value().attr("charset"))
        .map(|s| s.to_ascii_lowercase());
}

fn extract_headings(document: &Html, headings: &mut HeadingFacts) {
    const LEVELS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

    for (index, level) in LEVELS.iter().enumerate() {
        let selector = Selector::parse(level).expect("valid selector");
        for el in document.select(&selector) {
            let text = el.text().collect::<String>().trim().to_string();
            // Headings with blank text do not count.
            if text.is_empty() {
                continue;
            }
            headings.counts[index] += 1;
            if index == 0 {
                headings.h1_texts.push(text);
            }
        }
    }
}

fn extract_images(document: &Html, base_url: &str) -> Vec<ImageFact> {
    let mut images = Vec::new();

    for el in document.select(selector!(IMG, "img")) {
        let src_raw = el.value().attr("src").unwrap_or("").trim();
        let src = url_utils::resolve(src_raw, base_url).unwrap_or_else(|| src_raw.to_string());
        let is_svg = src
            .split(['?', '#'])
            .next()
            .map(|path| path.to_ascii_lowercase().ends_with(".svg"))
            .unwrap_or(false);

        images.push(ImageFact {
            src,
            alt: el.value().attr("alt").map(|s| s.to_string()),
            width: el.value().attr("width").map(|s| s.to_string()),
            height: el.value().attr("height").map(|s| s.to_string()),
            is_svg,
        });
    }

    images
}

fn extract_links(document: &Html, base_url: &str, base_host: &str) -> Vec<LinkFact> {
    let mut links = Vec::new();

    for el in document.select(selector!(ANCHOR, "a[href]")) {
        let href = el.value().attr("href").unwrap_or("").trim();
        if href.is_empty()
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("data:")
        {
            continue;
        }

        let absolute = match url_utils::resolve(href, base_url) {
            Some(abs) => abs,
            None => continue,
        };

        let rel_tokens = el
            .value()
            .attr("rel")
            .map(|rel| {
                rel.split_whitespace()
                    .map(|t| t.to_ascii_lowercase())
                    .collect()
            })
            .unwrap_or_default();

        links.push(LinkFact {
            is_internal: url_utils::is_internal(&absolute, base_host),
            anchor_text: el.text().collect::<String>().trim().to_string(),
            aria_label: el.value().attr("aria-label").map(|s| s.to_string()),
            rel_tokens,
            href_absolute: absolute,
        });
    }

    links
}

fn extract_structured_data(document: &Html) -> Vec<StructuredDataFact> {
    let mut blocks = Vec::new();

    for el in document.select(selector!(JSONLD, r#"script[type="application/ld+json"]"#)) {
        let raw = el.text().collect::<String>();
        for label in jsonld_type_labels(&raw) {
            blocks.push(StructuredDataFact {
                kind: StructuredDataKind::JsonLd,
                type_label: label,
            });
        }
    }

    for el in document.select(selector!(MICRODATA, "[itemscope]")) {
        let label = el
            .value()
            .attr("itemtype")
            .map(|t| t.rsplit('/').next().unwrap_or(t).to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        blocks.push(StructuredDataFact {
            kind: StructuredDataKind::Microdata,
            type_label: label,
        });
    }

    for el in document.select(selector!(RDFA, "[typeof]")) {
        let label = el
            .value()
            .attr("typeof")
            .unwrap_or("Unknown")
            .to_string();
        blocks.push(StructuredDataFact {
            kind: StructuredDataKind::Rdfa,
            type_label: label,
        });
    }

    blocks
}

/// Pull `@type` labels out of a JSON-LD block. A top-level `@graph` wraps a
/// list of entities; otherwise the block itself is the entity.
fn jsonld_type_labels(raw: &str) -> Vec<String> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return vec!["Invalid".to_string()],
    };

    let entities: Vec<&serde_json::Value> = match &value {
        serde_json::Value::Array(items) => items.iter().collect(),
        serde_json::Value::Object(map) => match map.get("@graph") {
            Some(serde_json::Value::Array(items)) => items.iter().collect(),
            _ => vec![&value],
        },
        _ => return vec!["Unknown".to_string()],
    };

    entities
        .iter()
        .map(|entity| match entity.get("@type") {
            Some(serde_json::Value::String(t)) => t.clone(),
            Some(serde_json::Value::Array(types)) => types
                .first()
                .and_then(|t| t.as_str())
                .unwrap_or("Unknown")
                .to_string(),
            _ => "Unknown".to_string(),
        })
        .collect()
}

/// HTTP-scheme subresources referenced from an HTTPS page.
fn extract_mixed_content(document: &Html) -> Vec<String> {
    let mut found = Vec::new();

    for el in document.select(selector!(SCRIPT_SRC, "script[src]")) {
        if let Some(src) = el.value().attr("src") {
            if src.starts_with("http://") {
                found.push(src.to_string());
            }
        }
    }

    for el in document.select(selector!(STYLESHEET, r#"link[href]"#)) {
        let is_stylesheet = el
            .value()
            .attr("rel")
            .map(|rel| rel.to_ascii_lowercase().split_whitespace().any(|t| t == "stylesheet"))
            .unwrap_or(false);
        if !is_stylesheet {
            continue;
        }
        if let Some(href) = el.value().attr("href") {
            if href.starts_with("http://") {
                found.push(href.to_string());
            }
        }
    }

    for el in document.select(selector!(IMG_SRC, "img[src]")) {
        if let Some(src) = el.value().attr("src") {
            if src.starts_with("http://") {
                found.push(src.to_string());
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn html_fetch(url: &str, body: &str) -> FetchResult {
        let mut headers = BTreeMap::new();
        headers.insert(
            "content-type".to_string(),
            "text/html; charset=utf-8".to_string(),
        );
        FetchResult {
            final_url: url.to_string(),
            status_code: 200,
            headers,
            body: body.to_string(),
            body_truncated: false,
            redirect_chain: Vec::new(),
            elapsed_ms: 5,
            error: None,
        }
    }

    #[test]
    fn test_head_extraction() {
        let body = r#"<html lang="en"><head>
            <meta charset="UTF-8">
            <title>  Example Title  </title>
            <meta name="description" content="A description.">
            <meta name="viewport" content="width=device-width, initial-scale=1">
            <meta name="robots" content="NOINDEX, nofollow">
            <link rel="canonical" href="/canonical-page">
        </head><body></body></html>"#;
        let fetch = html_fetch("https://example.com/page", body);
        let facts = parse(&fetch, "example.com");

        assert_eq!(facts.title.as_deref(), Some("Example Title"));
        assert_eq!(facts.meta_description.as_deref(), Some("A description."));
        assert_eq!(
            facts.canonical.as_deref(),
            Some("https://example.com/canonical-page")
        );
        assert_eq!(
            facts.meta_robots,
            Some(vec!["noindex".to_string(), "nofollow".to_string()])
        );
        assert!(facts.viewport_present);
        assert_eq!(facts.lang_attr.as_deref(), Some("en"));
        assert_eq!(facts.charset.as_deref(), Some("utf-8"));
        assert!(facts.https);
    }

    #[test]
    fn test_x_robots_header() {
        let mut fetch = html_fetch("https://example.com/", "<html></html>");
        fetch
            .headers
            .insert("x-robots-tag".to_string(), "noindex, noarchive".to_string());
        let facts = parse(&fetch, "example.com");
        assert_eq!(
            facts.x_robots,
            Some(vec!["noindex".to_string(), "noarchive".to_string()])
        );
        assert!(facts.has_noindex());
    }

    #[test]
    fn test_headings() {
        let body = "<h1>First</h1><h1> Second </h1><h2>Sub</h2><h3>Deep</h3>";
        let fetch = html_fetch("https://example.com/", body);
        let facts = parse(&fetch, "example.com");

        assert_eq!(facts.headings.h1_count(), 2);
        assert_eq!(facts.headings.counts[1], 1);
        assert_eq!(facts.headings.counts[2], 1);
        assert_eq!(facts.headings.h1_texts, vec!["First", "Second"]);
    }

    #[test]
    fn test_blank_headings_not_counted() {
        let body = "<h1>   </h1><h1>Real heading</h1><h2></h2>";
        let fetch = html_fetch("https://example.com/", body);
        let facts = parse(&fetch, "example.com");

        assert_eq!(facts.headings.h1_count(), 1);
        assert_eq!(facts.headings.h1_texts, vec!["Real heading"]);
        assert_eq!(facts.headings.counts[1], 0);
    }

    #[test]
    fn test_images_and_svg_flag() {
        let body = r#"
            <img src="/a.png" alt="A picture">
            <img src="/b.png" alt="">
            <img src="/c.png">
            <img src="/icon.svg">
        "#;
        let fetch = html_fetch("https://example.com/", body);
        let facts = parse(&fetch, "example.com");

        assert_eq!(facts.images.len(), 4);
        assert_eq!(facts.images[0].alt.as_deref(), Some("A picture"));
        assert_eq!(facts.images[1].alt.as_deref(), Some(""));
        assert!(facts.images[2].alt.is_none());
        assert!(facts.images[3].is_svg);
        assert!(!facts.images[0].is_svg);
    }

    #[test]
    fn test_links_classification() {
        let body = r#"
            <a href="/internal">Internal page</a>
            <a href="https://other.com/out" rel="nofollow noopener">External</a>
            <a href="/no-text" aria-label="labeled"></a>
            <a href="mailto:x@example.com">Mail</a>
        "#;
        let fetch = html_fetch("https://example.com/dir/", body);
        let facts = parse(&fetch, "example.com");

        assert_eq!(facts.links.len(), 3);
        assert!(facts.links[0].is_internal);
        assert_eq!(facts.links[0].href_absolute, "https://example.com/internal");
        assert!(!facts.links[1].is_internal);
        assert_eq!(facts.links[1].rel_tokens, vec!["nofollow", "noopener"]);
        assert_eq!(facts.links[2].aria_label.as_deref(), Some("labeled"));
        assert!(facts.links[2].anchor_text.is_empty());
    }

    #[test]
    fn test_structured_data() {
        let body = r#"
            <script type="application/ld+json">{"@context":"https://schema.org","@type":"Organization"}</script>
            <script type="application/ld+json">{"@graph":[{"@type":"WebSite"},{"@type":"WebPage"}]}</script>
            <div itemscope itemtype="https://schema.org/Product"></div>
            <div typeof="Person"></div>
        "#;
        let fetch = html_fetch("https://example.com/", body);
        let facts = parse(&fetch, "example.com");

        let labels: Vec<&str> = facts
            .structured_data
            .iter()
            .map(|b| b.type_label.as_str())
            .collect();
        assert_eq!(labels, vec!["Organization", "WebSite", "WebPage", "Product", "Person"]);
        assert_eq!(facts.structured_data[0].kind, StructuredDataKind::JsonLd);
        assert_eq!(facts.structured_data[3].kind, StructuredDataKind::Microdata);
        assert_eq!(facts.structured_data[4].kind, StructuredDataKind::Rdfa);
    }

    #[test]
    fn test_mixed_content_only_on_https() {
        let body = r#"
            <script src="http://cdn.example.com/app.js"></script>
            <link rel="stylesheet" href="http://cdn.example.com/style.css">
            <img src="http://cdn.example.com/pic.jpg">
            <img src="https://cdn.example.com/safe.jpg">
        "#;
        let fetch = html_fetch("https://example.com/", body);
        let facts = parse(&fetch, "example.com");
        assert_eq!(facts.mixed_content.len(), 3);

        let http_fetch = html_fetch("http://example.com/", body);
        let facts = parse(&http_fetch, "example.com");
        assert!(facts.mixed_content.is_empty());
        assert!(!facts.https);
    }

    #[test]
    fn test_malformed_html_is_best_effort() {
        let body = "<html><head><title>Broken</title><body><h1>Still here";
        let fetch = html_fetch("https://example.com/", body);
        let facts = parse(&fetch, "example.com");
        assert!(facts.title.is_some());
        assert_eq!(facts.headings.h1_count(), 1);
    }

    #[test]
    fn test_missing_title_vs_empty_title() {
        let fetch = html_fetch("https://example.com/", "<html><head></head></html>");
        let facts = parse(&fetch, "example.com");
        assert!(facts.title.is_none());

        let fetch = html_fetch(
            "https://example.com/",
            "<html><head><title>   </title></head></html>",
        );
        let facts = parse(&fetch, "example.com");
        assert_eq!(facts.title.as_deref(), Some(""));
    }
}
