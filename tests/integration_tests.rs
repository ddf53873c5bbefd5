//! End-to-end pipeline tests: fixture fetch results run through the parser,
//! site-context build, rule evaluation, scoring, and report assembly.

use std::collections::{BTreeMap, BTreeSet};

use site_auditor::audit::evaluate_site;
use site_auditor::models::{
    CrawlRecord, FetchErrorKind, FetchResult, PageScore, RedirectHop, Severity,
};
use site_auditor::robots::RobotsTxt;
use site_auditor::site_context::SiteContext;
use site_auditor::{parser, report, scoring, url_utils};

fn html_fetch(url: &str, body: &str) -> FetchResult {
    let mut headers = BTreeMap::new();
    headers.insert(
        "content-type".to_string(),
        "text/html; charset=utf-8".to_string(),
    );
    headers.insert("cache-control".to_string(), "max-age=600".to_string());
    headers.insert("content-encoding".to_string(), "gzip".to_string());

    FetchResult {
        final_url: url.to_string(),
        status_code: 200,
        headers,
        body: body.to_string(),
        body_truncated: false,
        redirect_chain: Vec::new(),
        elapsed_ms: 12,
        error: None,
    }
}

/// Build a crawl record the way the crawler does: fetch, then parse.
fn page(url: &str, body: &str) -> CrawlRecord {
    let fetch = html_fetch(url, body);
    let base_host = url_utils::extract_host(url).unwrap();
    let facts = parser::parse(&fetch, &base_host);

    CrawlRecord {
        url: url_utils::canonicalize(url).unwrap(),
        fetch,
        facts: Some(facts),
    }
}

fn build_ctx(homepage: &str, records: &[CrawlRecord], sitemap_urls: &[&str]) -> SiteContext {
    let base_host = url_utils::extract_host(homepage).unwrap();
    let sitemap_set: BTreeSet<String> = sitemap_urls
        .iter()
        .filter_map(|u| url_utils::canonicalize(u))
        .collect();
    let sitemaps_found = if sitemap_urls.is_empty() {
        Vec::new()
    } else {
        vec![format!("{homepage}sitemap.xml")]
    };

    SiteContext::build(
        &base_host,
        homepage,
        records,
        sitemap_set,
        sitemaps_found,
        RobotsTxt::parse("User-agent: *\nDisallow:\n"),
        true,
    )
}

fn score_of<'a>(scores: &'a [PageScore], url: &str) -> &'a PageScore {
    scores.iter().find(|s| s.url == url).unwrap()
}

/// A page with one short title and nothing else wrong scores 96.
#[test]
fn test_all_green_single_page() {
    let body = format!(
        r#"<html lang="en"><head>
            <meta charset="utf-8">
            <title>Welcome to A</title>
            <meta name="description" content="{}">
            <meta name="viewport" content="width=device-width, initial-scale=1">
            <link rel="canonical" href="https://a.test/">
            <script type="application/ld+json">{{"@context":"https://schema.org","@type":"Organization"}}</script>
        </head><body>
            <h1>Welcome</h1>
            <img src="/hero.png" alt="Our storefront">
        </body></html>"#,
        "d".repeat(140)
    );

    let records = vec![page("https://a.test/", &body)];
    let ctx = build_ctx("https://a.test/", &records, &["https://a.test/"]);

    let (scores, issues) = evaluate_site(&records, &ctx);

    let score = score_of(&scores, "https://a.test/");
    assert_eq!(score.score, 96, "issues: {:?}", issues);
    assert_eq!(score.penalty_total, -4);

    assert!(issues.iter().any(|i| i.code == "title_too_short"));
    assert!(!issues
        .iter()
        .any(|i| matches!(i.severity, Severity::Critical | Severity::High)));
}

/// A non-HTTPS homepage loses exactly the not_https penalty.
#[test]
fn test_not_https_homepage() {
    let body = format!(
        r#"<html lang="en"><head>
            <title>{}</title>
            <meta name="description" content="{}">
            <meta name="viewport" content="width=device-width">
            <link rel="canonical" href="http://b.test/">
            <script type="application/ld+json">{{"@type":"WebSite"}}</script>
        </head><body><h1>About our work</h1></body></html>"#,
        "t".repeat(40),
        "d".repeat(140)
    );

    let records = vec![page("http://b.test/", &body)];
    let ctx = build_ctx("http://b.test/", &records, &["http://b.test/"]);

    let (scores, issues) = evaluate_site(&records, &ctx);

    let score = score_of(&scores, "http://b.test/");
    assert_eq!(score.score, 85, "issues: {:?}", issues);

    let criticals: Vec<_> = issues
        .iter()
        .filter(|i| i.severity == Severity::Critical)
        .collect();
    assert_eq!(criticals.len(), 1);
    assert_eq!(criticals[0].code, "not_https");
}

/// A redirect loop yields one record flagged redirect_loop, score 85, and no
/// piggy-backed redirect issues.
#[test]
fn test_redirect_loop() {
    let record = CrawlRecord {
        url: "https://c.test/a".to_string(),
        fetch: FetchResult {
            final_url: "https://c.test/a".to_string(),
            status_code: 0,
            headers: BTreeMap::new(),
            body: String::new(),
            body_truncated: false,
            redirect_chain: vec![
                RedirectHop {
                    url: "https://c.test/a".to_string(),
                    status: 302,
                },
                RedirectHop {
                    url: "https://c.test/b".to_string(),
                    status: 302,
                },
            ],
            elapsed_ms: 40,
            error: Some(FetchErrorKind::RedirectLoop),
        },
        facts: None,
    };

    let records = vec![record];
    let ctx = build_ctx("https://c.test/", &records, &[]);
    let (scores, issues) = evaluate_site(&records, &ctx);

    assert_eq!(score_of(&scores, "https://c.test/a").score, 85);

    let codes: Vec<_> = issues.iter().map(|i| i.code).collect();
    assert!(codes.contains(&"redirect_loop"));
    assert!(!codes.contains(&"redirect_302"));
    assert!(!codes.contains(&"redirect_chain_too_long"));
}

/// Three pages sharing a title each get duplicate_title at -4.
#[test]
fn test_duplicate_titles_across_site() {
    let body = |extra: &str| {
        format!(
            r#"<html><head><title>Home</title></head><body><h1>H</h1>{extra}</body></html>"#
        )
    };

    let records = vec![
        page("https://d.test/", &body("")),
        page("https://d.test/a", &body("<p>a</p>")),
        page("https://d.test/b", &body("<p>b</p>")),
    ];
    let ctx = build_ctx("https://d.test/", &records, &[]);
    let (_, issues) = evaluate_site(&records, &ctx);

    let duplicates: Vec<_> = issues.iter().filter(|i| i.code == "duplicate_title").collect();
    assert_eq!(duplicates.len(), 3);
    for issue in duplicates {
        assert_eq!(issue.weight, -4);
        assert_eq!(issue.severity, Severity::Medium);
    }
}

/// Only the sitemap-listed page with zero inbound links is an orphan; the
/// homepage never is.
#[test]
fn test_orphan_in_sitemap() {
    let homepage_body = r#"<html><head><title>A site homepage with links</title></head>
        <body><h1>Hi</h1>
        <a href="/a">page a</a>
        <a href="/b">page b</a>
        </body></html>"#;
    let leaf = r#"<html><head><title>A leaf page on this site</title></head><body><h1>Leaf</h1></body></html>"#;

    let records = vec![
        page("https://e.test/", homepage_body),
        page("https://e.test/a", leaf),
        page("https://e.test/b", leaf),
        page("https://e.test/c", leaf),
    ];
    let ctx = build_ctx(
        "https://e.test/",
        &records,
        &["https://e.test/a", "https://e.test/b", "https://e.test/c"],
    );
    let (_, issues) = evaluate_site(&records, &ctx);

    let orphans: Vec<_> = issues.iter().filter(|i| i.code == "orphan_page").collect();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].url, "https://e.test/c");
}

/// Ten alt-less images cost 3 x 4 = 12 points, not 40, and report at most
/// three entries.
#[test]
fn test_images_missing_alt_cap() {
    let imgs: String = (0..10)
        .map(|i| format!(r#"<img src="/img-{i}.png">"#))
        .collect();
    let body = format!(
        r#"<html><head><title>A gallery page with many pictures</title></head>
        <body><h1>Gallery</h1>{imgs}</body></html>"#
    );

    let records = vec![page("https://f.test/gallery", &body)];
    let ctx = build_ctx("https://f.test/", &records, &[]);
    let (scores, issues) = evaluate_site(&records, &ctx);

    let alt_issues: Vec<_> = issues
        .iter()
        .filter(|i| i.code == "images_missing_alt")
        .collect();
    assert_eq!(alt_issues.len(), 3);

    let alt_penalty: i32 = alt_issues.iter().map(|i| i.weight).sum();
    assert_eq!(alt_penalty, -12);

    let score = score_of(&scores, "https://f.test/gallery");
    assert!(score.score >= 20 && score.score <= 100);
}

/// Scores always land inside [20, 100], even for a disaster page.
#[test]
fn test_score_floor_invariant() {
    let body = r#"<html><head>
        <meta name="robots" content="noindex, nofollow">
        </head><body>
        <img src="/a.png"><img src="/b.png"><img src="/c.png"><img src="/d.png">
        <a href="/x"></a>
        </body></html>"#;

    let records = vec![page("http://g.test/Bad_Page", body)];
    let ctx = build_ctx("http://g.test/", &records, &[]);
    let (scores, issues) = evaluate_site(&records, &ctx);

    assert!(!issues.is_empty());
    for score in &scores {
        assert!(score.score >= 20, "score {} below floor", score.score);
        assert!(score.score <= 100);
    }
}

/// Identical fixtures always serialize to byte-identical reports.
#[test]
fn test_report_determinism() {
    let run = || {
        let homepage_body = r#"<html><head><title>Determinism check homepage title</title></head>
            <body><h1>Hello</h1><a href="/a">a</a></body></html>"#;
        let records = vec![
            page("https://h.test/", homepage_body),
            page("https://h.test/a", "<html><head><title>Home</title></head><body></body></html>"),
            page("https://h.test/b", "<html><head><title>Home</title></head><body></body></html>"),
        ];
        let ctx = build_ctx("https://h.test/", &records, &["https://h.test/b"]);
        let (scores, issues) = evaluate_site(&records, &ctx);
        let aggregates = scoring::aggregate(&records, &scores, &issues);
        let report = report::build("https://h.test/", &ctx, &aggregates, &issues, 0.0);
        serde_json::to_string_pretty(&report).unwrap()
    };

    assert_eq!(run(), run());
}

/// The report's counts line up with the underlying records and issues.
#[test]
fn test_report_consistency() {
    let records = vec![
        page(
            "https://i.test/",
            r#"<html><head><title>Consistency fixture homepage title</title></head><body><h1>x</h1></body></html>"#,
        ),
        page(
            "https://i.test/a",
            r#"<html><head></head><body></body></html>"#,
        ),
    ];
    let ctx = build_ctx("https://i.test/", &records, &[]);
    let (scores, issues) = evaluate_site(&records, &ctx);
    let aggregates = scoring::aggregate(&records, &scores, &issues);
    let report = report::build("https://i.test/", &ctx, &aggregates, &issues, 1.5);

    let overview = &report.audit_stats.site_overview;
    assert_eq!(overview.total_crawled_pages, 2);
    assert_eq!(overview.total_issues, issues.len());

    let summary = &report.audit_issues.issues_summary;
    assert_eq!(
        overview.critical_issues_count,
        summary.critical.len()
    );
    assert_eq!(overview.high_issues_count, summary.high.len());
    assert_eq!(overview.medium_issues_count, summary.medium.len());
    assert_eq!(overview.low_issues_count, summary.low.len());

    // Every grouped issue count matches its list.
    for (code, count) in &report.audit_stats.technical_seo {
        assert_eq!(
            report.audit_issues.technical_seo[code].len(),
            *count,
            "mismatch for {code}"
        );
    }
    for (code, count) in &report.audit_stats.onpage_seo {
        assert_eq!(report.audit_issues.onpage_seo[code].len(), *count);
    }

    assert_eq!(report.execution_time, 1.5);
}

/// Status distribution folds fetch errors into pseudo-statuses.
#[test]
fn test_status_distribution_pseudo_statuses() {
    let ok = page(
        "https://j.test/",
        "<html><head><title>Status distribution homepage</title></head><body><h1>x</h1></body></html>",
    );

    let failed = CrawlRecord {
        url: "https://j.test/down".to_string(),
        fetch: FetchResult::failed("https://j.test/down", FetchErrorKind::Timeout, Vec::new(), 30_000),
        facts: None,
    };

    let records = vec![ok, failed];
    let ctx = build_ctx("https://j.test/", &records, &[]);
    let (scores, issues) = evaluate_site(&records, &ctx);
    let aggregates = scoring::aggregate(&records, &scores, &issues);

    assert_eq!(aggregates.status_distribution.get("200"), Some(&1));
    assert_eq!(aggregates.status_distribution.get("timeout"), Some(&1));
}
