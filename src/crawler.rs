//! Bounded, polite site crawler.
//!
//! The coordinator owns the frontier queue and the visited set; fetch tasks
//! run in a `JoinSet` capped at [`Config::MAX_IN_FLIGHT`]. Discovery follows
//! internal links from 2xx HTML pages; sitemap URLs seed the queue up front.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::models::{CrawlRecord, FetchErrorKind, FetchResult};
use crate::network::HttpClient;
use crate::parser;
use crate::rate_limit::HostRateLimiter;
use crate::robots::RobotsTxt;
use crate::url_utils;

#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub max_pages: usize,
    pub respect_robots: bool,
    pub user_agent: String,
    /// Global audit deadline; `None` means unbounded.
    pub deadline: Option<Duration>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: Config::DEFAULT_MAX_PAGES,
            respect_robots: false,
            user_agent: Config::USER_AGENT.to_string(),
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CrawlStats {
    pub crawled: usize,
    pub failed: usize,
    pub blocked_by_robots: usize,
}

pub struct Crawler {
    http: Arc<HttpClient>,
    config: CrawlerConfig,
    robots: Arc<RobotsTxt>,
    limiter: Arc<HostRateLimiter>,
    base_host: String,
    homepage: String,
}

impl Crawler {
    pub fn new(
        http: Arc<HttpClient>,
        config: CrawlerConfig,
        robots: RobotsTxt,
        base_host: String,
        homepage: String,
    ) -> Self {
        let limiter = HostRateLimiter::new(Config::HOST_RATE_PER_SEC);

        // Crawl-delay lowers the effective rate for the audited host.
        if config.respect_robots {
            if let Some(delay) = robots.crawl_delay_for(&config.user_agent) {
                if delay > 0.0 {
                    limiter.set_host_rate(&base_host, 1.0 / delay);
                }
            }
        }

        Self {
            http,
            config,
            robots: Arc::new(robots),
            limiter: Arc::new(limiter),
            base_host,
            homepage,
        }
    }

    /// Crawl from the homepage plus `seed_urls` (sitemap entries), returning
    /// one record per distinct canonical URL.
    #[tracing::instrument(skip(self, seed_urls), fields(homepage = %self.homepage))]
    pub async fn crawl(&self, seed_urls: impl IntoIterator<Item = String>) -> (Vec<CrawlRecord>, CrawlStats) {
        let cancel = CancellationToken::new();
        if let Some(deadline) = self.config.deadline {
            let token = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                tracing::warn!("audit deadline reached, cancelling outstanding fetches");
                token.cancel();
            });
        }

        let mut queue: VecDeque<String> = VecDeque::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut records: Vec<CrawlRecord> = Vec::new();
        let mut stats = CrawlStats::default();
        let mut in_flight: JoinSet<CrawlRecord> = JoinSet::new();

        seen.insert(self.homepage.clone());
        queue.push_back(self.homepage.clone());

        for seed in seed_urls {
            let Some(canonical) = url_utils::canonicalize(&seed) else {
                continue;
            };
            if url_utils::is_internal(&canonical, &self.base_host) && seen.insert(canonical.clone())
            {
                queue.push_back(canonical);
            }
        }

        tracing::info!(
            seeds = queue.len(),
            max_pages = self.config.max_pages,
            "crawl started"
        );

        let mut scheduled = 0usize;

        loop {
            // Schedule work while there is queue, budget, and a free slot.
            while in_flight.len() < Config::MAX_IN_FLIGHT
                && scheduled < self.config.max_pages
                && !cancel.is_cancelled()
            {
                let Some(url) = queue.pop_front() else {
                    break;
                };

                if self.config.respect_robots
                    && !self.robots.can_fetch(&self.config.user_agent, &url)
                {
                    stats.blocked_by_robots += 1;
                    tracing::debug!(url = %url, "skipped: disallowed by robots.txt");
                    continue;
                }

                scheduled += 1;
                self.spawn_fetch(&mut in_flight, url, cancel.clone());
            }

            let Some(joined) = in_flight.join_next().await else {
                // No tasks left; the queue is either empty or out of budget.
                break;
            };

            let record = match joined {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!(error = %e, "fetch task panicked");
                    continue;
                }
            };

            if record.fetch.error.is_some() {
                stats.failed += 1;
            } else {
                stats.crawled += 1;
            }

            // Follow links only from successful HTML pages.
            if record.fetch.is_success() {
                if let Some(facts) = &record.facts {
                    for link in facts.internal_links() {
                        let Some(canonical) = url_utils::canonicalize(&link.href_absolute) else {
                            continue;
                        };
                        if seen.insert(canonical.clone()) {
                            queue.push_back(canonical);
                        }
                    }
                }
            }

            records.push(record);
        }

        tracing::info!(
            crawled = stats.crawled,
            failed = stats.failed,
            blocked = stats.blocked_by_robots,
            "crawl complete"
        );

        (records, stats)
    }

    fn spawn_fetch(&self, in_flight: &mut JoinSet<CrawlRecord>, url: String, cancel: CancellationToken) {
        let http = Arc::clone(&self.http);
        let limiter = Arc::clone(&self.limiter);
        let base_host = self.base_host.clone();

        in_flight.spawn(async move {
            let host = url_utils::extract_host(&url).unwrap_or_default();

            // Politeness wait happens before the request, inside the task, so
            // other hosts' tokens are unaffected.
            tokio::select! {
                _ = limiter.acquire(&host) => {}
                _ = cancel.cancelled() => {
                    return timeout_record(&url);
                }
            }

            let fetch = tokio::select! {
                fetch = http.fetch(&url) => fetch,
                _ = cancel.cancelled() => {
                    return timeout_record(&url);
                }
            };

            let facts = if fetch.is_success() && fetch.is_html() {
                let fetch_for_parse = fetch.clone();
                let host_for_parse = base_host.clone();
                // scraper's DOM is not Send; parse on the blocking pool.
                tokio::task::spawn_blocking(move || parser::parse(&fetch_for_parse, &host_for_parse))
                    .await
                    .ok()
            } else {
                None
            };

            CrawlRecord { url, fetch, facts }
        });
    }
}

/// Record for a fetch cancelled by the global deadline.
fn timeout_record(url: &str) -> CrawlRecord {
    CrawlRecord {
        url: url.to_string(),
        fetch: FetchResult::failed(url, FetchErrorKind::Timeout, Vec::new(), 0),
        facts: None,
    }
}
