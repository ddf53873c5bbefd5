//! robots.txt retrieval and directive parsing.
//!
//! The directive scan keeps the raw text around so Allow/Disallow matching
//! can be delegated to `robotstxt`'s matcher, while Sitemap and Crawl-delay
//! lines are read directly.

use robotstxt::DefaultMatcher;

use crate::network::HttpClient;
use crate::url_utils;

/// One user-agent group from robots.txt.
#[derive(Debug, Clone, Default)]
pub struct UserAgentRules {
    pub user_agents: Vec<String>,
    pub disallow: Vec<String>,
    pub allow: Vec<String>,
    pub crawl_delay_secs: Option<f64>,
}

/// Parsed robots.txt state for the audited host.
#[derive(Debug, Clone, Default)]
pub struct RobotsTxt {
    pub exists: bool,
    pub raw_text: Option<String>,
    pub declared_sitemaps: Vec<String>,
    pub groups: Vec<UserAgentRules>,
}

impl RobotsTxt {
    /// Fetch and parse `<base>/robots.txt`. Absent or non-2xx responses yield
    /// `exists = false` with empty rules.
    pub async fn fetch(http: &HttpClient, base_url: &str) -> Self {
        let robots_url = match url_utils::robots_url(base_url) {
            Some(u) => u,
            None => return Self::default(),
        };

        let result = http.fetch(&robots_url).await;
        if !result.is_success() {
            tracing::debug!(status = result.status_code, "no robots.txt");
            return Self::default();
        }

        Self::parse(&result.body)
    }

    /// Parse robots.txt directives: User-agent, Disallow, Allow, Crawl-delay,
    /// Sitemap. Unknown lines are ignored.
    pub fn parse(text: &str) -> Self {
        let mut robots = RobotsTxt {
            exists: true,
            raw_text: Some(text.to_string()),
            declared_sitemaps: Vec::new(),
            groups: Vec::new(),
        };

        let mut current: Option<UserAgentRules> = None;
        // A run of consecutive User-agent lines opens one group.
        let mut agent_run = false;

        for line in text.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let (key, value) = match line.split_once(':') {
                Some((k, v)) => (k.trim().to_ascii_lowercase(), v.trim().to_string()),
                None => continue,
            };

            match key.as_str() {
                "user-agent" => {
                    if !agent_run {
                        if let Some(group) = current.take() {
                            robots.groups.push(group);
                        }
                        current = Some(UserAgentRules::default());
                    }
                    if let Some(group) = current.as_mut() {
                        group.user_agents.push(value.to_ascii_lowercase());
                    }
                    agent_run = true;
                }
                "disallow" => {
                    agent_run = false;
                    if let Some(group) = current.as_mut() {
                        if !value.is_empty() {
                            group.disallow.push(value);
                        }
                    }
                }
                "allow" => {
                    agent_run = false;
                    if let Some(group) = current.as_mut() {
                        if !value.is_empty() {
                            group.allow.push(value);
                        }
                    }
                }
                "crawl-delay" => {
                    agent_run = false;
                    if let Some(group) = current.as_mut() {
                        group.crawl_delay_secs = value.parse::<f64>().ok().filter(|d| *d >= 0.0);
                    }
                }
                // Sitemap is global, not part of any group.
                "sitemap" => {
                    agent_run = false;
                    if !value.is_empty() {
                        robots.declared_sitemaps.push(value);
                    }
                }
                _ => {
                    agent_run = false;
                }
            }
        }

        if let Some(group) = current.take() {
            robots.groups.push(group);
        }

        robots
    }

    /// Whether `url` may be fetched by `user_agent`. Allowed when robots.txt
    /// is absent.
    pub fn can_fetch(&self, user_agent: &str, url: &str) -> bool {
        match &self.raw_text {
            Some(text) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(text, user_agent, url)
            }
            None => true,
        }
    }

    /// Crawl-delay for `user_agent`, falling back to the wildcard group.
    pub fn crawl_delay_for(&self, user_agent: &str) -> Option<f64> {
        let agent = user_agent.to_ascii_lowercase();

        let matches_agent = |group: &UserAgentRules| {
            group
                .user_agents
                .iter()
                .any(|ua| ua != "*" && agent.contains(ua.as_str()))
        };

        self.groups
            .iter()
            .find(|g| matches_agent(g))
            .or_else(|| {
                self.groups
                    .iter()
                    .find(|g| g.user_agents.iter().any(|ua| ua == "*"))
            })
            .and_then(|g| g.crawl_delay_secs)
    }
}
