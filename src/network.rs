//! HTTP fetcher with manual redirect tracing.
//!
//! Redirect following is disabled on the client so every hop can be recorded
//! with its status code. All failure modes are folded into
//! [`FetchResult::error`]; callers never see an `Err` from [`HttpClient::fetch`].

use reqwest::Client;
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::models::{FetchErrorKind, FetchResult, RedirectHop};

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_content_size: usize,
}

impl HttpClient {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        Self::with_content_limit(user_agent, Config::MAX_CONTENT_SIZE)
    }

    pub fn with_content_limit(
        user_agent: &str,
        max_content: usize,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(Config::CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(Config::REQUEST_TIMEOUT_SECS))
            .pool_max_idle_per_host(Config::POOL_IDLE_PER_HOST)
            .pool_idle_timeout(Duration::from_secs(Config::POOL_IDLE_TIMEOUT_SECS))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            // Decompression is handled manually so Content-Encoding survives
            // into the recorded headers.
            .no_gzip()
            .no_brotli()
            .no_deflate()
            // Redirects are traced manually, one hop at a time.
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            max_content_size: max_content,
        })
    }

    /// Fetch a URL, following up to [`Config::MAX_REDIRECT_HOPS`] redirects.
    ///
    /// Transient network failures are retried once after a short backoff.
    /// HTTP status errors are never retried.
    #[tracing::instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let start = Instant::now();

        let first = self.fetch_traced(url).await;
        let retry_worthwhile = first
            .error
            .map(|e| e.is_transient() && first.status_code == 0)
            .unwrap_or(false);

        if !retry_worthwhile {
            return first;
        }

        tracing::debug!("transient error, retrying once");
        tokio::time::sleep(Duration::from_millis(Config::RETRY_BACKOFF_MS)).await;

        let mut second = self.fetch_traced(url).await;
        second.elapsed_ms = start.elapsed().as_millis() as u64;
        second
    }

    async fn fetch_traced(&self, url: &str) -> FetchResult {
        let start = Instant::now();
        let mut chain: Vec<RedirectHop> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut current = url.to_string();

        loop {
            if !seen.insert(current.clone()) {
                return FetchResult::failed(
                    url,
                    FetchErrorKind::RedirectLoop,
                    chain,
                    start.elapsed().as_millis() as u64,
                );
            }

            let response = match self.send_one(&current).await {
                Ok(resp) => resp,
                Err(kind) => {
                    return FetchResult::failed(
                        url,
                        kind,
                        chain,
                        start.elapsed().as_millis() as u64,
                    );
                }
            };

            let status = response.status().as_u16();

            if response.status().is_redirection() {
                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|loc| crate::url_utils::resolve(loc, &current));

                chain.push(RedirectHop {
                    url: current.clone(),
                    status,
                });

                match location {
                    Some(next) => {
                        if chain.len() > Config::MAX_REDIRECT_HOPS {
                            return FetchResult::failed(
                                url,
                                FetchErrorKind::TooManyRedirects,
                                chain,
                                start.elapsed().as_millis() as u64,
                            );
                        }
                        current = next;
                        continue;
                    }
                    None => {
                        // Redirect without a usable Location terminates the chain.
                        return self
                            .finish(url, &current, response, chain, start)
                            .await;
                    }
                }
            }

            return self.finish(url, &current, response, chain, start).await;
        }
    }

    async fn send_one(&self, url: &str) -> Result<reqwest::Response, FetchErrorKind> {
        self.client
            .get(url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.5")
            // Only gzip is advertised; the body reader decodes it manually.
            .header("Accept-Encoding", "gzip")
            .send()
            .await
            .map_err(classify_reqwest_error)
    }

    async fn finish(
        &self,
        requested: &str,
        final_url: &str,
        response: reqwest::Response,
        chain: Vec<RedirectHop>,
        start: Instant,
    ) -> FetchResult {
        let status_code = response.status().as_u16();
        let headers = collect_headers(&response);

        let (raw_body, truncated) = match self.read_body(response).await {
            Ok(pair) => pair,
            Err(kind) => {
                let mut result = FetchResult::failed(
                    requested,
                    kind,
                    chain,
                    start.elapsed().as_millis() as u64,
                );
                result.final_url = final_url.to_string();
                result.status_code = status_code;
                result.headers = headers;
                return result;
            }
        };

        let decompressed = decompress_body(raw_body, headers.get("content-encoding")).await;
        let body = decode_body(&decompressed, headers.get("content-type"));

        FetchResult {
            final_url: final_url.to_string(),
            status_code,
            headers,
            body,
            body_truncated: truncated,
            redirect_chain: chain,
            elapsed_ms: start.elapsed().as_millis() as u64,
            error: None,
        }
    }

    /// Stream the body up to the content cap; oversize bodies are truncated,
    /// not failed.
    async fn read_body(
        &self,
        mut response: reqwest::Response,
    ) -> Result<(Vec<u8>, bool), FetchErrorKind> {
        let mut body: Vec<u8> = Vec::new();
        let mut truncated = false;

        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    let remaining = self.max_content_size.saturating_sub(body.len());
                    if chunk.len() > remaining {
                        body.extend_from_slice(&chunk[..remaining]);
                        truncated = true;
                        break;
                    }
                    body.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(e) => return Err(classify_reqwest_error(e)),
            }
        }

        Ok((body, truncated))
    }
}

fn collect_headers(response: &reqwest::Response) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    for (name, value) in response.headers() {
        if let Ok(v) = value.to_str() {
            headers
                .entry(name.as_str().to_lowercase())
                .and_modify(|existing: &mut String| {
                    existing.push_str(", ");
                    existing.push_str(v);
                })
                .or_insert_with(|| v.to_string());
        }
    }
    headers
}

async fn decompress_body(body: Vec<u8>, content_encoding: Option<&String>) -> Vec<u8> {
    use async_compression::tokio::bufread::GzipDecoder;
    use tokio::io::AsyncReadExt;

    let declared_gzip = content_encoding
        .map(|enc| enc.to_ascii_lowercase().contains("gzip"))
        .unwrap_or(false);
    // Sniff the magic bytes as well: .xml.gz sitemaps are often served as
    // plain application/gzip with no Content-Encoding.
    let looks_gzip = body.starts_with(&[0x1f, 0x8b]);

    if !declared_gzip && !looks_gzip {
        return body;
    }

    let mut decoder = GzipDecoder::new(&body[..]);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out).await {
        Ok(_) => out,
        // Broken gzip stream: fall back to the raw bytes.
        Err(_) => body,
    }
}

/// Decode a body using the response charset, BOM-aware, defaulting to UTF-8.
fn decode_body(body: &[u8], content_type: Option<&String>) -> String {
    if let Some((encoding, bom_len)) = encoding_rs::Encoding::for_bom(body) {
        let (text, _) = encoding.decode_without_bom_handling(&body[bom_len..]);
        return text.into_owned();
    }

    let encoding = content_type
        .and_then(|ct| charset_from_content_type(ct))
        .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);

    let (text, _) = encoding.decode_without_bom_handling(body);
    text.into_owned()
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("charset="))
        .map(|v| v.trim_matches('"').to_string())
}

fn classify_reqwest_error(error: reqwest::Error) -> FetchErrorKind {
    if error.is_timeout() {
        return FetchErrorKind::Timeout;
    }

    let message = error.to_string().to_lowercase();

    if error.is_connect() {
        if message.contains("connection refused") {
            return FetchErrorKind::Refused;
        }
        if message.contains("dns")
            || message.contains("name resolution")
            || message.contains("no such host")
        {
            return FetchErrorKind::Dns;
        }
    }

    if message.contains("certificate") || message.contains("ssl") || message.contains("tls") {
        return FetchErrorKind::Tls;
    }

    FetchErrorKind::Network
}
