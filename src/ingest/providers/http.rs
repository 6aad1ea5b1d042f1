// src/ingest/providers/http.rs
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;

use crate::ingest::config::ExtractorConfig;
use crate::ingest::error::ExtractError;
use crate::ingest::types::{PostSource, RawPost};

/// JSON API client for `{root}/api/...`.
///
/// The `reqwest::Client` is the shared session; clones share one connection
/// pool, so the caller can keep using the same client elsewhere.
pub struct HttpSource {
    client: reqwest::Client,
    root: String,
}

impl HttpSource {
    pub fn new(client: reqwest::Client, root: impl Into<String>) -> Self {
        let root = root.into().trim_end_matches('/').to_string();
        Self { client, root }
    }

    /// Build a client from config (user agent + timeouts).
    pub fn from_config(cfg: &ExtractorConfig) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| ExtractError::Http {
                url: cfg.root.clone(),
                source: e,
            })?;
        Ok(Self::new(client, cfg.root.as_str()))
    }

    pub fn user_url(&self, service: &str, user_id: &str) -> String {
        format!("{}/api/{}/user/{}", self.root, service, user_id)
    }

    pub fn post_url(&self, service: &str, user_id: &str, post_id: &str) -> String {
        format!("{}/post/{}", self.user_url(service, user_id), post_id)
    }

    async fn get_posts(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<RawPost>, ExtractError> {
        let t0 = Instant::now();
        let result = self.get_posts_inner(url, query).await;
        histogram!("extract_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        match &result {
            Ok(_) => counter!("extract_pages_total").increment(1),
            Err(e) => {
                tracing::warn!(error = %e, url, "post fetch failed");
                counter!("extract_fetch_errors_total").increment(1);
            }
        }
        result
    }

    async fn get_posts_inner(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<RawPost>, ExtractError> {
        let http_err = |e: reqwest::Error| ExtractError::Http {
            url: url.to_string(),
            source: e,
        };

        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(http_err)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExtractError::Transport {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let body = resp.text().await.map_err(http_err)?;
        parse_posts(url, &body)
    }
}

/// Parse a response body as a JSON array of post objects.
pub fn parse_posts(url: &str, body: &str) -> Result<Vec<RawPost>, ExtractError> {
    let malformed = |reason: String| ExtractError::MalformedResponse {
        url: url.to_string(),
        reason,
    };

    let value: Value = serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(malformed("expected a JSON array".into()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, v)| match v {
            Value::Object(m) => Ok(m),
            _ => Err(malformed(format!("element {i} is not an object"))),
        })
        .collect()
}

#[async_trait]
impl PostSource for HttpSource {
    async fn user_posts(
        &self,
        service: &str,
        user_id: &str,
        offset: usize,
    ) -> Result<Vec<RawPost>, ExtractError> {
        let url = self.user_url(service, user_id);
        self.get_posts(&url, &[("o", offset.to_string())]).await
    }

    async fn post(
        &self,
        service: &str,
        user_id: &str,
        post_id: &str,
    ) -> Result<Vec<RawPost>, ExtractError> {
        let url = self.post_url(service, user_id, post_id);
        self.get_posts(&url, &[]).await
    }

    fn root(&self) -> &str {
        &self.root
    }

    fn name(&self) -> &'static str {
        "kemono-http"
    }
}
