use anyhow::{anyhow, Context, Result};
use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Source block of a NewsAPI article.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Article as returned by NewsAPI. Every field may be missing or `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default)]
    pub source: Option<ArticleSource>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl Article {
    /// Source name, if present and non-empty.
    pub fn source_name(&self) -> Option<&str> {
        self.source
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .filter(|n| !n.is_empty())
    }
}

/// Top-level `/v2/everything` response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Parameters of one search call.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub days_back: u32,
    pub page_size: u32,
}

/// Anything that can answer a news search.
#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch_articles(&self, request: &SearchRequest) -> Result<SearchResponse>;
}

/// NewsAPI `/v2/everything` client. One GET per search, no retries.
pub struct NewsApiClient {
    base_url: String,
    api_key: String,
    language: String,
    sort_by: String,
    max_page_size: u32,
    client: Client,
}

impl NewsApiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("newsbrief/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            language: "en".to_string(),
            sort_by: "relevancy".to_string(),
            max_page_size: 100,
            client,
        })
    }

    pub fn with_defaults(
        mut self,
        language: impl Into<String>,
        sort_by: impl Into<String>,
        max_page_size: u32,
    ) -> Self {
        self.language = language.into();
        self.sort_by = sort_by.into();
        self.max_page_size = max_page_size;
        self
    }

    /// Build a client from the `[newsapi]` config section.
    pub fn from_config(config: &common::Config, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::new(config.newsapi_url(), api_key, config.news_timeout_seconds())?
            .with_defaults(config.news_language(), config.news_sort_by(), config.max_page_size()))
    }
}

/// First day of the search window, `days_back` days before `today`.
pub fn from_date(today: NaiveDate, days_back: u32) -> String {
    (today - ChronoDuration::days(i64::from(days_back)))
        .format("%Y-%m-%d")
        .to_string()
}

#[async_trait::async_trait]
impl NewsSource for NewsApiClient {
    async fn fetch_articles(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let page_size = request.page_size.min(self.max_page_size).max(1).to_string();
        let from = from_date(Local::now().date_naive(), request.days_back);

        debug!(query = %request.query, %from, %page_size, "querying NewsAPI");

        // The key travels as a header so it never shows up in logged URLs.
        let sent = self
            .client
            .get(&self.base_url)
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("q", request.query.as_str()),
                ("language", self.language.as_str()),
                ("sortBy", self.sort_by.as_str()),
                ("pageSize", page_size.as_str()),
                ("from", from.as_str()),
            ])
            .send()
            .await;

        let response = match sent {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Err(anyhow!("Request timed out. Please try again.")),
            Err(e) => return Err(anyhow!("Network issue: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("NewsAPI Error: {} - {}", status.as_u16(), body));
        }

        let body: SearchResponse = match response.json().await {
            Ok(b) => b,
            Err(e) if e.is_timeout() => return Err(anyhow!("Request timed out. Please try again.")),
            Err(e) => return Err(anyhow!("Error fetching news: {}", e)),
        };

        if body.status.as_deref() == Some("error") {
            return Err(anyhow!(
                "NewsAPI Error: {} - {}",
                body.code.as_deref().unwrap_or("error"),
                body.message.as_deref().unwrap_or("unknown error")
            ));
        }

        info!(
            query = %request.query,
            returned = body.articles.len(),
            total = body.total_results.unwrap_or(0),
            "NewsAPI search complete"
        );
        Ok(body)
    }
}
