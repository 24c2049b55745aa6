use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::remote::RemoteLlmProvider;
use crate::llm::{analyst, LlmProvider};
use crate::processing::{self, ArticleMetadata, DisplayArticle};
use crate::search::{NewsApiClient, NewsSource, SearchRequest};

/// User-tunable settings of one research run. Never carries API keys, so it
/// can be exported as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchSettings {
    pub model: String,
    pub days_back: u32,
    pub max_articles: u32,
    pub show_images: bool,
    pub show_authors: bool,
}

impl ResearchSettings {
    pub fn from_config(config: &common::Config) -> Self {
        Self {
            model: config.default_model(),
            days_back: config.default_days_back(),
            max_articles: config.default_page_size(),
            show_images: true,
            show_authors: false,
        }
    }

    /// Bring every field into the range the config allows. Unknown models fall
    /// back to the configured default.
    pub fn clamp(mut self, config: &common::Config) -> Self {
        if !config.available_models().iter().any(|m| m == &self.model) {
            self.model = config.default_model();
        }
        self.days_back = self.days_back.clamp(1, config.max_days_back());
        self.max_articles = self
            .max_articles
            .clamp(config.min_articles(), config.max_articles_display().max(config.min_articles()));
        self
    }
}

/// API keys supplied for one run.
#[derive(Clone, Default)]
pub struct Credentials {
    pub llm_key: String,
    pub news_key: String,
}

impl Credentials {
    /// Fill blank keys from the environment variables named in the config.
    pub fn or_env(mut self, config: &common::Config) -> Self {
        if self.llm_key.trim().is_empty() {
            self.llm_key = common::resolve_api_key(config.llm_key_env()).unwrap_or_default();
        }
        if self.news_key.trim().is_empty() {
            self.news_key = common::resolve_api_key(config.newsapi_key_env()).unwrap_or_default();
        }
        self
    }
}

// Keys must never end up in logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("llm_key", &(!self.llm_key.is_empty()).then_some("<redacted>"))
            .field("news_key", &(!self.news_key.is_empty()).then_some("<redacted>"))
            .finish()
    }
}

/// Everything a finished research run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    pub query: String,
    pub summary: String,
    pub articles: Vec<DisplayArticle>,
    pub metadata: ArticleMetadata,
    pub timestamp: DateTime<Local>,
    pub settings: ResearchSettings,
    /// Problems found while validating the fetched articles
    pub warnings: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Please enter your Groq API key in the sidebar")]
    MissingLlmKey,
    #[error("Please enter your NewsAPI key in the sidebar")]
    MissingNewsKey,
    #[error("Please enter a search query")]
    EmptyQuery,
    #[error("{}", .0.join("; "))]
    InvalidKeys(Vec<String>),
    #[error("No articles found for your query. Try different keywords.")]
    NoArticles,
    #[error("API Error: {0}")]
    Api(String),
}

/// Check a request before any network call. Order matches what the user sees:
/// analysis key, news key, query, then key format.
pub fn check_request(query: &str, credentials: &Credentials) -> Result<(), ResearchError> {
    if credentials.llm_key.trim().is_empty() {
        return Err(ResearchError::MissingLlmKey);
    }
    if credentials.news_key.trim().is_empty() {
        return Err(ResearchError::MissingNewsKey);
    }
    if query.trim().is_empty() {
        return Err(ResearchError::EmptyQuery);
    }
    processing::validate_api_keys(&credentials.llm_key, &credentials.news_key)
        .map_err(ResearchError::InvalidKeys)
}

/// Fetch, validate, analyse and aggregate articles for `query`.
///
/// A failed analysis does not fail the run: the summary then carries the error
/// text. Search failures and empty results do.
pub async fn run_research(
    news: &dyn NewsSource,
    llm: &dyn LlmProvider,
    query: &str,
    settings: ResearchSettings,
    max_prompt_articles: usize,
) -> Result<ResearchResult, ResearchError> {
    let query = query.trim();
    info!(%query, model = %settings.model, days_back = settings.days_back, "starting research");

    let request = SearchRequest {
        query: query.to_string(),
        days_back: settings.days_back,
        page_size: settings.max_articles,
    };

    let response = news
        .fetch_articles(&request)
        .await
        .map_err(|e| ResearchError::Api(e.to_string()))?;

    if response.articles.is_empty() {
        info!(%query, "search returned no articles");
        return Err(ResearchError::NoArticles);
    }

    let (valid, warnings) = processing::validate_articles(response.articles);
    if !warnings.is_empty() {
        warn!(count = warnings.len(), "articles with missing information");
    }
    if valid.is_empty() {
        return Err(ResearchError::NoArticles);
    }

    let news_content =
        processing::prepare_content_for_analysis(&valid, max_prompt_articles.min(valid.len()));
    let summary = analyst::generate_analysis(llm, query, &news_content).await;

    let metadata = processing::extract_metadata(&valid);
    let articles = valid
        .iter()
        .enumerate()
        .map(|(i, a)| processing::format_article_for_display(a, i))
        .collect();

    info!(
        %query,
        articles = metadata.total_articles,
        sources = metadata.unique_sources,
        "research complete"
    );

    Ok(ResearchResult {
        query: query.to_string(),
        summary,
        articles,
        metadata,
        timestamp: Local::now(),
        settings,
        warnings,
    })
}

/// Check the request, then run it against NewsAPI and the configured LLM
/// endpoint with the given keys.
pub async fn research_with_config(
    config: &common::Config,
    query: &str,
    settings: ResearchSettings,
    credentials: &Credentials,
) -> Result<ResearchResult, ResearchError> {
    check_request(query, credentials)?;

    let news = NewsApiClient::from_config(config, credentials.news_key.trim())
        .map_err(|e| ResearchError::Api(format!("{:#}", e)))?;
    let llm = RemoteLlmProvider::from_config(config, credentials.llm_key.trim(), settings.model.clone());

    run_research(&news, &llm, query, settings, config.max_prompt_articles()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmRequest, LlmResponse, UsageMetadata};
    use crate::search::{Article, ArticleSource, SearchResponse};
    use std::sync::Mutex;

    struct CannedNews(Vec<Article>);

    #[async_trait::async_trait]
    impl NewsSource for CannedNews {
        async fn fetch_articles(&self, _request: &SearchRequest) -> anyhow::Result<SearchResponse> {
            Ok(SearchResponse { articles: self.0.clone(), ..Default::default() })
        }
    }

    struct FailingNews;

    #[async_trait::async_trait]
    impl NewsSource for FailingNews {
        async fn fetch_articles(&self, _request: &SearchRequest) -> anyhow::Result<SearchResponse> {
            anyhow::bail!("NewsAPI Error: 401 - apiKeyInvalid")
        }
    }

    #[derive(Default)]
    struct EchoLlm {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl LlmProvider for EchoLlm {
        async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
            self.prompts.lock().unwrap().push(request.prompt);
            Ok(LlmResponse {
                content: "Neutral sentiment".to_string(),
                usage: UsageMetadata::default(),
                model: "echo".to_string(),
            })
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    fn settings() -> ResearchSettings {
        ResearchSettings {
            model: "echo".to_string(),
            days_back: 7,
            max_articles: 15,
            show_images: true,
            show_authors: false,
        }
    }

    fn article(title: &str, source: &str) -> Article {
        Article {
            source: Some(ArticleSource { id: None, name: Some(source.to_string()) }),
            title: Some(title.to_string()),
            published_at: Some("2024-03-01T10:00:00Z".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn request_checks_run_in_order() {
        let none = Credentials::default();
        assert!(matches!(check_request("q", &none), Err(ResearchError::MissingLlmKey)));

        let llm_only = Credentials { llm_key: "gsk_0123456789".into(), news_key: String::new() };
        assert!(matches!(check_request("q", &llm_only), Err(ResearchError::MissingNewsKey)));

        let both = Credentials { llm_key: "gsk_0123456789".into(), news_key: "0123456789ab".into() };
        assert!(matches!(check_request("   ", &both), Err(ResearchError::EmptyQuery)));
        assert!(check_request("Tesla", &both).is_ok());

        let short = Credentials { llm_key: "gsk".into(), news_key: "0123456789ab".into() };
        let err = check_request("Tesla", &short).unwrap_err();
        assert_eq!(err.to_string(), "Invalid Groq API key format");
    }

    #[test]
    fn settings_are_clamped_to_config_limits() {
        let config = common::Config::default();
        let wild = ResearchSettings {
            model: "not-a-model".to_string(),
            days_back: 90,
            max_articles: 1,
            show_images: false,
            show_authors: true,
        }
        .clamp(&config);

        assert_eq!(wild.model, config.default_model());
        assert_eq!(wild.days_back, 30);
        assert_eq!(wild.max_articles, 5);
    }

    #[tokio::test]
    async fn pipeline_builds_result_from_valid_articles() {
        let news = CannedNews(vec![
            article("Chipmaker beats estimates", "Reuters"),
            Article::default(),
            article("Guidance raised", "Bloomberg"),
        ]);
        let llm = EchoLlm::default();

        let result = run_research(&news, &llm, "  chips  ", settings(), 10).await.unwrap();

        assert_eq!(result.query, "chips");
        assert_eq!(result.summary, "Neutral sentiment");
        assert_eq!(result.articles.len(), 2);
        assert_eq!(result.articles[1].index, 1);
        assert_eq!(result.metadata.unique_sources, 2);
        assert_eq!(result.warnings, vec!["Article 2: Missing title and description"]);

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Title: Chipmaker beats estimates"));
        assert!(prompts[0].contains(r#"related to: "chips""#));
    }

    #[tokio::test]
    async fn empty_search_is_reported_as_no_articles() {
        let llm = EchoLlm::default();
        let err = run_research(&CannedNews(vec![]), &llm, "q", settings(), 10).await.unwrap_err();
        assert!(matches!(err, ResearchError::NoArticles));

        let only_invalid = CannedNews(vec![Article::default()]);
        let err = run_research(&only_invalid, &llm, "q", settings(), 10).await.unwrap_err();
        assert!(matches!(err, ResearchError::NoArticles));
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_failure_surfaces_as_api_error() {
        let llm = EchoLlm::default();
        let err = run_research(&FailingNews, &llm, "q", settings(), 10).await.unwrap_err();
        assert_eq!(err.to_string(), "API Error: NewsAPI Error: 401 - apiKeyInvalid");
    }
}
