use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::search::Article;

/// Article reshaped for display and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayArticle {
    pub index: usize,
    pub title: String,
    pub description: String,
    pub source: String,
    pub published_at: String,
    pub url: String,
    pub url_to_image: String,
    pub author: String,
}

/// Earliest/latest publish day and the number of days between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: String,
    pub latest: String,
    pub span_days: i64,
}

/// Aggregate statistics over a batch of articles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    pub total_articles: usize,
    pub unique_sources: usize,
    pub source_distribution: BTreeMap<String, usize>,
    pub date_range: Option<DateRange>,
    pub sources_list: Vec<String>,
}

/// Split articles into those worth keeping and a list of human-readable warnings.
///
/// An article with neither title nor description is dropped. One without a
/// source name is kept but reported.
pub fn validate_articles(articles: Vec<Article>) -> (Vec<Article>, Vec<String>) {
    let mut valid = Vec::with_capacity(articles.len());
    let mut warnings = Vec::new();

    for (i, article) in articles.into_iter().enumerate() {
        if non_empty(&article.title).is_none() && non_empty(&article.description).is_none() {
            warnings.push(format!("Article {}: Missing title and description", i + 1));
            continue;
        }

        if article.source_name().is_none() {
            warnings.push(format!("Article {}: Unknown source", i + 1));
        }

        valid.push(article);
    }

    (valid, warnings)
}

/// Tally sources and compute the publish-date span.
pub fn extract_metadata(articles: &[Article]) -> ArticleMetadata {
    let mut source_distribution: BTreeMap<String, usize> = BTreeMap::new();
    for article in articles {
        let name = article.source_name().unwrap_or("Unknown");
        *source_distribution.entry(name.to_string()).or_insert(0) += 1;
    }

    let dates: Vec<NaiveDate> = articles
        .iter()
        .filter_map(|a| non_empty(&a.published_at))
        .filter_map(|p| NaiveDate::parse_from_str(&prefix(p, 10), "%Y-%m-%d").ok())
        .collect();

    let date_range = match (dates.iter().min(), dates.iter().max()) {
        (Some(earliest), Some(latest)) => Some(DateRange {
            earliest: earliest.format("%Y-%m-%d").to_string(),
            latest: latest.format("%Y-%m-%d").to_string(),
            span_days: (*latest - *earliest).num_days(),
        }),
        _ => None,
    };

    let sources_list: Vec<String> = source_distribution.keys().cloned().collect();

    ArticleMetadata {
        total_articles: articles.len(),
        unique_sources: sources_list.len(),
        source_distribution,
        date_range,
        sources_list,
    }
}

pub fn format_article_for_display(article: &Article, index: usize) -> DisplayArticle {
    DisplayArticle {
        index,
        title: or_default(&article.title, "No title available"),
        description: or_default(&article.description, "No description available"),
        source: article.source_name().unwrap_or("Unknown Source").to_string(),
        published_at: non_empty(&article.published_at)
            .map(|p| prefix(p, 19).replace('T', " "))
            .unwrap_or_else(|| "Unknown date".to_string()),
        url: article.url.clone().unwrap_or_default(),
        url_to_image: article.url_to_image.clone().unwrap_or_default(),
        author: or_default(&article.author, "Unknown author"),
    }
}

/// Render up to `max_articles` articles as numbered text blocks for the prompt.
pub fn prepare_content_for_analysis(articles: &[Article], max_articles: usize) -> String {
    let mut content = String::new();

    for (i, article) in articles.iter().take(max_articles).enumerate() {
        let published = non_empty(&article.published_at)
            .map(|p| prefix(p, 10))
            .unwrap_or_else(|| "Unknown date".to_string());

        content.push_str(&format!(
            "Article {}:\nTitle: {}\nDescription: {}\nSource: {}\nPublished: {}\n---\n",
            i + 1,
            or_default(&article.title, "No title"),
            or_default(&article.description, "No description"),
            article.source_name().unwrap_or("Unknown source"),
            published,
        ));
    }

    content
}

/// Condense a description into at most four short lines for an article card.
///
/// Sentences longer than 20 characters are preferred; when the description
/// has none, it is word-wrapped at 80 columns instead.
pub fn card_summary(description: &str) -> String {
    const MAX_LINES: usize = 4;
    const WIDTH: usize = 80;

    let mut lines: Vec<String> = description
        .split(". ")
        .take(MAX_LINES)
        .map(str::trim)
        .filter(|s| s.chars().count() > 20)
        .map(with_period)
        .collect();

    if lines.is_empty() {
        let mut current = String::new();
        for word in description.split_whitespace() {
            if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > WIDTH {
                lines.push(with_period(&current));
                current.clear();
                if lines.len() == MAX_LINES {
                    break;
                }
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() && lines.len() < MAX_LINES {
            lines.push(with_period(&current));
        }
    }

    lines.truncate(MAX_LINES);
    lines.join(" ")
}

fn with_period(s: &str) -> String {
    if s.ends_with('.') {
        s.to_string()
    } else {
        format!("{}.", s)
    }
}

/// Ordering offered on the articles tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Order returned by the search API
    #[default]
    Relevance,
    /// Newest first
    Date,
    /// Source name A to Z
    Source,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relevance" => Ok(SortOrder::Relevance),
            "date" => Ok(SortOrder::Date),
            "source" => Ok(SortOrder::Source),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Relevance => write!(f, "Relevance"),
            SortOrder::Date => write!(f, "Date"),
            SortOrder::Source => write!(f, "Source"),
        }
    }
}

/// Articles per page on the articles tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Limit(usize),
    All,
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::Limit(10)
    }
}

impl PageSize {
    pub const CHOICES: [PageSize; 5] = [
        PageSize::Limit(5),
        PageSize::Limit(10),
        PageSize::Limit(15),
        PageSize::Limit(20),
        PageSize::All,
    ];
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(PageSize::All);
        }
        match s.parse::<usize>() {
            Ok(n) if n > 0 => Ok(PageSize::Limit(n)),
            _ => Err(format!("invalid page size: {}", s)),
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSize::Limit(n) => write!(f, "{}", n),
            PageSize::All => write!(f, "All"),
        }
    }
}

/// Filter, sort and page settings for the articles tab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleView {
    pub sort: SortOrder,
    /// `None` means all sources
    pub source: Option<String>,
    pub per_page: PageSize,
}

/// Result of applying an [`ArticleView`].
#[derive(Debug)]
pub struct ArticlePage<'a> {
    pub shown: Vec<&'a DisplayArticle>,
    pub filtered: usize,
    pub total: usize,
}

impl ArticleView {
    pub fn apply<'a>(&self, articles: &'a [DisplayArticle]) -> ArticlePage<'a> {
        let mut selected: Vec<&DisplayArticle> = articles
            .iter()
            .filter(|a| self.source.as_ref().map_or(true, |s| &a.source == s))
            .collect();

        match self.sort {
            SortOrder::Relevance => {}
            SortOrder::Date => selected.sort_by(|a, b| {
                is_dated(&b.published_at)
                    .cmp(&is_dated(&a.published_at))
                    .then_with(|| b.published_at.cmp(&a.published_at))
            }),
            SortOrder::Source => selected.sort_by(|a, b| a.source.cmp(&b.source)),
        }

        let filtered = selected.len();
        if let PageSize::Limit(n) = self.per_page {
            selected.truncate(n);
        }

        ArticlePage {
            shown: selected,
            filtered,
            total: articles.len(),
        }
    }
}

/// One row of the source breakdown table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStat {
    pub source: String,
    pub count: usize,
    pub percentage: f64,
}

/// Sources by article count (descending, ties by name).
pub fn source_stats(metadata: &ArticleMetadata) -> Vec<SourceStat> {
    let mut rows: Vec<SourceStat> = metadata
        .source_distribution
        .iter()
        .map(|(source, &count)| SourceStat {
            source: source.clone(),
            count,
            percentage: if metadata.total_articles == 0 {
                0.0
            } else {
                round1(count as f64 / metadata.total_articles as f64 * 100.0)
            },
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.source.cmp(&b.source)));
    rows
}

/// Articles per day across the date span, or 0 when the span is empty.
pub fn average_per_day(metadata: &ArticleMetadata) -> f64 {
    match &metadata.date_range {
        Some(range) if range.span_days > 0 => {
            round1(metadata.total_articles as f64 / range.span_days as f64)
        }
        _ => 0.0,
    }
}

/// Check that both keys look plausible. Returns every problem found.
pub fn validate_api_keys(llm_key: &str, news_key: &str) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if llm_key.trim().chars().count() < 10 {
        errors.push("Invalid Groq API key format".to_string());
    }
    if news_key.trim().chars().count() < 10 {
        errors.push("Invalid NewsAPI key format".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// First `n` characters of `s`, never splitting a character.
pub fn prefix(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Whether a display timestamp starts with a real `YYYY-MM-DD` date.
fn is_dated(published_at: &str) -> bool {
    published_at
        .get(..10)
        .map_or(false, |d| NaiveDate::parse_from_str(d, "%Y-%m-%d").is_ok())
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.trim().is_empty())
}

fn or_default(v: &Option<String>, default: &str) -> String {
    non_empty(v).unwrap_or(default).to_string()
}
