//! HTML pages for the browser interface.
//!
//! Plain `format!` templates. Every user- or API-supplied string goes through
//! [`html_escape`] before it lands in markup.

use std::fmt;
use std::str::FromStr;

use crate::export::{self, html_escape, html_multiline, ExportKind};
use crate::processing::{self, ArticleView, DisplayArticle, PageSize, SortOrder};
use crate::research::ResearchResult;
use crate::sessions::{Notice, NoticeKind, ResearchSession};

/// Queries offered as one-click suggestions under the search box.
pub const QUICK_SUGGESTIONS: [(&str, &str); 3] = [
    ("📈 Tesla Stock", "Tesla stock price analysis"),
    ("🍎 Apple Earnings", "Apple quarterly earnings report"),
    ("₿ Crypto Market", "cryptocurrency market trends"),
];

const SIDEBAR_HISTORY: usize = 10;
const ANALYTICS_HISTORY: usize = 10;
const TOP_SOURCES_CHART: usize = 10;

/// Results tab selected with `?tab=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Analysis,
    Articles,
    Analytics,
    Export,
}

impl Tab {
    const ALL: [Tab; 4] = [Tab::Analysis, Tab::Articles, Tab::Analytics, Tab::Export];

    fn slug(self) -> &'static str {
        match self {
            Tab::Analysis => "analysis",
            Tab::Articles => "articles",
            Tab::Analytics => "analytics",
            Tab::Export => "export",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Tab::Analysis => "🤖 AI Analysis",
            Tab::Articles => "📰 News Articles",
            Tab::Analytics => "📊 Analytics",
            Tab::Export => "📋 Export",
        }
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tab::ALL
            .into_iter()
            .find(|t| t.slug() == s)
            .ok_or_else(|| format!("unknown tab: {}", s))
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Choices and bounds for the sidebar form, taken from the config.
#[derive(Debug, Clone)]
pub struct FormLimits {
    pub models: Vec<String>,
    pub max_days_back: u32,
    pub min_articles: u32,
    pub max_articles: u32,
}

impl FormLimits {
    pub fn from_config(config: &common::Config) -> Self {
        Self {
            models: config.available_models(),
            max_days_back: config.max_days_back(),
            min_articles: config.min_articles(),
            max_articles: config.max_articles_display().max(config.min_articles()),
        }
    }
}

/// Whether each upstream key is available, and where it came from.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyStatus {
    pub llm_configured: bool,
    pub news_configured: bool,
}

/// Everything the index page needs.
pub struct IndexPage<'a> {
    pub session: &'a ResearchSession,
    pub notices: &'a [Notice],
    pub limits: &'a FormLimits,
    pub keys: KeyStatus,
    pub tab: Tab,
    pub view: &'a ArticleView,
}

pub fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{}</title>
    <link rel="stylesheet" href="/static/style.css">
</head>
<body>
{}
</body>
</html>
"#,
        html_escape(title),
        body
    )
}

pub fn render_index(page: &IndexPage<'_>) -> String {
    let mut main = String::new();
    main.push_str(&render_header());
    main.push_str(&render_notices(page.notices));
    main.push_str(&render_search(&page.session.selected_query));
    if let Some(result) = &page.session.current {
        main.push_str(&render_results(result, page));
    }
    main.push_str(&render_help());
    main.push_str(&render_footer());

    let body = format!(
        r#"<div class="app">
<aside class="sidebar">
{}
</aside>
<main class="main">
{}
</main>
</div>"#,
        render_sidebar(page),
        main
    );

    layout("News Research Tool", &body)
}

fn render_header() -> String {
    r#"<h1 class="main-header">📰 AI News Research Tool</h1>
<h3>🚀 Professional Equity Research Assistant</h3>
<p><em>Powered by Groq AI &amp; NewsAPI for intelligent market analysis</em></p>
"#
    .to_string()
}

pub fn render_notices(notices: &[Notice]) -> String {
    notices
        .iter()
        .map(|n| {
            let (class, icon) = match n.kind {
                NoticeKind::Success => ("success", "✅"),
                NoticeKind::Info => ("info", "ℹ️"),
                NoticeKind::Warning => ("warning", "⚠️"),
                NoticeKind::Error => ("error", "❌"),
            };
            format!(
                "<div class=\"notice notice-{}\">{} {}</div>\n",
                class,
                icon,
                html_escape(&n.text)
            )
        })
        .collect()
}

fn render_sidebar(page: &IndexPage<'_>) -> String {
    let settings = &page.session.settings;
    let limits = page.limits;

    let model_options: String = limits
        .models
        .iter()
        .map(|m| {
            format!(
                "<option value=\"{v}\"{sel}>{v}</option>",
                v = html_escape(m),
                sel = if *m == settings.model { " selected" } else { "" }
            )
        })
        .collect();

    let status = |ok: bool| if ok { "✅ Configured" } else { "❌ Not configured" };

    format!(
        r#"<h3 class="sidebar-header">⚙️ Analysis Settings</h3>
<form id="research-form" method="post" action="/research">
    <label>🤖 AI Model
        <select name="model">{model_options}</select>
    </label>
    <label>📅 Days to look back: <output>{days}</output>
        <input type="range" name="days_back" min="1" max="{max_days}" value="{days}" oninput="this.previousElementSibling.value=this.value">
    </label>
    <label>📄 Max articles to analyze: <output>{articles}</output>
        <input type="range" name="max_articles" min="{min_articles}" max="{max_articles}" value="{articles}" oninput="this.previousElementSibling.value=this.value">
    </label>
    <details>
        <summary>🔧 Advanced Settings</summary>
        <label><input type="checkbox" name="show_images"{images}> Show article images</label>
        <label><input type="checkbox" name="show_authors"{authors}> Show article authors</label>
    </details>
    <h3 class="sidebar-header">🔑 API Keys</h3>
    <label>Groq API key
        <input type="password" name="llm_api_key" autocomplete="off" placeholder="{llm_placeholder}">
    </label>
    <label>NewsAPI key
        <input type="password" name="news_api_key" autocomplete="off" placeholder="{news_placeholder}">
    </label>
</form>
<div class="key-status">
    <div><strong>Groq API:</strong> {llm_status}</div>
    <div><strong>NewsAPI:</strong> {news_status}</div>
</div>
{history}"#,
        model_options = model_options,
        days = settings.days_back,
        max_days = limits.max_days_back,
        articles = settings.max_articles,
        min_articles = limits.min_articles,
        max_articles = limits.max_articles,
        images = if settings.show_images { " checked" } else { "" },
        authors = if settings.show_authors { " checked" } else { "" },
        llm_placeholder = if page.keys.llm_configured { "stored (leave blank to keep)" } else { "gsk_..." },
        news_placeholder = if page.keys.news_configured { "stored (leave blank to keep)" } else { "your NewsAPI key" },
        llm_status = status(page.keys.llm_configured),
        news_status = status(page.keys.news_configured),
        history = render_search_history(page.session),
    )
}

fn render_search_history(session: &ResearchSession) -> String {
    let history = &session.search_history;
    let mut out = String::from("<hr>\n<h3 class=\"sidebar-header\">🕐 Search History</h3>\n");

    if history.is_empty() {
        out.push_str("<div class=\"notice notice-info\">📝 No search history yet</div>\n");
        return out;
    }

    out.push_str(&format!(
        r#"<p><strong>Total Searches:</strong> {}</p>
<form method="post" action="/history/clear"><button type="submit">🗑️ Clear History</button></form>
"#,
        history.len()
    ));

    for (idx, item) in history.iter().take(SIDEBAR_HISTORY).enumerate() {
        let short = processing::prefix(&item.query, 50);
        let ellipsis = if item.query.chars().count() > 50 { "..." } else { "" };
        let count = if item.results_count > 0 {
            format!(" • 📰 {} articles", item.results_count)
        } else {
            String::new()
        };

        out.push_str(&format!(
            r#"<div class="history-item">
    <div class="history-query">🔍 {short}{ellipsis}</div>
    <div class="history-meta">📅 {date} • ⏰ {time}{count}</div>
    <form method="post" action="/select" class="inline"><input type="hidden" name="query" value="{query}"><button type="submit">🔄 Search</button></form>
    <form method="post" action="/history/{idx}/remove" class="inline"><button type="submit">❌</button></form>
</div>
"#,
            short = html_escape(&short),
            ellipsis = ellipsis,
            date = item.timestamp.format("%b %d, %Y"),
            time = item.timestamp.format("%I:%M %p"),
            count = count,
            query = html_escape(&item.query),
            idx = idx,
        ));
    }

    if history.len() > SIDEBAR_HISTORY {
        out.push_str(&format!("<p><em>...and {} more</em></p>\n", history.len() - SIDEBAR_HISTORY));
    }

    out
}

fn render_search(selected_query: &str) -> String {
    let suggestions: String = QUICK_SUGGESTIONS
        .iter()
        .map(|(label, query)| {
            format!(
                r#"<form method="post" action="/select" class="inline"><input type="hidden" name="query" value="{}"><button type="submit">{}</button></form>"#,
                html_escape(query),
                label
            )
        })
        .collect();

    format!(
        r#"<section class="search">
    <div class="search-main">
        <h2>🔍 Enter Your Research Query</h2>
        <input form="research-form" type="text" name="query" value="{query}" placeholder="e.g., Tesla earnings Q4, Apple stock analysis, Bitcoin price prediction">
        <p><strong>💡 Quick Suggestions:</strong></p>
        <div class="suggestions">{suggestions}</div>
    </div>
    <div class="search-actions">
        <h2>📊 Actions</h2>
        <button form="research-form" type="submit" class="primary">🚀 Start Research</button>
        <form method="post" action="/clear"><button type="submit">🗑️ Clear All</button></form>
    </div>
</section>
"#,
        query = html_escape(selected_query),
        suggestions = suggestions,
    )
}

fn render_results(result: &ResearchResult, page: &IndexPage<'_>) -> String {
    let tabs: String = Tab::ALL
        .iter()
        .map(|t| {
            format!(
                r#"<a class="tab{}" href="/?tab={}">{}</a>"#,
                if *t == page.tab { " active" } else { "" },
                t.slug(),
                t.label()
            )
        })
        .collect();

    let body = match page.tab {
        Tab::Analysis => render_analysis(result),
        Tab::Articles => render_articles(result, page.view, &page.session.settings),
        Tab::Analytics => render_analytics(result, page.session),
        Tab::Export => render_export(result),
    };

    format!(
        r#"<hr>
<h2>🎯 Research Results for: '{}'</h2>
<nav class="tabs">{}</nav>
<section class="tab-body">
{}
</section>
"#,
        html_escape(&result.query),
        tabs,
        body
    )
}

fn metric_card(icon: &str, value: &str, label: &str) -> String {
    format!(
        r#"<div class="metric-card"><div class="metric-icon">{}</div><div class="metric-value">{}</div><div class="metric-label">{}</div></div>"#,
        icon,
        html_escape(value),
        label
    )
}

pub fn render_analysis(result: &ResearchResult) -> String {
    let meta = &result.metadata;
    let span = meta.date_range.as_ref().map(|r| r.span_days).unwrap_or(0);

    format!(
        r#"<div class="summary-box"><h2>🤖 AI-Generated Market Analysis</h2></div>
<h3>📊 {query}</h3>
<div class="analysis">{summary}</div>
<div class="metrics">{articles}{sources}{days}{generated}</div>
"#,
        query = html_escape(&result.query),
        summary = html_multiline(&result.summary),
        articles = metric_card("📰", &meta.total_articles.to_string(), "Articles"),
        sources = metric_card("🏢", &meta.unique_sources.to_string(), "Sources"),
        days = metric_card("📅", &span.to_string(), "Days"),
        generated = metric_card("⏰", &result.timestamp.format("%H:%M").to_string(), "Generated"),
    )
}

pub fn render_articles(
    result: &ResearchResult,
    view: &ArticleView,
    settings: &crate::research::ResearchSettings,
) -> String {
    let sort_options: String = [SortOrder::Relevance, SortOrder::Date, SortOrder::Source]
        .iter()
        .map(|s| {
            format!(
                "<option value=\"{v}\"{sel}>{v}</option>",
                v = s,
                sel = if *s == view.sort { " selected" } else { "" }
            )
        })
        .collect();

    let mut source_options = format!(
        "<option value=\"\"{}>All Sources</option>",
        if view.source.is_none() { " selected" } else { "" }
    );
    for s in &result.metadata.sources_list {
        source_options.push_str(&format!(
            "<option value=\"{v}\"{sel}>{v}</option>",
            v = html_escape(s),
            sel = if view.source.as_deref() == Some(s.as_str()) { " selected" } else { "" }
        ));
    }

    let page_options: String = PageSize::CHOICES
        .iter()
        .map(|p| {
            format!(
                "<option value=\"{v}\"{sel}>{v}</option>",
                v = p,
                sel = if *p == view.per_page { " selected" } else { "" }
            )
        })
        .collect();

    let page = view.apply(&result.articles);

    let mut out = format!(
        r#"<h3>📰 News Articles ({total} found)</h3>
<form method="get" action="/" class="article-view">
    <input type="hidden" name="tab" value="articles">
    <label>Sort by: <select name="sort">{sort_options}</select></label>
    <label>Filter by source: <select name="source">{source_options}</select></label>
    <label>Articles per page: <select name="per_page">{page_options}</select></label>
    <button type="submit">Apply</button>
</form>
"#,
        total = result.articles.len(),
        sort_options = sort_options,
        source_options = source_options,
        page_options = page_options,
    );

    if page.shown.is_empty() {
        out.push_str("<div class=\"notice notice-info\">No articles match the current filters.</div>\n");
    } else {
        for article in &page.shown {
            out.push_str(&render_news_card(article, settings));
        }
    }

    if page.filtered != page.total {
        out.push_str(&format!(
            "<div class=\"notice notice-info\">Showing {} of {} filtered articles (total: {})</div>\n",
            page.shown.len(),
            page.filtered,
            page.total
        ));
    }

    out
}

fn render_news_card(article: &DisplayArticle, settings: &crate::research::ResearchSettings) -> String {
    let image = match export::safe_link(&article.url_to_image) {
        Some(src) if settings.show_images => format!(
            r#"<figure class="card-image"><img src="{}" alt="" loading="lazy"><figcaption>📸 {}</figcaption></figure>"#,
            html_escape(src),
            html_escape(&article.source)
        ),
        _ => String::new(),
    };

    let author = if settings.show_authors {
        format!(r#"<span class="pill">✍️ {}</span>"#, html_escape(&article.author))
    } else {
        String::new()
    };

    let link = export::safe_link(&article.url)
        .map(|url| {
            format!(
                r#"<a class="button primary" href="{}" target="_blank" rel="noopener">🔗 Full Article</a>"#,
                html_escape(url)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<article class="news-card">
    <div class="card-head"><span class="card-index">{number}</span><h3>{title}</h3></div>
    <details>
        <summary>📖 Read Summary &amp; Details</summary>
        <div class="card-meta"><span class="pill">📰 {source}</span><span class="pill">📅 {published}</span>{author}</div>
        <div class="card-body">{image}<div class="card-summary"><h4>✨ Summary</h4><p>{summary}</p></div></div>
        {link}
    </details>
</article>
"#,
        number = article.index + 1,
        title = html_escape(&article.title),
        source = html_escape(&article.source),
        published = html_escape(&article.published_at),
        author = author,
        image = image,
        summary = html_escape(&processing::card_summary(&article.description)),
        link = link,
    )
}

pub fn render_analytics(result: &ResearchResult, session: &ResearchSession) -> String {
    let meta = &result.metadata;
    let stats = processing::source_stats(meta);

    let range = meta
        .date_range
        .as_ref()
        .map(|r| metric_card("📅", &format!("{} days", r.span_days), "Date Range"))
        .unwrap_or_default();

    let mut out = format!(
        r#"<h3>📊 Research Analytics Dashboard</h3>
<div class="metrics">{total}{sources}{range}{avg}</div>
"#,
        total = metric_card("📰", &meta.total_articles.to_string(), "Total Articles"),
        sources = metric_card("🏢", &meta.unique_sources.to_string(), "Unique Sources"),
        range = range,
        avg = metric_card("📈", &processing::average_per_day(meta).to_string(), "Avg/Day"),
    );

    if !stats.is_empty() {
        let max = stats.iter().map(|s| s.count).max().unwrap_or(1).max(1);
        out.push_str("<h3>📊 Sources Distribution</h3>\n<div class=\"bar-chart\">\n");
        for s in stats.iter().take(TOP_SOURCES_CHART) {
            out.push_str(&format!(
                r#"<div class="bar-row"><span class="bar-label">{}</span><span class="bar" style="width: {}%"></span><span class="bar-value">{}</span></div>
"#,
                html_escape(&s.source),
                s.count * 100 / max,
                s.count
            ));
        }
        out.push_str("</div>\n<h3>📋 Source Details</h3>\n<table>\n<tr><th>Source</th><th>Articles</th><th>Percentage</th></tr>\n");
        for s in &stats {
            out.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}%</td></tr>\n",
                html_escape(&s.source),
                s.count,
                s.percentage
            ));
        }
        out.push_str("</table>\n");
    }

    if session.research_history.len() > 1 {
        out.push_str("<h3>📜 Research History</h3>\n<table>\n<tr><th>Query</th><th>Articles</th><th>Time</th><th>Date</th></tr>\n");
        for item in session.recent_research(ANALYTICS_HISTORY) {
            out.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                html_escape(&item.query),
                item.article_count,
                item.timestamp.format("%H:%M:%S"),
                item.timestamp.format("%Y-%m-%d")
            ));
        }
        out.push_str("</table>\n");
    }

    out
}

pub fn render_export(result: &ResearchResult) -> String {
    let downloads: String = ExportKind::ALL
        .iter()
        .map(|k| {
            format!(
                r#"<a class="button" href="/export/{}" download="{}">{}</a>"#,
                k.slug(),
                html_escape(&export::export_filename(*k, result)),
                k.label()
            )
        })
        .collect();

    format!(
        r#"<h3>📋 Export &amp; Download Options</h3>
<div class="downloads">{downloads}</div>
<details>
    <summary>📧 Email Content Preview</summary>
    <label>Email Subject:<textarea rows="1" readonly>{subject}</textarea></label>
    <label>Email Body:<textarea rows="14" readonly>{body}</textarea></label>
    <p class="notice notice-info">Copy the content above to send via your email client</p>
</details>
<details>
    <summary>🔍 Raw Data Preview</summary>
    <pre>{raw}</pre>
</details>
"#,
        downloads = downloads,
        subject = html_escape(&export::email_subject(result)),
        body = html_escape(&export::email_body(result)),
        raw = html_escape(&raw_preview(result)),
    )
}

fn raw_preview(result: &ResearchResult) -> String {
    let value = serde_json::json!({
        "query": result.query,
        "article_count": result.articles.len(),
        "sources": result.metadata.sources_list.len(),
        "timestamp": result.timestamp.to_rfc3339(),
        "model_used": result.settings.model,
    });
    serde_json::to_string_pretty(&value).unwrap_or_default()
}

fn render_help() -> String {
    r#"<details class="help">
<summary>📖 How to Use This Tool</summary>
<h4>🚀 Getting Started:</h4>
<p><strong>Step 1: Configure API Keys</strong></p>
<ul>
    <li>Paste your keys in the sidebar, or export <code>GROQ_API_KEY</code> and <code>NEWSAPI_KEY</code> before starting the server</li>
    <li>Get a Groq API key from <a href="https://groq.com">groq.com</a></li>
    <li>Get a NewsAPI key from <a href="https://newsapi.org">newsapi.org</a></li>
</ul>
<p><strong>Step 2: Start Research</strong></p>
<ul>
    <li>Enter your query (company name, stock symbol, industry term)</li>
    <li>Click "Start Research" to begin analysis</li>
    <li>Browse the AI analysis, the articles, the analytics and the exports</li>
</ul>
<h4>🎯 Query Examples:</h4>
<ul>
    <li><code>Tesla Q4 earnings report</code></li>
    <li><code>Apple iPhone sales decline</code></li>
    <li><code>Bitcoin ETF approval news</code></li>
    <li><code>Microsoft AI developments</code></li>
</ul>
</details>
"#
    .to_string()
}

fn render_footer() -> String {
    r#"<footer>
<div class="footer-columns">
    <div><strong>🚀 Features:</strong><ul><li>AI-Powered Analysis</li><li>Real-time News</li><li>Multi-source Research</li></ul></div>
    <div><strong>⚡ Exports:</strong><ul><li>Text &amp; HTML Reports</li><li>CSV &amp; JSON Data</li><li>Email-ready Summary</li></ul></div>
    <div><strong>🔒 Privacy:</strong><ul><li>Keys Kept in Memory Only</li><li>No Data Storage</li><li>Nothing Shared Between Visitors</li></ul></div>
</div>
<div class="footer-text">
    <p>🚀 <strong>News Research Tool</strong> - Powered by Groq AI &amp; NewsAPI</p>
    <p>⚠️ <em>This tool provides analysis for research purposes only. Not financial advice.</em></p>
</div>
</footer>
"#
    .to_string()
}
