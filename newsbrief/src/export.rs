//! Export renderings of a research result: text report, HTML report, CSV,
//! JSON, summary-only text and an email body.
//!
//! Everything here is a pure function of the [`ResearchResult`].

use anyhow::{Context, Result};
use serde::Serialize;
use std::str::FromStr;

use crate::processing::{self, ArticleMetadata, DisplayArticle};
use crate::research::{ResearchResult, ResearchSettings};

const BANNER_WIDTH: usize = 50;
const EMAIL_SUMMARY_CHARS: usize = 500;
const HTML_REPORT_ARTICLES: usize = 5;

/// Downloadable renderings offered on the export tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Report,
    Html,
    Csv,
    Json,
    Summary,
    Email,
}

impl ExportKind {
    pub const ALL: [ExportKind; 6] = [
        ExportKind::Report,
        ExportKind::Html,
        ExportKind::Csv,
        ExportKind::Json,
        ExportKind::Summary,
        ExportKind::Email,
    ];

    /// Path segment used in `/export/<kind>`.
    pub fn slug(self) -> &'static str {
        match self {
            ExportKind::Report => "report",
            ExportKind::Html => "html",
            ExportKind::Csv => "csv",
            ExportKind::Json => "json",
            ExportKind::Summary => "summary",
            ExportKind::Email => "email",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportKind::Report => "💾 Download Analysis Report",
            ExportKind::Html => "📄 Export as HTML (print to PDF)",
            ExportKind::Csv => "📊 Export to CSV",
            ExportKind::Json => "📋 Export as JSON",
            ExportKind::Summary => "📝 Summary Only",
            ExportKind::Email => "📧 Email Text",
        }
    }

    /// `(top-level, sub-level)` MIME type.
    pub fn media_type(self) -> (&'static str, &'static str) {
        match self {
            ExportKind::Html => ("text", "html"),
            ExportKind::Csv => ("text", "csv"),
            ExportKind::Json => ("application", "json"),
            _ => ("text", "plain"),
        }
    }

    fn file_prefix(self) -> &'static str {
        match self {
            ExportKind::Report | ExportKind::Html => "research_report",
            ExportKind::Csv => "articles_data",
            ExportKind::Json => "research_data",
            ExportKind::Summary => "summary",
            ExportKind::Email => "email",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            ExportKind::Html => "html",
            ExportKind::Csv => "csv",
            ExportKind::Json => "json",
            _ => "txt",
        }
    }

    /// Render `result` in this format.
    pub fn render(self, result: &ResearchResult) -> Result<String> {
        Ok(match self {
            ExportKind::Report => text_report(result),
            ExportKind::Html => html_report(result),
            ExportKind::Csv => csv_export(result),
            ExportKind::Json => json_export(result)?,
            ExportKind::Summary => summary_only(result),
            ExportKind::Email => format!("Subject: {}\n\n{}", email_subject(result), email_body(result)),
        })
    }
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportKind::ALL
            .into_iter()
            .find(|k| k.slug() == s)
            .ok_or_else(|| format!("unknown export format: {}", s))
    }
}

/// Download name: `<prefix>_<query>_<YYYYmmdd_HHMMSS>.<ext>`. The query is
/// reduced to ASCII letters, digits, `-` and `_`.
pub fn export_filename(kind: ExportKind, result: &ResearchResult) -> String {
    format!(
        "{}_{}_{}.{}",
        kind.file_prefix(),
        safe_query(&result.query),
        result.timestamp.format("%Y%m%d_%H%M%S"),
        kind.extension()
    )
}

pub fn safe_query(query: &str) -> String {
    query
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn banner(title: &str) -> String {
    let rule = "=".repeat(BANNER_WIDTH);
    format!("{rule}\n{title}\n{rule}")
}

fn date_range_text(metadata: &ArticleMetadata) -> (String, String) {
    match &metadata.date_range {
        Some(r) => (r.earliest.clone(), r.latest.clone()),
        None => ("N/A".to_string(), "N/A".to_string()),
    }
}

fn span_text(metadata: &ArticleMetadata) -> String {
    metadata
        .date_range
        .as_ref()
        .map(|r| r.span_days.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// Full plain-text research report.
pub fn text_report(result: &ResearchResult) -> String {
    let meta = &result.metadata;
    let (earliest, latest) = date_range_text(meta);
    let sources: String = processing::source_stats(meta)
        .iter()
        .map(|stat| format!("- {}: {} articles\n", stat.source, stat.count))
        .collect();

    format!(
        "NEWS RESEARCH REPORT
Generated: {generated}
Query: {query}

{summary_banner}

{summary}

{metadata_banner}

Total Articles Analyzed: {total}
Unique News Sources: {unique}
Date Range: {earliest} to {latest}

Sources Distribution:
{sources}
{disclaimer_banner}

This report is generated by AI and should not be considered as financial advice.
Always consult with qualified financial advisors before making investment decisions.
The information provided is based on publicly available news sources and may not be complete or accurate.

Report generated by News Research Tool - Powered by Groq AI & NewsAPI
",
        generated = result.timestamp.format("%Y-%m-%d %H:%M:%S"),
        query = result.query,
        summary_banner = banner("EXECUTIVE SUMMARY"),
        summary = result.summary,
        metadata_banner = banner("RESEARCH METADATA"),
        total = meta.total_articles,
        unique = meta.unique_sources,
        disclaimer_banner = banner("DISCLAIMER"),
    )
}

/// Escape text for inclusion in HTML element content or quoted attributes.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// `url` if it is an absolute `http`/`https` URL, safe to place in an `href`
/// or `src` attribute (after escaping). Anything else, `javascript:` and
/// relative paths included, yields `None`.
pub fn safe_link(url: &str) -> Option<&str> {
    url::Url::parse(url)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(|_| url)
}

/// Escaped text with line breaks kept as `<br>`.
pub fn html_multiline(s: &str) -> String {
    html_escape(s).replace("\r\n", "\n").replace('\n', "<br>\n")
}

/// Printable standalone HTML report with the top articles.
pub fn html_report(result: &ResearchResult) -> String {
    let meta = &result.metadata;

    let articles: String = result
        .articles
        .iter()
        .take(HTML_REPORT_ARTICLES)
        .map(html_report_article)
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Market Research Report: {query}</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; margin: 40px; }}
        .header {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
                  color: white; padding: 2rem; text-align: center; border-radius: 10px; }}
        .content {{ background: #f9f9f9; padding: 2rem; margin-top: 2rem; border-radius: 10px; }}
        .article {{ border-bottom: 1px solid #ddd; padding: 1rem 0; }}
        .metrics {{ display: flex; justify-content: space-around; margin: 2rem 0; }}
        .metric {{ text-align: center; background: #e3f2fd; padding: 1rem; border-radius: 8px; }}
        h1, h2, h3 {{ color: #333; }}
        .footer {{ text-align: center; margin-top: 3rem; color: #666; }}
    </style>
</head>
<body>
    <div class="header">
        <h1>📊 Market Research Report</h1>
        <h2>Query: "{query}"</h2>
        <p>Generated: {generated}</p>
    </div>

    <div class="content">
        <h2>🤖 AI Analysis Summary</h2>
        <div>{summary}</div>

        <div class="metrics">
            <div class="metric"><h3>{total}</h3><p>Articles</p></div>
            <div class="metric"><h3>{sources}</h3><p>Sources</p></div>
            <div class="metric"><h3>{span} days</h3><p>Time Span</p></div>
        </div>

        <h2>📰 Key Articles</h2>
{articles}    </div>

    <div class="footer">
        <p>Generated by AI News Research Tool</p>
        <p>Powered by Groq AI &amp; NewsAPI</p>
    </div>
</body>
</html>
"#,
        query = html_escape(&result.query),
        generated = result.timestamp.format("%Y-%m-%d %H:%M:%S"),
        summary = html_multiline(&result.summary),
        total = meta.total_articles,
        sources = meta.unique_sources,
        span = span_text(meta),
        articles = articles,
    )
}

fn html_report_article(article: &DisplayArticle) -> String {
    let link = safe_link(&article.url)
        .map(|url| {
            format!(
                r#"
            <p><a href="{}" target="_blank">Read Full Article</a></p>"#,
                html_escape(url)
            )
        })
        .unwrap_or_default();

    format!(
        r#"        <div class="article">
            <h3>{}</h3>
            <p><strong>Source:</strong> {} | <strong>Date:</strong> {}</p>
            <p>{}</p>{}
        </div>
"#,
        html_escape(&article.title),
        html_escape(&article.source),
        html_escape(&article.published_at),
        html_escape(&article.description),
        link
    )
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let row: Vec<String> = fields.into_iter().map(|f| csv_field(f.as_ref())).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

fn single_line(s: &str) -> String {
    s.replace('\n', " ").replace('\r', "")
}

/// Article table followed by a short statistics block.
pub fn csv_export(result: &ResearchResult) -> String {
    let mut out = String::new();

    csv_row(
        &mut out,
        ["Article_Number", "Title", "Source", "Author", "Published_Date", "Description", "URL"],
    );

    for (i, article) in result.articles.iter().enumerate() {
        csv_row(
            &mut out,
            [
                (i + 1).to_string(),
                single_line(&article.title),
                article.source.clone(),
                article.author.clone(),
                article.published_at.clone(),
                single_line(&article.description),
                article.url.clone(),
            ],
        );
    }

    out.push_str("\r\n");
    csv_row(&mut out, ["Summary Statistics"]);
    csv_row(&mut out, ["Total Articles".to_string(), result.articles.len().to_string()]);
    csv_row(&mut out, ["Unique Sources".to_string(), result.metadata.unique_sources.to_string()]);
    csv_row(&mut out, ["Date Range (days)".to_string(), span_text(&result.metadata)]);

    out
}

#[derive(Serialize)]
struct JsonExport<'a> {
    query: &'a str,
    summary: &'a str,
    articles: &'a [DisplayArticle],
    metadata: &'a ArticleMetadata,
    timestamp: String,
    config: &'a ResearchSettings,
}

/// Complete research data as pretty-printed JSON. API keys are not part of
/// [`ResearchSettings`] and so never appear.
pub fn json_export(result: &ResearchResult) -> Result<String> {
    let export = JsonExport {
        query: &result.query,
        summary: &result.summary,
        articles: &result.articles,
        metadata: &result.metadata,
        timestamp: result.timestamp.to_rfc3339(),
        config: &result.settings,
    };
    serde_json::to_string_pretty(&export).context("failed to serialize research export")
}

/// The analysis text with a few headline numbers.
pub fn summary_only(result: &ResearchResult) -> String {
    format!(
        "MARKET RESEARCH SUMMARY\nQuery: {}\nGenerated: {}\n\n{}\n\n---\nArticles Analyzed: {}\nSources: {}\nModel Used: {}\n",
        result.query,
        result.timestamp.format("%Y-%m-%d %H:%M:%S"),
        result.summary,
        result.articles.len(),
        result.metadata.unique_sources,
        result.settings.model,
    )
}

pub fn email_subject(result: &ResearchResult) -> String {
    format!("Market Research Report: {}", result.query)
}

/// Email-ready body quoting the start of the analysis.
pub fn email_body(result: &ResearchResult) -> String {
    let meta = &result.metadata;
    format!(
        r#"Dear Recipient,

Please find below the market research analysis for "{query}" generated on {generated}.

EXECUTIVE SUMMARY:
{excerpt}...

KEY METRICS:
• Articles Analyzed: {total}
• News Sources: {sources}
• Time Period: {span} days

This analysis was generated using AI and multiple news sources to provide market insights.

For the complete detailed report with all articles, please refer to the attached files or contact me for the full analysis.

DISCLAIMER: This report is for informational purposes only and should not be considered as financial advice. Always consult with qualified financial advisors before making investment decisions.

Best regards,
AI News Research Tool
Powered by Groq AI & NewsAPI
"#,
        query = result.query,
        generated = result.timestamp.format("%B %d, %Y at %H:%M"),
        excerpt = processing::prefix(&result.summary, EMAIL_SUMMARY_CHARS),
        total = meta.total_articles,
        sources = meta.unique_sources,
        span = span_text(meta),
    )
}
