// Market analysis over a batch of news articles
use tracing::{info, warn};

use super::{LlmProvider, LlmRequest};

/// Build the equity-research prompt for `query` over the prepared article text.
pub fn build_prompt(query: &str, news_content: &str) -> String {
    format!(
        r#"As an expert equity research analyst with 15+ years of experience, analyze the following news articles related to: "{query}"

News Content:
{news_content}

Please provide a comprehensive analysis including:

📊 **EXECUTIVE SUMMARY:**
- Key developments and breaking news
- Overall market sentiment (Bullish/Bearish/Neutral)

📈 **MARKET IMPLICATIONS:**
- Short-term price impact expectations
- Long-term investment thesis changes
- Sector-wide effects

⚠️ **RISK ASSESSMENT:**
- Potential downside risks
- Regulatory or competitive threats
- Market volatility factors

🎯 **INVESTMENT RECOMMENDATIONS:**
- Buy/Hold/Sell signals
- Price targets and timeframes
- Portfolio allocation suggestions

📰 **NEWS CREDIBILITY:**
- Source reliability assessment
- Information confirmation status

Keep the analysis professional, data-driven, and actionable for institutional investors.
"#
    )
}

/// Ask the provider for an analysis of `news_content`.
///
/// Never fails: a provider error is rendered as an `Error: ...` narrative so the
/// rest of the research result (articles, statistics, exports) stays usable.
pub async fn generate_analysis<P: LlmProvider + ?Sized>(
    provider: &P,
    query: &str,
    news_content: &str,
) -> String {
    let request = LlmRequest {
        prompt: build_prompt(query, news_content),
        max_tokens: None,
        temperature: None,
        timeout_seconds: None,
    };

    match provider.generate(request).await {
        Ok(response) => {
            info!(
                model = %response.model,
                total_tokens = response.usage.total_tokens,
                "analysis generated"
            );
            response.content
        }
        Err(e) => {
            warn!(model = %provider.model(), "analysis failed: {:#}", e);
            format!("Error: {:#}", e)
        }
    }
}
