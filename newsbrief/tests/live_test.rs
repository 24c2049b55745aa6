//! Live round trip against NewsAPI and Groq. Needs GROQ_API_KEY and
//! NEWSAPI_KEY (a `.env` file works), so it only runs on request:
//!
//!   cargo test -p newsbrief --test live_test -- --ignored

use common::Config;
use newsbrief::export::ExportKind;
use newsbrief::research::{self, Credentials, ResearchSettings};

#[tokio::test]
#[ignore]
async fn test_live_research_pipeline() {
    dotenv::dotenv().ok();

    let config = Config::default();
    let credentials = Credentials::default().or_env(&config);
    if credentials.llm_key.is_empty() || credentials.news_key.is_empty() {
        eprintln!("skipping: GROQ_API_KEY / NEWSAPI_KEY not set");
        return;
    }

    let settings = ResearchSettings {
        max_articles: 5,
        ..ResearchSettings::from_config(&config)
    };

    let result = research::research_with_config(&config, "Tesla stock price analysis", settings, &credentials)
        .await
        .expect("live research should succeed");

    assert!(!result.articles.is_empty());
    assert!(result.articles.len() <= 5);
    assert!(!result.summary.starts_with("Error: "), "analysis failed: {}", result.summary);

    for kind in ExportKind::ALL {
        let rendered = kind.render(&result).expect("render export");
        assert!(!rendered.contains(&credentials.llm_key));
    }
}
