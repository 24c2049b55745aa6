use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::form::Form;
use rocket::http::{ContentType, Cookie, CookieJar, Header, Status};
use rocket::response::content::RawHtml;
use rocket::response::Redirect;
use rocket::serde::json::Json;
use rocket::{get, post, routes, Build, FromForm, Responder, Rocket, State};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use common::Config;

use crate::export::{self, ExportKind};
use crate::pages::{self, FormLimits, IndexPage, KeyStatus, Tab};
use crate::processing::ArticleView;
use crate::research::{self, Credentials, ResearchError, ResearchResult, ResearchSettings};
use crate::sessions::{NoticeKind, SessionStore};

const SESSION_COOKIE: &str = "newsbrief_sid";
const STYLESHEET: &str = include_str!("../static/style.css");

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub config: Arc<Config>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        let sessions = SessionStore::new(config.max_sessions(), ResearchSettings::from_config(&config));
        Self {
            started_at: Utc::now(),
            config,
            sessions,
        }
    }
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    sessions: usize,
    default_model: String,
    models: Vec<String>,
}

/// Fields posted by the sidebar and search box.
#[derive(Debug, FromForm)]
struct ResearchForm {
    query: String,
    model: Option<String>,
    days_back: Option<u32>,
    max_articles: Option<u32>,
    show_images: bool,
    show_authors: bool,
    llm_api_key: Option<String>,
    news_api_key: Option<String>,
}

#[derive(Debug, FromForm)]
struct QueryForm {
    query: String,
}

/// Body of `POST /api/v1/research`. Missing keys fall back to the environment.
#[derive(Debug, Deserialize)]
struct ApiResearchRequest {
    query: String,
    model: Option<String>,
    days_back: Option<u32>,
    max_articles: Option<u32>,
    llm_api_key: Option<String>,
    news_api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

/// File download with a `Content-Disposition` header.
#[derive(Responder)]
struct Download {
    inner: (ContentType, String),
    disposition: Header<'static>,
}

/// Session id from the cookie, issuing a fresh one when absent or garbled.
fn session_id(cookies: &CookieJar<'_>) -> Uuid {
    if let Some(id) = cookies
        .get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
    {
        return id;
    }
    let id = Uuid::new_v4();
    cookies.add(Cookie::new(SESSION_COOKIE, id.to_string()));
    id
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[get("/?<tab>&<sort>&<source>&<per_page>")]
async fn index(
    state: &State<AppState>,
    cookies: &CookieJar<'_>,
    tab: Option<&str>,
    sort: Option<&str>,
    source: Option<&str>,
    per_page: Option<&str>,
) -> RawHtml<String> {
    let id = session_id(cookies);
    let (session, notices) = state
        .sessions
        .with_session(id, |s| {
            let notices = s.take_notices();
            (s.clone(), notices)
        })
        .await;

    let credentials = session.credentials.clone().or_env(&state.config);
    let keys = KeyStatus {
        llm_configured: !credentials.llm_key.trim().is_empty(),
        news_configured: !credentials.news_key.trim().is_empty(),
    };

    let view = ArticleView {
        sort: sort.and_then(|s| s.parse().ok()).unwrap_or_default(),
        source: source.filter(|s| !s.is_empty()).map(str::to_string),
        per_page: per_page.and_then(|p| p.parse().ok()).unwrap_or_default(),
    };
    let limits = FormLimits::from_config(&state.config);

    RawHtml(pages::render_index(&IndexPage {
        session: &session,
        notices: &notices,
        limits: &limits,
        keys,
        tab: tab.and_then(|t| t.parse::<Tab>().ok()).unwrap_or_default(),
        view: &view,
    }))
}

#[post("/research", data = "<form>")]
async fn start_research(
    state: &State<AppState>,
    cookies: &CookieJar<'_>,
    form: Form<ResearchForm>,
) -> Redirect {
    let id = session_id(cookies);
    let config = state.config.clone();
    let form = form.into_inner();
    let query = form.query.trim().to_string();

    let (settings, credentials) = state
        .sessions
        .with_session(id, |s| {
            s.settings = ResearchSettings {
                model: non_blank(form.model).unwrap_or_else(|| s.settings.model.clone()),
                days_back: form.days_back.unwrap_or(s.settings.days_back),
                max_articles: form.max_articles.unwrap_or(s.settings.max_articles),
                show_images: form.show_images,
                show_authors: form.show_authors,
            }
            .clamp(&config);

            if let Some(key) = non_blank(form.llm_api_key) {
                s.credentials.llm_key = key;
            }
            if let Some(key) = non_blank(form.news_api_key) {
                s.credentials.news_key = key;
            }
            s.selected_query = query.clone();
            (s.settings.clone(), s.credentials.clone())
        })
        .await;

    let outcome =
        research::research_with_config(&config, &query, settings, &credentials.or_env(&config)).await;

    state
        .sessions
        .with_session(id, |s| match outcome {
            Ok(result) => {
                s.notify(
                    NoticeKind::Success,
                    format!("Successfully fetched {} articles", result.articles.len()),
                );
                if !result.warnings.is_empty() {
                    s.notify(
                        NoticeKind::Warning,
                        format!("Found {} articles with missing information", result.warnings.len()),
                    );
                }
                s.record_result(result, config.history_limit());
            }
            Err(ResearchError::NoArticles) => {
                s.notify(NoticeKind::Warning, ResearchError::NoArticles.to_string());
            }
            Err(e) => {
                warn!(error = %e, "research request failed");
                s.notify(NoticeKind::Error, e.to_string());
            }
        })
        .await;

    Redirect::to("/")
}

#[post("/select", data = "<form>")]
async fn select_query(state: &State<AppState>, cookies: &CookieJar<'_>, form: Form<QueryForm>) -> Redirect {
    let id = session_id(cookies);
    let query = form.into_inner().query.trim().to_string();
    state
        .sessions
        .with_session(id, |s| s.selected_query = query)
        .await;
    Redirect::to("/")
}

#[post("/clear")]
async fn clear(state: &State<AppState>, cookies: &CookieJar<'_>) -> Redirect {
    let id = session_id(cookies);
    state.sessions.with_session(id, |s| s.clear()).await;
    Redirect::to("/")
}

#[post("/history/clear")]
async fn clear_history(state: &State<AppState>, cookies: &CookieJar<'_>) -> Redirect {
    let id = session_id(cookies);
    state
        .sessions
        .with_session(id, |s| {
            s.clear_search_history();
            s.notify(NoticeKind::Success, "Search history cleared!");
        })
        .await;
    Redirect::to("/")
}

#[post("/history/<idx>/remove")]
async fn remove_history(state: &State<AppState>, cookies: &CookieJar<'_>, idx: usize) -> Redirect {
    let id = session_id(cookies);
    state
        .sessions
        .with_session(id, |s| {
            s.remove_search_history(idx);
        })
        .await;
    Redirect::to("/")
}

#[get("/export/<kind>")]
async fn download(
    state: &State<AppState>,
    cookies: &CookieJar<'_>,
    kind: &str,
) -> Result<Download, Status> {
    let kind: ExportKind = kind.parse().map_err(|_| Status::NotFound)?;
    let id = session_id(cookies);

    let result = state
        .sessions
        .get(id)
        .await
        .and_then(|s| s.current)
        .ok_or(Status::NotFound)?;

    let body = kind.render(&result).map_err(|e| {
        error!(error = %e, kind = kind.slug(), "export failed");
        Status::InternalServerError
    })?;

    let (top, sub) = kind.media_type();
    let filename = export::export_filename(kind, &result);
    info!(kind = kind.slug(), %filename, "export generated");

    Ok(Download {
        inner: (ContentType::new(top, sub).with_params(("charset", "utf-8")), body),
        disposition: Header::new(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        ),
    })
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

/// Status endpoint returning simple JSON with uptime and model info.
#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();

    Json(StatusResponse {
        status: "ok",
        uptime_seconds: uptime,
        sessions: state.sessions.len().await,
        default_model: state.config.default_model(),
        models: state.config.available_models(),
    })
}

#[post("/api/v1/research", data = "<body>")]
async fn api_research(
    state: &State<AppState>,
    body: Json<ApiResearchRequest>,
) -> Result<Json<ResearchResult>, (Status, Json<ApiError>)> {
    let config = state.config.as_ref();
    let body = body.into_inner();
    let defaults = ResearchSettings::from_config(config);

    let settings = ResearchSettings {
        model: non_blank(body.model).unwrap_or(defaults.model),
        days_back: body.days_back.unwrap_or(defaults.days_back),
        max_articles: body.max_articles.unwrap_or(defaults.max_articles),
        ..defaults
    }
    .clamp(config);

    let credentials = Credentials {
        llm_key: non_blank(body.llm_api_key).unwrap_or_default(),
        news_key: non_blank(body.news_api_key).unwrap_or_default(),
    }
    .or_env(config);

    research::research_with_config(config, &body.query, settings, &credentials)
        .await
        .map(Json)
        .map_err(|e| {
            let status = match e {
                ResearchError::NoArticles => Status::NotFound,
                ResearchError::Api(_) => Status::BadGateway,
                _ => Status::BadRequest,
            };
            warn!(error = %e, code = status.code, "api research failed");
            (status, Json(ApiError { error: e.to_string() }))
        })
}

#[get("/static/style.css")]
async fn stylesheet() -> (ContentType, &'static str) {
    (ContentType::CSS, STYLESHEET)
}

/// Build the Rocket instance with managed state and every route mounted.
/// `[server] bind` and `port` are merged into Rocket's figment.
pub fn build_rocket(config: Arc<Config>) -> Rocket<Build> {
    let fig = rocket::Config::figment()
        .merge(("address", config.bind_address().to_string()))
        .merge(("port", config.port()));

    rocket::custom(fig).manage(AppState::new(config)).mount(
        "/",
        routes![
            index,
            start_research,
            select_query,
            clear,
            clear_history,
            remove_history,
            download,
            health,
            status,
            api_research,
            stylesheet,
        ],
    )
}

pub async fn launch_rocket(config: Arc<Config>) -> Result<()> {
    info!(
        bind = config.bind_address(),
        port = config.port(),
        default_model = %config.default_model(),
        "Starting Rocket HTTP server"
    );

    build_rocket(config)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    info!("Rocket HTTP server has shut down");
    Ok(())
}
