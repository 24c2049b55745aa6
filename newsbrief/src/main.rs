/*
newsbrief - server main.rs
This binary loads the configuration and starts the Rocket HTTP server that serves the research UI.
*/

use anyhow::Result;
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use newsbrief::server::launch_rocket;

#[derive(Parser, Debug)]
#[command(name = "newsbrief", about = "AI news research assistant (web UI)")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Override `[server] bind`
    #[arg(long)]
    bind: Option<String>,

    /// Override `[server] port`
    #[arg(long)]
    port: Option<u16>,
}

/// Resolve `config.default.toml` plus an optional override file and load them.
async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = explicit {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let mut config = match load_config(args.config).await {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };

    if let Some(bind) = args.bind {
        config.server.bind = Some(bind);
    }
    if let Some(port) = args.port {
        config.server.port = Some(port);
    }

    for (name, env) in [("Groq", config.llm_key_env()), ("NewsAPI", config.newsapi_key_env())] {
        if common::resolve_api_key(env).is_none() {
            warn!(api = name, env_var = env, "no API key in environment; visitors must paste one");
        }
    }

    if let Err(e) = launch_rocket(Arc::new(config)).await {
        error!(%e, "Rocket server failed");
        return Err(e);
    }

    info!("Shutdown complete");
    Ok(())
}
