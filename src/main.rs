use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;

use mediashelf::config::AppConfig;
use mediashelf::routes::AppState;
use mediashelf::scanner::Scanner;
use mediashelf::tmdb::{MetadataProvider, TmdbClient};
use mediashelf::{db, watcher};

#[derive(Parser)]
#[command(name = "mediashelf", about = "Home media catalog and streaming server")]
struct Cli {
    /// Path to config file
    #[arg(long, env = "MEDIASHELF_CONFIG")]
    config: Option<String>,

    /// TMDB API key, required for scanning
    #[arg(long, env = "TMDB_API_KEY", hide_env_values = true)]
    tmdb_api_key: Option<String>,

    /// Directory holding the movies and series folders
    #[arg(long, env = "MEDIA_ROOT")]
    media_root: Option<PathBuf>,

    /// Port to listen on (all interfaces)
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .compact()
        .with_target(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mediashelf=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(key) = cli.tmdb_api_key {
        config.tmdb_api_key = Some(key);
    }
    if let Some(root) = cli.media_root {
        config.media_root = root;
    }
    if let Some(port) = cli.port {
        config.listen_addr = format!("0.0.0.0:{port}");
    }
    match cli.config {
        Some(ref path) => tracing::info!("Loaded config from {path}"),
        None => tracing::info!("No config file given, using defaults"),
    }

    let pool = db::init_pool(&config.database_url).await?;
    tracing::info!("Database initialized");

    let provider: Option<Arc<dyn MetadataProvider>> = match config.api_key() {
        Some(key) => Some(Arc::new(TmdbClient::new(
            key.to_string(),
            config.tmdb_language.clone(),
        ))),
        None => {
            tracing::warn!("TMDB API key is not configured; scanning is disabled");
            None
        }
    };

    let library = Arc::new(config.library());
    let scanner = Scanner::new(
        pool.clone(),
        library,
        provider,
        config.assets_dir.clone(),
        config.scan_concurrency,
    );

    if config.scan_on_startup {
        let startup = scanner.clone();
        tokio::spawn(async move {
            match startup.scan().await {
                Ok(summary) => tracing::info!("{summary}"),
                Err(e) => tracing::error!("Startup scan failed: {e}"),
            }
        });
    }

    if config.watch {
        if let Some(reconciler) = scanner.reconciler() {
            watcher::start(reconciler.clone()).await?;
        }
    }

    let state = AppState { pool, scanner };

    let app = mediashelf::routes::build_router(state)
        .nest_service("/posters", ServeDir::new(&config.assets_dir));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("Listening on {}", config.listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
