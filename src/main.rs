//! Application entry point for the `irrigation-advisor` service.
//!
//! This binary wires the recommendation engine to its collaborators:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Establishing a PostgreSQL connection pool and creating the schema
//! - Loading the crop and soil reference tables
//! - Building the weather cache, fetcher, orchestrator and janitor
//! - Serving the HTTP trigger endpoints with Axum
//!
//! # Environment Variables
//! - `DATABASE_URL` (**required**) – PostgreSQL connection string
//! - `WEATHER_API_KEY` (**required**) – weather API key
//! - `IRRIGATION_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `IRRIGATION_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config` for the remaining tunables.
use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use is_terminal::IsTerminal;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::{Context, Result};

use irrigation_advisor::{
    config, routes, schema,
    store::PgStore,
    weather::{OpenWeatherClient, WeatherCache, WeatherFetcher},
    AppState, CacheJanitor, Orchestrator, ReferenceTables,
};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let reference = ReferenceTables::load(
        cfg.crop_coefficients_path.as_deref(),
        cfg.soil_types_path.as_deref(),
    )
    .context("Failed to load reference tables")?;
    reference.log_summary();

    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(&cfg.db_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Successfully connected to database");

    schema::create_schema(&pool).await?;

    let store = Arc::new(PgStore::new(pool));
    let ttl = chrono::Duration::seconds(i64::from(cfg.weather_cache_ttl_secs));

    let api = OpenWeatherClient::new(
        cfg.weather_api_key.clone(),
        cfg.weather_api_url.clone(),
        Duration::from_secs(u64::from(cfg.weather_timeout_secs)),
    )?;
    let cache = WeatherCache::new(store.clone(), ttl);
    let fetcher = Arc::new(WeatherFetcher::new(Arc::new(api), cache));

    let orchestrator = Orchestrator::new(
        store.clone(),
        store.clone(),
        fetcher,
        Arc::new(reference),
        cfg.water_balance,
    );
    let janitor = CacheJanitor::new(store, ttl);

    let app = routes::router(AppState {
        orchestrator: Arc::new(orchestrator),
        janitor: Arc::new(janitor),
        sensor_max_raw: cfg.sensor_max_raw,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// - Target, file and line number are included in every event
/// - `FORCE_COLOR=1|true|yes` / `0|false|no` forces colour on or off,
///   otherwise colour follows TTY detection
/// - `IRRIGATION_SPAN_EVENTS`: `"full"` emits ENTER, EXIT and CLOSE with
///   timing, `"enter_exit"` emits ENTER and EXIT, anything else CLOSE only
/// - `RUST_LOG` wins when set; otherwise `IRRIGATION_LOG_LEVEL` picks the
///   level, with sqlx query logging held at `warn`
///
/// Call once at startup before any logging.
fn init_tracing() {
    // ---
    let span_events = match env::var("IRRIGATION_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("IRRIGATION_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn,hyper=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
