use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use when_events::config::Config;
use when_events::ingest::HttpFetcher;
use when_events::schema::SchemaRegistry;
use when_events::store::PgStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.log_level)
        }))
        .init();

    tracing::info!("Starting when-events");

    let schemas = match &config.schema_dir {
        Some(dir) => {
            tracing::info!("Loading schemas from {}", dir.display());
            SchemaRegistry::from_dir(dir)?
        }
        None => SchemaRegistry::builtin()?,
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Migrations applied");

    let fetcher = HttpFetcher::new(&config.fetch)?;
    tracing::info!(
        "Fetch timeout {}s, response limit {} bytes, no retries",
        config.fetch.timeout.as_secs(),
        config.fetch.max_response_size
    );

    let addr = SocketAddr::new(config.host, config.port);
    let state = when_events::build_state(
        config,
        Arc::new(PgStore::new(pool)),
        Arc::new(fetcher),
        schemas,
    );
    let app = when_events::build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
