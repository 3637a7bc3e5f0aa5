//! Read-only SQL tool server - main entry point.

use clap::Parser;
use readonly_sql_mcp::config::{Config, TransportMode};
use readonly_sql_mcp::db::{
    ConnectionPool, DatabaseAdapter, MySqlAdapter, PostgresAdapter, SqliteAdapter,
};
use readonly_sql_mcp::error::ServerResult;
use readonly_sql_mcp::mcp::Dispatcher;
use readonly_sql_mcp::models::{ConnectionSettings, DatabaseKind};
use readonly_sql_mcp::tools::build_registry;
use readonly_sql_mcp::transport::{HttpTransport, SessionManager, StdioTransport, Transport};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber. Output always goes to stderr so the
/// stdio transport keeps stdout for protocol frames.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Connect, serve on the configured transport, then close the pool.
async fn serve<A: DatabaseAdapter>(
    adapter: A,
    settings: &ConnectionSettings,
    config: &Config,
) -> ServerResult<()> {
    let pool = ConnectionPool::connect(adapter, settings).await?;
    let registry = build_registry(pool.clone());
    info!(tools = ?registry.names(), "Tools registered");
    let dispatcher = Dispatcher::new(registry);

    let result = match config.transport {
        TransportMode::Stdio => StdioTransport::new(dispatcher).run().await,
        TransportMode::Http => {
            let (sse_path, messages_path) = config.http_paths()?;
            let transport = HttpTransport::new(
                SessionManager::new(dispatcher),
                &config.http_host,
                config.http_port,
                sse_path,
                messages_path,
            );
            transport.run().await
        }
    };

    pool.close().await;
    result
}

async fn run(config: &Config) -> ServerResult<()> {
    let settings = config.connection_settings()?;
    let schema = settings.schema.clone();

    match settings.kind {
        DatabaseKind::MySql => serve(MySqlAdapter::new(schema), &settings, config).await,
        DatabaseKind::Postgres => serve(PostgresAdapter::new(schema), &settings, config).await,
        DatabaseKind::Sqlite => serve(SqliteAdapter::new(), &settings, config).await,
    }
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let config = Config::parse();
    init_tracing(&config);

    info!(
        engine = %config.engine,
        transport = %config.transport,
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let code = match run(&config).await {
        Ok(()) => {
            info!("Server shutdown complete");
            0
        }
        Err(e) => {
            match e.suggestion() {
                Some(suggestion) => error!(kind = e.kind(), error = %e, suggestion, "Server error"),
                None => error!(kind = e.kind(), error = %e, "Server error"),
            }
            1
        }
    };

    // A pending stdin read would otherwise keep the runtime from shutting down
    std::process::exit(code);
}
