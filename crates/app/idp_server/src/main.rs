//! Identity provider server binary.
//!
//! Configuration comes from the environment (and `.env`); command-line flags
//! override it.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use idp_api::config::ApiConfig;
use idp_core::store::{CredentialStore, MemoryCredentialStore, PgCredentialStore};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "idp_server", about = "Multi-tenant identity provider")]
struct Args {
    /// Address to listen on. Overrides `BIND_ADDR`.
    #[arg(long)]
    bind_addr: Option<String>,

    /// PostgreSQL connection URL. Overrides `DATABASE_URL`.
    #[arg(long)]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,

    /// Seconds to wait for a free pool connection before failing a request.
    #[arg(long, default_value_t = 5)]
    acquire_timeout_secs: u64,

    /// bcrypt cost factor. Overrides `BCRYPT_COST`.
    #[arg(long)]
    bcrypt_cost: Option<u32>,

    /// Keep everything in process memory instead of PostgreSQL. Data is lost
    /// on exit; for local development only.
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(
                    "info,idp_api=debug,idp_core=debug",
                )),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }
    if let Some(cost) = args.bcrypt_cost {
        config.bcrypt_cost = cost;
    }

    info!(
        bind_addr = %config.bind_addr,
        bcrypt_cost = config.bcrypt_cost,
        in_memory = args.in_memory,
        "starting idp_server"
    );

    let store: Arc<dyn CredentialStore> = if args.in_memory {
        warn!("using in-memory store; nothing will be persisted");
        Arc::new(MemoryCredentialStore::new())
    } else {
        info!(max_connections = args.max_connections, "configuring connection pool");
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(Duration::from_secs(args.acquire_timeout_secs))
            .connect(&config.database_url)
            .await?;

        info!("running database migrations");
        idp_api::migrate(&pool).await?;
        Arc::new(PgCredentialStore::new(pool))
    };

    let state = idp_api::AppState::new(store, config.clone())?;
    let app = idp_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            info!("shutdown signal received, draining connections");
            shutdown.cancel();
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
