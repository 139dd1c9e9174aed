use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use vidgate::config::{Cli, MEMORY_DATABASE};
use vidgate::store::SqliteStore;
use vidgate::{router, AppState, Gateway, TrustedHeaderIdentity};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let store = if config.database == MEMORY_DATABASE {
        SqliteStore::open_memory()?
    } else {
        SqliteStore::open(&config.database)
            .with_context(|| format!("failed to open database {}", config.database))?
    };

    if !config.gateway.uploads_dir.is_dir() {
        tracing::warn!(
            dir = %config.gateway.uploads_dir.display(),
            "uploads directory missing, local videos will 404"
        );
    }

    let gateway = Arc::new(Gateway::new(store, config.gateway.clone()));
    if let Some(email) = &config.admin_email {
        gateway.seed_admin(email).await?;
    }

    let state = AppState {
        gateway,
        identity: Arc::new(TrustedHeaderIdentity::new(&config.identity)?),
        trust_proxy: config.trust_proxy,
    };
    let app = router(state);

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, "vidgate listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
