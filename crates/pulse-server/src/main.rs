mod api;
mod middleware;

use std::sync::Arc;

use pulse_core::{AppConfig, StorageBackend};
use pulse_db::{MemoryTopicStore, PgTopicStore, TopicStore};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let store = open_store(&config).await?;
    let sources = pulse_ingest::SourceSet::from_config(&config)?;
    let inference = pulse_annotate::inference_from_config(&config)?;

    let auth = AuthState::from_env(matches!(config.env, pulse_core::Environment::Development))?;
    let state = AppState {
        store,
        sources,
        inference,
        settings: pulse_annotate::AnnotateSettings::from_app_config(&config),
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "pulse-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn TopicStore>> {
    match config.storage {
        StorageBackend::Postgres => {
            let pool = pulse_db::connect_pool_from_config(config).await?;
            let applied = pulse_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations up to date");
            Ok(Arc::new(PgTopicStore::new(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("PULSE_STORAGE=memory; partitions are lost on shutdown");
            Ok(Arc::new(MemoryTopicStore::new()))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
