use std::sync::Arc;

use anyhow::Context;
use mq::{MqConfig, init_mq};
use tracing::{Level, info, warn};

use judge_relay::config::AppConfig;
use judge_relay::consumers::consume_progress_events;
use judge_relay::database::init_db;
use judge_relay::state::AppState;
use judge_relay::store::{DbResultStore, MemoryResultStore, ResultStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load config")?;

    let store: Arc<dyn ResultStore> = match config.database.url.as_deref() {
        Some(url) => {
            let db = init_db(url).await.context("Failed to connect to database")?;
            info!("Database connected");
            Arc::new(DbResultStore::new(db))
        }
        None => {
            warn!("No database configured, terminal results are kept in memory only");
            Arc::new(MemoryResultStore::new())
        }
    };

    let state = AppState::new(config.clone(), store);
    state
        .ingestor
        .spawn_reaper(config.judge.reap_interval(), config.judge.lane_idle());

    if config.mq.enabled {
        let mq = Arc::new(
            init_mq(MqConfig {
                url: config.mq.url.clone(),
                pool_size: config.mq.pool_size,
            })
            .await
            .context("Failed to initialize MQ")?,
        );
        tokio::spawn(consume_progress_events(
            Arc::clone(&state.ingestor),
            mq,
            config.mq.progress_queue_name.clone(),
        ));
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    let app = judge_relay::build_router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    info!("Stopped.");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
    state.shutdown();
}
