use std::sync::Arc;

use mimalloc::MiMalloc;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use postq::config::{RuntimeConfig, Settings};
use postq::http::{self, AppState, ProducerState};
use postq::notify::Notifier;
use postq::poster::{HttpPoster, PostClient, StaticCredentials};
use postq::queue::QuestionQueue;
use postq::scheduler::Scheduler;
use postq::startup::{print_startup_summary, StartupConfig};
use postq::store::{CachedStore, SqliteBackend, StoreConfig};
use postq::sync::FairMutex;
use postq::telemetry;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Create a shutdown signal handler.
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler, continuing without it");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler, continuing without it");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    let runtime_config = RuntimeConfig::from_env();

    // Persistence: SQLite backend under a cache-backed store with a
    // debounced batch writer.
    let backend = Arc::new(SqliteBackend::open(&runtime_config.data_path)?);
    let store = CachedStore::new(backend, StoreConfig::default());
    let flush_task = store.start();

    // Queue with its fair mutex; resume ids from the persisted queue.
    let mutex = Arc::new(FairMutex::new());
    let queue = QuestionQueue::new(Arc::clone(&store), mutex);
    queue.recover_id_counter().await?;

    let notifier = Arc::new(Notifier::new());

    // Posting client from runtime config; the retry budget comes from
    // the persisted settings.
    let settings = Settings::load(&store).await?;
    if runtime_config.post_token.is_none() {
        warn!("POST_TOKEN is not set; posting will fail until configured");
    }
    let credentials = Arc::new(StaticCredentials::new(runtime_config.post_token.clone()));
    let poster = Arc::new(HttpPoster::new(
        &runtime_config.post_endpoint,
        credentials,
        settings.max_retry_attempts,
    )?) as Arc<dyn PostClient>;

    let scheduler = Scheduler::new(
        Arc::clone(&queue),
        poster,
        Arc::clone(&store),
        Arc::clone(&notifier),
        runtime_config.post_target.clone(),
    );

    // A schedule left running by the previous process picks up again.
    let resumed = scheduler.resume_if_persisted().await?;

    print_startup_summary(&StartupConfig {
        version: env!("CARGO_PKG_VERSION"),
        data_path: runtime_config.data_path.display().to_string(),
        auth_enabled: !runtime_config.auth_tokens.is_empty(),
        token_count: runtime_config.auth_tokens.len(),
        http_port: runtime_config.http_port,
        post_endpoint: runtime_config.post_endpoint.clone(),
        resumed,
    });

    let state = AppState {
        queue,
        scheduler: Arc::clone(&scheduler),
        store: Arc::clone(&store),
        notifier,
        auth_tokens: Arc::new(runtime_config.auth_tokens.clone()),
        producer: Arc::new(Mutex::new(ProducerState::default())),
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let shutdown_tx_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        shutdown_signal(shutdown_tx_signal).await;
    });

    let router = http::create_router(state);
    let listener = TcpListener::bind(("0.0.0.0", runtime_config.http_port)).await?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = runtime_config.http_port,
        "HTTP API ready"
    );

    let mut shutdown_rx = shutdown_tx.subscribe();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    // Stop the loops without clearing the persisted running flag, then
    // flush the store and checkpoint.
    scheduler.halt();
    store.shutdown().await;
    let _ = flush_task.await;

    info!("Shutdown complete");
    Ok(())
}
