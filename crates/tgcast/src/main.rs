use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use tgcast_core::{config::Config, dispatcher::BroadcastDispatcher, store::JsonFileStore};
use tgcast_http::AppState;
use tgcast_telegram::TelegramClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tgcast_core::logging::init("tgcast")?;

    let cfg = Arc::new(Config::load()?);

    let store = Arc::new(JsonFileStore::new(cfg.bots_dir.clone()));
    let messenger = Arc::new(TelegramClient::from_config(&cfg)?);

    // Fired on Ctrl-C / SIGTERM: stops accepting requests and interrupts
    // running broadcasts between recipients.
    let shutdown = CancellationToken::new();
    let dispatcher =
        Arc::new(BroadcastDispatcher::new(store, messenger).with_shutdown(shutdown.clone()));

    tokio::spawn(watch_signals(shutdown.clone()));

    let state = Arc::new(AppState::new(cfg, dispatcher));
    tgcast_http::serve(state, async move { shutdown.cancelled().await }).await
}

async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
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
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
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

    tracing::info!("shutdown requested");
    shutdown.cancel();
}
