use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scorepush_api::background::scheduler;
use scorepush_api::config::ServerConfig;
use scorepush_api::dispatch::MAX_BATCH_SIZE;
use scorepush_api::router::build_app_router;
use scorepush_api::state::AppState;
use scorepush_store::{NotificationStore, SupabaseConfig, SupabaseRpcStore};
use scorepush_webpush::{PushTransport, VapidCredentials, VapidSigner, WebPushClient};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    // `LOG_FORMAT=json` switches to one JSON object per line.
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "scorepush_api=debug,scorepush_webpush=debug,scorepush_store=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let worst_case_secs = config.dispatch.worst_case_batch_secs(MAX_BATCH_SIZE);
    if config.request_timeout_secs < worst_case_secs {
        tracing::warn!(
            request_timeout_secs = config.request_timeout_secs,
            worst_case_secs,
            "REQUEST_TIMEOUT_SECS is below the worst-case batch time; \
             slow runs will answer 500 and finish in the background"
        );
    }

    // --- Backend store ---
    let supabase = SupabaseConfig::from_env();
    tracing::info!(url = %supabase.url, "Using Supabase RPC backend");
    let store: Arc<dyn NotificationStore> =
        Arc::new(SupabaseRpcStore::new(supabase).expect("Failed to build backend HTTP client"));

    // --- Push transport ---
    let transport: Option<Arc<dyn PushTransport>> = match VapidCredentials::from_env() {
        Some(credentials) => {
            if let Err(e) = credentials.validate() {
                tracing::warn!(error = %e, "VAPID credentials are invalid, every push will fail");
            }
            let client = WebPushClient::new(
                VapidSigner::new(credentials),
                config.dispatch.transport_settings(),
            )
            .expect("Failed to build push HTTP client");
            tracing::info!("Push delivery enabled");
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("VAPID credentials not set, push delivery disabled");
            None
        }
    };

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        transport,
    };

    // --- Dispatch scheduler ---
    let scheduler_cancel = CancellationToken::new();
    let scheduler_handle = config.dispatch.interval_secs.map(|secs| {
        let state = state.clone();
        let cancel = scheduler_cancel.clone();
        tokio::spawn(async move {
            scheduler::run(state, Duration::from_secs(secs), cancel).await;
        })
    });

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    scheduler_cancel.cancel();
    if let Some(handle) = scheduler_handle {
        let _ = tokio::time::timeout(Duration::from_secs(30), handle).await;
        tracing::info!("Dispatch scheduler stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
