use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use water_monitor::backend::SupabaseClient;
use water_monitor::common::AppState;
use water_monitor::config::{Config, Deployment};
use water_monitor::routes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (fail-fast)
    let config = Config::from_env()?;

    init_tracing(&config.deployment);

    tracing::info!("Starting water-monitor...");
    tracing::info!(
        deployment = ?config.deployment,
        host = %config.api_host,
        port = config.api_port,
        backend = %config.supabase_url,
        window_capacity = config.window_capacity,
        "Configuration loaded"
    );

    let client = SupabaseClient::new(&config);
    tracing::info!("Supabase client initialized");

    let state = AppState::new(&config, client);
    let app = routes::build_router(state.clone());

    // Start server with graceful shutdown
    let addr = config.bind_address();
    tracing::info!(address = %addr, "Starting server");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drop the realtime socket before exiting
    state.session.end().await;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

fn init_tracing(deployment: &Deployment) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,water_monitor=debug".into());

    match deployment {
        Deployment::Local => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        _ => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        },
    }
}
