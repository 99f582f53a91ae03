mod api;
mod config;
mod external;
mod state;
mod user_data;
mod utils;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{routing::get, Router};
use api::{api_router, health};
use config::{config_path_from_env, load_or_create_config, resolve_path};
use organizer::Organizer;
use parking_lot::RwLock;
use reqwest::Client;
use state::AppState;
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use user_data::{open_or_create_db, UserDataStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = config_path_from_env();
    let (config, created) = load_or_create_config(&config_path)?;
    if created {
        info!("Created default config at {:?}", config_path);
    } else {
        info!("Loaded config from {:?}", config_path);
    }

    let user_db_path = resolve_path(&config_path, &config.user_data_path);
    let user_db = Arc::new(open_or_create_db(&user_db_path)?);
    let user_data = UserDataStore::new(Arc::clone(&user_db));
    if let Err(err) = user_data.init_tables() {
        warn!("Failed to create user data tables: {}", err);
    }
    info!("User data stored at {:?}", user_db_path);

    let external_client = Client::builder()
        .user_agent(concat!("genre-organizer/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let organizer = Organizer::new(Arc::new(user_data), config.organizer_options());
    let bind_addr = config.listen_addr();
    let state = AppState {
        config: Arc::new(RwLock::new(config)),
        organizer,
        external_client,
        library_counts: Arc::new(RwLock::new(HashMap::new())),
    };

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api", api_router(state))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                warn!("Failed to install terminate signal handler: {}", err);
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", err);
        }
    }

    info!("Shutdown signal received; running organize jobs are abandoned.");
}
