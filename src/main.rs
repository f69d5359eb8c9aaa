use garage_flow::reconcile::Sources;
use garage_flow::sources::PredictionSource;
use garage_flow::sources::file::FileStore;
use garage_flow::sources::remote::RemotePredictionSource;
use garage_flow::state::AppState;
use garage_flow::{api, config};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::Level;

fn init_tracing(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_default()?;
    init_tracing(config.log_level());
    tracing::info!(
        config_path = config::DEFAULT_CONFIG_PATH,
        app = %config.app.name,
        "garage-flow starting"
    );

    let store = Arc::new(FileStore::new(
        config.data_dir(),
        config.fetch_timeout(),
        config.history_weeks(),
    ));
    tracing::info!(
        data_dir = %config.data_dir().display(),
        history_weeks = config.history_weeks(),
        "File store ready"
    );

    let predictions: Arc<dyn PredictionSource> = match config.prediction_endpoint() {
        Some(endpoint) => {
            tracing::info!(endpoint, "Using remote prediction source");
            Arc::new(RemotePredictionSource::new(
                endpoint.to_string(),
                config.prediction_timeout(),
            ))
        }
        None => {
            tracing::info!("No prediction endpoint configured, reading predictions from file store");
            store.clone()
        }
    };
    let sources = Sources {
        aggregates: store.clone(),
        predictions,
        history: store,
    };

    let garages = config.garages();
    tracing::info!(count = garages.len(), "Garages configured");
    let state = Arc::new(AppState::new(garages, sources, config.utc_offset()?));

    let app = api::router(state);
    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
