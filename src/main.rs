use curvefolio::{api, config::Config, AppError, MarketStore, MemoryStore, SeedData, TimeMs};
use std::net::SocketAddr;
use std::sync::Arc;

fn load_store(config: &Config) -> Result<MemoryStore, AppError> {
    let Some(path) = config.seed_file.as_deref() else {
        return Ok(MemoryStore::new());
    };
    let seed = SeedData::load(path).map_err(|e| AppError::Config(e.to_string()))?;
    let (tokens, quests) = (seed.tokens.len(), seed.quests.len());
    let store = seed
        .into_store(TimeMs::now())
        .map_err(|e| AppError::Config(e.to_string()))?;
    tracing::info!(path = %path.display(), tokens, quests, "Seeded store");
    Ok(store)
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn MarketStore> = match load_store(&config) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("Failed to initialize store: {}", e);
            std::process::exit(1);
        }
    };

    let addr = SocketAddr::new(config.bind_addr, config.port);

    // Create router
    let app = api::create_router(api::AppState::new(store, config));

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
