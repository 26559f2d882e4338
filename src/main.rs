use proxybid::notify::OutboxNotifier;
use proxybid::orchestration::{Auctioneer, ListingLocks, SettlementSweeper};
use proxybid::{api, config::Config, db::init_db, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

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

    let port = config.port;

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let notifier = Arc::new(OutboxNotifier::new(repo.clone()));
    let locks = Arc::new(ListingLocks::new());
    let auctioneer = Arc::new(Auctioneer::new(
        repo.clone(),
        notifier.clone(),
        locks.clone(),
        &config,
    ));
    let sweeper = SettlementSweeper::new(repo.clone(), notifier.clone(), locks, &config);

    // Background settlement; a zero interval leaves only the HTTP trigger
    let _sweep_task = sweeper.clone().spawn_interval(config.sweep_interval_secs);

    // Create router
    let app = api::create_router(api::AppState {
        repo,
        auctioneer,
        sweeper: Arc::new(sweeper),
        notifier,
    });

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
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
