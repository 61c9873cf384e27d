use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use convite_server::config::{Config, ResolverKind};
use convite_server::routes::create_routes;
use convite_server::services::{AddressResolver, LogNotifier, NominatimResolver, ViaCepResolver};
use convite_server::state::AppState;
use convite_server::store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .expect("Failed to connect to database");

            tracing::info!("Successfully connected to database");

            sqlx::migrate!()
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            tracing::info!("Migrations run successfully");

            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; falling back to an ephemeral in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let resolver: Arc<dyn AddressResolver> = match config.resolver {
        ResolverKind::Geocode => Arc::new(NominatimResolver::new(config.nominatim_base_url.clone())),
        ResolverKind::Cep => Arc::new(ViaCepResolver::new(config.viacep_base_url.clone())),
    };

    let port = config.port;
    let state = AppState {
        store,
        resolver,
        notifier: Arc::new(LogNotifier),
        config: Arc::new(config),
    };

    let app = create_routes(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    // connect-info is what the RSVP rate limiter keys on
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server failed");
}
