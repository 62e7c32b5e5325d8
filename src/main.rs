// EMR API server
//
// In-memory patient records plus a PostgreSQL schema mapper, served over HTTP.

use actix_web::{App, HttpServer, middleware, web};
use anyhow::Result;
use emr_api::{AppConfig, AppState, CatalogConnector, MemoryStore, PgConnector, configure_routes};
use log::{info, warn};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    info!("Starting EMR API v{}", env!("CARGO_PKG_VERSION"));

    let store = if config.seed_demo_data {
        let store = MemoryStore::with_demo_data()?;
        info!("In-memory store seeded with demo data");
        store
    } else {
        MemoryStore::new()
    };

    let catalog: Option<Arc<dyn CatalogConnector>> = match &config.database {
        Some(db) => {
            info!(
                "Database configured: {}@{}:{}/{} (schema {})",
                db.user, db.host, db.port, db.name, db.schema
            );
            Some(Arc::new(PgConnector::new(db)))
        }
        None => {
            warn!("No POSTGRES_* settings found; /test-db and /map-db will answer 503");
            None
        }
    };

    let state = web::Data::new(AppState::new(store, catalog));

    let bind_addr = config.bind_addr();
    info!("Listening on http://{}", bind_addr);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    });
    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }
    server.bind(&bind_addr)?.run().await?;

    info!("Server stopped");
    Ok(())
}
