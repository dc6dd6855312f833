mod analytics;
mod clients;
mod config;
mod database;
mod error;
mod handlers;
mod models;
mod moderation;
mod services;
mod session;
mod store;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::clients::backend::BackendClient;
use crate::config::AppConfig;
use crate::database::Database;
use crate::services::AppState;
use crate::session::AuthEvents;

/// Review photos arrive as raw request bodies.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|err| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
    })?;
    let bind_address = config.bind_address();

    let db = Database::connect(&config.database_url)
        .await
        .map_err(|err| {
            log::error!("Failed to initialize database: {err:?}");
            std::io::Error::new(std::io::ErrorKind::Other, err)
        })?;
    log::info!("DB schema ensured");

    let backend = Arc::new(BackendClient::new(
        config.backend_url.clone(),
        config.backend_anon_key.clone(),
    ));
    let state = web::Data::new(AppState::new(
        Arc::new(db),
        backend.clone(),
        backend.clone(),
        backend,
        AuthEvents::default(),
        &config,
    ));

    let mut session_log = state.auth.events().subscribe();
    tokio::spawn(async move {
        loop {
            match session_log.recv().await {
                Ok(event) => log::info!("Auth event: {event:?}"),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Auth event log lagged, {skipped} events skipped")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    log::info!("Starting directory service on {}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
            .wrap(cors)
            .wrap(Logger::default())
            .service(web::scope("/api/v1").configure(handlers::routes))
    })
    .bind(&bind_address)?
    .run()
    .await
}
