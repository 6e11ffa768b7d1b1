mod ai;
mod auth;
mod config;
mod error;
mod handlers;
mod models;
mod seed;
mod store;

use std::io;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use ai::ContentAssistant;
use auth::AuthKeys;
use config::AppConfig;
use handlers::{configure, not_found, AppState};
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{self, EnvFilter};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("actix_web=info".parse().unwrap())
                .add_directive("capital_charcoal_api=debug".parse().unwrap()),
        )
        .init();

    info!("Starting Capital Charcoal API server");

    let config = AppConfig::from_env().map_err(io::Error::other)?;
    let store = store::open(&config).await.map_err(io::Error::other)?;

    let assistant = ContentAssistant::from_config(&config.ai);
    info!(
        "Content assistant {}",
        if assistant.is_enabled() { "enabled" } else { "disabled" }
    );

    let state = web::Data::new(AppState {
        store,
        auth: AuthKeys::new(
            config.admin_password_hash.clone(),
            &config.jwt_secret,
            &config.refresh_secret,
        ),
        assistant,
    });

    info!("Listening on {}", config.bind_addr);
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .configure(configure)
            .default_service(web::to(not_found))
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
