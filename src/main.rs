use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod integrations;
mod model;
mod models;
mod routes;
mod service;
mod store;
mod utils;

#[cfg(test)]
mod test_support;

use config::{AnalyticsCache, Config};
use db::init_db;

use crate::docs::ApiDoc;
use crate::integrations::{Integrations, graph::GraphClient};
use crate::service::{
    absences::AbsenceService, analytics::AnalyticsService, settings::SettingsService,
};
use crate::store::{SnapshotStore, mysql::MySqlStore, snapshot_cache::MokaSnapshotStore};
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

const SNAPSHOT_CACHE_CAPACITY: u64 = 1_000;

#[get("/")]
async fn index() -> impl Responder {
    "Absence Manager"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;
    let store = Arc::new(MySqlStore::new(pool));

    let integrations = match config.graph.clone() {
        Some(graph) => {
            let client = GraphClient::new(graph).context("Failed to build Graph client")?;
            info!(time_zone = client.time_zone(), "Directory integration enabled");
            Integrations::from_client(Arc::new(client))
        }
        None => {
            warn!("No Graph credentials configured, integrations disabled");
            Integrations::disabled()
        }
    };

    let snapshots: Arc<dyn SnapshotStore> = match config.analytics_cache {
        AnalyticsCache::Database => store.clone() as Arc<dyn SnapshotStore>,
        AnalyticsCache::Memory => Arc::new(MokaSnapshotStore::new(SNAPSHOT_CACHE_CAPACITY)),
    };

    let settings = Arc::new(SettingsService::new(store.clone()));
    let absences = Data::new(AbsenceService::new(
        store.clone(),
        store.clone(),
        settings.clone(),
        integrations,
    ));
    let analytics = Data::new(AnalyticsService::new(store.clone(), store.clone(), snapshots));
    let settings = Data::from(settings);

    let limiter = routes::protected_limiter(&config)?;
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(absences.clone())
            .app_data(analytics.clone())
            .app_data(settings.clone())
            .app_data(api::json_config())
            .app_data(api::query_config())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config, &limiter))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
