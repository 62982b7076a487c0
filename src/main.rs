mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod services;
mod storage;
mod utils;

#[cfg(test)]
mod testing;

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};
use std::io;
use std::sync::Arc;

use crate::config::{Settings, StorageBackend};
use crate::db::{EmployeeRepository, PgEmployeeRepository};
use crate::services::employee::{spawn_orphan_sweeper, EmployeeService};
use crate::storage::{BlobStore, LocalBlobStore, PhotoUrls, S3BlobStore};
use crate::utils::jwt::JwtSecret;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let settings = Settings::from_env().map_err(|err| startup_error("Invalid configuration", err))?;
    let photo_urls = PhotoUrls::new(&settings.public_storage_url)
        .map_err(|err| startup_error("Invalid PUBLIC_STORAGE_URL", err))?;

    let pool = db::create_pool(&settings)
        .await
        .map_err(|err| startup_error("Failed to connect to the database", err))?;
    let repo: Arc<dyn EmployeeRepository> = Arc::new(PgEmployeeRepository::new(pool));

    let blobs: Arc<dyn BlobStore> = match &settings.storage {
        StorageBackend::Local { root } => {
            info!("Storing photos under {}", root);
            Arc::new(LocalBlobStore::new(root.clone()))
        }
        StorageBackend::S3 { bucket, region } => {
            info!("Storing photos in S3 bucket {}", bucket);
            Arc::new(S3BlobStore::connect(bucket.clone(), region.clone()).await)
        }
    };

    let service = Arc::new(EmployeeService::new(
        repo,
        blobs,
        settings.limits.clone(),
        settings.transaction_timeout,
    ));
    spawn_orphan_sweeper(
        service.clone(),
        settings.orphan_sweep_interval,
        settings.orphan_grace,
    );

    let service = web::Data::from(service);
    let photo_urls = web::Data::new(photo_urls);
    let jwt_secret = web::Data::new(JwtSecret(settings.jwt_secret.clone()));

    info!("Starting server at {}", settings.server_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .app_data(photo_urls.clone())
            .app_data(jwt_secret.clone())
            .configure(handlers::configure)
    })
    .bind(&settings.server_addr)?
    .run()
    .await
}
