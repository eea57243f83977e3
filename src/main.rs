mod config;
mod errors;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod state;
mod utils;

use crate::config::Config;
use crate::middleware::{create_cors, RequestLogging};
use crate::routes::{api_v1_routes, public_routes};
use crate::state::AppState;
use actix_web::{web, App, HttpServer};
use chrono::Local;
use log::{info, warn};
use std::error::Error;
use std::io;
use std::io::Write;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 初始化日志
    let mut log_builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    log_builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S %:z"),
                record.level(),
                record.args()
            )
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e)) // 转换为 io::Result
        })
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    if !config.gateway.is_configured() {
        warn!("Payment gateway credentials incomplete, checkout routes will return configuration errors");
    }
    if config.backend.base_url.is_none() {
        warn!("BACKEND_URL not set, deposit events will not be forwarded");
    }

    let bind_address = config.bind_address();
    let workers = config.server.workers;
    let cors_origins = config.server.cors_allowed_origins.clone();
    let app_state = web::Data::new(AppState::new(config)?);

    info!("Starting deposit gateway on {}", bind_address);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(create_cors(&cors_origins))
            .wrap(RequestLogging)
            .service(api_v1_routes())
            .service(public_routes())
    });
    if let Some(workers) = workers {
        server = server.workers(workers);
    }

    server.bind(&bind_address)?.run().await?;
    info!("Deposit gateway stopped");
    Ok(())
}
