use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::{self, Data};
use actix_web::{App, HttpServer};
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod services;
mod store;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::error::{json_error_handler, query_error_handler};
use crate::services::attendance::AttendanceService;
use crate::services::leave::LeaveService;
use crate::store::EmployeeDirectory;
use crate::store::mysql::MySqlStore;
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::employee_cache::{CachedDirectory, warmup_employee_cache};
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(
        offset = %config.utc_offset,
        window_start = %config.clock_in_window_start,
        window_end = %config.clock_in_window_end,
        "Server starting..."
    );

    let pool = init_db(&config.database_url).await?;

    let store = Arc::new(MySqlStore::new(pool.clone()));
    let directory = Arc::new(CachedDirectory::new(
        store.clone(),
        config.employee_cache_ttl(),
    ));

    let attendance = Data::new(AttendanceService::new(
        directory.clone() as Arc<dyn EmployeeDirectory>,
        store.clone(),
        config.attendance_policy(),
    ));
    let leave = Data::new(LeaveService::new(
        directory.clone() as Arc<dyn EmployeeDirectory>,
        store.clone(),
        config.leave_policy(),
    ));
    let clock: Data<dyn Clock> = Data::from(Arc::new(SystemClock::new(config.utc_offset)) as Arc<dyn Clock>);

    let warmup_batch = config.employee_cache_warmup_batch;
    let warmup_directory = directory.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = warmup_employee_cache(&pool, &warmup_directory, warmup_batch).await {
            error!(error = ?e, "Failed to warmup employee cache");
        }
    });

    // Clone values for the closure (avoid move issues)
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(attendance.clone())
            .app_data(leave.clone())
            .app_data(clock.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
