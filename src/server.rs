use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing_actix_web::TracingLogger;

use crate::cache::CacheStore;
use crate::routes;
use crate::services::Scheduler;
use crate::utils::config::Config;

pub async fn run(
    config: Config,
    cache: Arc<CacheStore>,
    scheduler: Arc<RwLock<Scheduler>>,
) -> std::io::Result<()> {
    let port = config.port;

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(cache.clone()))
            .app_data(web::Data::new(scheduler.clone()))
            .service(routes::health::health)
            .service(
                web::scope("/api")
                    .service(routes::wind::get_wind_global)
                    .service(routes::wind::get_wind_global_by_index)
                    .service(routes::wind::get_wind_indices)
                    .service(routes::wind::get_precipitation_global)
                    .service(routes::wind::get_precipitation_global_by_index)
                    .service(routes::wind::get_precipitation_indices)
                    .service(routes::windgl::get_windgl_metadata)
                    .service(routes::windgl::get_windgl_metadata_by_index)
                    .service(routes::windgl::get_windgl_png)
                    .service(routes::windgl::get_windgl_png_by_index)
                    .service(routes::scheduler::get_wind_status)
                    .service(routes::scheduler::post_wind_refresh)
                    .service(routes::scheduler::post_wind_refresh_latest),
            )
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
