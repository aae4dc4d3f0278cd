use actix_web::{get, web, HttpResponse, Result};
use std::sync::Arc;
use tracing::{error, info};

use crate::cache::CacheStore;
use crate::models::api_responses::ErrorResponse;
use crate::services::{PRECIPITATION_POINTS_KEY, WIND_POINTS_KEY};

/// GET /api/wind-global - Get latest wind data
#[get("/wind-global")]
pub async fn get_wind_global(cache: web::Data<Arc<CacheStore>>) -> Result<HttpResponse> {
    info!("Request for wind-global");

    match cache.get_json(WIND_POINTS_KEY).await {
        Ok(Some(data)) => Ok(HttpResponse::Ok().json(data)),
        Ok(None) => {
            info!("Wind data not yet available");
            Ok(HttpResponse::ServiceUnavailable().json(ErrorResponse { error: "Wind data not yet available. Please try again in a few minutes.".to_string() }))
        }
        Err(e) => {
            error!("Failed to fetch wind data: {}", e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse { error: "Failed to fetch wind data".to_string() }))
        }
    }
}

/// GET /api/wind-indices - Last 8 IndexEntries for wind:points
#[get("/wind-indices")]
pub async fn get_wind_indices(cache: web::Data<Arc<CacheStore>>) -> Result<HttpResponse> {
    info!("Request for wind-indices");

    match cache.list_indices(WIND_POINTS_KEY).await {
        Ok(indices) => {
            let last_8: Vec<_> = indices.into_iter().take(8).collect();
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "count": last_8.len(),
                "indices": last_8,
            })))
        }
        Err(e) => {
            error!("Failed to fetch wind indices: {}", e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse { error: "Failed to fetch wind indices".to_string() }))
        }
    }
}

/// GET /api/wind-global/{index} - Get wind data by index
#[get("/wind-global/{index}")]
pub async fn get_wind_global_by_index(
    index: web::Path<u32>,
    cache: web::Data<Arc<CacheStore>>,
) -> Result<HttpResponse> {
    let index = index.into_inner();
    info!("Request for wind-global at index {}", index);

    match cache.get_by_index(WIND_POINTS_KEY, index).await {
        Ok(Some(data)) => Ok(HttpResponse::Ok().json(data)),
        Ok(None) => {
            info!("Wind data not found at index {}", index);
            Ok(HttpResponse::NotFound().json(ErrorResponse { error: format!("Wind data not found at index {}", index) }))
        }
        Err(e) => {
            error!("Failed to fetch wind data at index {}: {}", index, e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse { error: "Failed to fetch wind data".to_string() }))
        }
    }
}

/// GET /api/precipitation-global - Get latest precipitation data
#[get("/precipitation-global")]
pub async fn get_precipitation_global(cache: web::Data<Arc<CacheStore>>) -> Result<HttpResponse> {
    info!("Request for precipitation-global");

    match cache.get_json(PRECIPITATION_POINTS_KEY).await {
        Ok(Some(data)) => Ok(HttpResponse::Ok().json(data)),
        Ok(None) => {
            info!("Precipitation data not yet available");
            Ok(HttpResponse::ServiceUnavailable().json(ErrorResponse { error: "Precipitation data not yet available. Please try again in a few minutes.".to_string() }))
        }
        Err(e) => {
            error!("Failed to fetch precipitation data: {}", e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse { error: "Failed to fetch precipitation data".to_string() }))
        }
    }
}

/// GET /api/precipitation-indices - Last 8 IndexEntries for precipitation:points
#[get("/precipitation-indices")]
pub async fn get_precipitation_indices(cache: web::Data<Arc<CacheStore>>) -> Result<HttpResponse> {
    info!("Request for precipitation-indices");

    match cache.list_indices(PRECIPITATION_POINTS_KEY).await {
        Ok(indices) => {
            let last_8: Vec<_> = indices.into_iter().take(8).collect();
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "count": last_8.len(),
                "indices": last_8,
            })))
        }
        Err(e) => {
            error!("Failed to fetch precipitation indices: {}", e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse { error: "Failed to fetch precipitation indices".to_string() }))
        }
    }
}

/// GET /api/precipitation-global/{index} - Get precipitation data by index
#[get("/precipitation-global/{index}")]
pub async fn get_precipitation_global_by_index(
    index: web::Path<u32>,
    cache: web::Data<Arc<CacheStore>>,
) -> Result<HttpResponse> {
    let index = index.into_inner();
    info!("Request for precipitation-global at index {}", index);

    match cache.get_by_index(PRECIPITATION_POINTS_KEY, index).await {
        Ok(Some(data)) => Ok(HttpResponse::Ok().json(data)),
        Ok(None) => {
            info!("Precipitation data not found at index {}", index);
            Ok(HttpResponse::NotFound().json(ErrorResponse { error: format!("Precipitation data not found at index {}", index) }))
        }
        Err(e) => {
            error!(
                "Failed to fetch precipitation data at index {}: {}",
                index, e
            );
            Ok(HttpResponse::InternalServerError().json(ErrorResponse { error: "Failed to fetch precipitation data".to_string() }))
        }
    }
}
