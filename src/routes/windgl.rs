use actix_web::{get, web, HttpResponse, Result};
use std::sync::Arc;
use tracing::{error, info};

use crate::cache::CacheStore;
use crate::models::api_responses::ErrorResponse;
use crate::services::{WIND_METADATA_KEY, WIND_PNG_KEY};

/// GET /api/windgl/metadata.json - Get latest windgl metadata
#[get("/windgl/metadata.json")]
pub async fn get_windgl_metadata(cache: web::Data<Arc<CacheStore>>) -> Result<HttpResponse> {
    info!("Request for windgl metadata");

    match cache.get_json(WIND_METADATA_KEY).await {
        Ok(Some(mut data)) => {
            if let Some(obj) = data.as_object_mut() {
                obj.insert(
                    "tiles".to_string(),
                    serde_json::json!(["/api/windgl/wind.png"]),
                );
            }
            Ok(HttpResponse::Ok()
                .content_type("application/json")
                .insert_header(("Cache-Control", "public, max-age=3600"))
                .json(data))
        }
        Ok(None) => {
            info!("Wind metadata not yet available");
            Ok(HttpResponse::ServiceUnavailable().json(ErrorResponse { error: "Wind metadata not yet available".to_string() }))
        }
        Err(e) => {
            error!("Failed to fetch wind metadata: {}", e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse { error: "Failed to fetch wind metadata".to_string() }))
        }
    }
}

/// GET /api/windgl/metadata.json/{index} - Get windgl metadata by index
#[get("/windgl/metadata.json/{index}")]
pub async fn get_windgl_metadata_by_index(
    index: web::Path<u32>,
    cache: web::Data<Arc<CacheStore>>,
) -> Result<HttpResponse> {
    let index = index.into_inner();
    info!("Request for windgl metadata at index {}", index);

    match cache.get_by_index(WIND_METADATA_KEY, index).await {
        Ok(Some(mut data)) => {
            if let Some(obj) = data.as_object_mut() {
                obj.insert(
                    "tiles".to_string(),
                    serde_json::json!([format!("/api/windgl/wind.png/{}", index)]),
                );
                obj.insert("index".to_string(), serde_json::json!(index));
            }
            Ok(HttpResponse::Ok()
                .content_type("application/json")
                .insert_header(("Cache-Control", "public, max-age=3600"))
                .json(data))
        }
        Ok(None) => {
            info!("Wind metadata not found at index {}", index);
            Ok(HttpResponse::NotFound().json(ErrorResponse { error: format!("Wind metadata not found at index {}", index) }))
        }
        Err(e) => {
            error!("Failed to fetch wind metadata at index {}: {}", index, e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse { error: "Failed to fetch wind metadata".to_string() }))
        }
    }
}

/// GET /api/windgl/wind.png - Get latest windgl PNG
#[get("/windgl/wind.png")]
pub async fn get_windgl_png(cache: web::Data<Arc<CacheStore>>) -> Result<HttpResponse> {
    info!("Request for windgl PNG");

    match cache.get_binary(WIND_PNG_KEY).await {
        Ok(Some(png_buffer)) if !png_buffer.is_empty() => Ok(HttpResponse::Ok()
            .content_type("image/png")
            .insert_header(("Cache-Control", "public, max-age=3600"))
            .body(png_buffer)),
        Ok(Some(_)) => {
            info!("Wind PNG encoder unavailable for latest forecast");
            Ok(HttpResponse::NotFound().json(ErrorResponse { error: "Wind PNG not available for this forecast".to_string() }))
        }
        Ok(None) => {
            info!("Wind PNG not yet available");
            Ok(HttpResponse::ServiceUnavailable().json(ErrorResponse { error: "Wind PNG not yet available".to_string() }))
        }
        Err(e) => {
            error!("Failed to fetch wind PNG: {}", e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse { error: "Failed to fetch wind PNG".to_string() }))
        }
    }
}

/// GET /api/windgl/wind.png/{index} - Get windgl PNG by index
#[get("/windgl/wind.png/{index}")]
pub async fn get_windgl_png_by_index(
    index: web::Path<u32>,
    cache: web::Data<Arc<CacheStore>>,
) -> Result<HttpResponse> {
    let index = index.into_inner();
    info!("Request for windgl PNG at index {}", index);

    match cache.get_binary_by_index(WIND_PNG_KEY, index).await {
        Ok(Some(png_buffer)) if !png_buffer.is_empty() => Ok(HttpResponse::Ok()
            .content_type("image/png")
            .insert_header(("Cache-Control", "public, max-age=3600"))
            .body(png_buffer)),
        Ok(Some(_)) => {
            info!("Wind PNG encoder unavailable at index {}", index);
            Ok(HttpResponse::NotFound().json(ErrorResponse { error: format!("Wind PNG not available at index {}", index) }))
        }
        Ok(None) => {
            info!("Wind PNG not found at index {}", index);
            Ok(HttpResponse::NotFound().json(ErrorResponse { error: format!("Wind PNG not found at index {}", index) }))
        }
        Err(e) => {
            error!("Failed to fetch wind PNG at index {}: {}", index, e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse { error: "Failed to fetch wind PNG".to_string() }))
        }
    }
}
