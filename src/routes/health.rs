use actix_web::{get, HttpResponse, Result};

/// GET /health - liveness probe
#[get("/health")]
pub async fn health() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().body("ok"))
}
