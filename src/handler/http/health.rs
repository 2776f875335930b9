use actix_web::{HttpResponse, get};

#[get("/health")]
pub async fn health() -> HttpResponse {
    match infra::db::health_check().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({"status": "ok"})),
        Err(err) => {
            tracing::error!(target: "webpods::health", error = %err, "health check failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({"status": "unhealthy"}))
        }
    }
}
