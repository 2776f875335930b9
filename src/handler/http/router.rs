//! Top-level dispatch: subdomain → pod, bare host → `/health` and the
//! test-only surface (spec.md §6 "Subdomain routing"). OAuth, sessions and
//! the CLI frontend are out-of-scope collaborator surfaces (spec.md §1)
//! and are not mounted here.

use actix_web::{HttpRequest, HttpResponse, web};

use crate::{
    errors::{ApiError, Result},
    handler::http::{extractors, pod},
};

pub async fn dispatch_get(req: HttpRequest) -> Result<HttpResponse> {
    match extractors::pod_from_host(&req) {
        Some(p) => pod::handle_get(req, p).await,
        None => bare_host_not_found(&req),
    }
}

pub async fn dispatch_post(req: HttpRequest, body: web::Bytes) -> Result<HttpResponse> {
    match extractors::pod_from_host(&req) {
        Some(p) => pod::handle_post(req, body, p).await,
        None => bare_host_not_found(&req),
    }
}

pub async fn dispatch_delete(req: HttpRequest) -> Result<HttpResponse> {
    match extractors::pod_from_host(&req) {
        Some(p) => pod::handle_delete(req, p).await,
        None => bare_host_not_found(&req),
    }
}

pub async fn dispatch_head(req: HttpRequest) -> Result<HttpResponse> {
    match extractors::pod_from_host(&req) {
        Some(p) => pod::handle_head(req, p).await,
        None => bare_host_not_found(&req),
    }
}

fn bare_host_not_found(req: &HttpRequest) -> Result<HttpResponse> {
    tracing::debug!(target: "webpods::router", path = req.path(), "no pod route on bare host");
    Err(ApiError::NotFound)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(crate::handler::http::health::health)
        .service(crate::handler::http::test_utils::cache_stats)
        .service(crate::handler::http::test_utils::reset)
        .default_service(web::route().to(fallback));
}

async fn fallback(req: HttpRequest, body: web::Bytes) -> Result<HttpResponse> {
    match *req.method() {
        actix_web::http::Method::GET => dispatch_get(req).await,
        actix_web::http::Method::POST => dispatch_post(req, body).await,
        actix_web::http::Method::DELETE => dispatch_delete(req).await,
        actix_web::http::Method::HEAD => dispatch_head(req).await,
        _ => Err(ApiError::NotFound),
    }
}
