//! Special-cased POST bodies for the meta-streams under `/.config`
//! (spec.md §6 "Meta endpoints"). `/.permissions/<path>` and
//! `/.schema/<path>` are otherwise ordinary streams — reads and regular
//! record appends against them go through `handler::http::pod` like any
//! other path; only their *write* semantics need special handling here.

use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::{
    errors::{ApiError, Result},
    service::meta_stream,
};

#[derive(Deserialize)]
struct OwnerBody {
    owner: String,
}

pub fn is_owner_transfer(path: &str) -> bool {
    path.trim_matches('/') == ".config/owner"
}

pub fn is_routing(path: &str) -> bool {
    path.trim_matches('/') == ".config/routing"
}

pub fn schema_target(path: &str) -> Option<String> {
    let trimmed = path.trim_start_matches('/');
    trimmed.strip_prefix(".schema").map(|rest| {
        if rest.is_empty() { "/".to_string() } else { rest.to_string() }
    })
}

pub async fn handle_owner_transfer(pod: &str, body: &web::Bytes, caller: &str) -> Result<HttpResponse> {
    let parsed: OwnerBody = serde_json::from_slice(body).map_err(|e| ApiError::InvalidName(e.to_string()))?;
    meta_stream::set_owner(pod, &parsed.owner, caller).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"owner": parsed.owner})))
}

pub async fn handle_routing(pod: &str, body: &web::Bytes, caller: &str) -> Result<HttpResponse> {
    let parsed: std::collections::HashMap<String, String> =
        serde_json::from_slice(body).map_err(|e| ApiError::InvalidName(e.to_string()))?;
    meta_stream::set_routing(pod, &parsed, caller).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"routing": parsed})))
}

pub async fn handle_schema_set(pod: &str, target_path: &str, body: &web::Bytes, caller: &str) -> Result<HttpResponse> {
    let schema: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| ApiError::InvalidSchema(e.to_string()))?;
    meta_stream::set_schema(pod, target_path, &schema, caller).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({"target": target_path})))
}
