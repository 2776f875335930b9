//! The per-pod HTTP surface: stream/record create, append, list, read,
//! delete, metadata (spec.md §6 "HTTP surface (per pod)").

use std::collections::HashMap;

use actix_web::{HttpRequest, HttpResponse, web};

use crate::{
    errors::{ApiError, Result},
    handler::http::{extractors, meta},
    service::{
        meta_stream::SchemaMode, path_resolver, path_resolver::Resolved, permission::{self, Access},
        pod_store, rate_limit, record_store, stream_store,
    },
};

fn query_map(req: &HttpRequest) -> HashMap<String, String> {
    url::form_urlencoded::parse(req.query_string().as_bytes())
        .into_owned()
        .collect()
}

fn header_map(req: &HttpRequest) -> HashMap<String, String> {
    req.headers()
        .iter()
        .filter_map(|(name, value)| {
            let name = name.as_str();
            if name.len() > 2 && name[..2].eq_ignore_ascii_case("x-") && !name.eq_ignore_ascii_case("x-user-id") {
                value.to_str().ok().map(|v| (name.to_string(), v.to_string()))
            } else {
                None
            }
        })
        .collect()
}

async fn enforce_rate_limit(req: &HttpRequest, action: rate_limit::Action) -> Result<()> {
    let decision = rate_limit::check(&extractors::client_identifier(req), action).await;
    if !decision.allowed {
        return Err(ApiError::RateLimitExceeded {
            limit: decision.limit,
            remaining: decision.remaining,
            reset_at: decision.reset_at,
        });
    }
    Ok(())
}

pub async fn handle_post(req: HttpRequest, body: web::Bytes, pod: String) -> Result<HttpResponse> {
    enforce_rate_limit(&req, rate_limit::Action::Write).await?;
    let user_id = extractors::require_user_id(&req)?;
    let path = req.path().trim_start_matches('/').to_string();
    let query = query_map(&req);

    if !pod_store::exists(&pod).await? {
        enforce_rate_limit(&req, rate_limit::Action::PodCreate).await?;
        pod_store::get_or_create(&pod, &user_id).await?;
    }

    if meta::is_owner_transfer(&path) {
        return meta::handle_owner_transfer(&pod, &body, &user_id).await;
    }
    if meta::is_routing(&path) {
        return meta::handle_routing(&pod, &body, &user_id).await;
    }
    if let Some(target) = meta::schema_target(&path) {
        return meta::handle_schema_set(&pod, &target, &body, &user_id).await;
    }

    if body.is_empty() && !path.is_empty() {
        // Empty body on a bare path creates a stream (spec.md §6).
        // Counted only when the stream doesn't already exist (spec.md §4.9).
        if stream_store::get_by_path(&pod, &path).await?.is_none() {
            enforce_rate_limit(&req, rate_limit::Action::StreamCreate).await?;
        }
        let access = query.get("access").cloned().unwrap_or_else(|| "public".to_string());
        let stream = create_stream(&pod, &path, &user_id, &access).await?;
        return Ok(HttpResponse::Created().json(serde_json::json!({
            "path": stream.path,
            "accessPermission": stream.access_permission,
        })));
    }

    let (stream_path, name) = path_resolver::split_for_write(&path)?;
    let stream = stream_store::get_or_create(&pod, &stream_path, &user_id, "public").await?;
    authorize(&pod, &stream, Some(&user_id), Access::Write).await?;

    if let Some(mode) = schema_mode(&query) {
        crate::service::meta_stream::validate_against_schema(&pod, &stream.path, &body, mode).await?;
    }

    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let record = record_store::append(record_store::AppendOptions {
        pod: pod.clone(),
        stream_id: stream.id,
        stream_path: stream.path.clone(),
        name,
        body: body.to_vec(),
        content_type,
        user_id,
        headers: header_map(&req),
    })
    .await?;

    Ok(HttpResponse::Created()
        .insert_header(("X-Hash", record.hash.clone()))
        .json(record.meta()))
}

fn schema_mode(query: &HashMap<String, String>) -> Option<SchemaMode> {
    match query.get("schemaMode").map(String::as_str) {
        Some("strict") => Some(SchemaMode::Strict),
        Some("permissive") => Some(SchemaMode::Permissive),
        _ => None,
    }
}

async fn create_stream(pod: &str, path: &str, user_id: &str, access: &str) -> Result<infra::table::streams::StreamRecord> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.starts_with('.') {
        let owner = crate::service::meta_stream::get_owner(pod).await?;
        if owner.as_deref() != Some(user_id) {
            return Err(ApiError::Forbidden("system streams may only be created by the pod owner".into()));
        }
    }
    stream_store::get_or_create(pod, path, user_id, access).await
}

async fn authorize(pod: &str, stream: &infra::table::streams::StreamRecord, user: Option<&str>, access: Access) -> Result<()> {
    if permission::can_access(pod, stream, user, access).await? {
        Ok(())
    } else {
        Err(ApiError::Forbidden("insufficient permission".into()))
    }
}

pub async fn handle_get(req: HttpRequest, pod: String) -> Result<HttpResponse> {
    enforce_rate_limit(&req, rate_limit::Action::Read).await?;
    let user_id = extractors::user_id(&req);
    let path = req.path().trim_start_matches('/').to_string();
    let query = query_map(&req);
    let has_index_query = query.contains_key("i");

    match path_resolver::resolve(&pod, &path, has_index_query).await? {
        Resolved::NotFound => Err(ApiError::NotFound),
        Resolved::Record { stream, record } => {
            authorize(&pod, &stream, user_id.as_deref(), Access::Read).await?;
            let include_deleted = query.get("include_deleted").map(String::as_str) == Some("true");
            let domain = match record_store::get_by_name(&pod, &stream.path, stream.id, &record.name).await {
                Ok(r) => r,
                Err(ApiError::RecordDeleted(_)) if !include_deleted => {
                    return Err(ApiError::RecordDeleted(record.name));
                }
                Err(ApiError::RecordDeleted(_)) => crate::common::meta::record::Record::from(record),
                Err(e) => return Err(e),
            };
            Ok(render_record(&domain))
        }
        Resolved::Stream(stream) => {
            authorize(&pod, &stream, user_id.as_deref(), Access::Read).await?;
            if let Some(index_spec) = query.get("i") {
                return handle_index_query(stream.id, index_spec).await;
            }
            handle_list(&pod, &stream, &query, user_id.as_deref()).await
        }
    }
}

fn render_record(record: &crate::common::meta::record::Record) -> HttpResponse {
    let mut builder = HttpResponse::Ok();
    builder
        .content_type(record.content_type.clone())
        .insert_header(("X-Content-Hash", record.content_hash.clone()))
        .insert_header(("X-Hash", record.hash.clone()))
        .insert_header(("X-Author", record.user_id.clone()))
        .insert_header(("X-Timestamp", record.created_at_iso.clone()));
    if let Some(prev) = &record.previous_hash {
        builder.insert_header(("X-Previous-Hash", prev.clone()));
    }
    for (k, v) in &record.headers {
        builder.insert_header((k.as_str(), v.as_str()));
    }
    if let Some(locator) = &record.storage {
        let url = infra::storage::get().get_file_url(locator);
        return builder
            .status(actix_web::http::StatusCode::FOUND)
            .insert_header(("Location", url))
            .insert_header(("ETag", record.content_hash.clone()))
            .insert_header(("Cache-Control", "private, max-age=3600"))
            .insert_header(("X-Record-Type", "file"))
            .finish();
    }
    builder.body(record.content.clone())
}

async fn handle_index_query(stream_id: i64, spec: &str) -> Result<HttpResponse> {
    if let Some((a, b)) = spec.split_once(':') {
        let start: i64 = a.parse().map_err(|_| ApiError::InvalidIndex(spec.to_string()))?;
        let end: i64 = b.parse().map_err(|_| ApiError::InvalidIndex(spec.to_string()))?;
        let records = record_store::get_range(stream_id, start, end).await?;
        let metas: Vec<_> = records.into_iter().map(|r| r.meta()).collect();
        return Ok(HttpResponse::Ok().json(serde_json::json!({"records": metas})));
    }
    let index: i64 = spec.parse().map_err(|_| ApiError::InvalidIndex(spec.to_string()))?;
    let record = record_store::get_by_index(stream_id, index).await?;
    Ok(render_record(&record))
}

async fn handle_list(
    pod: &str,
    stream: &infra::table::streams::StreamRecord,
    query: &HashMap<String, String>,
    user_id: Option<&str>,
) -> Result<HttpResponse> {
    let limit: u64 = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(100);
    let after: u64 = query.get("after").and_then(|v| v.parse().ok()).unwrap_or(0);
    let unique = query.get("unique").map(String::as_str) == Some("true");
    let recursive = query.get("recursive").map(String::as_str) == Some("true");

    if recursive {
        let records = record_store::list_recursive(pod, &stream.path, unique, user_id).await?;
        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "records": records.iter().map(|r| r.meta()).collect::<Vec<_>>(),
            "total": records.len(),
        })));
    }

    let page = if unique {
        record_store::list_unique(pod, &stream.path, stream.id, limit, after).await?
    } else {
        record_store::list(pod, &stream.path, stream.id, limit, after).await?
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "records": page.records.iter().map(|r| r.meta()).collect::<Vec<_>>(),
        "total": page.total,
        "hasMore": page.has_more,
    })))
}

pub async fn handle_delete(req: HttpRequest, pod: String) -> Result<HttpResponse> {
    let user_id = extractors::require_user_id(&req)?;
    let path = req.path().trim_start_matches('/').to_string();
    let query = query_map(&req);

    let Some((stream_path, name)) = split_trailing(&path) else {
        // No trailing record segment: the whole path names a stream.
        let owner = crate::service::meta_stream::get_owner(&pod).await?;
        if owner.as_deref() != Some(user_id.as_str()) {
            return Err(ApiError::Forbidden("only the pod owner may delete a stream".into()));
        }
        stream_store::delete(&pod, &path).await?;
        return Ok(HttpResponse::NoContent().finish());
    };

    if let Some(stream) = stream_store::get_by_path(&pod, &stream_path).await? {
        let owner = crate::service::meta_stream::get_owner(&pod).await?;
        if owner.as_deref() != Some(user_id.as_str()) {
            return Err(ApiError::Forbidden("only the pod owner may delete a record".into()));
        }
        let purge = query.get("purge").map(String::as_str) == Some("true");
        let mode = if purge { record_store::DeleteMode::Hard } else { record_store::DeleteMode::Soft };
        record_store::delete(&pod, stream.id, &stream.path, &name, mode, &user_id).await?;
        return Ok(HttpResponse::NoContent().finish());
    }

    // Fall back to treating the whole path as a (possibly nonexistent) stream.
    let owner = crate::service::meta_stream::get_owner(&pod).await?;
    if owner.as_deref() != Some(user_id.as_str()) {
        return Err(ApiError::Forbidden("only the pod owner may delete a stream".into()));
    }
    stream_store::delete(&pod, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}

fn split_trailing(path: &str) -> Option<(String, String)> {
    path_resolver::split_for_write(path).ok()
}

pub async fn handle_head(req: HttpRequest, pod: String) -> Result<HttpResponse> {
    let user_id = extractors::user_id(&req);
    let path = req.path().trim_start_matches('/').to_string();
    let stream = stream_store::get_by_path(&pod, &path)
        .await?
        .ok_or(ApiError::StreamNotFound(path))?;
    authorize(&pod, &stream, user_id.as_deref(), Access::Read).await?;

    let total = record_store::list(&pod, &stream.path, stream.id, 1, 0).await?.total;
    let verify = record_store::verify(stream.id).await?;
    let last = if total > 0 {
        record_store::get_by_index(stream.id, -1).await.ok()
    } else {
        None
    };

    let mut builder = HttpResponse::Ok();
    builder.insert_header(("X-Total-Records", total.to_string()));
    if let Some(record) = last {
        builder.insert_header(("X-Hash", record.hash));
        builder.insert_header(("X-Last-Modified", record.created_at_iso));
    }
    let _ = verify;
    Ok(builder.finish())
}
