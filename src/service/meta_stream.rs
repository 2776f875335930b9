//! `/.config/owner`, `/.config/routing` and `/.schema/<path>` meta-streams
//! (spec.md §4.6, §6, §9 "Ownership via records").

use std::collections::HashMap;

use crate::{
    common::meta::permission::OwnerRecord,
    errors::{ApiError, Result},
    service::{record_store, stream_store},
};

const OWNER_STREAM: &str = "/.config/owner";
const ROUTING_STREAM: &str = "/.config/routing";
const SCHEMA_ROOT: &str = "/.schema";

/// The initial owner record, written once as part of pod creation — no
/// ownership check applies since no owner exists yet (spec.md §3
/// "Lifecycle").
pub async fn set_owner_initial(pod: &str, user_id: &str) -> Result<()> {
    let stream = stream_store::get_or_create(pod, OWNER_STREAM, user_id, "private").await?;
    write_owner_record(pod, &stream, user_id, user_id).await
}

/// Ownership transfer: only the current owner may call this
/// (spec.md §4.6). The caller is expected to have resolved `caller`
/// against `get_owner` before invoking.
pub async fn set_owner(pod: &str, new_owner: &str, caller: &str) -> Result<()> {
    let current = get_owner(pod).await?;
    if current.as_deref() != Some(caller) {
        return Err(ApiError::Forbidden("only the current owner may transfer ownership".into()));
    }
    let stream = stream_store::get_or_create(pod, OWNER_STREAM, caller, "private").await?;
    write_owner_record(pod, &stream, new_owner, caller).await?;
    let pools = infra::cache::pools::get();
    let _ = pools.pods.invalidate(&crate::service::keys::pod_prefix(pod));
    Ok(())
}

async fn write_owner_record(pod: &str, stream: &infra::table::streams::StreamRecord, owner: &str, author: &str) -> Result<()> {
    let body = serde_json::to_vec(&OwnerRecord { owner: owner.to_string() })
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    record_store::append(record_store::AppendOptions {
        pod: pod.to_string(),
        stream_id: stream.id,
        stream_path: stream.path.clone(),
        name: "owner".to_string(),
        body,
        content_type: "application/json".to_string(),
        user_id: author.to_string(),
        headers: HashMap::new(),
    })
    .await?;
    Ok(())
}

/// The owner is the latest record of `/.config/owner`, not a column
/// (spec.md §9). Callers in the hot path should cache this on the pods
/// pool at a higher layer; this function always consults the stream.
pub async fn get_owner(pod: &str) -> Result<Option<String>> {
    let Some(stream) = stream_store::get_by_path(pod, OWNER_STREAM).await? else {
        return Ok(None);
    };
    let Some(record) = infra::table::records::get_latest_by_name(stream.id, "owner").await? else {
        return Ok(None);
    };
    let parsed: OwnerRecord =
        serde_json::from_slice(&record.content).map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(Some(parsed.owner))
}

/// `{ "<url-path>": "<stream>/<record>" }` routing map (spec.md §6).
pub async fn set_routing(pod: &str, map: &HashMap<String, String>, caller: &str) -> Result<()> {
    let stream = stream_store::get_or_create(pod, ROUTING_STREAM, caller, "private").await?;
    let body = serde_json::to_vec(map).map_err(|e| ApiError::InternalError(e.to_string()))?;
    record_store::append(record_store::AppendOptions {
        pod: pod.to_string(),
        stream_id: stream.id,
        stream_path: stream.path,
        name: "map".to_string(),
        body,
        content_type: "application/json".to_string(),
        user_id: caller.to_string(),
        headers: HashMap::new(),
    })
    .await?;
    Ok(())
}

pub async fn get_routing(pod: &str) -> Result<HashMap<String, String>> {
    let Some(stream) = stream_store::get_by_path(pod, ROUTING_STREAM).await? else {
        return Ok(HashMap::new());
    };
    let Some(record) = infra::table::records::get_latest_by_name(stream.id, "map").await? else {
        return Ok(HashMap::new());
    };
    Ok(serde_json::from_slice(&record.content).unwrap_or_default())
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum SchemaMode {
    Strict,
    Permissive,
}

/// Schema stream for `target_path` lives at `/.schema/<target_path>`
/// (spec.md §6, §4.2).
fn schema_path(target_path: &str) -> String {
    format!("{SCHEMA_ROOT}{}", target_path)
}

pub async fn set_schema(pod: &str, target_path: &str, schema: &serde_json::Value, caller: &str) -> Result<()> {
    jsonschema::JSONSchema::compile(schema)
        .map_err(|e| ApiError::InvalidSchema(e.to_string()))?;
    let stream = stream_store::get_or_create(pod, &schema_path(target_path), caller, "private").await?;
    let body = serde_json::to_vec(schema).map_err(|e| ApiError::InternalError(e.to_string()))?;
    record_store::append(record_store::AppendOptions {
        pod: pod.to_string(),
        stream_id: stream.id,
        stream_path: stream.path,
        name: "schema".to_string(),
        body,
        content_type: "application/json".to_string(),
        user_id: caller.to_string(),
        headers: HashMap::new(),
    })
    .await?;
    if let Some(target) = stream_store::get_by_path(pod, target_path).await? {
        infra::table::streams::set_has_schema(target.id, true).await?;
    }
    Ok(())
}

/// Validates `body` against the latest schema for `target_path`, if one is
/// set. `strict` mode fails the write with `INVALID_SCHEMA`; `permissive`
/// mode only logs the violation (spec.md §6).
pub async fn validate_against_schema(pod: &str, target_path: &str, body: &[u8], mode: SchemaMode) -> Result<()> {
    let Some(stream) = stream_store::get_by_path(pod, &schema_path(target_path)).await? else {
        return Ok(());
    };
    let Some(record) = infra::table::records::get_latest_by_name(stream.id, "schema").await? else {
        return Ok(());
    };
    let schema: serde_json::Value =
        serde_json::from_slice(&record.content).map_err(|e| ApiError::InternalError(e.to_string()))?;
    let compiled = jsonschema::JSONSchema::compile(&schema).map_err(|e| ApiError::InternalError(e.to_string()))?;
    let instance: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return Ok(()),
    };
    let result = compiled.validate(&instance);
    if let Err(errors) = result {
        let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
        match mode {
            SchemaMode::Strict => return Err(ApiError::InvalidSchema(messages.join("; "))),
            SchemaMode::Permissive => {
                tracing::warn!(target: "webpods::schema", pod, target_path, errors = %messages.join("; "), "permissive schema violation");
            }
        }
    }
    Ok(())
}
