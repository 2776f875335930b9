//! Stream tree: lazy creation, lookup, children, recursive delete
//! (spec.md §4.2). Every mutating path keeps the `streams` cache pool
//! coherent per §4.7's coherence rules.

use infra::{cache::pools::StreamCacheValue, table::streams::{NewStream, StreamRecord}};

use crate::{
    common::meta::stream::Stream,
    errors::{ApiError, Result},
    service::keys,
};

fn to_cache_value(s: &StreamRecord) -> StreamCacheValue {
    StreamCacheValue {
        id: s.id,
        pod_name: s.pod_name.clone(),
        name: s.name.clone(),
        parent_id: s.parent_id,
        path: s.path.clone(),
        user_id: s.user_id.clone(),
        access_permission: s.access_permission.clone(),
        has_schema: s.has_schema,
    }
}

fn from_cache_value(v: StreamCacheValue) -> StreamRecord {
    StreamRecord {
        id: v.id,
        pod_name: v.pod_name,
        name: v.name,
        parent_id: v.parent_id,
        path: v.path,
        user_id: v.user_id,
        access_permission: v.access_permission,
        has_schema: v.has_schema,
        metadata: None,
        created_at: 0,
    }
}

pub async fn get_by_path(pod: &str, path: &str) -> Result<Option<StreamRecord>> {
    let pools = infra::cache::pools::get();
    let key = keys::stream_by_path(pod, path);
    if let Some(cached) = pools.streams.get(&key) {
        return Ok(Some(from_cache_value(cached)));
    }
    let found = infra::table::streams::get_by_path(pod, path).await?;
    if let Some(s) = &found {
        pools.streams.set(&key, to_cache_value(s));
    }
    Ok(found)
}

pub async fn get_by_id(id: i64) -> Result<Option<StreamRecord>> {
    let pools = infra::cache::pools::get();
    let key = keys::stream_by_id(id);
    if let Some(cached) = pools.streams.get(&key) {
        return Ok(Some(from_cache_value(cached)));
    }
    let found = infra::table::streams::get_by_id(id).await?;
    if let Some(s) = &found {
        pools.streams.set(&key, to_cache_value(s));
    }
    Ok(found)
}

pub async fn list_children(pod: &str, parent_id: Option<i64>) -> Result<Vec<Stream>> {
    Ok(infra::table::streams::list_children(pod, parent_id)
        .await?
        .into_iter()
        .map(Stream::from)
        .collect())
}

/// Resolves `path` segment-by-segment, creating missing intermediate
/// streams (spec.md §4.2 `getOrCreate`). Intermediate segments default to
/// `public`; only the terminal segment uses `access_permission`. System
/// streams (leading `.`) may only be created by the pod owner — the
/// caller is expected to have already checked ownership before calling
/// this with a system path.
pub async fn get_or_create(
    pod: &str,
    path: &str,
    creator: &str,
    access_permission: &str,
) -> Result<StreamRecord> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        // `/` itself: the implicit root stream holding records written
        // directly at the pod's top level (e.g. `POST <pod>/greet`).
        return get_or_create_root(pod, creator, access_permission).await;
    }

    let mut parent_id: Option<i64> = None;
    let mut current_path = String::new();
    let mut current: Option<StreamRecord> = None;

    for (i, segment) in segments.iter().enumerate() {
        current_path.push('/');
        current_path.push_str(segment);
        let is_terminal = i == segments.len() - 1;

        if let Some(existing) = infra::table::streams::get_by_parent_and_name(pod, parent_id, segment).await? {
            parent_id = Some(existing.id);
            current = Some(existing);
            continue;
        }

        // At the pod root, top-level records live under the lazily-created
        // root stream's real id, not under a sentinel — look it up rather
        // than defaulting to one, so the conflict check actually sees them.
        let sibling_scope = match parent_id {
            Some(id) => Some(id),
            None => infra::table::streams::get_by_parent_and_name(pod, None, "")
                .await?
                .map(|root| root.id),
        };

        if let Some(scope) = sibling_scope {
            if infra::table::records::exists_name_as_stream_sibling_conflict(scope, segment)
                .await
                .unwrap_or(false)
            {
                return Err(ApiError::NameConflict(format!(
                    "a record named '{segment}' already exists at this level"
                )));
            }
        }

        let perm = if is_terminal { access_permission } else { "public" };
        let created = infra::table::streams::insert(NewStream {
            pod_name: pod.to_string(),
            name: segment.to_string(),
            parent_id,
            path: current_path.clone(),
            user_id: creator.to_string(),
            access_permission: perm.to_string(),
        })
        .await?;

        invalidate_for_create_or_delete(pod, &current_path);
        parent_id = Some(created.id);
        current = Some(created);
    }

    current.ok_or_else(|| ApiError::InternalError("stream resolution produced no node".into()))
}

async fn get_or_create_root(pod: &str, creator: &str, access_permission: &str) -> Result<StreamRecord> {
    if let Some(existing) = infra::table::streams::get_by_parent_and_name(pod, None, "").await? {
        return Ok(existing);
    }
    let created = infra::table::streams::insert(NewStream {
        pod_name: pod.to_string(),
        name: String::new(),
        parent_id: None,
        path: "/".to_string(),
        user_id: creator.to_string(),
        access_permission: access_permission.to_string(),
    })
    .await?;
    invalidate_for_create_or_delete(pod, "/");
    Ok(created)
}

/// Caller must already have verified the caller is the pod owner and that
/// `path` is not under `/.config` or `/.permissions` (spec.md §4.2).
pub async fn delete(pod: &str, path: &str) -> Result<u64> {
    if is_protected(path) {
        return Err(ApiError::Forbidden("system streams cannot be deleted".into()));
    }
    let affected = infra::table::streams::delete_subtree(pod, path).await?;
    invalidate_for_create_or_delete(pod, path);
    Ok(affected)
}

fn is_protected(path: &str) -> bool {
    let trimmed = path.trim_start_matches('/');
    trimmed == ".config"
        || trimmed.starts_with(".config/")
        || trimmed == ".permissions"
        || trimmed.starts_with(".permissions/")
}

/// Invalidates the single-record/list caches for the affected subtree plus
/// the per-pod stream listing caches (spec.md §4.7 "create or delete
/// stream" coherence rule).
fn invalidate_for_create_or_delete(pod: &str, path: &str) {
    let pools = infra::cache::pools::get();
    let _ = pools.streams.invalidate(&keys::pod_streams_prefix(pod));
    let _ = pools.streams.invalidate(&keys::stream_children_prefix(pod, path));
    let _ = pools.streams.invalidate(&keys::stream_prefix(pod, path));
    let _ = pools.single_records.invalidate(&keys::stream_prefix(pod, path));
    let _ = pools.record_lists.invalidate(&keys::stream_prefix(pod, path));
}
