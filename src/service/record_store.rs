//! Append, read, delete and verify records within a stream
//! (spec.md §4.3-§4.5). Orchestrates name validation, content
//! canonicalization, external-storage offload, the hash chain and cache
//! coherence around the lower-level `infra::table::records` primitives.

use std::collections::HashMap;

use infra::{
    cache::pools::SingleRecordCacheValue,
    table::records::{AppendInput, RecordRecord},
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    common::meta::record::Record,
    errors::{ApiError, Result},
    service::{content, keys},
};

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9._\-]+$").unwrap());

/// Validates record name shape (spec.md §4.3): non-empty, ≤255 chars,
/// `[A-Za-z0-9._-]+`, cannot start or end with `.`, cannot contain `/`.
pub fn validate_name(name: &str) -> Result<()> {
    let max_len = config::get_config().limits.max_record_name_len;
    if name.is_empty() || name.len() > max_len {
        return Err(ApiError::InvalidName(format!(
            "record name must be 1-{max_len} characters"
        )));
    }
    if name.contains('/') {
        return Err(ApiError::InvalidName("record name cannot contain '/'".into()));
    }
    if name.starts_with('.') || name.ends_with('.') {
        return Err(ApiError::InvalidName(
            "record name cannot start or end with '.'".into(),
        ));
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(ApiError::InvalidName(
            "record name must match [A-Za-z0-9._-]+".into(),
        ));
    }
    Ok(())
}

pub struct AppendOptions {
    pub pod: String,
    pub stream_id: i64,
    pub stream_path: String,
    pub name: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub user_id: String,
    pub headers: HashMap<String, String>,
}

pub async fn append(opts: AppendOptions) -> Result<Record> {
    validate_name(&opts.name)?;
    if infra::table::streams::get_by_parent_and_name(&opts.pod, Some(opts.stream_id), &opts.name)
        .await?
        .is_some()
    {
        return Err(ApiError::NameConflict(format!(
            "a child stream named '{}' already exists",
            opts.name
        )));
    }

    let decoded = content::canonicalize(&opts.content_type, &opts.body)?;
    let content_hash = content::content_hash(&decoded);
    let size = decoded.len() as i64;

    let cfg = config::get_config();
    let (stored_content, storage) = if cfg.storage.enabled && decoded.len() >= cfg.storage.min_external_size {
        let ext = extension_for(&opts.content_type);
        match infra::storage::get()
            .store_file(&opts.pod, &opts.stream_path, &opts.name, &content_hash, &decoded, &ext)
            .await
        {
            Ok(locator) => (Vec::new(), Some(locator)),
            Err(err) => {
                tracing::warn!(target: "webpods::storage", error = %err, "external storage failed, falling back to inline");
                (decoded, None)
            }
        }
    } else {
        (decoded, None)
    };

    let headers_json = if opts.headers.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&opts.headers).map_err(|e| ApiError::InternalError(e.to_string()))?)
    };

    let path = format!("{}/{}", opts.stream_path.trim_end_matches('/'), opts.name);
    let inserted = infra::table::records::append(AppendInput {
        stream_id: opts.stream_id,
        name: opts.name.clone(),
        path,
        stored_content,
        content_type: opts.content_type,
        size,
        content_hash,
        user_id: opts.user_id,
        storage,
        headers: headers_json,
    })
    .await?;

    invalidate_after_append(&opts.pod, &opts.stream_path);
    Ok(Record::from(inserted))
}

fn extension_for(content_type: &str) -> String {
    match content_type.split(';').next().unwrap_or(content_type).trim() {
        "image/png" => ".png".into(),
        "image/jpeg" => ".jpg".into(),
        "image/gif" => ".gif".into(),
        "application/pdf" => ".pdf".into(),
        "application/zip" => ".zip".into(),
        _ => "".into(),
    }
}

fn invalidate_after_append(pod: &str, stream_path: &str) {
    let pools = infra::cache::pools::get();
    let _ = pools.single_records.invalidate(&keys::stream_prefix(pod, stream_path));
    let _ = pools.record_lists.invalidate(&keys::stream_prefix(pod, stream_path));
}

/// Highest-index record named `name`, unless a later tombstone references
/// it as `originalName` (spec.md §4.4, testable property 6).
pub async fn get_by_name(pod: &str, stream_path: &str, stream_id: i64, name: &str) -> Result<Record> {
    let pools = infra::cache::pools::get();
    let key = keys::single_record(pod, stream_path, name);
    if let Some(cached) = pools.single_records.get(&key) {
        return Ok(from_cache_value(stream_id, cached));
    }

    let record = infra::table::records::get_latest_by_name(stream_id, name)
        .await?
        .ok_or(ApiError::RecordNotFound(name.to_string()))?;

    if let Some(tombstone) = infra::table::records::get_latest_tombstone_candidate(stream_id, name).await? {
        let tombstone_index = tombstone.index;
        let domain = Record::from(tombstone);
        if tombstone_index > record.index && domain.original_name_if_tombstone().as_deref() == Some(name) {
            return Err(ApiError::RecordDeleted(name.to_string()));
        }
    }

    let domain = Record::from(record);
    if domain.content.len() <= config_record_cache_limit() {
        pools.single_records.set(&key, to_cache_value(&domain));
    }
    Ok(domain)
}

fn config_record_cache_limit() -> usize {
    config::get_config().cache.single_record_max_bytes
}

fn to_cache_value(r: &Record) -> SingleRecordCacheValue {
    SingleRecordCacheValue {
        index: r.index,
        name: r.name.clone(),
        content: r.content.clone(),
        content_type: r.content_type.clone(),
        headers: r.headers.clone(),
        content_hash: r.content_hash.clone(),
        hash: r.hash.clone(),
        previous_hash: r.previous_hash.clone(),
        user_id: r.user_id.clone(),
        created_at_iso: r.created_at_iso.clone(),
    }
}

fn from_cache_value(stream_id: i64, v: SingleRecordCacheValue) -> Record {
    Record {
        id: 0,
        stream_id,
        index: v.index,
        name: v.name,
        path: String::new(),
        content: v.content,
        content_type: v.content_type,
        size: 0,
        content_hash: v.content_hash,
        hash: v.hash,
        previous_hash: v.previous_hash,
        user_id: v.user_id,
        storage: None,
        headers: v.headers,
        created_at_iso: v.created_at_iso,
    }
}

/// `i < 0` is interpreted as `total + i`; `-total` maps to index 0;
/// `-total-1` is out of range (spec.md §8 boundary behaviors).
pub async fn get_by_index(stream_id: i64, index: i64) -> Result<Record> {
    let total = infra::table::records::count_for_stream(stream_id).await?;
    let resolved = if index < 0 { total + index } else { index };
    if resolved < 0 || resolved >= total {
        return Err(ApiError::InvalidIndex(format!("index {index} out of range")));
    }
    let record = infra::table::records::get_by_index(stream_id, resolved)
        .await?
        .ok_or_else(|| ApiError::InvalidIndex(format!("index {index} out of range")))?;
    Ok(Record::from(record))
}

/// Half-open `[start, end)`, Python-style negative indices resolved
/// against `total` (spec.md §4.4).
pub async fn get_range(stream_id: i64, start: i64, end: i64) -> Result<Vec<Record>> {
    let total = infra::table::records::count_for_stream(stream_id).await?;
    let resolve = |i: i64| -> i64 {
        if i < 0 { (total + i).max(0) } else { i.min(total) }
    };
    let start = resolve(start);
    let end = resolve(end);
    if start > end {
        return Err(ApiError::InvalidRange(format!("start {start} > end {end}")));
    }
    let records = infra::table::records::list_window(stream_id, start as u64, (end - start) as u64).await?;
    Ok(records.into_iter().map(Record::from).collect())
}

pub struct RecordPage {
    pub records: Vec<Record>,
    pub total: i64,
    pub has_more: bool,
}

pub async fn list(pod: &str, stream_path: &str, stream_id: i64, limit: u64, after: u64) -> Result<RecordPage> {
    let cache_key = keys::record_list(pod, stream_path, &format!("list:{limit}:{after}"));
    if let Some(page) = get_cached_page(&cache_key) {
        return Ok(page);
    }
    let total = infra::table::records::count_for_stream(stream_id).await?;
    let records = infra::table::records::list_window(stream_id, after, limit)
        .await?
        .into_iter()
        .map(Record::from)
        .collect::<Vec<_>>();
    let has_more = after + records.len() as u64 < total as u64;
    let page = RecordPage { records, total, has_more };
    cache_page(&cache_key, &page);
    Ok(page)
}

/// For each distinct `name`, keeps only the highest-index record
/// (latest-wins, spec.md §4.4).
pub async fn list_unique(pod: &str, stream_path: &str, stream_id: i64, limit: u64, after: u64) -> Result<RecordPage> {
    let cache_key = keys::record_list(pod, stream_path, &format!("unique:{limit}:{after}"));
    if let Some(page) = get_cached_page(&cache_key) {
        return Ok(page);
    }
    let all = infra::table::records::list_all_ascending(stream_id).await?;
    let mut latest_by_name: HashMap<String, RecordRecord> = HashMap::new();
    for r in all {
        latest_by_name.insert(r.name.clone(), r);
    }
    let mut unique: Vec<RecordRecord> = latest_by_name.into_values().collect();
    unique.sort_by_key(|r| r.index);
    let total = unique.len() as i64;
    let page: Vec<Record> = unique
        .into_iter()
        .skip(after as usize)
        .take(limit as usize)
        .map(Record::from)
        .collect();
    let has_more = after + page.len() as u64 < total as u64;
    let page = RecordPage { records: page, total, has_more };
    cache_page(&cache_key, &page);
    Ok(page)
}

fn get_cached_page(key: &str) -> Option<RecordPage> {
    let cached = infra::cache::pools::get().record_lists.get(key)?;
    Some(RecordPage {
        records: cached.records.into_iter().map(|v| from_cache_value(0, v)).collect(),
        total: cached.total,
        has_more: cached.has_more,
    })
}

/// Skips admission above the record-count cap even when the serialized
/// size would otherwise fit (spec.md §4.7 recordLists row: "skip if ...
/// > 1000 records" — a rule the generic `HierarchicalCache` cannot see
/// since it only estimates byte size).
fn cache_page(key: &str, page: &RecordPage) {
    let max_records = config::get_config().cache.record_list_max_records;
    if page.records.len() > max_records {
        return;
    }
    let value = infra::cache::pools::RecordListCacheValue {
        records: page.records.iter().map(to_cache_value).collect(),
        total: page.total,
        has_more: page.has_more,
    };
    infra::cache::pools::get().record_lists.set(key, value);
}

/// Traverses every stream whose `path` starts with `root_path`, applying
/// the read-permission filter per visited stream and stopping at
/// inaccessible subtrees (spec.md §4.4).
pub async fn list_recursive(
    pod: &str,
    root_path: &str,
    unique: bool,
    user_id: Option<&str>,
) -> Result<Vec<Record>> {
    let streams = infra::table::streams::list_subtree(pod, root_path).await?;
    let mut out = Vec::new();
    for stream in streams {
        let allowed = crate::service::permission::can_access(
            pod,
            &stream,
            user_id,
            crate::service::permission::Access::Read,
        )
        .await?;
        if !allowed {
            continue;
        }
        let records = if unique {
            list_unique(pod, &stream.path, stream.id, u64::MAX, 0).await?.records
        } else {
            infra::table::records::list_all_ascending(stream.id)
                .await?
                .into_iter()
                .map(Record::from)
                .collect()
        };
        out.extend(records);
    }
    Ok(out)
}

pub enum DeleteMode {
    Soft,
    Hard,
}

/// Appends a tombstone (spec.md §4.4); hard delete additionally blanks the
/// original record's stored content while preserving `hash`/`content_hash`
/// so chain verification keeps passing.
pub async fn delete(
    pod: &str,
    stream_id: i64,
    stream_path: &str,
    name: &str,
    mode: DeleteMode,
    caller: &str,
) -> Result<()> {
    let original = infra::table::records::get_latest_by_name(stream_id, name)
        .await?
        .ok_or_else(|| ApiError::RecordNotFound(name.to_string()))?;

    let now_iso = config::now_iso();
    // The tombstone's `name` must satisfy `validate_name`'s
    // `[A-Za-z0-9._-]+` pattern, which RFC3339's `:`/`+` would violate;
    // `deletedAt`/`purgedAt` below keep the full RFC3339 form.
    let tombstone_name = format!("{name}.deleted.{}", config::now_compact());
    let mut body = serde_json::json!({
        "deleted": true,
        "originalName": name,
        "deletedAt": now_iso,
        "deletedBy": caller,
    });
    if matches!(mode, DeleteMode::Hard) {
        body["purged"] = serde_json::Value::Bool(true);
        body["purgedAt"] = serde_json::Value::String(now_iso.clone());
        body["purgedBy"] = serde_json::Value::String(caller.to_string());
    }

    append(AppendOptions {
        pod: pod.to_string(),
        stream_id,
        stream_path: stream_path.to_string(),
        name: tombstone_name,
        body: serde_json::to_vec(&body).map_err(|e| ApiError::InternalError(e.to_string()))?,
        content_type: "application/json".to_string(),
        user_id: caller.to_string(),
        headers: HashMap::new(),
    })
    .await?;

    if matches!(mode, DeleteMode::Hard) {
        infra::table::records::purge_content(original.id).await?;
        invalidate_after_append(pod, stream_path);
    }

    Ok(())
}

pub struct VerifyResult {
    pub valid: bool,
    pub first_break_index: Option<i64>,
}

/// Recomputes each record's `hash` in ascending order and checks it
/// against the stored value and the next record's `previous_hash`
/// (spec.md §4.5). For purged records `content_hash` is trusted from the
/// row since the content itself is gone.
pub async fn verify(stream_id: i64) -> Result<VerifyResult> {
    let records = infra::table::records::list_all_ascending(stream_id).await?;
    let mut expected_previous: Option<String> = None;
    for r in &records {
        let recomputed = infra::table::records::compute_hash(
            expected_previous.as_deref(),
            &r.content_hash,
            &r.user_id,
            &r.created_at_iso,
        );
        if recomputed != r.hash || r.previous_hash != expected_previous {
            return Ok(VerifyResult {
                valid: false,
                first_break_index: Some(r.index),
            });
        }
        expected_previous = Some(r.hash.clone());
    }
    Ok(VerifyResult {
        valid: true,
        first_break_index: None,
    })
}
