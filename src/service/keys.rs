//! Cache key builders, following the shapes spec.md §4.7 assigns to each
//! pool. Keys are `:`-delimited so that
//! `infra::cache::HierarchicalCache::invalidate` can treat a prefix as a
//! `<prefix>:*` pattern.

pub fn pod(name: &str) -> String {
    format!("pod:{name}:meta")
}

pub fn pod_prefix(name: &str) -> String {
    format!("pod:{name}:*")
}

pub fn stream_by_path(pod: &str, path: &str) -> String {
    format!("pod:{pod}:stream:{path}:meta")
}

pub fn stream_by_id(id: i64) -> String {
    format!("stream:id:{id}")
}

/// Covers single-record and list caches for the stream at `path`
/// (spec.md §4.7 "append to stream" coherence rule).
pub fn stream_prefix(pod: &str, path: &str) -> String {
    format!("pod:{pod}:stream:{path}:*")
}

/// Per-pod stream listing caches, invalidated on stream create/delete.
pub fn pod_streams_prefix(pod: &str) -> String {
    format!("pod:{pod}:streams:*")
}

pub fn stream_children_prefix(pod: &str, path: &str) -> String {
    format!("pod:{pod}:stream:{path}:children:*")
}

pub fn single_record(pod: &str, stream_path: &str, name: &str) -> String {
    format!("pod:{pod}:stream:{stream_path}:record:{name}:data")
}

/// `sha256(query)[:16]` keeps list keys bounded-length regardless of how
/// many query parameters a listing request carries.
pub fn record_list(pod: &str, stream_path: &str, query: &str) -> String {
    let digest = sha256::digest(query.as_bytes());
    format!("pod:{pod}:stream:{stream_path}:list:{}", &digest[..16])
}
