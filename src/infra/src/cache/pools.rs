use std::{collections::HashMap, time::Duration};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::{CacheValue, HierarchicalCache};

#[derive(Clone, Serialize, Deserialize)]
pub struct PodCacheValue {
    pub owner: Option<String>,
    pub metadata: Option<String>,
    pub created_at: i64,
}

impl CacheValue for PodCacheValue {
    fn estimated_size(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len() * 2).unwrap_or(64)
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StreamCacheValue {
    pub id: i64,
    pub pod_name: String,
    pub name: String,
    pub parent_id: Option<i64>,
    pub path: String,
    pub user_id: String,
    pub access_permission: String,
    pub has_schema: bool,
}

impl CacheValue for StreamCacheValue {
    fn estimated_size(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len() * 2).unwrap_or(64)
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SingleRecordCacheValue {
    pub index: i64,
    pub name: String,
    pub content: Vec<u8>,
    pub content_type: String,
    pub headers: HashMap<String, String>,
    pub content_hash: String,
    pub hash: String,
    pub previous_hash: Option<String>,
    pub user_id: String,
    pub created_at_iso: String,
}

impl CacheValue for SingleRecordCacheValue {
    fn estimated_size(&self) -> usize {
        self.content.len()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RecordListCacheValue {
    pub records: Vec<SingleRecordCacheValue>,
    pub total: i64,
    pub has_more: bool,
}

impl CacheValue for RecordListCacheValue {
    fn estimated_size(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len() * 2).unwrap_or(64)
    }
}

pub struct Pools {
    pub pods: HierarchicalCache<PodCacheValue>,
    pub streams: HierarchicalCache<StreamCacheValue>,
    pub single_records: HierarchicalCache<SingleRecordCacheValue>,
    pub record_lists: HierarchicalCache<RecordListCacheValue>,
}

static POOLS: OnceCell<Pools> = OnceCell::new();

pub fn get() -> &'static Pools {
    POOLS.get_or_init(|| {
        let cfg = config::get_config();
        Pools {
            pods: HierarchicalCache::new(
                cfg.cache.pods_cap,
                usize::MAX,
                Duration::from_secs(cfg.cache.pods_ttl_secs),
            ),
            streams: HierarchicalCache::new(
                cfg.cache.streams_cap,
                usize::MAX,
                Duration::from_secs(cfg.cache.streams_ttl_secs),
            ),
            single_records: HierarchicalCache::new(
                cfg.cache.single_records_cap,
                cfg.cache.single_record_max_bytes,
                Duration::from_secs(cfg.cache.single_records_ttl_secs),
            ),
            record_lists: HierarchicalCache::new(
                cfg.cache.record_lists_cap,
                cfg.cache.record_list_max_bytes,
                Duration::from_secs(cfg.cache.record_lists_ttl_secs),
            ),
        }
    })
}

/// Test-only reset entry point (spec.md §9: "expose a test-only reset
/// entry point").
pub fn reset_all() {
    let pools = get();
    pools.pods.clear();
    pools.streams.clear();
    pools.single_records.clear();
    pools.record_lists.clear();
}

pub struct CacheReport {
    pub pods: super::CacheStats,
    pub streams: super::CacheStats,
    pub single_records: super::CacheStats,
    pub record_lists: super::CacheStats,
}

pub fn report() -> CacheReport {
    let pools = get();
    CacheReport {
        pods: pools.pods.stats(),
        streams: pools.streams.stats(),
        single_records: pools.single_records.stats(),
        record_lists: pools.record_lists.stats(),
    }
}
