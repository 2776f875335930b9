use std::{collections::HashMap, sync::Arc};

use once_cell::sync::Lazy;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Schema, Set};
use tokio::sync::Mutex as AsyncMutex;

use super::entity::record::{ActiveModel, Column, Entity, Model};
use crate::{
    db::{ORM_CLIENT, connect_to_orm},
    errors::Result,
};

#[derive(Debug, Clone)]
pub struct RecordRecord {
    pub id: i64,
    pub stream_id: i64,
    pub index: i64,
    pub name: String,
    pub path: String,
    pub content: Vec<u8>,
    pub content_type: String,
    pub size: i64,
    pub content_hash: String,
    pub hash: String,
    pub previous_hash: Option<String>,
    pub user_id: String,
    pub storage: Option<String>,
    pub headers: Option<String>,
    pub created_at_iso: String,
    pub created_at: i64,
}

impl From<Model> for RecordRecord {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            stream_id: m.stream_id,
            index: m.idx,
            name: m.name,
            path: m.path,
            content: m.content,
            content_type: m.content_type,
            size: m.size,
            content_hash: m.content_hash,
            hash: m.hash,
            previous_hash: m.previous_hash,
            user_id: m.user_id,
            storage: m.storage,
            headers: m.headers,
            created_at_iso: m.created_at_iso,
            created_at: m.created_at,
        }
    }
}

pub struct AppendInput {
    pub stream_id: i64,
    pub name: String,
    pub path: String,
    pub stored_content: Vec<u8>,
    pub content_type: String,
    pub size: i64,
    pub content_hash: String,
    pub user_id: String,
    pub storage: Option<String>,
    pub headers: Option<String>,
}

/// Per-stream advisory locks (spec.md §4.3 step 1): appends to different
/// streams proceed fully in parallel; appends to the same stream are
/// totally ordered.
static STREAM_LOCKS: Lazy<parking_lot::Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>> =
    Lazy::new(|| parking_lot::Mutex::new(HashMap::new()));

fn lock_for(stream_id: i64) -> Arc<AsyncMutex<()>> {
    STREAM_LOCKS
        .lock()
        .entry(stream_id)
        .or_insert_with(|| Arc::new(AsyncMutex::new(())))
        .clone()
}

pub async fn create_table() -> Result<()> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    let builder = client.get_database_backend();
    let schema = Schema::new(builder);
    let stmt = schema.create_table_from_entity(Entity).if_not_exists().take();
    client.execute(builder.build(&stmt)).await?;
    Ok(())
}

pub async fn get_tail(stream_id: i64) -> Result<Option<(i64, String)>> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    let tail = Entity::find()
        .filter(Column::StreamId.eq(stream_id))
        .order_by(Column::Idx, Order::Desc)
        .limit(1)
        .one(client)
        .await?;
    Ok(tail.map(|m| (m.idx, m.hash)))
}

/// Appends a record under the stream-scoped lock, assigning the next dense
/// index and linking `previous_hash` to the current tail. `hash` is
/// computed here so the read-tail-then-write stays a single serialized
/// step (spec.md §4.3 steps 1-5).
pub async fn append(input: AppendInput) -> Result<RecordRecord> {
    let lock = lock_for(input.stream_id);
    let _guard = lock.lock().await;

    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    let tail = get_tail(input.stream_id).await?;
    let (index, previous_hash) = match tail {
        Some((idx, hash)) => (idx + 1, Some(hash)),
        None => (0, None),
    };

    let now_iso = config::now_iso();
    let now = config::now_micros();
    let hash = compute_hash(previous_hash.as_deref(), &input.content_hash, &input.user_id, &now_iso);

    let model = ActiveModel {
        id: sea_orm::ActiveValue::NotSet,
        stream_id: Set(input.stream_id),
        idx: Set(index),
        name: Set(input.name.clone()),
        path: Set(input.path.clone()),
        content: Set(input.stored_content.clone()),
        content_type: Set(input.content_type.clone()),
        size: Set(input.size),
        content_hash: Set(input.content_hash.clone()),
        hash: Set(hash.clone()),
        previous_hash: Set(previous_hash.clone()),
        user_id: Set(input.user_id.clone()),
        storage: Set(input.storage.clone()),
        headers: Set(input.headers.clone()),
        created_at_iso: Set(now_iso.clone()),
        created_at: Set(now),
    };
    let res = Entity::insert(model).exec(client).await?;

    Ok(RecordRecord {
        id: res.last_insert_id,
        stream_id: input.stream_id,
        index,
        name: input.name,
        path: input.path,
        content: input.stored_content,
        content_type: input.content_type,
        size: input.size,
        content_hash: input.content_hash,
        hash,
        previous_hash,
        user_id: input.user_id,
        storage: input.storage,
        headers: input.headers,
        created_at_iso: now_iso,
        created_at: now,
    })
}

/// `SHA-256(previous_hash ∥ content_hash ∥ user_id ∥ created_at_iso)`,
/// operating on the UTF-8 bytes of each hex/string component in order
/// (spec.md §3, §4.3 step 5). `previous_hash` is empty for the first
/// record in a stream.
pub fn compute_hash(previous_hash: Option<&str>, content_hash: &str, user_id: &str, created_at_iso: &str) -> String {
    let mut buf = Vec::new();
    buf.extend_from_slice(previous_hash.unwrap_or("").as_bytes());
    buf.extend_from_slice(content_hash.as_bytes());
    buf.extend_from_slice(user_id.as_bytes());
    buf.extend_from_slice(created_at_iso.as_bytes());
    sha256::digest(buf)
}

pub async fn get_by_id(id: i64) -> Result<Option<RecordRecord>> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Ok(Entity::find_by_id(id).one(client).await?.map(RecordRecord::from))
}

pub async fn get_by_index(stream_id: i64, index: i64) -> Result<Option<RecordRecord>> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Ok(Entity::find()
        .filter(Column::StreamId.eq(stream_id))
        .filter(Column::Idx.eq(index))
        .one(client)
        .await?
        .map(RecordRecord::from))
}

pub async fn count_for_stream(stream_id: i64) -> Result<i64> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Ok(Entity::find()
        .filter(Column::StreamId.eq(stream_id))
        .count(client)
        .await? as i64)
}

/// Ascending-index window `[offset, offset+limit)`. Used by `list`, `verify`
/// and the recursive traversals.
pub async fn list_window(stream_id: i64, offset: u64, limit: u64) -> Result<Vec<RecordRecord>> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Ok(Entity::find()
        .filter(Column::StreamId.eq(stream_id))
        .order_by(Column::Idx, Order::Asc)
        .offset(offset)
        .limit(limit)
        .all(client)
        .await?
        .into_iter()
        .map(RecordRecord::from)
        .collect())
}

pub async fn list_all_ascending(stream_id: i64) -> Result<Vec<RecordRecord>> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Ok(Entity::find()
        .filter(Column::StreamId.eq(stream_id))
        .order_by(Column::Idx, Order::Asc)
        .all(client)
        .await?
        .into_iter()
        .map(RecordRecord::from)
        .collect())
}

/// Highest-index record with the given `name` (spec.md §4.4 `getByName`).
pub async fn get_latest_by_name(stream_id: i64, name: &str) -> Result<Option<RecordRecord>> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Ok(Entity::find()
        .filter(Column::StreamId.eq(stream_id))
        .filter(Column::Name.eq(name))
        .order_by(Column::Idx, Order::Desc)
        .limit(1)
        .one(client)
        .await?
        .map(RecordRecord::from))
}

/// Tombstones are named `<original>.deleted.<iso-timestamp>` (spec.md §3).
/// Returns the highest-index tombstone whose name starts with that prefix,
/// a superset the caller narrows by parsing `originalName` from content.
pub async fn get_latest_tombstone_candidate(stream_id: i64, original_name: &str) -> Result<Option<RecordRecord>> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    let prefix = format!("{original_name}.deleted.%");
    Ok(Entity::find()
        .filter(Column::StreamId.eq(stream_id))
        .filter(Column::Name.like(&prefix))
        .order_by(Column::Idx, Order::Desc)
        .limit(1)
        .one(client)
        .await?
        .map(RecordRecord::from))
}

pub async fn exists_name_as_stream_sibling_conflict(stream_id: i64, name: &str) -> Result<bool> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Ok(Entity::find()
        .filter(Column::StreamId.eq(stream_id))
        .filter(Column::Name.eq(name))
        .count(client)
        .await?
        > 0)
}

/// Hard-delete (purge) overwrite: blanks `content` while preserving `hash`
/// and `content_hash` so chain verification still succeeds (spec.md §4.4).
pub async fn purge_content(id: i64) -> Result<()> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Entity::update_many()
        .col_expr(Column::Content, sea_orm::entity::prelude::Expr::value(Vec::<u8>::new()))
        .filter(Column::Id.eq(id))
        .exec(client)
        .await?;
    Ok(())
}

pub async fn clear() -> Result<()> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Entity::delete_many().exec(client).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_for_same_inputs() {
        let h1 = compute_hash(None, "ch", "user", "2024-01-01T00:00:00Z");
        let h2 = compute_hash(None, "ch", "user", "2024-01-01T00:00:00Z");
        assert_eq!(h1, h2);
        let h3 = compute_hash(Some(&h1), "ch2", "user", "2024-01-01T00:00:01Z");
        assert_ne!(h1, h3);
    }
}
