use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Schema, Set};

use super::entity::pod::{ActiveModel, Column, Entity, Model};
use crate::{
    db::{ORM_CLIENT, connect_to_orm, get_lock},
    errors::{DbError, Error, Result},
};

#[derive(Debug, Clone)]
pub struct PodRecord {
    pub name: String,
    pub metadata: Option<String>,
    pub created_at: i64,
}

impl From<Model> for PodRecord {
    fn from(m: Model) -> Self {
        Self {
            name: m.name,
            metadata: m.metadata,
            created_at: m.created_at,
        }
    }
}

pub async fn create_table() -> Result<()> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    let builder = client.get_database_backend();
    let schema = Schema::new(builder);
    let stmt = schema.create_table_from_entity(Entity).if_not_exists().take();
    client.execute(builder.build(&stmt)).await?;
    Ok(())
}

pub async fn create(name: &str) -> Result<PodRecord> {
    let _lock = get_lock().await;
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    if Entity::find_by_id(name.to_string()).one(client).await?.is_some() {
        return Err(Error::DbError(DbError::UniqueViolation(format!(
            "pod {name} already exists"
        ))));
    }
    let now = config::now_micros();
    let model = ActiveModel {
        name: Set(name.to_string()),
        metadata: Set(None),
        created_at: Set(now),
    };
    Entity::insert(model).exec(client).await?;
    Ok(PodRecord {
        name: name.to_string(),
        metadata: None,
        created_at: now,
    })
}

pub async fn get(name: &str) -> Result<Option<PodRecord>> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    let record = Entity::find_by_id(name.to_string()).one(client).await?;
    Ok(record.map(PodRecord::from))
}

pub async fn exists(name: &str) -> Result<bool> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Ok(Entity::find()
        .filter(Column::Name.eq(name))
        .count(client)
        .await?
        > 0)
}

/// Truncates the table. Callers are responsible for gating this behind the
/// `testing` config flag (spec.md §9's "test-only reset entry point").
pub async fn clear() -> Result<()> {
    let _lock = get_lock().await;
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Entity::delete_many().exec(client).await?;
    Ok(())
}

pub async fn is_empty() -> Result<bool> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Ok(Entity::find().count(client).await? == 0)
}
