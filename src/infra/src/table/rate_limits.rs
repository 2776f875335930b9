use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Schema, Set};
use tokio::sync::Mutex;

use super::entity::rate_limit::{ActiveModel, Column, Entity, Model};
use crate::{
    db::{ORM_CLIENT, connect_to_orm},
    errors::Result,
};

static LOCK: Mutex<()> = Mutex::const_new(());

pub async fn create_table() -> Result<()> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    let builder = client.get_database_backend();
    let schema = Schema::new(builder);
    let stmt = schema.create_table_from_entity(Entity).if_not_exists().take();
    client.execute(builder.build(&stmt)).await?;
    Ok(())
}

/// Atomically increments `(identifier, action)`'s counter for the current
/// hourly `window_start`, creating the row on first use, and returns the
/// post-increment count.
pub async fn increment(identifier: &str, action: &str, window_start: i64) -> Result<i64> {
    let _guard = LOCK.lock().await;
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    let existing = Entity::find()
        .filter(Column::Identifier.eq(identifier))
        .filter(Column::Action.eq(action))
        .filter(Column::WindowStart.eq(window_start))
        .one(client)
        .await?;

    match existing {
        Some(row) => {
            let new_count = row.count + 1;
            let mut active: ActiveModel = row.into();
            active.count = Set(new_count);
            Entity::update(active).exec(client).await?;
            Ok(new_count)
        }
        None => {
            let model = ActiveModel {
                id: sea_orm::ActiveValue::NotSet,
                identifier: Set(identifier.to_string()),
                action: Set(action.to_string()),
                window_start: Set(window_start),
                count: Set(1),
            };
            Entity::insert(model).exec(client).await?;
            Ok(1)
        }
    }
}

pub async fn get(identifier: &str, action: &str, window_start: i64) -> Result<Option<Model>> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Ok(Entity::find()
        .filter(Column::Identifier.eq(identifier))
        .filter(Column::Action.eq(action))
        .filter(Column::WindowStart.eq(window_start))
        .one(client)
        .await?)
}

/// Deletes windows older than `before`, the opportunistic reap spec.md
/// §4.9 calls for plus the backstop `job::rate_limit_reaper` runs.
pub async fn reap_older_than(before: i64) -> Result<u64> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    let res = Entity::delete_many()
        .filter(Column::WindowStart.lt(before))
        .exec(client)
        .await?;
    Ok(res.rows_affected)
}

pub async fn clear() -> Result<()> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Entity::delete_many().exec(client).await?;
    Ok(())
}
