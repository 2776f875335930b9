use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    Schema, Set, sea_query::Condition,
};

use super::entity::stream::{ActiveModel, Column, Entity, Model};
use crate::{
    db::{ORM_CLIENT, connect_to_orm, get_lock},
    errors::Result,
};

#[derive(Debug, Clone)]
pub struct StreamRecord {
    pub id: i64,
    pub pod_name: String,
    pub name: String,
    pub parent_id: Option<i64>,
    pub path: String,
    pub user_id: String,
    pub access_permission: String,
    pub has_schema: bool,
    pub metadata: Option<String>,
    pub created_at: i64,
}

impl From<Model> for StreamRecord {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            pod_name: m.pod_name,
            name: m.name,
            parent_id: m.parent_id,
            path: m.path,
            user_id: m.user_id,
            access_permission: m.access_permission,
            has_schema: m.has_schema,
            metadata: m.metadata,
            created_at: m.created_at,
        }
    }
}

pub struct NewStream {
    pub pod_name: String,
    pub name: String,
    pub parent_id: Option<i64>,
    pub path: String,
    pub user_id: String,
    pub access_permission: String,
}

pub async fn create_table() -> Result<()> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    let builder = client.get_database_backend();
    let schema = Schema::new(builder);
    let stmt = schema.create_table_from_entity(Entity).if_not_exists().take();
    client.execute(builder.build(&stmt)).await?;
    Ok(())
}

pub async fn insert(new: NewStream) -> Result<StreamRecord> {
    let _lock = get_lock().await;
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    let now = config::now_micros();
    let model = ActiveModel {
        id: sea_orm::ActiveValue::NotSet,
        pod_name: Set(new.pod_name.clone()),
        name: Set(new.name.clone()),
        parent_id: Set(new.parent_id),
        path: Set(new.path.clone()),
        user_id: Set(new.user_id.clone()),
        access_permission: Set(new.access_permission.clone()),
        has_schema: Set(false),
        metadata: Set(None),
        created_at: Set(now),
    };
    let res = Entity::insert(model).exec(client).await?;
    Ok(StreamRecord {
        id: res.last_insert_id,
        pod_name: new.pod_name,
        name: new.name,
        parent_id: new.parent_id,
        path: new.path,
        user_id: new.user_id,
        access_permission: new.access_permission,
        has_schema: false,
        metadata: None,
        created_at: now,
    })
}

pub async fn get_by_id(id: i64) -> Result<Option<StreamRecord>> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Ok(Entity::find_by_id(id).one(client).await?.map(StreamRecord::from))
}

pub async fn get_by_path(pod: &str, path: &str) -> Result<Option<StreamRecord>> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Ok(Entity::find()
        .filter(Column::PodName.eq(pod))
        .filter(Column::Path.eq(path))
        .one(client)
        .await?
        .map(StreamRecord::from))
}

pub async fn get_by_parent_and_name(
    pod: &str,
    parent_id: Option<i64>,
    name: &str,
) -> Result<Option<StreamRecord>> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    let mut query = Entity::find()
        .filter(Column::PodName.eq(pod))
        .filter(Column::Name.eq(name));
    query = match parent_id {
        Some(pid) => query.filter(Column::ParentId.eq(pid)),
        None => query.filter(Column::ParentId.is_null()),
    };
    Ok(query.one(client).await?.map(StreamRecord::from))
}

pub async fn list_children(pod: &str, parent_id: Option<i64>) -> Result<Vec<StreamRecord>> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    let mut query = Entity::find().filter(Column::PodName.eq(pod));
    query = match parent_id {
        Some(pid) => query.filter(Column::ParentId.eq(pid)),
        None => query.filter(Column::ParentId.is_null()),
    };
    Ok(query
        .order_by(Column::Id, Order::Asc)
        .all(client)
        .await?
        .into_iter()
        .map(StreamRecord::from)
        .collect())
}

/// Every stream at `path` or nested under it (`path/...`), ordered so that
/// ancestors precede descendants — the order `delete_subtree` relies on.
pub async fn list_subtree(pod: &str, path: &str) -> Result<Vec<StreamRecord>> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    let prefix = format!("{path}/%");
    let cond = Condition::any()
        .add(Column::Path.eq(path))
        .add(Column::Path.like(&prefix));
    Ok(Entity::find()
        .filter(Column::PodName.eq(pod))
        .filter(cond)
        .order_by(Column::Path, Order::Asc)
        .all(client)
        .await?
        .into_iter()
        .map(StreamRecord::from)
        .collect())
}

pub async fn delete_subtree(pod: &str, path: &str) -> Result<u64> {
    let _lock = get_lock().await;
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    let prefix = format!("{path}/%");
    let cond = Condition::any()
        .add(Column::Path.eq(path))
        .add(Column::Path.like(&prefix));
    let res = Entity::delete_many()
        .filter(Column::PodName.eq(pod))
        .filter(cond)
        .exec(client)
        .await?;
    Ok(res.rows_affected)
}

pub async fn set_has_schema(id: i64, has_schema: bool) -> Result<()> {
    let _lock = get_lock().await;
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Entity::update_many()
        .col_expr(Column::HasSchema, sea_orm::entity::prelude::Expr::value(has_schema))
        .filter(Column::Id.eq(id))
        .exec(client)
        .await?;
    Ok(())
}

pub async fn count_for_pod(pod: &str) -> Result<u64> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Ok(Entity::find().filter(Column::PodName.eq(pod)).count(client).await?)
}

pub async fn clear() -> Result<()> {
    let _lock = get_lock().await;
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    Entity::delete_many().exec(client).await?;
    Ok(())
}
