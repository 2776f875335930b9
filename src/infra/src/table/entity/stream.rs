use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stream")]
pub struct Model {
    #[sea_orm(primary_key)]
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

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
