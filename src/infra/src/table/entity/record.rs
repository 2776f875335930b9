use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "record")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub stream_id: i64,
    pub idx: i64,
    pub name: String,
    pub path: String,
    #[sea_orm(column_type = "Blob")]
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

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
