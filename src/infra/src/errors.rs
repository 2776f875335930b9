use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("sea-orm error: {0}")]
    SeaORMError(String),
    #[error("record not found")]
    NotFound,
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("db error: {0}")]
    DbError(#[from] DbError),
    #[error("storage error: {0}")]
    StorageError(String),
    #[error("cache error: {0}")]
    CacheError(String),
    #[error("{0}")]
    Message(String),
}

impl From<sea_orm::DbErr> for Error {
    fn from(e: sea_orm::DbErr) -> Self {
        Error::DbError(DbError::SeaORMError(e.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
