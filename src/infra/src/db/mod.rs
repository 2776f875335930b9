use once_cell::sync::OnceCell;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tokio::sync::Mutex;

use crate::errors::{Error, Result};

pub static ORM_CLIENT: OnceCell<DatabaseConnection> = OnceCell::const_new();

/// Serializes writes against a single-writer backend (sqlite). Postgres/mysql
/// deployments rely on row-level locking instead and do not need this, but
/// taking it unconditionally keeps a single code path for both.
static WRITE_LOCK: Mutex<()> = Mutex::const_new(());

pub async fn connect_to_orm() -> DatabaseConnection {
    let cfg = config::get_config();
    let mut opts = ConnectOptions::new(cfg.db.url.clone());
    // An in-memory sqlite database lives only as long as its connection, so a
    // pool of more than one would give each caller a different empty
    // database. Pin the pool to a single connection in that case.
    if cfg.db.url.contains(":memory:") {
        opts.max_connections(1);
    } else {
        opts.max_connections(cfg.db.max_connections);
    }
    Database::connect(opts)
        .await
        .expect("failed to connect to database")
}

pub async fn get_lock() -> tokio::sync::MutexGuard<'static, ()> {
    WRITE_LOCK.lock().await
}

pub async fn init() -> Result<()> {
    ORM_CLIENT.get_or_init(connect_to_orm).await;
    crate::table::pods::create_table().await?;
    crate::table::streams::create_table().await?;
    crate::table::records::create_table().await?;
    crate::table::rate_limits::create_table().await?;
    Ok(())
}

pub async fn health_check() -> Result<()> {
    let client = ORM_CLIENT.get_or_init(connect_to_orm).await;
    use sea_orm::ConnectionTrait;
    client
        .execute_unprepared("SELECT 1")
        .await
        .map_err(Error::from)?;
    Ok(())
}

/// Test-only: drops and recreates all tables. Gated at the call site by the
/// `testing` config flag, never wired to a production route.
pub async fn reset_all() -> Result<()> {
    crate::table::records::clear().await?;
    crate::table::streams::clear().await?;
    crate::table::pods::clear().await?;
    crate::table::rate_limits::clear().await?;
    Ok(())
}
