use std::path::Path;
use std::time::Duration;

use log::info;
use sqlx::{SqlitePool, sqlite::*};

pub mod crud;
pub mod model;
mod store;

pub use model::*;
pub use store::*;

pub type Database = SqlitePool;

/// 获取连接的超时时间，数据库不可用时尽快失败
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(3);

/// 创建连接池，连接在第一次使用时才会真正建立
pub fn connect_db(filename: impl AsRef<Path>) -> Database {
    let filename = filename.as_ref();
    info!("初始化数据库连接: {}", filename.display());

    let options = SqliteConnectOptions::new()
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .filename(filename)
        .create_if_missing(true);

    SqlitePoolOptions::new().acquire_timeout(ACQUIRE_TIMEOUT).connect_lazy_with(options)
}

/// 执行数据库迁移
pub async fn migrate(pool: &Database) -> Result<(), sqlx::migrate::MigrateError> {
    info!("检查数据库迁移");
    sqlx::migrate!().run(pool).await
}
