use sqlx::{
    Row,
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use tracing::info;

use crate::{
    config::{DatabaseConfig, StorageMode},
    error::StoreError,
};

/// Key-value tables backed by SQLite.
pub struct KvStore {
    pool: SqlitePool,
    tables: Vec<String>,
}

impl KvStore {
    pub async fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        if config.security_key.expose().is_empty() {
            return Err(StoreError::EmptySecurityKey);
        }
        if let Some(bad) = config.tables.iter().find(|t| !valid_table_name(t)) {
            return Err(StoreError::InvalidTable(bad.clone()));
        }

        let pool = match config.mode {
            StorageMode::File => SqlitePool::connect(&config.backend_url).await?,
            // A single connection, otherwise every pooled connection gets its own memory db.
            StorageMode::Memory => {
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect("sqlite::memory:")
                    .await?
            }
        };

        let mut conn = pool.acquire().await?;
        for table in &config.tables {
            sqlx::query(&format!(
                r#"CREATE TABLE IF NOT EXISTS "{table}" (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL)"#
            ))
            .execute(&mut *conn)
            .await?;
        }
        drop(conn);
        info!("{:?} store ready with tables {:?}", config.engine, config.tables);

        Ok(KvStore {
            pool,
            tables: config.tables.clone(),
        })
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    fn table<'a>(&self, table: &'a str) -> Result<&'a str, StoreError> {
        if self.tables.iter().any(|t| t == table) {
            Ok(table)
        } else {
            Err(StoreError::UnknownTable(table.to_owned()))
        }
    }

    pub async fn get(&self, table: &str, key: &str) -> Result<Option<String>, StoreError> {
        let table = self.table(table)?;
        let row = sqlx::query(&format!(r#"SELECT value FROM "{table}" WHERE key = ?1"#))
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    pub async fn set(&self, table: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let table = self.table(table)?;
        sqlx::query(&format!(
            r#"INSERT INTO "{table}" (key, value) VALUES (?1, ?2)
               ON CONFLICT(key) DO UPDATE SET value = excluded.value"#
        ))
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn valid_table_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
