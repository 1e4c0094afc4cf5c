use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;

use super::{Collection, StorageError};

/// Durable-table backend: one Postgres table per collection holding
/// `(key, value JSONB)` rows. Each put is a single upsert statement.
#[derive(Clone)]
pub struct PgCollection {
    pool: PgPool,
    table: String,
}

impl PgCollection {
    /// Binds to `table`, creating it if absent. Table names cannot be bound
    /// as query parameters, so only `[a-z_]` identifiers are accepted.
    pub async fn open(pool: PgPool, table: &str) -> Result<Self, StorageError> {
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
            return Err(StorageError::Unavailable(format!(
                "invalid table name '{table}'"
            )));
        }

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                key TEXT PRIMARY KEY,
                value JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#
        ))
        .execute(&pool)
        .await?;

        info!("Table '{table}' ready");
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }
}

#[async_trait]
impl Collection for PgCollection {
    fn name(&self) -> &str {
        &self.table
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(
            sqlx::query_scalar::<_, Value>(&format!(
                "SELECT value FROM {} WHERE key = $1",
                self.table
            ))
            .bind(key)
            .fetch_optional(&self.pool)
            .await?,
        )
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StorageError> {
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (key, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
            "#,
            self.table
        ))
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE key = $1", self.table))
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Value)>, StorageError> {
        Ok(sqlx::query_as::<_, (String, Value)>(&scan_sql(&self.table))
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?)
    }
}

/// left() instead of LIKE: keys contain '_', a LIKE wildcard. The "C"
/// collation orders keys bytewise, the same as the other backends.
fn scan_sql(table: &str) -> String {
    format!(
        r#"SELECT key, value FROM {table} WHERE left(key, char_length($1)) = $1 ORDER BY key COLLATE "C""#
    )
}
