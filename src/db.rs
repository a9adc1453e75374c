//! SQLite persistence for recognized text.
//!
//! One table, one required text column. Every successful recognition writes
//! exactly one row; failed recognitions write nothing.

use crate::error::AppError;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// One stored recognition result
#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct Analysis {
    pub id: String,
    pub text: String,
    pub created_at: String,
}

/// Create a SqlitePool with WAL mode and common settings
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AppError::Internal(format!("Invalid database URL: {}", e)))?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;

    tracing::debug!("database pool created");
    Ok(pool)
}

/// Apply the schema. Idempotent, runs at startup.
pub async fn migrate(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            id TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Repository over the analyses table
#[derive(Clone)]
pub struct AnalysisStore {
    pool: SqlitePool,
}

impl AnalysisStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn insert(&self, text: &str) -> Result<Analysis, AppError> {
        let analysis = Analysis {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };

        sqlx::query("INSERT INTO analyses (id, text, created_at) VALUES (?1, ?2, ?3)")
            .bind(&analysis.id)
            .bind(&analysis.text)
            .bind(&analysis.created_at)
            .execute(&self.pool)
            .await?;

        tracing::debug!(id = %analysis.id, "analysis stored");
        Ok(analysis)
    }

    pub async fn list_recent(&self, limit: u32) -> Result<Vec<Analysis>, AppError> {
        let rows = sqlx::query_as(
            r#"
            SELECT id, text, created_at FROM analyses
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analyses")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> AnalysisStore {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        migrate(&pool).await.unwrap();
        AnalysisStore::new(pool)
    }

    #[tokio::test]
    async fn insert_returns_row_with_id_and_timestamp() {
        let store = test_store().await;

        let analysis = store.insert("Hello World").await.unwrap();

        assert!(!analysis.id.is_empty());
        assert_eq!(analysis.text, "Hello World");
        assert!(!analysis.created_at.is_empty());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_recent_returns_newest_first() {
        let store = test_store().await;

        store.insert("first").await.unwrap();
        store.insert("second").await.unwrap();
        store.insert("third").await.unwrap();

        let rows = store.list_recent(2).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text, "third");
        assert_eq!(rows[1].text, "second");
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        migrate(&pool).await.unwrap();
        migrate(&pool).await.unwrap();

        let store = AnalysisStore::new(pool);
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
