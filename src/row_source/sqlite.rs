use crate::error::PipelineError;
use crate::row_source::backend::RowSource;
use crate::sqlite_pragma::apply_optimized_pragmas;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;

pub struct SqliteRowSource {
    conn: Connection,
}

impl SqliteRowSource {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PipelineError::Source(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let conn = Connection::open(db_path.as_ref())?;
        apply_optimized_pragmas(&conn)?;

        log::info!("✅ SQLite row source opened: {}", db_path.as_ref().display());

        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, PipelineError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    fn create_table(&self) -> Result<(), PipelineError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS numbers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                num INTEGER NOT NULL
            );
            DELETE FROM numbers;",
        )?;

        log::info!("📋 Table 'numbers' ready (previous rows cleared)");
        Ok(())
    }

    fn insert_all(&mut self, values: &[i64]) -> Result<(), PipelineError> {
        // Dropping an uncommitted transaction rolls it back
        let tx = self.conn.transaction()?;

        {
            let mut stmt = tx.prepare_cached("INSERT INTO numbers (num) VALUES (?1)")?;
            for value in values {
                stmt.execute(params![value])?;
            }
        }

        tx.commit()?;

        log::debug!("✅ Inserted {} rows into 'numbers'", values.len());
        Ok(())
    }

    fn select_all(&self) -> Result<Vec<i64>, PipelineError> {
        let mut stmt = self.conn.prepare("SELECT num FROM numbers ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;

        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }

        log::debug!("📥 Fetched {} rows from 'numbers'", values.len());
        Ok(values)
    }
}

#[async_trait]
impl RowSource for SqliteRowSource {
    async fn ensure_schema(&mut self) -> Result<(), PipelineError> {
        self.create_table()
    }

    async fn bulk_insert(&mut self, values: &[i64]) -> Result<(), PipelineError> {
        self.insert_all(values).map_err(|e| {
            log::warn!("↩️  Transaction rolled back: {}", e);
            e
        })
    }

    async fn fetch_all(&mut self) -> Result<Vec<i64>, PipelineError> {
        self.select_all()
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_insert_and_fetch_in_creation_order() {
        let dir = tempdir().unwrap();
        let mut source = SqliteRowSource::open(dir.path().join("test.db")).unwrap();

        source.ensure_schema().await.unwrap();
        source.bulk_insert(&[3, 1, 2]).await.unwrap();

        assert_eq!(source.fetch_all().await.unwrap(), vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_ensure_schema_clears_previous_rows() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let mut source = SqliteRowSource::open(&db_path).unwrap();
        source.ensure_schema().await.unwrap();
        source.bulk_insert(&[1, 2, 3]).await.unwrap();

        // Second run against the same file
        let mut source = SqliteRowSource::open(&db_path).unwrap();
        source.ensure_schema().await.unwrap();
        assert!(source.fetch_all().await.unwrap().is_empty());

        source.bulk_insert(&[7]).await.unwrap();
        assert_eq!(source.fetch_all().await.unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back_everything() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let mut source = SqliteRowSource::open(&db_path).unwrap();
        source.ensure_schema().await.unwrap();

        // Abort on the 7th value from a second connection
        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_seven BEFORE INSERT ON numbers
             WHEN NEW.num = 7
             BEGIN SELECT RAISE(ABORT, 'seven rejected'); END;",
        )
        .unwrap();
        drop(conn);

        let values: Vec<i64> = (1..=10).collect();
        let err = source.bulk_insert(&values).await.unwrap_err();
        assert!(matches!(err, PipelineError::Source(_)));

        assert!(source.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_insert() {
        let mut source = SqliteRowSource::open_in_memory().unwrap();
        source.ensure_schema().await.unwrap();
        source.bulk_insert(&[]).await.unwrap();

        assert!(source.fetch_all().await.unwrap().is_empty());
        assert_eq!(source.backend_type(), "SQLite");
    }
}
