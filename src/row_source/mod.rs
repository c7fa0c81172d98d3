//! Row source - the relational store that seeds the pipeline
//!
//! ```text
//! ensure_schema()  →  CREATE TABLE IF NOT EXISTS numbers + DELETE
//! bulk_insert()    →  single transaction, rollback on failure
//! fetch_all()      →  SELECT num ORDER BY id
//! ```

pub mod backend;
pub mod sqlite;

pub use backend::RowSource;
pub use sqlite::SqliteRowSource;
