//! Shared SQLite connection PRAGMAs

use rusqlite::Connection;

/// Apply connection PRAGMAs (WAL journal, NORMAL sync, in-memory temp store)
///
/// In-memory databases silently keep `journal_mode=memory`.
pub fn apply_optimized_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    conn.pragma_update(None, "wal_autocheckpoint", 1000)?;
    Ok(())
}
