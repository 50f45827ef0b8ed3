use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;

pub fn save_checkpoint(conn: &Connection, session_id: &str, state_json: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO conversation_checkpoints (session_id, state_json, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(session_id) DO UPDATE SET state_json = excluded.state_json,
                                               updated_at = excluded.updated_at",
        params![session_id, state_json],
    )?;
    Ok(())
}

pub fn load_checkpoint(conn: &Connection, session_id: &str) -> Result<Option<String>, DatabaseError> {
    let json = conn
        .query_row(
            "SELECT state_json FROM conversation_checkpoints WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(json)
}

pub fn delete_checkpoint(conn: &Connection, session_id: &str) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM conversation_checkpoints WHERE session_id = ?1",
        params![session_id],
    )?;
    Ok(deleted > 0)
}
