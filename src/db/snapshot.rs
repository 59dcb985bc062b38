//! Transactional snapshots of in-memory state.
//!
//! Every function here is one logical unit of durability: a memory batch, a
//! Q-table batch, one path's chunk set, or one config key. Each runs inside a
//! single transaction, so a crash mid-write leaves either the old state or the
//! new state on disk — never a torn mix.

use rusqlite::{params, Connection};

use super::{bytes_to_vector, vector_to_bytes};
use crate::error::Result;
use crate::indexer::index::ChunkRecord;
use crate::memory::types::{Memory, MemoryType};

/// Persisted Q-table row: (state, action, value, visits).
pub type QRow = (String, String, f64, u32);

/// Per-file bookkeeping used for unchanged-file detection.
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub path: String,
    pub hash: String,
    pub mtime: i64,
    pub chunk_count: u32,
}

// ── Memories ─────────────────────────────────────────────────────────────────

/// Persist a single memory (one insert = one transaction).
pub fn save_memory(conn: &Connection, memory: &Memory) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO memories \
         (id, content, vector, type, importance, created_at, last_accessed, access_count) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            memory.id,
            memory.content,
            vector_to_bytes(&memory.embedding),
            memory.memory_type.as_str(),
            memory.importance,
            memory.created_at,
            memory.last_accessed,
            memory.access_count,
        ],
    )?;
    Ok(())
}

/// Persist a batch of memories in one transaction.
pub fn save_memories(conn: &mut Connection, memories: &[Memory]) -> Result<()> {
    let tx = conn.transaction()?;
    for memory in memories {
        tx.execute(
            "INSERT OR REPLACE INTO memories \
             (id, content, vector, type, importance, created_at, last_accessed, access_count) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                memory.id,
                memory.content,
                vector_to_bytes(&memory.embedding),
                memory.memory_type.as_str(),
                memory.importance,
                memory.created_at,
                memory.last_accessed,
                memory.access_count,
            ],
        )?;
    }
    tx.commit()?;
    Ok(())
}

pub fn load_memories(conn: &Connection) -> Result<Vec<Memory>> {
    let mut stmt = conn.prepare(
        "SELECT id, content, vector, type, importance, created_at, last_accessed, access_count \
         FROM memories",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let vector_bytes: Vec<u8> = row.get(2)?;
            let type_str: String = row.get(3)?;
            Ok(Memory {
                id: row.get(0)?,
                content: row.get(1)?,
                embedding: bytes_to_vector(&vector_bytes),
                memory_type: type_str.parse().unwrap_or(MemoryType::Semantic),
                importance: row.get(4)?,
                created_at: row.get(5)?,
                last_accessed: row.get(6)?,
                access_count: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn delete_memory(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
    Ok(())
}

// ── Q-table ──────────────────────────────────────────────────────────────────

/// Persist the whole Q-table in one transaction, replacing the prior snapshot.
pub fn save_q_table(conn: &mut Connection, rows: &[QRow]) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM q_table", [])?;
    for (state, action, value, visits) in rows {
        tx.execute(
            "INSERT INTO q_table (state, action, value, visits) VALUES (?1, ?2, ?3, ?4)",
            params![state, action, value, visits],
        )?;
    }
    tx.commit()?;
    Ok(())
}

pub fn load_q_table(conn: &Connection) -> Result<Vec<QRow>> {
    let mut stmt = conn.prepare("SELECT state, action, value, visits FROM q_table")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── File chunks ──────────────────────────────────────────────────────────────

/// Atomically replace one path's chunk set and its bookkeeping row.
pub fn replace_chunks(
    conn: &mut Connection,
    path: &str,
    chunks: &[ChunkRecord],
    hash: &str,
    mtime: i64,
) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM file_chunks WHERE path = ?1", params![path])?;
    for chunk in chunks {
        tx.execute(
            "INSERT INTO file_chunks (path, chunk_index, content, vector, file_type, mtime) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                chunk.path,
                chunk.chunk_index,
                chunk.text,
                vector_to_bytes(&chunk.embedding),
                chunk.file_type,
                chunk.mtime,
            ],
        )?;
    }
    tx.execute(
        "INSERT OR REPLACE INTO indexed_files (path, hash, mtime, chunk_count) \
         VALUES (?1, ?2, ?3, ?4)",
        params![path, hash, mtime, chunks.len() as u32],
    )?;
    tx.commit()?;
    Ok(())
}

/// Remove a deleted path's chunks and bookkeeping in one transaction.
pub fn delete_path(conn: &mut Connection, path: &str) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM file_chunks WHERE path = ?1", params![path])?;
    tx.execute("DELETE FROM indexed_files WHERE path = ?1", params![path])?;
    tx.commit()?;
    Ok(())
}

pub fn load_chunks(conn: &Connection) -> Result<Vec<ChunkRecord>> {
    let mut stmt = conn.prepare(
        "SELECT path, chunk_index, content, vector, file_type, mtime FROM file_chunks",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let vector_bytes: Vec<u8> = row.get(3)?;
            Ok(ChunkRecord {
                path: row.get(0)?,
                chunk_index: row.get(1)?,
                text: row.get(2)?,
                embedding: bytes_to_vector(&vector_bytes),
                file_type: row.get(4)?,
                mtime: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn load_file_meta(conn: &Connection) -> Result<Vec<FileMeta>> {
    let mut stmt = conn.prepare("SELECT path, hash, mtime, chunk_count FROM indexed_files")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(FileMeta {
                path: row.get(0)?,
                hash: row.get(1)?,
                mtime: row.get(2)?,
                chunk_count: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Config ───────────────────────────────────────────────────────────────────

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>> {
    use rusqlite::OptionalExtension;
    let value = conn
        .query_row(
            "SELECT value FROM config WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::memory::types::MemoryType;

    fn sample_memory(id: &str) -> Memory {
        Memory {
            id: id.to_string(),
            content: format!("content for {id}"),
            embedding: vec![0.5, -0.5, 0.25, 0.0],
            memory_type: MemoryType::Episodic,
            importance: 0.7,
            created_at: 1_000,
            last_accessed: 1_000,
            access_count: 2,
        }
    }

    #[test]
    fn memory_round_trip() {
        let mut conn = open_memory_database().unwrap();
        save_memories(&mut conn, &[sample_memory("a"), sample_memory("b")]).unwrap();

        let loaded = load_memories(&conn).unwrap();
        assert_eq!(loaded.len(), 2);
        let a = loaded.iter().find(|m| m.id == "a").unwrap();
        assert_eq!(a.memory_type, MemoryType::Episodic);
        assert_eq!(a.embedding, vec![0.5, -0.5, 0.25, 0.0]);
        assert_eq!(a.access_count, 2);
    }

    #[test]
    fn q_table_round_trip() {
        let mut conn = open_memory_database().unwrap();
        let rows = vec![
            ("c1.r0.h2".to_string(), "memory_only".to_string(), 0.4, 3u32),
            ("c1.r0.h2".to_string(), "blend_ai".to_string(), -0.1, 1u32),
        ];
        save_q_table(&mut conn, &rows).unwrap();

        let mut loaded = load_q_table(&conn).unwrap();
        loaded.sort_by(|a, b| a.1.cmp(&b.1));
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].1, "memory_only");
        assert_eq!(loaded[1].3, 3);
    }

    #[test]
    fn replace_chunks_is_atomic_per_path() {
        let mut conn = open_memory_database().unwrap();
        let chunk = |i: u32| ChunkRecord {
            path: "/tmp/a.txt".into(),
            chunk_index: i,
            text: format!("chunk {i}"),
            embedding: vec![1.0, 0.0],
            file_type: "txt".into(),
            mtime: 10,
        };

        replace_chunks(&mut conn, "/tmp/a.txt", &[chunk(0), chunk(1), chunk(2)], "h1", 10)
            .unwrap();
        replace_chunks(&mut conn, "/tmp/a.txt", &[chunk(0)], "h2", 11).unwrap();

        let loaded = load_chunks(&conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].chunk_index, 0);

        let meta = load_file_meta(&conn).unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].hash, "h2");
        assert_eq!(meta[0].chunk_count, 1);
    }

    #[test]
    fn config_round_trip() {
        let conn = open_memory_database().unwrap();
        set_config(&conn, "last_scan", "12345").unwrap();
        assert_eq!(get_config(&conn, "last_scan").unwrap().as_deref(), Some("12345"));
        assert_eq!(get_config(&conn, "missing").unwrap(), None);
    }
}
