//! C4 connection layer: a single write connection plus a small pool of
//! read-only connections, all against the same WAL-mode database file.
//! No code outside this module touches a raw `&Connection`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};

use crate::errors::storage_error::sqe;
use crate::errors::StorageError;

use super::migrations;

const READER_POOL_SIZE: usize = 4;

pub struct StorageEngine {
    path: Option<PathBuf>,
    writer: Mutex<Connection>,
    readers: Mutex<Vec<Connection>>,
}

impl StorageEngine {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::CheckpointIo(e.to_string()))?;
        }

        let writer = Connection::open(path)?;
        apply_pragmas(&writer)?;
        migrations::run_migrations(&writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let reader = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
            )?;
            readers.push(reader);
        }

        Ok(Self {
            path: Some(path.to_path_buf()),
            writer: Mutex::new(writer),
            readers: Mutex::new(readers),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let writer = Connection::open_in_memory()?;
        migrations::run_migrations(&writer)?;
        Ok(Self {
            path: None,
            writer: Mutex::new(writer),
            readers: Mutex::new(Vec::new()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Runs `f` against the single write connection, serialized behind a
    /// mutex. The single-threaded pipeline model (§5) means contention here
    /// is rare; the mutex exists for correctness, not throughput.
    pub fn with_writer<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self.writer.lock().map_err(|_| sqe("writer mutex poisoned"))?;
        f(&conn)
    }

    /// Borrows a connection from the reader pool, falling back to the writer
    /// connection for in-memory databases (which have no reader pool).
    pub fn with_reader<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let mut pool = self.readers.lock().map_err(|_| sqe("reader pool poisoned"))?;
        match pool.pop() {
            Some(conn) => {
                let result = f(&conn);
                pool.push(conn);
                result
            }
            None => self.with_writer(f),
        }
    }
}

fn apply_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.pragma_update(None, "journal_mode", "WAL").map_err(sqe)?;
    conn.pragma_update(None, "synchronous", "NORMAL").map_err(sqe)?;
    conn.pragma_update(None, "foreign_keys", "ON").map_err(sqe)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_engine_runs_migrations() {
        let engine = StorageEngine::open_in_memory().unwrap();
        let version = engine
            .with_reader(|conn| migrations::current_version(conn))
            .unwrap();
        assert_eq!(version, migrations::LATEST_VERSION);
    }
}
