/*!
 * Translation-memory store connection.
 *
 * One SQLite connection shared behind a mutex. Synchronous access serves the
 * export path, which already runs on a blocking thread; async callers go
 * through `spawn_blocking` so the runtime is never stalled on SQLite.
 */

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use rusqlite::{Connection, Transaction};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::schema;

const STORE_DIRNAME: &str = "tmxstream";
const STORE_FILENAME: &str = "tmxstream.db";

/// Shared handle to the translation-memory store
#[derive(Clone)]
pub struct DatabaseConnection {
    /// File backing the store; `None` for an in-memory store
    file: Option<PathBuf>,
    connection: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open the store in the user's local data directory
    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Open (creating if needed) the store at `db_path` and bring its schema up to date
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory: {:?}", parent))?;
        }

        info!("Opening translation memory store at {:?}", db_path);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open translation memory store: {:?}", db_path))?;

        Self::with_schema(conn, Some(db_path))
    }

    /// Store that lives only as long as this handle and its clones
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory translation memory store");
        let conn = Connection::open_in_memory().context("Failed to create in-memory store")?;
        Self::with_schema(conn, None)
    }

    fn with_schema(conn: Connection, file: Option<PathBuf>) -> Result<Self> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            file,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// `<local data dir>/tmxstream/tmxstream.db`
    pub fn default_database_path() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(base_dir.join(STORE_DIRNAME).join(STORE_FILENAME))
    }

    /// File backing the store, if any
    pub fn path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    fn lock(connection: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
        connection
            .lock()
            .map_err(|e| anyhow!("Translation memory store lock poisoned: {}", e))
    }

    /// Run `f` on the calling thread while holding the connection
    pub fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = Self::lock(&self.connection)?;
        f(&conn)
    }

    /// Run `f` on the blocking pool while holding the connection
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let conn = Self::lock(&connection)?;
            f(&conn)
        })
        .await
        .context("Store task panicked")?
    }

    /// Run `f` in a transaction on the blocking pool; it commits only when `f` succeeds
    pub async fn transaction_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let mut conn = Self::lock(&connection)?;
            let tx = conn.transaction()?;
            let result = f(&tx)?;
            tx.commit()?;
            Ok(result)
        })
        .await
        .context("Store transaction task panicked")?
    }

    /// Row counts and file size of the store
    pub fn stats(&self) -> Result<DatabaseStats> {
        let (trans_memory_count, unit_count, variant_count) = self.execute(|conn| {
            conn.query_row(
                "SELECT (SELECT COUNT(*) FROM trans_memories),
                        (SELECT COUNT(*) FROM tm_translation_units),
                        (SELECT COUNT(*) FROM tm_trans_unit_variants)",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?)),
            )
            .context("Failed to count stored translation memory rows")
        })?;

        let file_size_bytes = match &self.file {
            Some(path) => std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            None => 0,
        };

        Ok(DatabaseStats {
            trans_memory_count,
            unit_count,
            variant_count,
            file_size_bytes,
        })
    }
}

/// Snapshot of the store's size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    pub trans_memory_count: i64,
    pub unit_count: i64,
    pub variant_count: i64,
    /// Zero for in-memory stores
    pub file_size_bytes: u64,
}

impl fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} translation memories, {} units, {} variants, {} KB on disk",
            self.trans_memory_count,
            self.unit_count,
            self.variant_count,
            self.file_size_bytes / 1024
        )
    }
}
