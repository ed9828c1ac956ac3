use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::Mutex;

use crate::db::migration_runner::MigrationRunner;

pub struct Database {
    pub conn: Mutex<Connection>,
}

impl Database {
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        // WAL keeps readers unblocked while the refresher writes
        conn.pragma_update(None, "journal_mode", "WAL")?;

        log::info!("Opening rate cache database at {}", db_path.display());
        Self::migrate(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::migrate(Connection::open_in_memory()?)
    }

    fn migrate(conn: Connection) -> Result<Self> {
        let runner = MigrationRunner::new();

        let applied = runner.run_pending_migrations(&conn)?;
        if applied > 0 {
            log::info!("Applied {} migrations successfully", applied);
        } else {
            log::debug!("Database schema is up to date");
        }

        runner.verify_migrations(&conn)?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }
}
