//! Database connection - one live handle per instance

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::ConnectionConfig;
use crate::{Error, Result};

/// Owns exactly one live database handle.
///
/// The handle is opened once in [`Connection::open`] and stays open until the
/// `Connection` is dropped. Statements on one connection are serialized.
pub struct Connection {
    conn: Mutex<rusqlite::Connection>,
    database: String,
    host: String,
    user: String,
}

impl Connection {
    /// Open the database named by `config`
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        let opened = if config.is_in_memory() {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&config.database)
        };

        let conn = opened.and_then(|conn| {
            conn.pragma_update(None, "encoding", "UTF-8")?;
            Ok(conn)
        });

        match conn {
            Ok(conn) => {
                tracing::debug!(
                    database = %config.database,
                    host = %config.host,
                    user = %config.user,
                    "opened database connection"
                );
                Ok(Self {
                    conn: Mutex::new(conn),
                    database: config.database.clone(),
                    host: config.host.clone(),
                    user: config.user.clone(),
                })
            }
            Err(e) => {
                tracing::error!("Failed to connect to database {}: {}", config.database, e);
                Err(Error::Connection(e))
            }
        }
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&ConnectionConfig::in_memory())
    }

    /// The live driver handle, held exclusively while the guard lives
    pub fn handle(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name of the database this connection is bound to
    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("database", &self.database)
            .field("host", &self.host)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}
