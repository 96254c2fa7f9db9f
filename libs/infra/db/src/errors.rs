use thiserror::Error;

/// Persistence error taxonomy. The Cell State Engine and dispatcher
/// decide retry vs. drop-session purely from which variant they see.
#[derive(Error, Debug)]
pub enum DbError {
    /// Write contention or a locked database file; retrying the single
    /// operation may succeed.
    #[error("transient persistence failure: {0}")]
    Transient(String),

    /// Another writer's change already won; the caller's view is stale.
    #[error("write conflict: {0}")]
    Conflict(String),

    /// Corruption, a missing schema, or an open failure. Not retryable.
    #[error("fatal persistence failure: {0}")]
    Fatal(String),
}

impl DbError {
    /// SQLite reports lock contention as `SQLITE_BUSY`/`SQLITE_LOCKED`;
    /// anything else surfaced by the driver is treated as fatal, since
    /// it usually means a schema or connection problem rather than
    /// something a retry can fix.
    pub fn classify(source: libsql::Error) -> Self {
        let message = source.to_string();
        let lowercase = message.to_lowercase();
        if lowercase.contains("database is locked") || lowercase.contains("busy") {
            DbError::Transient(message)
        } else if lowercase.contains("constraint") {
            DbError::Conflict(message)
        } else {
            DbError::Fatal(message)
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Transient(_))
    }
}

impl From<libsql::Error> for DbError {
    fn from(source: libsql::Error) -> Self {
        DbError::classify(source)
    }
}
