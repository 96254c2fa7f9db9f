//! Thin wrapper over a `libsql::Database` handle: one connection
//! checked out per repository call, relying on SQLite's own row-level
//! serialization for the concurrent-writer guarantee.

use crate::errors::DbError;
use crate::schema::apply_schema;
use libsql::{Builder, Connection, Database};
use std::sync::Arc;
use tracing::{error, info, instrument};

#[derive(Clone)]
pub struct DbClient {
    database: Arc<Database>,
    /// In `:memory:` mode SQLite drops the database once its last
    /// connection closes; holding one open here keeps the schema alive
    /// for every later `get_connection()` call.
    _memory_anchor: Option<Arc<Connection>>,
}

impl DbClient {
    #[instrument(skip(auth_token))]
    pub async fn connect(url: &str, auth_token: Option<String>) -> Result<Self, DbError> {
        if url.is_empty() {
            return Err(DbError::Fatal("DATABASE_URL is empty".into()));
        }

        info!(url, "opening database");

        let is_remote = url.starts_with("libsql://") || url.starts_with("https://");
        let is_memory = url.contains(":memory:") || url.contains("mode=memory");

        let database = if is_remote {
            let token = auth_token
                .ok_or_else(|| DbError::Fatal("remote database URL requires an auth token".into()))?;
            Builder::new_remote(url.to_string(), token).build().await
        } else {
            Builder::new_local(url).build().await
        }
        .map_err(|source| DbError::Fatal(format!("failed to open database: {source}")))?;

        let database = Arc::new(database);

        let memory_anchor = if is_memory {
            let anchor = database
                .connect()
                .map_err(|source| DbError::Fatal(format!("failed to anchor in-memory database: {source}")))?;
            apply_schema(&anchor)
                .await
                .map_err(|source| DbError::Fatal(format!("schema bootstrap failed: {source}")))?;
            Some(Arc::new(anchor))
        } else {
            let bootstrap = database
                .connect()
                .map_err(|source| DbError::Fatal(format!("failed to connect for bootstrap: {source}")))?;
            apply_schema(&bootstrap)
                .await
                .map_err(|source| DbError::Fatal(format!("schema bootstrap failed: {source}")))?;
            None
        };

        Ok(Self {
            database,
            _memory_anchor: memory_anchor,
        })
    }

    pub fn get_connection(&self) -> Result<Connection, DbError> {
        self.database.connect().map_err(|source| {
            error!(error = %source, "failed to check out a connection");
            DbError::Transient(source.to_string())
        })
    }
}
