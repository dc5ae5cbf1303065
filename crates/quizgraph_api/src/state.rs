//! Shared request state and the blocking bridge into the record store.
//!
//! # Invariants
//! - One SQLite connection per process, used by one request at a time.
//! - Store work never runs on an async worker thread.

use log::{debug, error};
use quizgraph_core::{QueryError, QueryFacade, QueryResult, SqliteRecordStore};
use rusqlite::Connection;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Failure of one request's store work.
#[derive(Debug)]
pub(crate) enum ApiError {
    /// Query-level outcome; handlers map some of these to sentinels.
    Query(QueryError),
    /// Lock, runtime or bootstrap failure.
    Internal(String),
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query(err) => write!(f, "{err}"),
            Self::Internal(message) => f.write_str(message),
        }
    }
}

/// Cloneable handle given to every handler.
#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Wraps an already bootstrapped connection (see `quizgraph_core::db::open_db`).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `op` against a fresh query facade on the blocking pool.
    pub(crate) async fn query<T, F>(&self, route: &'static str, op: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&QueryFacade<SqliteRecordStore<'_>>) -> QueryResult<T> + Send + 'static,
    {
        let started_at = Instant::now();
        let conn = Arc::clone(&self.conn);
        let result = tokio::task::spawn_blocking(move || -> Result<T, ApiError> {
            let conn = conn
                .lock()
                .map_err(|_| ApiError::Internal("connection lock poisoned".to_string()))?;
            let store = SqliteRecordStore::try_new(&conn)
                .map_err(|err| ApiError::Query(QueryError::Store(err)))?;
            op(&QueryFacade::new(store)).map_err(ApiError::Query)
        })
        .await
        .unwrap_or_else(|err| Err(ApiError::Internal(format!("blocking task failed: {err}"))));

        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(_) => debug!("event=http_request module=api status=ok route={route} duration_ms={duration_ms}"),
            Err(ApiError::Query(
                QueryError::NotFound { .. } | QueryError::OutOfBounds { .. } | QueryError::NoCompleteQuiz,
            )) => debug!("event=http_request module=api status=miss route={route} duration_ms={duration_ms}"),
            Err(err) => error!(
                "event=http_request module=api status=error route={route} duration_ms={duration_ms} error={err}"
            ),
        }
        result
    }
}
