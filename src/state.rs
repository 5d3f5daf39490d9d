use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::Connection;

use crate::auth::JwtKeys;
use crate::config::AppConfig;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig) -> Self {
        let jwt = JwtKeys::new(&config.jwt);
        Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            jwt,
        }
    }

    /// The single connection doubles as the write lock for booking.
    ///
    /// A poisoned lock is recovered: every write runs in a transaction that
    /// rolls back when dropped during unwinding, so the connection is consistent.
    pub fn db(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            tracing::error!("database mutex was poisoned by a panicking request; recovering");
            poisoned.into_inner()
        })
    }
}
