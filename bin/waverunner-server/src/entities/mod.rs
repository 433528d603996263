//! Database abstraction layer.
//!
//! [`WaveStore`] defines the interface for persisting download records.
//! The default implementation is [`SqliteStore`]. Handlers only see the
//! store through [`crate::state::AppState`], so tests can point it at a
//! throwaway database file.
//!
//! All trait methods use `impl Future` in their signatures so no extra
//! `async-trait` crate is required here.

pub mod dao;
pub mod wave;

pub use dao::{NewWave, WaveRecord, WaveStatus};
pub use wave::WaveStore;

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// SQLite-backed wave store.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g.
    /// `"sqlite://waverunner.db"`.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;
        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}
