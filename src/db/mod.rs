use log::info;

use crate::config::PostgresSettings;
use crate::error::AnalysisResult;

pub mod memory;
pub mod models;
pub mod postgres;
mod source;

pub use memory::MemorySource;
pub use postgres::PostgresClient;
pub use source::DataSource;

/// Database handle scoped to a single analysis run.
///
/// Owns the PostgreSQL pool for the lifetime of the run. The pool is closed
/// when the handle is dropped, so every exit path releases its connections.
pub struct Database {
    pub postgres: PostgresClient,
}

impl Database {
    pub async fn connect(settings: PostgresSettings) -> AnalysisResult<Self> {
        let postgres = PostgresClient::new(settings).await?;
        Ok(Self { postgres })
    }

    /// The data source analyses should query.
    pub fn source(&self) -> &dyn DataSource {
        &self.postgres
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.postgres.close();
        info!("Database handle released");
    }
}
