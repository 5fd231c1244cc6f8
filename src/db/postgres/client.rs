use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use log::{error, info};
use tokio_postgres::NoTls;

use crate::config::PostgresSettings;
use crate::error::{AnalysisError, AnalysisResult};

/// PostgreSQL client with connection pooling.
///
/// Every query checks a client out of the pool and returns it when the
/// query finishes, including on error. Uses `deadpool-postgres` for
/// connection management.
#[derive(Clone)]
pub struct PostgresClient {
    pub pool: Pool,
}

impl PostgresClient {
    /// Builds the pool and opens one connection to verify the settings.
    ///
    /// Connection failures are reported once and never retried.
    pub async fn new(settings: PostgresSettings) -> AnalysisResult<Self> {
        info!(
            "Connecting to PostgreSQL at {}:{}/{}",
            settings.host, settings.port, settings.database
        );

        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&settings.host)
            .port(settings.port)
            .user(&settings.user)
            .password(&settings.password)
            .dbname(&settings.database);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
        let pool = Pool::builder(mgr)
            .max_size(settings.pool_size)
            .build()
            .map_err(|e| {
                AnalysisError::Connection(format!("Failed to create PostgreSQL connection pool: {e}"))
            })?;

        // Test the connection
        match pool.get().await {
            Ok(_conn) => {
                info!("Successfully connected to PostgreSQL");
                Ok(Self { pool })
            },
            Err(e) => {
                error!("Failed to connect to PostgreSQL: {}", e);
                pool.close();
                Err(AnalysisError::Connection(e.to_string()))
            },
        }
    }

    /// Closes the pool; idle connections are dropped and no new ones are opened.
    pub fn close(&self) {
        if !self.pool.is_closed() {
            info!("Closing PostgreSQL connection pool");
            self.pool.close();
        }
    }
}
