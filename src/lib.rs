pub mod analysis;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod presentation;

pub use analysis::{AnalysisKind, Report};
pub use config::Settings;
pub use db::{DataSource, Database, MemorySource};
pub use error::{AnalysisError, AnalysisResult, ErrorKind};
