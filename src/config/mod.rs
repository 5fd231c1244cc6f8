#[allow(clippy::module_inception)]
mod config;

pub use config::{
    ActivationSettings, BonusEntry, CohortSettings, CohortSource, ConversionSettings,
    DateCorrection, LoggingSettings, PostgresSettings, QueryErrorPolicy, Settings,
};
