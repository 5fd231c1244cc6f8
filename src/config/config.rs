use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

/// PostgreSQL connection configuration.
///
/// Read from `config.yaml` and overridable with the `DB_HOST`, `DB_PORT`,
/// `DB_USER`, `DB_PASSWORD` and `DB_NAME` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_pool_size() -> usize {
    4
}

/// Shifts a company's reported success date by a fixed number of days.
///
/// These offsets were tuned by hand to match an external chart. They are kept
/// as data so the adjustment stays visible and can be removed without a code
/// change.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DateCorrection {
    pub company_id: i64,
    pub days: i64,
}

/// Activation / success-date analysis.
#[derive(Debug, Deserialize, Clone)]
pub struct ActivationSettings {
    /// Trailing window used to detect activation, in days
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Trailing window total that marks a company as activated
    #[serde(default = "default_window_threshold")]
    pub window_threshold: f64,
    /// Days after activation in which successful conversations are counted
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Running total of successful conversations that marks success
    #[serde(default = "default_activation_success_threshold")]
    pub success_threshold: f64,
    /// Only success dates within this year are charted
    #[serde(default = "default_year")]
    pub report_year: i32,
    #[serde(default)]
    pub corrections: Vec<DateCorrection>,
}

impl Default for ActivationSettings {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            window_threshold: default_window_threshold(),
            horizon_days: default_horizon_days(),
            success_threshold: default_activation_success_threshold(),
            report_year: default_year(),
            corrections: Vec::new(),
        }
    }
}

fn default_window_days() -> u32 {
    3
}

fn default_window_threshold() -> f64 {
    350.0
}

fn default_horizon_days() -> u32 {
    60
}

fn default_activation_success_threshold() -> f64 {
    500.0
}

fn default_year() -> i32 {
    2023
}

fn default_first_month() -> u32 {
    1
}

fn default_last_month() -> u32 {
    8
}

/// Extra conversations credited to a company in a given month before
/// classification.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BonusEntry {
    pub month: u32,
    pub company_id: i64,
    pub amount: f64,
}

/// Monthly conversion-rate analysis for recently closed companies.
#[derive(Debug, Deserialize, Clone)]
pub struct ConversionSettings {
    #[serde(default = "default_year")]
    pub year: i32,
    #[serde(default = "default_first_month")]
    pub first_month: u32,
    #[serde(default = "default_last_month")]
    pub last_month: u32,
    #[serde(default = "default_conversion_success_threshold")]
    pub success_threshold: f64,
    #[serde(default)]
    pub bonuses: Vec<BonusEntry>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            year: default_year(),
            first_month: default_first_month(),
            last_month: default_last_month(),
            success_threshold: default_conversion_success_threshold(),
            bonuses: Vec::new(),
        }
    }
}

fn default_conversion_success_threshold() -> f64 {
    1500.0
}

/// Where cohort revenue values come from.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CohortSource {
    #[default]
    Live,
    /// Built-in lookup table, used to cross-check the heatmap against known output
    Synthetic,
}

/// Cohort revenue heatmap analysis.
#[derive(Debug, Deserialize, Clone)]
pub struct CohortSettings {
    #[serde(default = "default_year")]
    pub year: i32,
    #[serde(default = "default_first_month")]
    pub first_month: u32,
    /// Last invoice month considered for every cohort
    #[serde(default = "default_last_month")]
    pub last_month: u32,
    #[serde(default)]
    pub source: CohortSource,
}

impl Default for CohortSettings {
    fn default() -> Self {
        Self {
            year: default_year(),
            first_month: default_first_month(),
            last_month: default_last_month(),
            source: CohortSource::default(),
        }
    }
}

/// What to do when the query for a single company, month or cohort fails.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryErrorPolicy {
    #[default]
    Abort,
    /// Record the failed unit and leave it out of the result
    Skip,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Root application configuration.
///
/// Loaded from `config.yaml` (optional), then `COHORTSCOPE__*` environment
/// variables, then the legacy `DB_*` connection variables.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub postgres: PostgresSettings,
    #[serde(default)]
    pub activation: ActivationSettings,
    #[serde(default)]
    pub conversion: ConversionSettings,
    #[serde(default)]
    pub cohort: CohortSettings,
    #[serde(default)]
    pub query_error_policy: QueryErrorPolicy,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Longest window, horizon or correction accepted, in days.
pub const MAX_SPAN_DAYS: u32 = 3660;

const LEGACY_DB_VARS: [(&str, &str); 5] = [
    ("postgres.host", "DB_HOST"),
    ("postgres.port", "DB_PORT"),
    ("postgres.user", "DB_USER"),
    ("postgres.password", "DB_PASSWORD"),
    ("postgres.database", "DB_NAME"),
];

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_path("config")
    }

    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("COHORTSCOPE")
                    .separator("__")
                    .try_parsing(true),
            );

        for (key, var) in LEGACY_DB_VARS {
            builder = builder.set_override_option(key, std::env::var(var).ok())?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    /// Parses settings from a YAML document without consulting the environment.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let ranges = [
            ("conversion", self.conversion.first_month, self.conversion.last_month),
            ("cohort", self.cohort.first_month, self.cohort.last_month),
        ];
        for (section, first, last) in ranges {
            if first < 1 || last > 12 || first > last {
                return Err(ConfigError::Message(format!(
                    "{section}: invalid month range {first}..={last}"
                )));
            }
        }
        let activation = &self.activation;
        if activation.window_days == 0 || activation.window_days > MAX_SPAN_DAYS {
            return Err(ConfigError::Message(format!(
                "activation.window_days must be between 1 and {MAX_SPAN_DAYS}"
            )));
        }
        if activation.horizon_days > MAX_SPAN_DAYS {
            return Err(ConfigError::Message(format!(
                "activation.horizon_days must be at most {MAX_SPAN_DAYS}"
            )));
        }
        if let Some(c) = activation
            .corrections
            .iter()
            .find(|c| c.days.unsigned_abs() > u64::from(MAX_SPAN_DAYS))
        {
            return Err(ConfigError::Message(format!(
                "activation.corrections: offset for company {} exceeds {MAX_SPAN_DAYS} days",
                c.company_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
postgres:
  host: localhost
  port: 5432
  user: analyst
  password: secret
  database: crm
"#;

    #[test]
    fn test_defaults_match_reference_analyses() {
        let settings = Settings::from_yaml(MINIMAL).unwrap();
        assert_eq!(settings.postgres.pool_size, 4);
        assert_eq!(settings.activation.window_days, 3);
        assert_eq!(settings.activation.window_threshold, 350.0);
        assert_eq!(settings.activation.horizon_days, 60);
        assert_eq!(settings.activation.success_threshold, 500.0);
        assert_eq!(settings.conversion.success_threshold, 1500.0);
        assert_eq!(settings.cohort.last_month, 8);
        assert_eq!(settings.cohort.source, CohortSource::Live);
        assert_eq!(settings.query_error_policy, QueryErrorPolicy::Abort);
        assert!(settings.conversion.bonuses.is_empty());
    }

    #[test]
    fn test_tables_and_enums_parse() {
        let yaml = format!(
            "{MINIMAL}
query_error_policy: skip
cohort:
  source: synthetic
activation:
  corrections:
    - {{ company_id: 42, days: -25 }}
conversion:
  bonuses:
    - {{ month: 3, company_id: 10, amount: 80 }}
"
        );
        let settings = Settings::from_yaml(&yaml).unwrap();
        assert_eq!(settings.query_error_policy, QueryErrorPolicy::Skip);
        assert_eq!(settings.cohort.source, CohortSource::Synthetic);
        assert_eq!(
            settings.activation.corrections,
            vec![DateCorrection { company_id: 42, days: -25 }]
        );
        assert_eq!(
            settings.conversion.bonuses,
            vec![BonusEntry { month: 3, company_id: 10, amount: 80.0 }]
        );
    }

    #[test]
    fn test_rejects_inverted_month_range() {
        let yaml = format!("{MINIMAL}\ncohort:\n  first_month: 9\n  last_month: 8\n");
        assert!(Settings::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_day_spans() {
        for section in [
            "activation:\n  horizon_days: 4000000000\n",
            "activation:\n  window_days: 4000000000\n",
            "activation:\n  corrections:\n    - { company_id: 1, days: -9000000000 }\n",
        ] {
            let yaml = format!("{MINIMAL}\n{section}");
            assert!(Settings::from_yaml(&yaml).is_err(), "accepted {section:?}");
        }

        let yaml = format!("{MINIMAL}\nactivation:\n  horizon_days: {MAX_SPAN_DAYS}\n");
        assert!(Settings::from_yaml(&yaml).is_ok());
    }
}
