//! The three one-shot analyses.
//!
//! Each analysis:
//! - queries a [`DataSource`] once per unit (company, month or cohort)
//! - aggregates in memory with [`crate::metrics`]
//! - returns a [`Report`] holding the chart, or an explicit "no data" result

use std::fmt;
use std::str::FromStr;

use log::{info, warn};
use serde::Serialize;

use crate::config::{QueryErrorPolicy, Settings};
use crate::db::DataSource;
use crate::error::{AnalysisError, AnalysisResult, ErrorKind};
use crate::presentation::Chart;

pub mod activation;
pub mod cohort_revenue;
pub mod conversion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Activation,
    Conversion,
    CohortRevenue,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Activation => "activation",
            AnalysisKind::Conversion => "conversion",
            AnalysisKind::CohortRevenue => "cohort-revenue",
        }
    }

    pub fn all() -> [AnalysisKind; 3] {
        [
            AnalysisKind::Activation,
            AnalysisKind::Conversion,
            AnalysisKind::CohortRevenue,
        ]
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisKind::all()
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown analysis '{s}'"))
    }
}

/// A unit of work left out of the result because its query failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedUnit {
    pub unit: String,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Report {
    Ready {
        chart: Chart,
        skipped: Vec<SkippedUnit>,
    },
    NoData {
        kind: ErrorKind,
        reason: String,
    },
}

impl Report {
    pub fn no_data(reason: impl Into<String>) -> Self {
        Report::NoData {
            kind: ErrorKind::EmptyInput,
            reason: reason.into(),
        }
    }

    pub fn chart(&self) -> Option<&Chart> {
        match self {
            Report::Ready { chart, .. } => Some(chart),
            Report::NoData { .. } => None,
        }
    }
}

/// Applies the configured [`QueryErrorPolicy`] to per-unit query results.
///
/// Only query errors can be skipped; connection errors always abort.
pub(crate) struct UnitErrors {
    policy: QueryErrorPolicy,
    skipped: Vec<SkippedUnit>,
}

impl UnitErrors {
    pub(crate) fn new(policy: QueryErrorPolicy) -> Self {
        Self {
            policy,
            skipped: Vec::new(),
        }
    }

    /// `Ok(None)` means the unit was skipped and must be left out entirely.
    pub(crate) fn check<T>(
        &mut self,
        unit: impl fmt::Display,
        result: AnalysisResult<T>,
    ) -> AnalysisResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if self.policy == QueryErrorPolicy::Skip && e.kind() == ErrorKind::Query => {
                warn!("Skipping {}: {}", unit, e);
                self.skipped.push(SkippedUnit {
                    unit: unit.to_string(),
                    kind: e.kind().as_str(),
                    message: e.to_string(),
                });
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }

    pub(crate) fn into_skipped(self) -> Vec<SkippedUnit> {
        self.skipped
    }
}

/// Runs one analysis against `source` with the given settings.
pub async fn run(
    kind: AnalysisKind,
    source: &dyn DataSource,
    settings: &Settings,
) -> AnalysisResult<Report> {
    info!("Running {} analysis against {}", kind, source.source_name());
    let policy = settings.query_error_policy;

    let report = match kind {
        AnalysisKind::Activation => activation::run(source, &settings.activation, policy).await?,
        AnalysisKind::Conversion => conversion::run(source, &settings.conversion, policy).await?,
        AnalysisKind::CohortRevenue => {
            cohort_revenue::run(source, &settings.cohort, policy).await?
        },
    };

    if let Report::NoData { reason, .. } = &report {
        info!("{} analysis produced no data: {}", kind, reason);
    }
    Ok(report)
}

pub(crate) fn invalid_range(section: &str) -> AnalysisError {
    AnalysisError::Config(::config::ConfigError::Message(format!(
        "{section}: invalid month range"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in AnalysisKind::all() {
            assert_eq!(kind.as_str().parse::<AnalysisKind>(), Ok(kind));
        }
        assert!("revenue".parse::<AnalysisKind>().is_err());
    }

    #[test]
    fn test_no_data_reports_empty_input_kind() {
        let report = Report::no_data("no partner-sourced companies");
        assert!(report.chart().is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "no_data");
        assert_eq!(json["kind"], "empty_input");
        assert_eq!(json["reason"], "no partner-sourced companies");
    }

    #[test]
    fn test_unit_errors_skip_only_query_errors() {
        let mut errors = UnitErrors::new(QueryErrorPolicy::Skip);
        let skipped: AnalysisResult<Option<u8>> =
            errors.check("company 7", Err(AnalysisError::query("q", "boom")));
        assert_eq!(skipped.unwrap(), None);

        let fatal: AnalysisResult<Option<u8>> =
            errors.check("company 8", Err(AnalysisError::Connection("gone".into())));
        assert!(fatal.is_err());

        let skipped = errors.into_skipped();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].unit, "company 7");
        assert_eq!(skipped[0].kind, "query");
    }

    #[test]
    fn test_unit_errors_abort_policy_propagates() {
        let mut errors = UnitErrors::new(QueryErrorPolicy::Abort);
        let result: AnalysisResult<Option<u8>> =
            errors.check("march", Err(AnalysisError::query("q", "boom")));
        assert!(result.is_err());
        assert!(errors.into_skipped().is_empty());
    }
}
