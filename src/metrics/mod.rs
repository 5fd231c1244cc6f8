//! Aggregation and classification primitives for the analyses.
//!
//! This module is organized into focused submodules:
//!
//! - [`month`] - Calendar month keys for cohorts and periods
//! - [`rolling`] - Trailing-window and running-total threshold crossings
//! - [`cohort`] - Sparse cohort x period matrices and the synthetic table
//! - [`classifier`] - Threshold classification, success rates and bonuses
//! - [`series`] - Weekly bucketing for time series

mod classifier;
mod cohort;
mod month;
mod rolling;
mod series;

// ============================================
// Re-exports
// ============================================

pub use classifier::{BonusTable, Classification, SuccessClassifier, SuccessRate};
pub use cohort::{CohortBinner, CohortMatrix, SyntheticRevenue};
pub use month::MonthKey;
pub use rolling::{Crossing, DateCorrections, RollingWindowAggregator};
pub use series::{week_ending_monday, weekly_cumulative};
