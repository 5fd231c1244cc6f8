use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Conversation total for one account on one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub account_id: i64,
    pub date: NaiveDate,
    pub total: f64,
}

impl DailyTotal {
    pub fn new(account_id: i64, date: NaiveDate, total: f64) -> Self {
        Self {
            account_id,
            date,
            total,
        }
    }
}

/// Conversation total for one account over a period (e.g. a calendar month).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountTotal {
    pub account_id: i64,
    pub total: f64,
}

/// A single conversation record as stored in `conversations`.
///
/// Only [`MemorySource`](crate::db::MemorySource) works at this granularity;
/// the PostgreSQL queries aggregate in SQL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub account_id: i64,
    pub date: NaiveDate,
    pub total: f64,
    pub successful: bool,
}
