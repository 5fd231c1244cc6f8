use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::metrics::MonthKey;

/// A billing invoice (PostgreSQL `stripe_invoice`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub billing_id: String,
    pub sent_date: NaiveDate,
    pub amount: f64,
}

/// Invoice amounts summed over one invoice month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    pub month: MonthKey,
    pub revenue: f64,
}
